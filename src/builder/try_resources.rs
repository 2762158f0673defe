//! Try-with-resources desugaring.
//!
//! A try with resources becomes plain try/catch/finally blocks. The first resource is peeled
//! into its own block and the rest are handled recursively inside it:
//!
//! ```text
//! {
//!     final R r = acquire()
//!     Throwable __$$primaryExc0 = null
//!     try { ...rest... }
//!     catch (Throwable __$$t0) { __$$primaryExc0 = __$$t0; throw __$$t0 }
//!     finally {
//!         if (__$$primaryExc0 != null) {
//!             try { r?.close() } catch (Throwable __$$suppressedExc0) { __$$primaryExc0?.addSuppressed(__$$suppressedExc0) }
//!         } else r?.close()
//!     }
//! }
//! ```
//!
//! A try that also has catch clauses or a finally block keeps them on an outer try wrapping
//! the rewritten one.

use pest::iterators::Pair;

use super::{AstBuilder, BuildResult, Synthetic};
use crate::ast::{
    BinaryOp, CatchClause, Declaration, Expr, ExprKind, Modifiers, Parameter, Stmt, StmtKind,
    TypeRef, TypedName,
};
use crate::syntax::{Rule, Span};

impl AstBuilder {
    /// Resource declarations in source order, each as a `Declaration` expression.
    pub(crate) fn resources(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<Expr>> {
        pair.into_inner().map(|resource| self.resource(resource)).collect()
    }

    fn resource(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let inner = self.first_child(&pair)?;
        match inner.as_rule() {
            Rule::local_variable_declaration => {
                let stmt = self.local_variable_declaration(inner)?;
                match stmt.kind {
                    StmtKind::Expression(decl) => Ok(decl),
                    _ => Err(self.syntax_error("Multi resources can not be declared in one statement", span)),
                }
            }
            Rule::expression => {
                let expr = self.expression(inner)?;
                self.resource_access(expr, span)
            }
            _ => Err(self.unexpected(&inner)),
        }
    }

    /// `r = acquire()` declares `r`; a bare `r` is bound to a fresh `__$$resourceN`.
    fn resource_access(&mut self, expr: Expr, span: Span) -> BuildResult<Expr> {
        if expr.as_variable().is_some() {
            let name = self.fresh_name(Synthetic::Resource);
            tracing::trace!(%name, "binding resource variable");
            let name_span = expr.span;
            return Ok(resource_declaration(name, name_span, expr, span));
        }
        if let ExprKind::Binary {
            left,
            op: BinaryOp::Assign,
            right,
        } = expr.kind
        {
            let Expr { kind, span: name_span } = *left;
            if let ExprKind::Variable(name) = kind {
                return Ok(resource_declaration(name, name_span, *right, span));
            }
        }
        Err(self.syntax_error(
            "Only variable declarations or variable access are allowed to declare resource",
            span,
        ))
    }

    /// Rewrites a resource-bearing try. `finally` is `Empty` when absent.
    pub(crate) fn try_with_resources(
        &mut self,
        mut resources: Vec<Expr>,
        body: Stmt,
        catches: Vec<CatchClause>,
        finally: Stmt,
        span: Span,
    ) -> BuildResult<Stmt> {
        if resources.is_empty() {
            return Ok(plain_try(body, catches, finally, span));
        }

        if !catches.is_empty() || !finally.is_empty() {
            let inner = self.try_with_resources(resources, body, Vec::new(), Stmt::empty(span), span)?;
            return Ok(plain_try(Stmt::block(vec![inner], span), catches, finally, span));
        }

        let mut first = resources.remove(0);
        let resource_name = match &mut first.kind {
            ExprKind::Declaration(decl) => {
                decl.modifiers.insert(Modifiers::FINAL);
                decl.targets.first().map(|target| target.name.clone())
            }
            _ => None,
        }
        .ok_or_else(|| self.internal("resource is not a declaration", first.span))?;

        let primary = self.fresh_name(Synthetic::PrimaryException);
        tracing::trace!(resource = %resource_name, %primary, "rewriting try-with-resources");
        let primary_decl = Declaration {
            targets: vec![TypedName {
                name: primary.clone(),
                ty: throwable(span),
                span,
            }],
            multiple: false,
            value: Expr::null(span),
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
        };

        let close_finally = self.close_resource(&primary, &resource_name, span);
        let record_primary = self.record_primary(&primary, span);
        let rest = self.try_with_resources(resources, body, vec![record_primary], close_finally, span)?;

        Ok(Stmt::block(
            vec![
                Stmt::expression(first),
                Stmt::expression(Expr::new(ExprKind::Declaration(Box::new(primary_decl)), span)),
                rest,
            ],
            span,
        ))
    }

    /// `catch (Throwable t) { primary = t; throw t }`
    fn record_primary(&mut self, primary: &str, span: Span) -> CatchClause {
        let caught = self.fresh_name(Synthetic::Throwable);
        let assign = Expr::binary(
            Expr::variable(primary, span),
            BinaryOp::Assign,
            Expr::variable(caught.clone(), span),
            span,
        );
        let body = Stmt::block(
            vec![
                Stmt::expression(assign),
                Stmt::new(StmtKind::Throw(Expr::variable(caught.clone(), span)), span),
            ],
            span,
        );
        CatchClause {
            param: Parameter::new(caught, throwable(span), span),
            body,
            span,
        }
    }

    /// Closes the resource, attaching a close failure to the primary exception when there is one.
    fn close_resource(&mut self, primary: &str, resource: &str, span: Span) -> Stmt {
        let suppressed = self.fresh_name(Synthetic::SuppressedException);
        let add_suppressed = safe_call(
            Expr::variable(primary, span),
            "addSuppressed",
            vec![Expr::variable(suppressed.clone(), span)],
            span,
        );
        let guarded_close = plain_try(
            Stmt::block(vec![close_call(resource, span)], span),
            vec![CatchClause {
                param: Parameter::new(suppressed, throwable(span), span),
                body: Stmt::block(vec![Stmt::expression(add_suppressed)], span),
                span,
            }],
            Stmt::empty(span),
            span,
        );
        let has_primary = Expr::binary(
            Expr::variable(primary, span),
            BinaryOp::NotEqual,
            Expr::null(span),
            span,
        );
        let branch = Stmt::new(
            StmtKind::If {
                condition: has_primary,
                then_branch: Box::new(guarded_close),
                else_branch: Box::new(close_call(resource, span)),
            },
            span,
        );
        Stmt::block(vec![branch], span)
    }
}

fn resource_declaration(name: String, name_span: Span, value: Expr, span: Span) -> Expr {
    let decl = Declaration {
        targets: vec![TypedName {
            name,
            ty: TypeRef::dynamic(name_span),
            span: name_span,
        }],
        multiple: false,
        value,
        modifiers: Modifiers::default(),
        annotations: Vec::new(),
    };
    Expr::new(ExprKind::Declaration(Box::new(decl)), span)
}

fn plain_try(body: Stmt, catches: Vec<CatchClause>, finally: Stmt, span: Span) -> Stmt {
    Stmt::new(
        StmtKind::Try {
            body: Box::new(body),
            catches,
            finally: Box::new(finally),
        },
        span,
    )
}

fn throwable(span: Span) -> TypeRef {
    TypeRef::named("Throwable", span)
}

/// `resource?.close()`
fn close_call(resource: &str, span: Span) -> Stmt {
    Stmt::expression(safe_call(Expr::variable(resource, span), "close", Vec::new(), span))
}

fn safe_call(object: Expr, method: &str, args: Vec<Expr>, span: Span) -> Expr {
    let mut call = Expr::call(object, method, Expr::arguments(args, span), span);
    if let ExprKind::MethodCall(call) = &mut call.kind {
        call.safe = true;
    }
    call
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{Modifiers, Stmt, StmtKind};
    use crate::parse;

    fn only(text: &str) -> Stmt {
        let mut module = parse(text, "R.groovy").unwrap();
        assert_eq!(module.statements.len(), 1);
        module.statements.remove(0)
    }

    #[test]
    fn basic_shape_closes_the_resource() {
        let stmt = only("try (def r = open()) { r.read() }");
        assert_eq!(
            stmt.text(),
            "{ def r = this.open(); Throwable __$$primaryExc0 = null; \
             try { r.read() } catch (Throwable __$$t0) { (__$$primaryExc0 = __$$t0); throw __$$t0 } \
             finally { if ((__$$primaryExc0 != null)) try { r?.close() } \
             catch (Throwable __$$suppressedExc0) { __$$primaryExc0?.addSuppressed(__$$suppressedExc0) } \
             else r?.close() } }"
        );
        let statements = stmt.block_statements().unwrap();
        let first = statements[0].as_expression().unwrap();
        let crate::ast::ExprKind::Declaration(decl) = &first.kind else {
            panic!("expected the resource declaration");
        };
        assert!(decl.modifiers.has(Modifiers::FINAL));
    }

    #[test]
    fn catches_and_finally_wrap_the_rewrite() {
        let stmt = only("try (def r = open()) { r.read() } catch (IOException e) { log(e) } finally { done() }");
        let StmtKind::Try { body, catches, finally } = &stmt.kind else {
            panic!("expected an outer try");
        };
        assert_eq!(catches.len(), 1);
        assert_eq!(catches[0].param.ty.text(), "IOException");
        assert_eq!(finally.text(), "{ this.done() }");
        let inner = &body.block_statements().unwrap()[0];
        assert!(inner.text().starts_with("{ def r = this.open(); Throwable __$$primaryExc0 = null;"));
    }

    #[test]
    fn resources_nest_in_order() {
        let stmt = only("try (def a = open(1); def b = open(2)) { use(a, b) }");
        let text = stmt.text();
        let outer = text.find("def a = this.open(1)").unwrap();
        let inner = text.find("def b = this.open(2)").unwrap();
        assert!(outer < inner);
        assert!(text.contains("__$$primaryExc1"));
        assert!(text.contains("b?.close()"));
    }

    #[test]
    fn existing_variables_are_rebound() {
        let stmt = only("try (reader) { reader.read() }");
        assert!(stmt.text().starts_with("{ def __$$resource0 = reader;"));
        let stmt = only("try (r = open()) { r.read() }");
        assert!(stmt.text().starts_with("{ def r = this.open();"));
    }

    #[test]
    fn malformed_resources_are_rejected() {
        let failure = parse("try (def a = 1, b = 2) { }", "R.groovy").unwrap_err();
        assert_eq!(failure.messages(), vec!["Multi resources can not be declared in one statement"]);
        let failure = parse("try (open()) { }", "R.groovy").unwrap_err();
        assert_eq!(
            failure.messages(),
            vec!["Only variable declarations or variable access are allowed to declare resource"]
        );
    }
}
