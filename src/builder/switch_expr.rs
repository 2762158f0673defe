//! Switch expressions.
//!
//! `switch (x) { case 1 -> "a"; default -> "z" }` is rewritten to a closure that is called on
//! the spot:
//!
//! ```text
//! { -> def __$$sev0 = x; switch (__$$sev0) { case 1: return "a"; default: return "z" } }.call()
//! ```
//!
//! Colon arms keep their statements and produce a value with `yield`, which builds a `return`
//! carrying the yield marker.

use pest::iterators::Pair;

use super::{AstBuilder, BuildResult, FlowContext, Synthetic};
use crate::ast::{
    CaseStmt, Closure, ClosureParams, Declaration, Expr, ExprKind, Modifiers, Stmt, StmtKind,
    TypeRef, TypedName,
};
use crate::syntax::{Rule, Span};

/// What one label group contributes to the rewritten switch.
struct ArmGroup {
    branches: Vec<Arm>,
    arrow: bool,
    produces_value: bool,
}

enum Arm {
    Case(CaseStmt),
    Default(Stmt),
}

impl AstBuilder {
    pub(crate) fn switch_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        self.within(FlowContext::SwitchExpression, |this| this.rewrite_switch_expression(pair))
    }

    fn rewrite_switch_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        self.check_arrow_styles(&pair)?;

        let mut subject = None;
        let mut groups = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_switch => {}
                Rule::paren_expression => subject = Some(self.paren_expression(child)?),
                Rule::switch_expression_group => groups.push(self.arm_group(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let subject = subject.ok_or_else(|| self.internal("switch without a subject", span))?;

        let Some(first) = groups.first() else {
            return Err(self.syntax_error("`case` or `default` branches are expected", span));
        };
        if !first.arrow && !groups.iter().any(|group| group.produces_value) {
            return Err(self.syntax_error("`yield` or `throw` is expected", span));
        }

        let branches: Vec<Arm> = groups.into_iter().flat_map(|group| group.branches).collect();
        let last_is_case = matches!(branches.last(), Some(Arm::Case(_)));
        let mut cases = Vec::new();
        let mut defaults = Vec::new();
        for branch in branches {
            match branch {
                Arm::Case(case) => cases.push(case),
                Arm::Default(body) => defaults.push(body),
            }
        }
        if defaults.len() > 1 {
            return Err(self.syntax_error(
                "switch expression should have only one default case, which should appear at last",
                defaults[0].span,
            ));
        }
        if !defaults.is_empty() && last_is_case {
            return Err(self.syntax_error("default case should appear at last", defaults[0].span));
        }

        let variable = self.fresh_name(Synthetic::SwitchValue);
        tracing::trace!(%variable, cases = cases.len(), "rewriting switch expression");

        let subject_span = subject.span;
        let declaration = Declaration {
            targets: vec![TypedName {
                name: variable.clone(),
                ty: TypeRef::dynamic(subject_span),
                span: subject_span,
            }],
            multiple: false,
            value: subject,
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
        };
        let mut switch = Stmt::new(
            StmtKind::Switch {
                subject: Expr::variable(variable, subject_span),
                cases,
                default: Box::new(defaults.pop().unwrap_or_else(|| Stmt::empty(span))),
            },
            span,
        );
        if !self.config.keep_yield_markers {
            clear_yield_markers(&mut switch);
        }

        let body = Stmt::block(
            vec![
                Stmt::expression(Expr::new(ExprKind::Declaration(Box::new(declaration)), span)),
                switch,
            ],
            span,
        );
        Ok(call_closure(body, span))
    }

    /// Every label must use the same arrow.
    fn check_arrow_styles(&self, pair: &Pair<'_, Rule>) -> BuildResult<()> {
        let mut seen_arrow = false;
        let mut first_colon = None;
        for label in pair
            .clone()
            .into_inner()
            .filter(|p| p.as_rule() == Rule::switch_expression_group)
            .flat_map(|group| group.into_inner())
            .filter(|p| p.as_rule() == Rule::switch_expression_label)
        {
            let arrow = self.expect_child(&label, Rule::switch_arrow)?;
            if arrow.as_str() == "->" {
                seen_arrow = true;
            } else if first_colon.is_none() {
                first_colon = Some(self.span_of(&arrow));
            }
        }
        match first_colon {
            Some(span) if seen_arrow => {
                Err(self.syntax_error("`->` and `:` cannot be used together", span))
            }
            _ => Ok(()),
        }
    }

    fn arm_group(&mut self, pair: Pair<'_, Rule>) -> BuildResult<ArmGroup> {
        let span = self.span_of(&pair);
        let mut labels = Vec::new();
        let mut statements = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::switch_expression_label => labels.push(child),
                _ => statements.push(child),
            }
        }
        let body_span = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => self.span_of(first).merge(self.span_of(last)),
            _ => span,
        };
        let arrow = labels
            .last()
            .and_then(|label| super::child_of(label, Rule::switch_arrow))
            .is_some_and(|arrow| arrow.as_str() == "->");

        let mut seen_case = false;
        let mut arrow_count = 0;
        for label in &labels {
            if self.expect_child(label, Rule::switch_arrow)?.as_str() == "->" {
                arrow_count += 1;
                if arrow_count > 1 && seen_case {
                    return Err(self.syntax_error(
                        "`case ... ->` does not support falling through cases",
                        self.span_of(&labels[0]),
                    ));
                }
            }
            seen_case |= super::has_child(label, Rule::kw_case);
        }

        let statements = self.block_statements(statements.into_iter())?;
        if statements.is_empty() {
            return Err(self.syntax_error("`yield` is expected", body_span));
        }
        if arrow && statements.len() > 1 {
            return Err(self.syntax_error(
                format!("Expect only 1 statement, but {} statements found", statements.len()),
                body_span,
            ));
        }
        let produces_value = !arrow && statements.iter().any(yields_or_throws);
        let body = if arrow {
            arrow_result(statements, body_span)
        } else {
            Stmt::block(statements, body_span)
        };

        let label_count = labels.len();
        let mut case_span = None;
        let mut branches = Vec::new();
        for (position, label) in labels.into_iter().enumerate() {
            let label_span = self.span_of(&label);
            let last_label = position + 1 == label_count;
            match super::child_of(&label, Rule::expression_list) {
                Some(list) => {
                    let first_span = *case_span.get_or_insert(label_span);
                    let expressions = self.expression_list(list, false)?;
                    let count = expressions.len();
                    for (index, expr) in expressions.into_iter().enumerate() {
                        let case_body = if last_label && index + 1 == count {
                            body.clone()
                        } else {
                            Stmt::empty(label_span)
                        };
                        branches.push(Arm::Case(CaseStmt {
                            expr,
                            span: first_span.merge(label_span).merge(case_body.span),
                            body: case_body,
                        }));
                    }
                }
                None => {
                    let mut default = body.clone();
                    default.span = label_span.merge(body_span);
                    branches.push(Arm::Default(default));
                }
            }
        }

        Ok(ArmGroup {
            branches,
            arrow,
            produces_value,
        })
    }
}

/// The single statement of an arrow arm as a block that returns its value. `return` and
/// `throw` are kept; an expression returns itself; anything else runs in a called closure.
fn arrow_result(mut statements: Vec<Stmt>, span: Span) -> Stmt {
    let mut stmt = statements.remove(0);
    if let StmtKind::Block(inner) = &mut stmt.kind {
        if inner.len() == 1 {
            stmt = inner.remove(0);
        }
    }
    match stmt.kind {
        StmtKind::Return { .. } | StmtKind::Throw(_) => Stmt::block(vec![stmt], span),
        StmtKind::Expression(expr) => {
            let stmt_span = stmt.span;
            Stmt::block(vec![Stmt::ret(expr, stmt_span)], span)
        }
        _ => {
            let stmt_span = stmt.span;
            let value = call_closure(stmt, stmt_span);
            Stmt::block(vec![Stmt::ret(value, stmt_span)], span)
        }
    }
}

/// `{ -> body }.call()` with no implicit `this`.
fn call_closure(body: Stmt, span: Span) -> Expr {
    let closure = Closure {
        params: ClosureParams::Implicit,
        body,
    };
    Expr::call(
        Expr::new(ExprKind::Closure(Box::new(closure)), span),
        "call",
        Expr::arguments(Vec::new(), span),
        span,
    )
}

/// True when a colon arm produces its value through `yield` or leaves through `throw`.
fn yields_or_throws(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return { from_yield, .. } => *from_yield,
        StmtKind::Throw(_) => true,
        _ => nested_statements(stmt).into_iter().any(yields_or_throws),
    }
}

fn clear_yield_markers(stmt: &mut Stmt) {
    if let StmtKind::Return { from_yield, .. } = &mut stmt.kind {
        *from_yield = false;
    }
    for nested in nested_statements_mut(stmt) {
        clear_yield_markers(nested);
    }
}

pub(super) fn nested_statements(stmt: &Stmt) -> Vec<&Stmt> {
    match &stmt.kind {
        StmtKind::Block(stmts) => stmts.iter().collect(),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => vec![then_branch, else_branch],
        StmtKind::For { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Synchronized { body, .. } => vec![body],
        StmtKind::Switch { cases, default, .. } => cases
            .iter()
            .map(|case| &case.body)
            .chain(std::iter::once(&**default))
            .collect(),
        StmtKind::Try {
            body,
            catches,
            finally,
        } => std::iter::once(&**body)
            .chain(catches.iter().map(|clause| &clause.body))
            .chain(std::iter::once(&**finally))
            .collect(),
        _ => Vec::new(),
    }
}

fn nested_statements_mut(stmt: &mut Stmt) -> Vec<&mut Stmt> {
    match &mut stmt.kind {
        StmtKind::Block(stmts) => stmts.iter_mut().collect(),
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => vec![then_branch, else_branch],
        StmtKind::For { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::Synchronized { body, .. } => vec![body],
        StmtKind::Switch { cases, default, .. } => cases
            .iter_mut()
            .map(|case| &mut case.body)
            .chain(std::iter::once(&mut **default))
            .collect(),
        StmtKind::Try {
            body,
            catches,
            finally,
        } => std::iter::once(&mut **body)
            .chain(catches.iter_mut().map(|clause| &mut clause.body))
            .chain(std::iter::once(&mut **finally))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{ExprKind, Stmt, StmtKind};
    use crate::{parse, AstBuilder, BuilderConfig, SourceContext};

    /// The rewritten switch statement inside `{ -> def v = x; switch (v) {...} }.call()`.
    fn rewritten(text: &str) -> Stmt {
        let module = parse(text, "Sw.groovy").unwrap();
        switch_of(&module.statements[0])
    }

    fn switch_of(stmt: &Stmt) -> Stmt {
        let ExprKind::Declaration(decl) = &stmt.as_expression().unwrap().kind else {
            panic!("expected a declaration");
        };
        let call = decl.value.as_method_call().expect("a closure call");
        assert_eq!(call.method.text(), "call");
        assert!(!call.implicit_this);
        let ExprKind::Closure(closure) = &call.object.kind else {
            panic!("expected a closure");
        };
        closure.body.block_statements().unwrap()[1].clone()
    }

    fn error(text: &str) -> String {
        parse(text, "Sw.groovy").unwrap_err().messages()[0].to_string()
    }

    #[test]
    fn arrow_arms_return_their_values() {
        let switch = rewritten(r#"def r = switch (x) { case 1 -> "a"; case 2, 3 -> "b"; default -> "z" }"#);
        assert_eq!(
            switch.text(),
            "switch (__$$sev0) { case 1: { return a }; case 2: ; case 3: { return b }; default: { return z } }"
        );
    }

    #[test]
    fn subject_is_bound_to_a_fresh_local() {
        let module = parse("def a = switch (x) { default -> 1 }\ndef b = switch (y) { default -> 2 }", "Sw.groovy")
            .unwrap();
        let first = module.statements[0].as_expression().unwrap();
        let ExprKind::Declaration(decl) = &first.kind else {
            panic!("expected a declaration");
        };
        let ExprKind::Closure(closure) = &decl.value.as_method_call().unwrap().object.kind else {
            panic!("expected a closure");
        };
        assert_eq!(closure.body.block_statements().unwrap()[0].text(), "def __$$sev0 = x");
        assert_eq!(switch_of(&module.statements[1]).text(), "switch (__$$sev1) { default: { return 2 } }");
    }

    #[test]
    fn arrow_arm_statements_run_in_a_closure() {
        let switch = rewritten("def r = switch (x) { case 1 -> { yield 10 }; default -> throw new E() }");
        assert_eq!(
            switch.text(),
            "switch (__$$sev0) { case 1: { yield 10 }; default: { throw new E() } }"
        );
        let switch = rewritten("def r = switch (x) { default -> if (y) { 1 } }");
        let StmtKind::Switch { default, .. } = &switch.kind else {
            panic!("expected a switch");
        };
        assert_eq!(default.text(), "{ return { -> ... }.call() }");
    }

    #[test]
    fn colon_arms_need_yield_or_throw() {
        let switch = rewritten("def r = switch (x) { case 1: yield 'one'; default: yield 'other' }");
        assert_eq!(
            switch.text(),
            "switch (__$$sev0) { case 1: { yield one }; default: { yield other } }"
        );
        assert_eq!(error("def r = switch (x) { case 1: foo() }"), "`yield` or `throw` is expected");
    }

    #[test]
    fn yield_markers_can_be_dropped() {
        let source = SourceContext::from_file("Sw.groovy", "def r = switch (x) { default: yield 1 }");
        let config = BuilderConfig::default().with_yield_markers(false);
        let module = AstBuilder::new(source, config).build().unwrap();
        assert_eq!(switch_of(&module.statements[0]).text(), "switch (__$$sev0) { default: { return 1 } }");
    }

    #[test]
    fn malformed_switch_expressions() {
        assert_eq!(
            error("def r = switch (x) { case 1 -> 'a'; case 2: yield 'b' }"),
            "`->` and `:` cannot be used together"
        );
        assert_eq!(error("def r = switch (x) { }"), "`case` or `default` branches are expected");
        assert_eq!(
            error("def r = switch (x) { case 1 -> a(); b(); default -> 2 }"),
            "Expect only 1 statement, but 2 statements found"
        );
        assert_eq!(
            error("def r = switch (x) { default -> 1; case 1 -> 2 }"),
            "default case should appear at last"
        );
        assert_eq!(
            error("def r = switch (x) { default -> 1; default -> 2 }"),
            "switch expression should have only one default case, which should appear at last"
        );
    }

    #[test]
    fn jumps_cannot_leave_a_switch_expression() {
        assert_eq!(
            error("def m() { def r = switch (x) { default -> return 1 } }"),
            "switch expression does not support `return`"
        );
        assert_eq!(
            error("for (i in xs) { def r = switch (i) { default: break } }"),
            "switch expression does not support `break`"
        );
        assert_eq!(
            error("for (i in xs) { def r = switch (i) { default: continue } }"),
            "switch expression does not support `continue`"
        );
    }

    #[test]
    fn loops_inside_an_arm_may_break() {
        let switch = rewritten("def r = switch (x) { default: while (true) { break }; yield 1 }");
        assert_eq!(
            switch.text(),
            "switch (__$$sev0) { default: { while (true) { break }; yield 1 } }"
        );
    }
}
