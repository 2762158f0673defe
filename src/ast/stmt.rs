//! Statement nodes.

use serde::{Deserialize, Serialize};

use super::decl::Parameter;
use super::expr::Expr;
use crate::syntax::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    /// Statement labels in source order.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStmt {
    pub expr: Expr,
    /// `Empty` for a label that falls through.
    pub body: Stmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub param: Parameter,
    pub body: Stmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    Expression(Expr),
    /// Several declarations from one source statement, e.g. `int a = 1, b = 2`.
    DeclarationList(Vec<Expr>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Box<Stmt>,
    },
    /// Enhanced loops carry their variable; classic loops iterate a `ClosureList`.
    For {
        variable: Option<Parameter>,
        collection: Expr,
        body: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        condition: Expr,
        body: Box<Stmt>,
    },
    Switch {
        subject: Expr,
        cases: Vec<CaseStmt>,
        default: Box<Stmt>,
    },
    Try {
        body: Box<Stmt>,
        catches: Vec<CatchClause>,
        finally: Box<Stmt>,
    },
    Throw(Expr),
    Return {
        value: Expr,
        from_yield: bool,
    },
    Break(Option<String>),
    Continue(Option<String>),
    Synchronized {
        lock: Expr,
        body: Box<Stmt>,
    },
    Assert {
        condition: Expr,
        message: Expr,
    },
    Empty,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self {
            kind,
            span,
            labels: Vec::new(),
        }
    }

    pub fn empty(span: Span) -> Self {
        Self::new(StmtKind::Empty, span)
    }

    pub fn expression(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(StmtKind::Expression(expr), span)
    }

    pub fn block(statements: Vec<Stmt>, span: Span) -> Self {
        Self::new(StmtKind::Block(statements), span)
    }

    pub fn ret(value: Expr, span: Span) -> Self {
        Self::new(
            StmtKind::Return {
                value,
                from_yield: false,
            },
            span,
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, StmtKind::Empty)
    }

    pub fn as_expression(&self) -> Option<&Expr> {
        match &self.kind {
            StmtKind::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn block_statements(&self) -> Option<&[Stmt]> {
        match &self.kind {
            StmtKind::Block(statements) => Some(statements),
            _ => None,
        }
    }

    /// Compact one-line rendering used by tests and debug output.
    pub fn text(&self) -> String {
        let body = match &self.kind {
            StmtKind::Block(stmts) if stmts.is_empty() => "{ }".to_string(),
            StmtKind::Block(stmts) => format!("{{ {} }}", join(stmts)),
            StmtKind::Expression(expr) => expr.text(),
            StmtKind::DeclarationList(decls) => decls
                .iter()
                .map(Expr::text)
                .collect::<Vec<_>>()
                .join(", "),
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if else_branch.is_empty() {
                    format!("if ({}) {}", condition.text(), then_branch.text())
                } else {
                    format!(
                        "if ({}) {} else {}",
                        condition.text(),
                        then_branch.text(),
                        else_branch.text()
                    )
                }
            }
            StmtKind::For {
                variable,
                collection,
                body,
            } => match variable {
                Some(param) => format!("for ({} in {}) {}", param.name, collection.text(), body.text()),
                None => format!("for {} {}", collection.text(), body.text()),
            },
            StmtKind::While { condition, body } => {
                format!("while ({}) {}", condition.text(), body.text())
            }
            StmtKind::DoWhile { condition, body } => {
                format!("do {} while ({})", body.text(), condition.text())
            }
            StmtKind::Switch {
                subject,
                cases,
                default,
            } => {
                let mut parts: Vec<String> = cases
                    .iter()
                    .map(|c| format!("case {}: {}", c.expr.text(), c.body.text()))
                    .collect();
                if !default.is_empty() {
                    parts.push(format!("default: {}", default.text()));
                }
                format!("switch ({}) {{ {} }}", subject.text(), parts.join("; "))
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                let mut text = format!("try {}", body.text());
                for clause in catches {
                    text.push_str(&format!(
                        " catch ({} {}) {}",
                        clause.param.ty.text(),
                        clause.param.name,
                        clause.body.text()
                    ));
                }
                if !finally.is_empty() {
                    text.push_str(&format!(" finally {}", finally.text()));
                }
                text
            }
            StmtKind::Throw(expr) => format!("throw {}", expr.text()),
            StmtKind::Return { value, from_yield } => {
                let keyword = if *from_yield { "yield" } else { "return" };
                format!("{keyword} {}", value.text())
            }
            StmtKind::Break(label) => labelled("break", label),
            StmtKind::Continue(label) => labelled("continue", label),
            StmtKind::Synchronized { lock, body } => {
                format!("synchronized ({}) {}", lock.text(), body.text())
            }
            StmtKind::Assert { condition, message } => {
                if message.is_empty() {
                    format!("assert {}", condition.text())
                } else {
                    format!("assert {} : {}", condition.text(), message.text())
                }
            }
            StmtKind::Empty => ";".into(),
        };
        self.labels
            .iter()
            .rev()
            .fold(body, |text, label| format!("{label}: {text}"))
    }
}

fn join(stmts: &[Stmt]) -> String {
    stmts.iter().map(Stmt::text).collect::<Vec<_>>().join("; ")
}

fn labelled(keyword: &str, label: &Option<String>) -> String {
    match label {
        Some(label) => format!("{keyword} {label}"),
        None => keyword.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_prefix_in_source_order() {
        let mut stmt = Stmt::new(StmtKind::Break(Some("outer".into())), Span::default());
        stmt.labels = vec!["a".into(), "b".into()];
        assert_eq!(stmt.text(), "a: b: break outer");
    }

    #[test]
    fn if_without_else_omits_branch() {
        let stmt = Stmt::new(
            StmtKind::If {
                condition: Expr::variable("x", Span::default()),
                then_branch: Box::new(Stmt::block(vec![], Span::default())),
                else_branch: Box::new(Stmt::empty(Span::default())),
            },
            Span::default(),
        );
        assert_eq!(stmt.text(), "if (x) { }");
    }
}
