//! Statements, blocks and local variable declarations.
//!
//! Loop, switch and closure nesting is tracked through [`AstBuilder::within`] so `break`,
//! `continue`, `return` and `yield` can be validated where they appear.

use std::iter::Peekable;

use pest::iterators::{Pair, Pairs};

use super::{push_flattened, AstBuilder, BuildResult, FlowContext};
use crate::ast::{
    BinaryOp, CaseStmt, CatchClause, Declaration, Expr, ExprKind, Parameter, Stmt, StmtKind,
    TypeRef, TypedName,
};
use crate::syntax::{Rule, Span};

/// One entry of a switch body before cases and the default are separated.
enum Branch {
    Case(CaseStmt),
    Default(Stmt),
}

impl AstBuilder {
    // ========================================================================
    // BLOCKS
    // ========================================================================

    /// Statements of a block, closure or switch arm. Declaration lists are flattened and a
    /// failed statement is recorded and skipped.
    pub(crate) fn block_statements<'i>(
        &mut self,
        pairs: impl Iterator<Item = Pair<'i, Rule>>,
    ) -> BuildResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        for pair in pairs {
            if self.collector.is_full() {
                break;
            }
            let result = self.block_statement(pair);
            if let Some(stmt) = self.recover(result)? {
                push_flattened(&mut statements, stmt);
            }
        }
        Ok(statements)
    }

    pub(crate) fn block(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let statements = self.block_statements(pair.into_inner())?;
        Ok(Stmt::block(statements, span))
    }

    pub(crate) fn statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        match pair.as_rule() {
            Rule::block => self.block(pair),
            Rule::if_statement => self.if_statement(pair),
            Rule::for_statement => self.within(FlowContext::Loop, |this| this.for_statement(pair)),
            Rule::while_statement => self.within(FlowContext::Loop, |this| this.while_statement(pair)),
            Rule::do_while_statement => {
                self.within(FlowContext::Loop, |this| this.do_while_statement(pair))
            }
            Rule::try_statement => self.try_statement(pair),
            Rule::switch_statement => {
                self.within(FlowContext::SwitchStatement, |this| this.switch_statement(pair))
            }
            Rule::synchronized_statement => {
                let lock = self.paren_expression(self.expect_child(&pair, Rule::paren_expression)?)?;
                let body = self.block(self.expect_child(&pair, Rule::block)?)?;
                Ok(Stmt::new(
                    StmtKind::Synchronized {
                        lock,
                        body: Box::new(body),
                    },
                    span,
                ))
            }
            Rule::return_statement => self.return_statement(pair),
            Rule::throw_statement => {
                let value = self.expression(self.expect_child(&pair, Rule::expression)?)?;
                Ok(Stmt::new(StmtKind::Throw(value), span))
            }
            Rule::break_statement => self.break_statement(pair),
            Rule::continue_statement => self.continue_statement(pair),
            Rule::yield_statement => self.yield_statement(pair),
            Rule::assert_statement => {
                self.assert_depth += 1;
                let result = self.assert_statement(pair);
                self.assert_depth -= 1;
                result
            }
            Rule::labeled_statement => self.labeled_statement(pair),
            Rule::empty_statement => Ok(Stmt::empty(span)),
            Rule::expression_statement => {
                let expr = self.command_expression(self.first_child(&pair)?)?;
                Ok(Stmt::new(StmtKind::Expression(expr), span))
            }
            _ => Err(self.unexpected(&pair)),
        }
    }

    // ========================================================================
    // LOCAL VARIABLES
    // ========================================================================

    /// `int a = 1, b`, `def x`, `final (a, b) = pair`. Several declarators give a
    /// declaration list.
    pub(crate) fn local_variable_declaration(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        if let Some(multiple) = children.next_if(|p| p.as_rule() == Rule::multiple_variable_declaration) {
            let decl = self.multiple_variable_declaration(multiple)?;
            return Ok(Stmt::new(StmtKind::Expression(decl), span));
        }

        let mut decls = self.variable_declaration(&mut children, span)?;
        match decls.len() {
            1 => Ok(Stmt::new(StmtKind::Expression(decls.remove(0)), span)),
            _ => Ok(Stmt::new(StmtKind::DeclarationList(decls), span)),
        }
    }

    /// Modifiers, an optional type and the declarators, shared by locals and `for` init.
    fn variable_declaration(
        &mut self,
        children: &mut Peekable<Pairs<'_, Rule>>,
        span: Span,
    ) -> BuildResult<Vec<Expr>> {
        let modifiers = self.modifier_set(children)?;
        let ty = match children.next_if(|p| p.as_rule() == Rule::type_ref) {
            Some(ty) => Some(self.type_ref(ty, false)?),
            None => None,
        };
        let declarators = children
            .next()
            .ok_or_else(|| self.internal("declaration without declarators", span))?;

        let mut decls = Vec::new();
        for declarator in declarators.into_inner() {
            // Each declaration reaches back over the shared modifiers and type.
            let decl_span = Span::new(span.start, self.span_of(&declarator).end);
            let mut parts = declarator.into_inner();
            let name = parts
                .next()
                .ok_or_else(|| self.internal("declarator without a name", decl_span))?;
            let name_span = self.span_of(&name);
            let value = match parts.next() {
                Some(init) => self.variable_initializer(init)?,
                None => Expr::empty(name_span),
            };
            let (ty, target_span) = match &ty {
                Some(ty) => (ty.clone(), ty.span.merge(name_span)),
                None => (TypeRef::dynamic(name_span), name_span),
            };
            let target = TypedName {
                name: name.as_str().to_string(),
                ty,
                span: target_span,
            };
            let decl = Declaration {
                targets: vec![target],
                multiple: false,
                value,
                modifiers: modifiers.bits(),
                annotations: modifiers.annotations(),
            };
            decls.push(Expr::new(ExprKind::Declaration(Box::new(decl)), decl_span));
        }
        Ok(decls)
    }

    fn multiple_variable_declaration(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let modifiers = self.modifier_set(&mut children)?;
        let mut targets = Vec::new();
        let mut value = None;
        for child in children {
            match child.as_rule() {
                Rule::typed_name => targets.push(self.typed_name(child)?),
                Rule::variable_initializer => value = Some(self.variable_initializer(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let value = value.ok_or_else(|| self.internal("multiple declaration without a value", span))?;
        let decl = Declaration {
            targets,
            multiple: true,
            value,
            modifiers: modifiers.bits(),
            annotations: modifiers.annotations(),
        };
        Ok(Expr::new(ExprKind::Declaration(Box::new(decl)), span))
    }

    fn typed_name(&mut self, pair: Pair<'_, Rule>) -> BuildResult<TypedName> {
        let span = self.span_of(&pair);
        let mut ty = TypeRef::dynamic(span);
        let mut name = String::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::type_ref => ty = self.type_ref(child, false)?,
                Rule::identifier => name = child.as_str().to_string(),
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(TypedName { name, ty, span })
    }

    // ========================================================================
    // CONTROL FLOW
    // ========================================================================

    fn if_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut condition = None;
        let mut branches = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_if | Rule::kw_else => {}
                Rule::paren_expression => condition = Some(self.paren_expression(child)?),
                _ => branches.push(self.statement(child)?),
            }
        }
        let condition = condition.ok_or_else(|| self.internal("if without a condition", span))?;
        let mut branches = branches.into_iter();
        let then_branch = branches
            .next()
            .ok_or_else(|| self.internal("if without a body", span))?;
        let else_branch = branches.next().unwrap_or_else(|| Stmt::empty(span));
        Ok(Stmt::new(
            StmtKind::If {
                condition,
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn for_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut control = None;
        let mut body = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_for => {}
                Rule::enhanced_for_control => control = Some(self.enhanced_for_control(child)?),
                Rule::classic_for_control => control = Some((None, self.classic_for_control(child)?)),
                _ => body = Some(self.statement(child)?),
            }
        }
        let (variable, collection) =
            control.ok_or_else(|| self.internal("for without a control", span))?;
        let body = body.ok_or_else(|| self.internal("for without a body", span))?;
        Ok(Stmt::new(
            StmtKind::For {
                variable,
                collection,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// `for (T x in xs)` and `for (x : xs)`.
    fn enhanced_for_control(&mut self, pair: Pair<'_, Rule>) -> BuildResult<(Option<Parameter>, Expr)> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let param_start = children.peek().map(|first| self.span_of(first));
        let modifiers = self.modifier_set(&mut children)?;
        let mut ty = None;
        let mut variable = None;
        let mut collection = None;
        for child in children {
            match child.as_rule() {
                Rule::type_ref => ty = Some(self.type_ref(child, false)?),
                Rule::identifier => {
                    let name_span = self.span_of(&child);
                    let param_span = param_start.map_or(name_span, |start| start.merge(name_span));
                    let ty = ty.take().unwrap_or_else(|| TypeRef::dynamic(name_span));
                    let mut param = Parameter::new(child.as_str(), ty, param_span);
                    param.modifiers = modifiers.bits();
                    param.annotations = modifiers.annotations();
                    variable = Some(param);
                }
                Rule::kw_in => {}
                Rule::expression => collection = Some(self.expression(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let variable = variable.ok_or_else(|| self.internal("for-in without a variable", span))?;
        let collection = collection.ok_or_else(|| self.internal("for-in without a collection", span))?;
        Ok((Some(variable), collection))
    }

    /// Init, condition and update as a three-slot list. Missing slots are `Empty`.
    fn classic_for_control(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut slots = [Expr::empty(span), Expr::empty(span), Expr::empty(span)];
        for child in pair.into_inner() {
            let child_span = self.span_of(&child);
            match child.as_rule() {
                Rule::for_init => {
                    let inner = self.first_child(&child)?;
                    slots[0] = match inner.as_rule() {
                        Rule::local_variable_declaration => {
                            let mut parts = inner.into_inner().peekable();
                            let mut decls = self.variable_declaration(&mut parts, child_span)?;
                            match decls.len() {
                                1 => decls.remove(0),
                                _ => Expr::new(ExprKind::ClosureList(decls), child_span),
                            }
                        }
                        _ => self.expression_list_slot(inner, child_span)?,
                    };
                }
                Rule::for_condition => {
                    slots[1] = self.expression(self.first_child(&child)?)?;
                }
                Rule::for_update => {
                    slots[2] = self.expression_list_slot(self.first_child(&child)?, child_span)?;
                }
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(Expr::new(ExprKind::ClosureList(slots.into()), span))
    }

    /// One expression, or several as a closure list.
    fn expression_list_slot(&mut self, pair: Pair<'_, Rule>, span: Span) -> BuildResult<Expr> {
        let mut items = self.expression_list(pair, false)?;
        match items.len() {
            1 => Ok(items.remove(0)),
            _ => Ok(Expr::new(ExprKind::ClosureList(items), span)),
        }
    }

    fn while_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let (condition, body) = self.loop_parts(pair, span)?;
        Ok(Stmt::new(StmtKind::While { condition, body }, span))
    }

    fn do_while_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let (condition, body) = self.loop_parts(pair, span)?;
        Ok(Stmt::new(StmtKind::DoWhile { condition, body }, span))
    }

    fn loop_parts(&mut self, pair: Pair<'_, Rule>, span: Span) -> BuildResult<(Expr, Box<Stmt>)> {
        let mut condition = None;
        let mut body = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_while | Rule::kw_do => {}
                Rule::paren_expression => condition = Some(self.paren_expression(child)?),
                _ => body = Some(self.statement(child)?),
            }
        }
        let condition = condition.ok_or_else(|| self.internal("loop without a condition", span))?;
        let body = body.ok_or_else(|| self.internal("loop without a body", span))?;
        Ok((condition, Box::new(body)))
    }

    // ========================================================================
    // TRY AND SWITCH
    // ========================================================================

    fn try_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut resources = None;
        let mut body = None;
        let mut catches = Vec::new();
        let mut finally = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_try => {}
                Rule::resources => resources = Some(self.resources(child)?),
                Rule::block => body = Some(self.block(child)?),
                Rule::catch_clause => catches.extend(self.catch_clause(child)?),
                Rule::finally_block => {
                    finally = Some(self.block(self.expect_child(&child, Rule::block)?)?);
                }
                _ => return Err(self.unexpected(&child)),
            }
        }

        if resources.is_none() && catches.is_empty() && finally.is_none() {
            return Err(self.syntax_error(
                "Either a catch or finally clause or both is required for a try-catch-finally statement",
                span,
            ));
        }

        let body = body.ok_or_else(|| self.internal("try without a body", span))?;
        let finally = finally.unwrap_or_else(|| Stmt::empty(span));
        match resources {
            Some(resources) => self.try_with_resources(resources, body, catches, finally, span),
            None => Ok(Stmt::new(
                StmtKind::Try {
                    body: Box::new(body),
                    catches,
                    finally: Box::new(finally),
                },
                span,
            )),
        }
    }

    /// `catch (A | B e)` gives one clause per type; an untyped parameter catches `Exception`.
    fn catch_clause(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<CatchClause>> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        children.next_if(|p| p.as_rule() == Rule::kw_catch);
        let param_start = children.peek().map(|first| self.span_of(first));
        let modifiers = self.modifier_set(&mut children)?;
        let mut types = Vec::new();
        let mut name = None;
        let mut body = None;
        for child in children {
            match child.as_rule() {
                Rule::catch_type => {
                    types = child
                        .into_inner()
                        .map(|class| self.class_type(&class))
                        .collect();
                }
                Rule::identifier => name = Some((child.as_str().to_string(), self.span_of(&child))),
                Rule::block => body = Some(self.block(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let (name, name_span) = name.ok_or_else(|| self.internal("catch without a parameter", span))?;
        let body = body.ok_or_else(|| self.internal("catch without a body", span))?;
        if types.is_empty() {
            types.push(TypeRef::named("Exception", name_span));
        }
        let param_span = param_start.map_or(name_span, |start| start.merge(name_span));

        Ok(types
            .into_iter()
            .map(|ty| {
                let mut param = Parameter::new(name.clone(), ty, param_span);
                param.modifiers = modifiers.bits();
                param.annotations = modifiers.annotations();
                CatchClause {
                    param,
                    body: body.clone(),
                    span,
                }
            })
            .collect())
    }

    fn switch_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut subject = None;
        let mut branches = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::kw_switch => {}
                Rule::paren_expression => subject = Some(self.paren_expression(child)?),
                Rule::switch_group => branches.extend(self.switch_group(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let subject = subject.ok_or_else(|| self.internal("switch without a subject", span))?;

        let last_is_case = matches!(branches.last(), Some(Branch::Case(_)));
        let mut cases = Vec::new();
        let mut defaults = Vec::new();
        for branch in branches {
            match branch {
                Branch::Case(case) => cases.push(case),
                Branch::Default(body) => defaults.push(body),
            }
        }
        if defaults.len() > 1 {
            return Err(self.syntax_error("a switch must only have one default branch", defaults[0].span));
        }
        if !defaults.is_empty() && last_is_case {
            return Err(self.syntax_error(
                "a default branch must only appear as the last branch of a switch",
                defaults[0].span,
            ));
        }

        let default = defaults.pop().unwrap_or_else(|| Stmt::empty(span));
        Ok(Stmt::new(
            StmtKind::Switch {
                subject,
                cases,
                default: Box::new(default),
            },
            span,
        ))
    }

    /// Labels of one group. Only the last label carries the group's statements; the others
    /// fall through to it.
    fn switch_group(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Vec<Branch>> {
        let span = self.span_of(&pair);
        let mut labels = Vec::new();
        let mut statements = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::switch_label => labels.push(child),
                _ => statements.push(child),
            }
        }
        let body = Stmt::block(self.block_statements(statements.into_iter())?, span);

        let count = labels.len();
        let mut branches = Vec::with_capacity(count);
        let mut first_case_span = None;
        for (position, label) in labels.into_iter().enumerate() {
            let label_span = self.span_of(&label);
            match self.first_child(&label)?.as_rule() {
                Rule::kw_case => {
                    let expr = self.expression(self.expect_child(&label, Rule::expression)?)?;
                    let case_body = if position + 1 == count {
                        body.clone()
                    } else {
                        Stmt::empty(label_span)
                    };
                    // A case starts at the group's first label and covers its own body.
                    let case_span = first_case_span
                        .get_or_insert(label_span)
                        .merge(label_span)
                        .merge(case_body.span);
                    branches.push(Branch::Case(CaseStmt {
                        expr,
                        body: case_body,
                        span: case_span,
                    }));
                }
                _ => {
                    let mut default = body.clone();
                    default.span = label_span.merge(span);
                    branches.push(Branch::Default(default));
                }
            }
        }
        Ok(branches)
    }

    // ========================================================================
    // JUMPS
    // ========================================================================

    fn inside_switch_expression(&self) -> bool {
        self.innermost_flow() == Some(FlowContext::SwitchExpression)
    }

    fn return_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        if self.inside_switch_expression() {
            return Err(self.syntax_error("switch expression does not support `return`", span));
        }
        let value = match pair.into_inner().find(|p| p.as_rule() == Rule::expression) {
            Some(expr) => self.expression(expr)?,
            None => Expr::empty(span),
        };
        Ok(Stmt::ret(value, span))
    }

    fn break_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        if self.loop_depth == 0 && self.switch_depth == 0 {
            return Err(self.syntax_error("break statement is only allowed inside loops or switches", span));
        }
        if self.inside_switch_expression() {
            return Err(self.syntax_error("switch expression does not support `break`", span));
        }
        Ok(Stmt::new(StmtKind::Break(jump_label(pair)), span))
    }

    fn continue_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        if self.loop_depth == 0 {
            return Err(self.syntax_error("continue statement is only allowed inside loops", span));
        }
        if self.inside_switch_expression() {
            return Err(self.syntax_error("switch expression does not support `continue`", span));
        }
        Ok(Stmt::new(StmtKind::Continue(jump_label(pair)), span))
    }

    /// `yield v` is a marked return. It must sit in a switch expression arm, possibly inside
    /// loops or blocks of that arm, but not inside a closure or lambda.
    fn yield_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let in_arm = self
            .flow
            .iter()
            .rev()
            .find(|context| {
                matches!(
                    context,
                    FlowContext::SwitchExpression | FlowContext::Closure | FlowContext::Lambda
                )
            })
            .is_some_and(|context| *context == FlowContext::SwitchExpression);
        if !in_arm {
            return Err(self.syntax_error("yield statement is only allowed inside switch expressions", span));
        }
        let value = self.expression(self.expect_child(&pair, Rule::expression)?)?;
        Ok(Stmt::new(
            StmtKind::Return {
                value,
                from_yield: true,
            },
            span,
        ))
    }

    fn assert_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut expressions = pair.into_inner().filter(|p| p.as_rule() == Rule::expression);
        let condition = expressions
            .next()
            .ok_or_else(|| self.internal("assert without a condition", span))?;
        let condition = self.expression(condition)?;
        if condition.binary_op() == Some(BinaryOp::Assign) {
            return Err(self.syntax_error(
                "Assignment expression is not allowed in the assert statement",
                condition.span,
            ));
        }
        let message = match expressions.next() {
            Some(message) => self.expression(message)?,
            None => Expr::empty(span),
        };
        Ok(Stmt::new(StmtKind::Assert { condition, message }, span))
    }

    /// `outer: for (...)`. Labels are kept in source order on the labeled statement.
    fn labeled_statement(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Stmt> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner();
        let label = children
            .next()
            .ok_or_else(|| self.internal("labeled statement without a label", span))?;
        let inner = children
            .next()
            .ok_or_else(|| self.internal("labeled statement without a statement", span))?;
        let mut stmt = match inner.as_rule() {
            Rule::local_variable_declaration => self.local_variable_declaration(inner)?,
            _ => self.statement(inner)?,
        };
        stmt.labels.insert(0, label.as_str().to_string());
        Ok(stmt)
    }
}

fn jump_label(pair: Pair<'_, Rule>) -> Option<String> {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{ExprKind, StmtKind};
    use crate::parse;

    fn first(text: &str) -> String {
        parse(text, "S.groovy").unwrap().statements[0].text()
    }

    fn error(text: &str) -> String {
        parse(text, "S.groovy").unwrap_err().messages()[0].to_string()
    }

    #[test]
    fn if_else_chains() {
        assert_eq!(first("if (a) b()"), "if (a) this.b()");
        assert_eq!(
            first("if (a) { x } else if (b) { y } else { z }"),
            "if (a) { x } else if (b) { y } else { z }"
        );
    }

    #[test]
    fn classic_for_keeps_empty_slots() {
        assert_eq!(first("for (;;) {}"), "for (; ; ) { }");
        assert_eq!(
            first("for (int i = 0, j = 1; i < 3; i++, j++) {}"),
            "for ((int i = 0; int j = 1); (i < 3); ((i++); (j++))) { }"
        );
    }

    #[test]
    fn enhanced_for_builds_a_parameter() {
        let module = parse("for (String s : names) { println s }", "S.groovy").unwrap();
        let StmtKind::For { variable, collection, .. } = &module.statements[0].kind else {
            panic!("expected a for loop");
        };
        let variable = variable.as_ref().unwrap();
        assert_eq!(variable.name, "s");
        assert_eq!(variable.ty.text(), "String");
        assert_eq!(collection.text(), "names");
        assert_eq!(first("for (x in 1..3) {}"), "for (x in (1..3)) { }");
    }

    #[test]
    fn loops_and_jumps() {
        assert_eq!(first("while (true) { break }"), "while (true) { break }");
        assert_eq!(first("do { continue } while (x)"), "do { continue } while (x)");
        assert_eq!(
            first("outer: for (x in xs) { for (y in ys) { continue outer } }"),
            "outer: for (x in xs) { for (y in ys) { continue outer } }"
        );
        assert_eq!(error("continue"), "continue statement is only allowed inside loops");
        assert_eq!(
            error("switch (x) { case 1: continue }"),
            "continue statement is only allowed inside loops"
        );
    }

    #[test]
    fn labels_stack_in_source_order() {
        let module = parse("a: b: while (x) { break a }", "S.groovy").unwrap();
        assert_eq!(module.statements[0].labels, vec!["a", "b"]);
    }

    #[test]
    fn switch_statement_groups() {
        assert_eq!(
            first("switch (x) { case 1: case 2: a(); break; default: b() }"),
            "switch (x) { case 1: ; case 2: { this.a(); break }; default: { this.b() } }"
        );
        assert_eq!(
            error("switch (x) { default: a(); default: b() }"),
            "a switch must only have one default branch"
        );
        assert_eq!(
            error("switch (x) { default: a(); case 1: b() }"),
            "a default branch must only appear as the last branch of a switch"
        );
    }

    #[test]
    fn multi_catch_splits_clauses() {
        let module = parse(
            "try { a() } catch (IOException | SQLException e) { b() } catch (e) { c() } finally { d() }",
            "S.groovy",
        )
        .unwrap();
        let StmtKind::Try { catches, finally, .. } = &module.statements[0].kind else {
            panic!("expected a try statement");
        };
        let types: Vec<String> = catches.iter().map(|c| c.param.ty.text()).collect();
        assert_eq!(types, vec!["IOException", "SQLException", "Exception"]);
        assert!(!finally.is_empty());
        assert_eq!(
            error("try { a() }"),
            "Either a catch or finally clause or both is required for a try-catch-finally statement"
        );
    }

    #[test]
    fn assert_rejects_assignment() {
        assert_eq!(first("assert x : 'msg'"), "assert x : msg");
        assert_eq!(first("assert a == b, 'msg'"), "assert (a == b) : msg");
        assert_eq!(
            error("assert x = 1"),
            "Assignment expression is not allowed in the assert statement"
        );
    }

    #[test]
    fn declarations() {
        assert_eq!(first("def x"), "def x");
        assert_eq!(first("final int x = 1"), "int x = 1");
        assert_eq!(first("def (a, b) = [1, 2]"), "def (a, b) = [1, 2]");
        assert_eq!(first("def (int a, String b) = f()"), "def (int a, String b) = this.f()");
        let module = parse("final x = 1", "S.groovy").unwrap();
        let ExprKind::Declaration(decl) = &module.statements[0].as_expression().unwrap().kind else {
            panic!("expected a declaration");
        };
        assert!(decl.modifiers.has(crate::ast::Modifiers::FINAL));
    }

    #[test]
    fn block_level_declarations_are_rejected() {
        assert_eq!(error("if (x) { import a.B }"), "Import statement not expected here");
        assert_eq!(error("if (x) { class A {} }"), "Class definition not expected here");
        assert_eq!(
            error("if (x) { def m() { 1 } }"),
            "Method definition not expected here"
        );
    }

    #[test]
    fn misc_statements() {
        assert_eq!(first("synchronized (lock) { a() }"), "synchronized (lock) { this.a() }");
        assert_eq!(first("throw new E('x')"), "throw new E(x)");
        assert_eq!(first(";"), ";");
        assert_eq!(first("return 1"), "return 1");
        assert_eq!(error("yield 1"), "yield statement is only allowed inside switch expressions");
    }
}
