//! Expressions: operator chains, path folding, command chains, creators, closures and lambdas.
//!
//! `operator_expression` is a flat chain in the CST. Precedence is resolved with pest's Pratt
//! parser into an [`OpTree`], which is then folded with full access to the builder. Path
//! expressions are folded left to right through a [`PathState`] that carries the flags a later
//! element needs to see: whether the base was parenthesized, whether a `??.` safe chain was
//! entered, and the type arguments of the last member access.

use once_cell::sync::Lazy;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

use super::{child_of, has_child, AstBuilder, BuildResult, FlowContext};
use crate::ast::{
    ArrayCreation, BinaryOp, Closure, ClosureParams, Constant, ConstructorCall, ConstructorKind,
    Expr, ExprKind, GenericsType, IncDec, Lambda, MapEntry, MethodCall, Parameter, PrimitiveType,
    PropertyAccess, Stmt, TypeKind, TypeRef,
};
use crate::syntax::{Rule, Span};

use super::types::wrap_dims;

// ============================================================================
// OPERATOR PRECEDENCE
// ============================================================================

/// Loosest binding first.
static OPERATORS: Lazy<PrattParser<Rule>> = Lazy::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::ternary_op, Assoc::Right) | Op::infix(Rule::elvis_op, Assoc::Right))
        .op(Op::infix(Rule::implies_op, Assoc::Right))
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::infix(Rule::bit_or_op, Assoc::Left))
        .op(Op::infix(Rule::xor_op, Assoc::Left))
        .op(Op::infix(Rule::bit_and_op, Assoc::Left))
        .op(Op::infix(Rule::regex_op, Assoc::Left))
        .op(Op::infix(Rule::equality_op, Assoc::Left))
        .op(Op::infix(Rule::relational_op, Assoc::Left)
            | Op::postfix(Rule::as_type)
            | Op::postfix(Rule::instanceof_type))
        .op(Op::infix(Rule::shift_op, Assoc::Left) | Op::infix(Rule::range_op, Assoc::Left))
        .op(Op::infix(Rule::additive_op, Assoc::Left))
        .op(Op::infix(Rule::multiplicative_op, Assoc::Left))
        .op(Op::prefix(Rule::unary_add_op))
        .op(Op::infix(Rule::power_op, Assoc::Left))
        .op(Op::prefix(Rule::unary_not_op))
        .op(Op::prefix(Rule::cast_prefix))
        .op(Op::postfix(Rule::postfix_inc_dec))
});

/// Operator structure of one `operator_expression`, before any node is built.
enum OpTree<'i> {
    Operand(Pair<'i, Rule>),
    Prefix(Pair<'i, Rule>, Box<OpTree<'i>>),
    Postfix(Box<OpTree<'i>>, Pair<'i, Rule>),
    Infix(Box<OpTree<'i>>, Pair<'i, Rule>, Box<OpTree<'i>>),
}

impl<'i> OpTree<'i> {
    fn is_parenthesized(&self) -> bool {
        matches!(self, Self::Operand(path) if paren_depth(path) > 0)
    }

    /// The literal of an operand written as a bare number.
    fn bare_number(&self) -> Option<Pair<'i, Rule>> {
        match self {
            Self::Operand(path) => sole_child(path)
                .filter(|p| matches!(p.as_rule(), Rule::integer_literal | Rule::float_literal)),
            _ => None,
        }
    }
}

// ============================================================================
// PATH STATE
// ============================================================================

/// The expression folded so far from a path, plus the flags later elements depend on.
struct PathState {
    expr: Expr,
    parenthesized: bool,
    safe_chain: bool,
    generics: Vec<GenericsType>,
}

impl PathState {
    fn new(expr: Expr, parenthesized: bool) -> Self {
        Self {
            expr,
            parenthesized,
            safe_chain: false,
            generics: Vec::new(),
        }
    }

    fn step(expr: Expr, safe_chain: bool) -> Self {
        Self {
            expr,
            parenthesized: false,
            safe_chain,
            generics: Vec::new(),
        }
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

impl AstBuilder {
    /// A `lambda_expression`, `expression` or `command_expression`.
    pub(crate) fn enhanced_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        match pair.as_rule() {
            Rule::lambda_expression => self.lambda(pair),
            Rule::expression => self.expression(pair),
            Rule::command_expression => self.command_expression(pair),
            _ => Err(self.unexpected(&pair)),
        }
    }

    pub(crate) fn expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner();
        let first = children
            .next()
            .ok_or_else(|| self.internal("empty expression", span))?;
        match first.as_rule() {
            Rule::multiple_assignment => self.multiple_assignment(first),
            Rule::operator_expression => match (children.next(), children.next()) {
                (Some(op), Some(value)) => self.assignment(first, op, value, span),
                _ => self.operator_expression(first),
            },
            _ => Err(self.unexpected(&first)),
        }
    }

    /// `( expr )`. The result keeps the span of the parentheses.
    pub(crate) fn paren_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let inner = self.first_child(&pair)?;
        let mut expr = self.enhanced_expression(inner)?;
        expr.span = span;
        Ok(expr)
    }

    fn multiple_assignment(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut targets = Vec::new();
        let mut targets_span = None;
        let mut value = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::identifier => {
                    let ident_span = self.span_of(&child);
                    targets_span = Some(targets_span.map_or(ident_span, |s: Span| s.merge(ident_span)));
                    targets.push(Expr::variable(child.as_str(), ident_span));
                }
                Rule::command_expression => value = Some(self.command_expression(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let value = value.ok_or_else(|| self.internal("multiple assignment without a value", span))?;
        let tuple = Expr::new(ExprKind::Tuple(targets), targets_span.unwrap_or(span));
        Ok(Expr::binary(tuple, BinaryOp::Assign, value, span))
    }

    fn assignment(
        &mut self,
        target: Pair<'_, Rule>,
        op: Pair<'_, Rule>,
        value: Pair<'_, Rule>,
        span: Span,
    ) -> BuildResult<Expr> {
        let depth = paren_depth(&target);
        let left = self.operator_expression(target)?;
        let op = BinaryOp::from_token(op.as_str()).ok_or_else(|| self.unexpected(&op))?;

        if left.as_variable().is_some() && depth > 0 {
            if depth > 1 {
                return Err(self.syntax_error(
                    "Nested parenthesis is not allowed in multiple assignment, e.g. ((a)) = b",
                    span,
                ));
            }
            let left_span = left.span;
            let tuple = Expr::new(ExprKind::Tuple(vec![left]), left_span);
            let right = self.enhanced_expression(value)?;
            return Ok(Expr::binary(tuple, op, right, span));
        }

        let assignable = match &left.kind {
            ExprKind::Variable(_) => depth == 0,
            ExprKind::Property(_) => true,
            ExprKind::Binary { op, .. } => matches!(op, BinaryOp::Index | BinaryOp::SafeIndex),
            _ => false,
        };
        if !assignable {
            return Err(self.syntax_error(
                "The LHS of an assignment should be a variable or a field accessing expression",
                span,
            ));
        }

        let right = self.enhanced_expression(value)?;
        Ok(Expr::binary(left, op, right, span))
    }

    // ========================================================================
    // OPERATORS
    // ========================================================================

    pub(crate) fn operator_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let tree = OPERATORS
            .map_primary(OpTree::Operand)
            .map_prefix(|op, operand| OpTree::Prefix(op, Box::new(operand)))
            .map_postfix(|operand, op| OpTree::Postfix(Box::new(operand), op))
            .map_infix(|left, op, right| OpTree::Infix(Box::new(left), op, Box::new(right)))
            .parse(pair.into_inner());
        self.fold_operators(tree)
    }

    fn fold_operators(&mut self, tree: OpTree<'_>) -> BuildResult<Expr> {
        match tree {
            OpTree::Operand(path) => self.path_expression(path),
            OpTree::Prefix(op, operand) => self.prefix(op, *operand),
            OpTree::Postfix(operand, op) => {
                let expr = self.fold_operators(*operand)?;
                self.postfix(expr, op)
            }
            OpTree::Infix(left, op, right) => {
                let left = self.fold_operators(*left)?;
                let middle = match op.as_rule() {
                    Rule::ternary_op => {
                        let branch = self.expect_child(&op, Rule::expression)?;
                        Some(self.expression(branch)?)
                    }
                    _ => None,
                };
                let right = self.fold_operators(*right)?;
                self.infix(left, op, middle, right)
            }
        }
    }

    fn prefix(&mut self, op: Pair<'_, Rule>, operand: OpTree<'_>) -> BuildResult<Expr> {
        let op_span = self.span_of(&op);
        let token = op.as_str();

        if op.as_rule() == Rule::unary_add_op && token == "-" {
            if let Some(literal) = operand.bare_number() {
                let span = op_span.merge(self.span_of(&literal));
                return self.negated_number(&literal, span);
            }
        }

        let parenthesized = operand.is_parenthesized();
        let expr = self.fold_operators(operand)?;
        let span = op_span.merge(expr.span);
        let kind = match op.as_rule() {
            Rule::unary_not_op if token == "!" => ExprKind::Not(Box::new(expr)),
            Rule::unary_not_op => ExprKind::BitwiseNegation(Box::new(expr)),
            Rule::unary_add_op => match token {
                "+" if is_non_string_constant(&expr) && !parenthesized => {
                    return Ok(Expr { span, ..expr });
                }
                "+" => ExprKind::UnaryPlus(Box::new(expr)),
                "-" => ExprKind::UnaryMinus(Box::new(expr)),
                "++" => ExprKind::Prefix {
                    op: IncDec::Increment,
                    expr: Box::new(expr),
                },
                _ => ExprKind::Prefix {
                    op: IncDec::Decrement,
                    expr: Box::new(expr),
                },
            },
            Rule::cast_prefix => {
                let ty = self.cast_type(op)?;
                self.reject_super_cast(&expr, span)?;
                ExprKind::Cast {
                    ty,
                    expr: Box::new(expr),
                    coerce: false,
                }
            }
            _ => return Err(self.unexpected(&op)),
        };
        Ok(Expr::new(kind, span))
    }

    fn cast_type(&mut self, pair: Pair<'_, Rule>) -> BuildResult<TypeRef> {
        let span = self.span_of(&pair);
        let mut ty = None;
        let mut dims = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::primitive_type => ty = Some(self.primitive_type(&child)?),
                Rule::dims => dims = self.dims(child)?,
                Rule::type_ref => ty = Some(self.type_ref(child, false)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let mut ty = ty.ok_or_else(|| self.internal("cast without a type", span))?;
        if !dims.is_empty() {
            ty.span = span;
        }
        Ok(wrap_dims(ty, dims))
    }

    fn reject_super_cast(&self, expr: &Expr, span: Span) -> BuildResult<()> {
        if expr.is_super() {
            return Err(self.syntax_error("Cannot cast or coerce `super`", span));
        }
        Ok(())
    }

    fn postfix(&mut self, expr: Expr, op: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = expr.span.merge(self.span_of(&op));
        match op.as_rule() {
            Rule::postfix_inc_dec => {
                let op = if op.as_str() == "++" {
                    IncDec::Increment
                } else {
                    IncDec::Decrement
                };
                Ok(Expr::new(
                    ExprKind::Postfix {
                        op,
                        expr: Box::new(expr),
                    },
                    span,
                ))
            }
            Rule::as_type => {
                let ty = self.type_ref(self.expect_child(&op, Rule::type_ref)?, false)?;
                self.reject_super_cast(&expr, span)?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        ty,
                        expr: Box::new(expr),
                        coerce: true,
                    },
                    span,
                ))
            }
            Rule::instanceof_type => {
                let negated = has_child(&op, Rule::not_instanceof);
                let ty = self.type_ref(self.expect_child(&op, Rule::type_ref)?, false)?;
                let ty_span = ty.span;
                let op = if negated {
                    BinaryOp::NotInstanceOf
                } else {
                    BinaryOp::InstanceOf
                };
                Ok(Expr::binary(expr, op, Expr::new(ExprKind::Class(ty), ty_span), span))
            }
            _ => Err(self.unexpected(&op)),
        }
    }

    fn infix(
        &mut self,
        left: Expr,
        op: Pair<'_, Rule>,
        middle: Option<Expr>,
        right: Expr,
    ) -> BuildResult<Expr> {
        let span = left.span.merge(right.span);
        let kind = match op.as_rule() {
            Rule::ternary_op => {
                let then_expr =
                    middle.ok_or_else(|| self.internal("ternary without a branch", span))?;
                ExprKind::Ternary {
                    condition: Box::new(left),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(right),
                }
            }
            Rule::elvis_op => ExprKind::Elvis {
                condition: Box::new(left),
                else_expr: Box::new(right),
            },
            Rule::range_op => {
                let token = op.as_str();
                ExprKind::Range {
                    from: Box::new(left),
                    to: Box::new(right),
                    exclusive_from: token.starts_with('<'),
                    exclusive_to: token.ends_with('<'),
                }
            }
            _ => {
                let binary = BinaryOp::from_token(op.as_str()).ok_or_else(|| self.unexpected(&op))?;
                return Ok(Expr::binary(left, binary, right, span));
            }
        };
        Ok(Expr::new(kind, span))
    }

    // ========================================================================
    // PATHS
    // ========================================================================

    pub(crate) fn path_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner();
        let primary = children
            .next()
            .ok_or_else(|| self.internal("path without a primary", span))?;
        Ok(self.fold_path(primary, children)?.expr)
    }

    fn fold_path<'i>(
        &mut self,
        primary: Pair<'i, Rule>,
        elements: impl Iterator<Item = Pair<'i, Rule>>,
    ) -> BuildResult<PathState> {
        let parenthesized = primary.as_rule() == Rule::paren_expression;
        let start = PathState::new(self.primary(primary)?, parenthesized);
        self.fold_elements(start, elements)
    }

    fn fold_elements<'i>(
        &mut self,
        mut state: PathState,
        elements: impl Iterator<Item = Pair<'i, Rule>>,
    ) -> BuildResult<PathState> {
        for element in elements {
            state = self.path_element(state, element)?;
        }
        Ok(state)
    }

    fn primary(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        match pair.as_rule() {
            Rule::new_expression => {
                let creator = self.expect_child(&pair, Rule::creator)?;
                self.creator(creator, None, span)
            }
            Rule::this_primary => Ok(Expr::variable("this", span)),
            Rule::super_primary => Ok(Expr::variable("super", span)),
            Rule::builtin_type_primary => Ok(Expr::variable(pair.as_str(), span)),
            Rule::identifier_primary => self.identifier_primary(pair),
            Rule::paren_expression => self.paren_expression(pair),
            Rule::closure => self.closure(pair),
            Rule::map_literal => self.map_literal(pair),
            Rule::list_literal => self.list_literal(pair),
            Rule::switch_expression => self.switch_expression(pair),
            Rule::float_literal
            | Rule::integer_literal
            | Rule::gstring
            | Rule::string_literal
            | Rule::boolean_literal
            | Rule::null_literal => self.literal(pair),
            _ => Err(self.unexpected(&pair)),
        }
    }

    /// A name, or `Name<T>` used as a class literal.
    fn identifier_primary(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let name = self.expect_child(&pair, Rule::identifier)?;
        match child_of(&pair, Rule::type_arguments) {
            Some(arguments) => {
                let generics = self.type_arguments(arguments)?;
                let ty = TypeRef::new(
                    TypeKind::Named {
                        name: name.as_str().to_string(),
                        generics,
                    },
                    span,
                );
                Ok(Expr::new(ExprKind::Class(ty), span))
            }
            None => Ok(Expr::variable(name.as_str(), span)),
        }
    }

    fn path_element(&mut self, state: PathState, element: Pair<'_, Rule>) -> BuildResult<PathState> {
        let span = state.expr.span.merge(self.span_of(&element));
        let safe_chain = state.safe_chain;
        match element.as_rule() {
            Rule::member_access => self.member_access(state, element, span),
            Rule::method_pointer => {
                let method = self.name_part(self.expect_child(&element, Rule::name_part)?)?;
                let kind = ExprKind::MethodPointer {
                    object: Box::new(state.expr),
                    method: Box::new(method),
                };
                Ok(PathState::step(Expr::new(kind, span), safe_chain))
            }
            Rule::method_reference => {
                let method = match child_of(&element, Rule::name_part) {
                    Some(name) => self.name_part(name)?,
                    None => {
                        let new = self.expect_child(&element, Rule::kw_new)?;
                        Expr::string("new", self.span_of(&new))
                    }
                };
                let kind = ExprKind::MethodReference {
                    object: Box::new(state.expr),
                    method: Box::new(method),
                };
                Ok(PathState::step(Expr::new(kind, span), safe_chain))
            }
            Rule::creator_access => {
                let creator = self.expect_child(&element, Rule::creator)?;
                let created = self.creator(creator, Some(state.expr), span)?;
                Ok(PathState::step(created, safe_chain))
            }
            Rule::index_access => {
                let mut safe = safe_chain;
                let mut index = None;
                for child in element.into_inner() {
                    match child.as_rule() {
                        Rule::index_op => safe |= child.as_str() == "?[",
                        Rule::expression_list => {
                            let list_span = self.span_of(&child);
                            let mut items = self.expression_list(child, true)?;
                            index = Some(match items.len() {
                                1 if !matches!(items[0].kind, ExprKind::Spread(_)) => items.remove(0),
                                _ => Expr::new(ExprKind::List(items), list_span),
                            });
                        }
                        _ => return Err(self.unexpected(&child)),
                    }
                }
                let index = index.ok_or_else(|| self.internal("index without a value", span))?;
                let op = if safe { BinaryOp::SafeIndex } else { BinaryOp::Index };
                Ok(PathState::step(Expr::binary(state.expr, op, index, span), safe_chain))
            }
            Rule::named_property_args => {
                let args_span = self.span_of(&element);
                let mut op = BinaryOp::Index;
                let mut entries = Vec::new();
                for child in element.into_inner() {
                    match child.as_rule() {
                        Rule::index_op if child.as_str() == "?[" => op = BinaryOp::SafeIndex,
                        Rule::index_op => {}
                        Rule::map_entry => entries.push(self.map_entry(child)?),
                        _ => return Err(self.unexpected(&child)),
                    }
                }
                let right = named_property_index(entries, args_span);
                Ok(PathState::step(Expr::binary(state.expr, op, right, span), safe_chain))
            }
            Rule::arguments => {
                let arguments = self.arguments(element)?;
                let call = self.call_with_arguments(state, arguments, span)?;
                Ok(PathState::step(call, safe_chain))
            }
            Rule::closure_argument => {
                let closure = self.closure(self.expect_child(&element, Rule::closure)?)?;
                let call = self.call_with_closure(state, closure, span)?;
                Ok(PathState::step(call, safe_chain))
            }
            _ => Err(self.unexpected(&element)),
        }
    }

    fn member_access(
        &mut self,
        state: PathState,
        pair: Pair<'_, Rule>,
        span: Span,
    ) -> BuildResult<PathState> {
        let mut operator = ".";
        let mut attribute = false;
        let mut generics = Vec::new();
        let mut property = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::member_op => operator = child.as_str(),
                Rule::attribute_marker => attribute = true,
                Rule::type_arguments => generics = self.type_arguments(child)?,
                Rule::name_part => property = Some(self.name_part(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let property = property.ok_or_else(|| self.internal("member access without a name", span))?;

        let mut safe_chain = state.safe_chain;
        let (safe, spread_safe) = match operator {
            "?." => (true, false),
            "??." => {
                safe_chain = true;
                (true, false)
            }
            "*." => (true, true),
            _ => (safe_chain, false),
        };
        let access = PropertyAccess {
            object: state.expr,
            property,
            safe,
            spread_safe,
            attribute,
            implicit_this: false,
        };
        Ok(PathState {
            expr: Expr::new(ExprKind::Property(Box::new(access)), span),
            parenthesized: false,
            safe_chain,
            generics,
        })
    }

    fn name_part(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let inner = self.first_child(&pair)?;
        let span = self.span_of(&inner);
        match inner.as_rule() {
            Rule::identifier | Rule::keyword_name => Ok(Expr::string(inner.as_str(), span)),
            Rule::string_literal | Rule::gstring => self.literal(inner),
            Rule::paren_expression => self.paren_expression(inner),
            _ => Err(self.unexpected(&inner)),
        }
    }

    /// `base(args)`, shaped by what `base` is.
    fn call_with_arguments(
        &mut self,
        state: PathState,
        arguments: Expr,
        span: Span,
    ) -> BuildResult<Expr> {
        let PathState {
            expr: base,
            parenthesized,
            generics,
            ..
        } = state;
        if parenthesized {
            return Ok(call_method(base, arguments, false, span));
        }

        let base_span = base.span;
        match base.kind {
            ExprKind::Property(mut access) if access.attribute => {
                access.spread_safe = false;
                let base = Expr::new(ExprKind::Property(access), base_span);
                Ok(call_method(base, arguments, true, span))
            }
            ExprKind::Property(access) => Ok(property_call(*access, arguments, generics, span)),
            kind => {
                let base = Expr::new(kind, base_span);
                if !is_name_like(&base) {
                    return Ok(call_method(base, arguments, false, span));
                }

                let name = base.text();
                if name == "void" {
                    return Ok(call_method(Expr::string(name, base_span), arguments, false, span));
                }
                if PrimitiveType::from_keyword(&name).is_some() {
                    return Err(self.syntax_error(
                        format!("Primitive type literal: {name} cannot be used as a method name"),
                        span,
                    ));
                }
                if base.is_this() || base.is_super() {
                    if self.closure_depth > 0 {
                        let method = Expr::string(name, base_span);
                        return Ok(method_call(base, method, arguments, true, span));
                    }
                    let kind = if base.is_this() {
                        ConstructorKind::This
                    } else {
                        ConstructorKind::Super
                    };
                    let call = ConstructorCall {
                        ty: TypeRef::named(name, base_span),
                        arguments,
                        kind,
                        anonymous_class: None,
                    };
                    return Ok(Expr::new(ExprKind::ConstructorCall(Box::new(call)), span));
                }
                Ok(implicit_this_call(base, arguments, span))
            }
        }
    }

    /// `base { ... }`. A closure after a call joins that call's arguments.
    fn call_with_closure(&mut self, state: PathState, closure: Expr, span: Span) -> BuildResult<Expr> {
        let PathState {
            expr: base,
            generics,
            ..
        } = state;
        let base_span = base.span;
        let closure_span = closure.span;
        match base.kind {
            ExprKind::MethodCall(mut call) => {
                let arguments = std::mem::replace(&mut call.arguments, Expr::empty(base_span));
                call.arguments = self.append_closure(arguments, closure)?;
                Ok(Expr::new(ExprKind::MethodCall(call), span))
            }
            ExprKind::Property(access) => {
                let arguments = Expr::arguments(vec![closure], closure_span);
                Ok(property_call(*access, arguments, generics, span))
            }
            kind => {
                let base = Expr::new(kind, base_span);
                let arguments = Expr::arguments(vec![closure], closure_span);
                if is_name_like(&base) {
                    Ok(implicit_this_call(base, arguments, span))
                } else {
                    Ok(call_method(base, arguments, false, span))
                }
            }
        }
    }

    fn append_closure(&self, arguments: Expr, closure: Expr) -> BuildResult<Expr> {
        let span = arguments.span.merge(closure.span);
        match arguments.kind {
            ExprKind::Arguments(mut items) => {
                items.push(closure);
                Ok(Expr::arguments(items, span))
            }
            ExprKind::Tuple(items) => {
                let mut items = items.into_iter();
                match items.next() {
                    Some(Expr {
                        kind: ExprKind::NamedArguments(entries),
                        span: named_span,
                    }) => {
                        let map = Expr::new(ExprKind::Map(entries), named_span);
                        Ok(Expr::arguments(vec![map, closure], span))
                    }
                    _ => Ok(Expr::arguments(vec![closure], span)),
                }
            }
            _ => Err(self.internal("call arguments of an unexpected shape", arguments.span)),
        }
    }

    // ========================================================================
    // COMMAND EXPRESSIONS
    // ========================================================================

    /// `foo a, b`, `obj.m x`, `x y a b c` and plain expressions in statement position.
    pub(crate) fn command_expression(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner().peekable();
        let head = children
            .next()
            .ok_or_else(|| self.internal("empty command expression", span))?;
        let head_span = self.span_of(&head);
        let head_text = head.as_str();
        let parenthesized = paren_depth(&head) > 0;
        let arguments = children.next_if(|p| p.as_rule() == Rule::command_arguments);
        let chain: Vec<Pair<'_, Rule>> = children.collect();
        let is_command = arguments.is_some() || !chain.is_empty();

        if is_command && self.array_init_depth > 0 {
            return Err(self.syntax_error(
                "Command chain expression can not be used in array initializer",
                span,
            ));
        }

        let state = match head.as_rule() {
            Rule::call_ended_path => {
                let mut parts = head.into_inner();
                let primary = parts
                    .next()
                    .ok_or_else(|| self.internal("path without a primary", head_span))?;
                self.fold_path(primary, parts)?
            }
            _ => PathState::new(self.expression(head)?, parenthesized),
        };

        if is_command && !parenthesized {
            if let Some(op) = state.expr.binary_op() {
                if !matches!(op, BinaryOp::Index) {
                    return Err(self.syntax_error(format!("Unexpected input: '{head_text}'"), head_span));
                }
            }
        }
        if !is_command {
            return Ok(state.expr);
        }

        let mut result = match arguments {
            Some(arguments) => {
                let args_span = self.span_of(&arguments);
                let arguments = self.argument_elements(arguments.into_inner(), args_span)?;
                self.command_call(state, arguments, head_text, head_span.merge(args_span))?
            }
            None => state.expr,
        };
        for argument in chain {
            result = self.command_argument(result, argument)?;
        }
        result.span = span;
        Ok(result)
    }

    fn command_call(
        &mut self,
        state: PathState,
        arguments: Expr,
        head_text: &str,
        span: Span,
    ) -> BuildResult<Expr> {
        let PathState {
            expr: base,
            parenthesized,
            generics,
            ..
        } = state;
        let base_span = base.span;
        match base.kind {
            ExprKind::Property(access) => Ok(property_call(*access, arguments, generics, span)),
            ExprKind::MethodCall(_) if !parenthesized => Err(self.syntax_error(
                format!("Unexpected input: '{head_text}'"),
                base_span,
            )),
            kind => {
                let base = Expr::new(kind, base_span);
                if !parenthesized && is_name_like(&base) {
                    self.reject_method_definition(&base, &arguments)?;
                    Ok(implicit_this_call(base, arguments, span))
                } else {
                    Ok(call_method(base, arguments, false, span))
                }
            }
        }
    }

    /// `Type name() { }` read as a command is a misplaced method declaration.
    fn reject_method_definition(&self, base: &Expr, arguments: &Expr) -> BuildResult<()> {
        let Some(name) = base.as_variable() else {
            return Ok(());
        };
        let type_like = name == "void"
            || PrimitiveType::from_keyword(name).is_some()
            || name.chars().next().is_some_and(char::is_uppercase);
        if !type_like {
            return Ok(());
        }
        let ExprKind::Arguments(items) = &arguments.kind else {
            return Ok(());
        };
        let [only] = items.as_slice() else {
            return Ok(());
        };
        let Some(call) = only.as_method_call() else {
            return Ok(());
        };
        let ExprKind::Arguments(call_arguments) = &call.arguments.kind else {
            return Ok(());
        };
        match call_arguments.last().map(|e| &e.kind) {
            Some(ExprKind::Closure(closure)) if closure.params == ClosureParams::Implicit => Err(
                self.syntax_error("Method definition not expected here", base.span.merge(only.span)),
            ),
            _ => Ok(()),
        }
    }

    /// One link of `x y a b`: `a b`, `a.c` or a bare `a`.
    fn command_argument(&mut self, base: Expr, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = base.span.merge(self.span_of(&pair));
        let pair_text = pair.as_str();
        let mut children = pair.into_inner().peekable();
        let head = children
            .next()
            .ok_or_else(|| self.internal("empty command argument", span))?;
        let primary = match head.as_rule() {
            Rule::identifier => Expr::variable(head.as_str(), self.span_of(&head)),
            _ => self.literal(head)?,
        };

        if let Some(arguments) = children.next_if(|p| p.as_rule() == Rule::command_arguments) {
            if matches!(base.kind, ExprKind::Property(_)) {
                return Err(self.syntax_error(format!("Unsupported command argument: {pair_text}"), span));
            }
            let args_span = self.span_of(&arguments);
            let arguments = self.argument_elements(arguments.into_inner(), args_span)?;
            return Ok(method_call(base, constant_of(primary), arguments, false, span));
        }

        if children.peek().is_some() {
            let access_span = base.span.merge(primary.span);
            let access = property(base, constant_of(primary), access_span);
            let state = self.fold_elements(PathState::new(access, false), children)?;
            let mut expr = state.expr;
            expr.span = span;
            return Ok(expr);
        }

        let name = match primary.kind {
            ExprKind::Variable(_) => constant_of(primary),
            _ => primary,
        };
        Ok(property(base, name, span))
    }

    // ========================================================================
    // ARGUMENTS AND COLLECTIONS
    // ========================================================================

    pub(crate) fn arguments(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let list = child_of(&pair, Rule::argument_list);
        match (list, child_of(&pair, Rule::trailing_comma)) {
            (None, Some(comma)) => Err(self.syntax_error("Expression expected", self.span_of(&comma))),
            (None, None) => Ok(Expr::arguments(Vec::new(), span)),
            (Some(list), _) => {
                let mut arguments = self.argument_elements(list.into_inner(), span)?;
                arguments.span = span;
                Ok(arguments)
            }
        }
    }

    /// Positional arguments, named arguments, or both with the named ones gathered into a
    /// leading map.
    fn argument_elements(&mut self, elements: Pairs<'_, Rule>, span: Span) -> BuildResult<Expr> {
        let mut positional = Vec::new();
        let mut named: Vec<MapEntry> = Vec::new();
        for element in elements {
            match element.as_rule() {
                Rule::map_entry => {
                    let dynamic = has_dynamic_key(&element);
                    let entry = self.map_entry(element)?;
                    if !dynamic {
                        let key = entry.key.text();
                        if named.iter().any(|e| e.key.text() == key) {
                            return Err(self.syntax_error(
                                format!("Duplicated named parameter '{key}' found"),
                                entry.span,
                            ));
                        }
                    }
                    named.push(entry);
                }
                Rule::lambda_expression => positional.push(self.lambda(element)?),
                Rule::expression_list_element => {
                    positional.push(self.expression_list_element(element, true)?)
                }
                _ => return Err(self.unexpected(&element)),
            }
        }

        if named.is_empty() {
            return Ok(Expr::arguments(positional, span));
        }
        let named_span = named
            .iter()
            .map(|e| e.span)
            .reduce(Span::merge)
            .unwrap_or(span);
        if positional.is_empty() {
            let named = Expr::new(ExprKind::NamedArguments(named), named_span);
            return Ok(Expr::new(ExprKind::Tuple(vec![named]), span));
        }
        positional.insert(0, Expr::new(ExprKind::Map(named), named_span));
        Ok(Expr::arguments(positional, span))
    }

    pub(crate) fn expression_list(
        &mut self,
        pair: Pair<'_, Rule>,
        allow_spread: bool,
    ) -> BuildResult<Vec<Expr>> {
        pair.into_inner()
            .map(|element| self.expression_list_element(element, allow_spread))
            .collect()
    }

    fn expression_list_element(
        &mut self,
        pair: Pair<'_, Rule>,
        allow_spread: bool,
    ) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut spread = None;
        let mut value = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::spread_marker => spread = Some(self.span_of(&child)),
                Rule::expression => value = Some(self.expression(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        let value = value.ok_or_else(|| self.internal("list element without a value", span))?;
        match spread {
            Some(_) if allow_spread => Ok(Expr::new(ExprKind::Spread(Box::new(value)), span)),
            Some(marker) => Err(self.syntax_error("spread operator is not allowed here", marker)),
            None => Ok(value),
        }
    }

    fn list_literal(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let mut items = None;
        let mut comma = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::expression_list => items = Some(self.expression_list(child, true)?),
                Rule::list_comma => comma = Some(self.span_of(&child)),
                _ => return Err(self.unexpected(&child)),
            }
        }
        match (items, comma) {
            (None, Some(comma)) => Err(self.syntax_error(
                "Empty list constructor should not contain any comma(,)",
                comma,
            )),
            (items, _) => Ok(Expr::new(ExprKind::List(items.unwrap_or_default()), span)),
        }
    }

    fn map_literal(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let entries = pair
            .into_inner()
            .map(|entry| self.map_entry(entry))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Expr::new(ExprKind::Map(entries), span))
    }

    /// `key: value`. A bare name key is a string; `(expr)` keeps the expression; `*: m`
    /// spreads `m`.
    fn map_entry(&mut self, pair: Pair<'_, Rule>) -> BuildResult<MapEntry> {
        let span = self.span_of(&pair);
        let mut children = pair.into_inner();
        let (label, value) = match (children.next(), children.next()) {
            (Some(label), Some(value)) => (label, value),
            _ => return Err(self.internal("map entry without a key or value", span)),
        };
        let value = self.expression(value)?;
        let key_pair = self.first_child(&label)?;
        let key_span = self.span_of(&key_pair);
        let key = match key_pair.as_rule() {
            Rule::spread_map_key => Expr::new(ExprKind::SpreadMap(Box::new(value.clone())), span),
            Rule::keyword_name => Expr::string(key_pair.as_str(), key_span),
            Rule::paren_expression => self.paren_expression(key_pair)?,
            _ => match self.primary(key_pair)? {
                Expr {
                    kind: ExprKind::Variable(name),
                    span,
                } => Expr::string(name, span),
                other => other,
            },
        };
        Ok(MapEntry { key, value, span })
    }

    // ========================================================================
    // CREATORS
    // ========================================================================

    /// `new T(args)`, `new T(args) { body }`, `new T[n]` and `new T[] { items }`.
    /// `enclosing` is the outer instance of `outer.new Inner()`.
    fn creator(
        &mut self,
        pair: Pair<'_, Rule>,
        enclosing: Option<Expr>,
        span: Span,
    ) -> BuildResult<Expr> {
        let mut children = pair.into_inner().peekable();
        let annotations = self.leading_annotations(&mut children)?;
        let name = children
            .next()
            .ok_or_else(|| self.internal("creator without a type", span))?;
        let mut ty = self.created_name(name)?;
        ty.span = annotations.iter().fold(ty.span, |covered, a| covered.merge(a.span));
        ty.annotations.splice(0..0, annotations);

        match children.peek().map(|p| p.as_rule()) {
            Some(Rule::arguments) => {
                let mut anonymous_body = None;
                let mut arguments_expr = None;
                for child in children {
                    match child.as_rule() {
                        Rule::arguments => arguments_expr = Some(self.arguments(child)?),
                        Rule::anonymous_class_body => anonymous_body = Some(child),
                        _ => return Err(self.unexpected(&child)),
                    }
                }
                let mut arguments =
                    arguments_expr.ok_or_else(|| self.internal("creator without arguments", span))?;

                if let Some(outer) = enclosing {
                    match &mut arguments.kind {
                        ExprKind::Arguments(items) => {
                            if let (ExprKind::ConstructorCall(call), TypeKind::Named { name, .. }) =
                                (&outer.kind, &mut ty.kind)
                            {
                                if !name.contains('.') {
                                    *name = format!("{}.{}", call.ty.name(), name);
                                }
                            }
                            arguments.span = arguments.span.merge(outer.span);
                            items.insert(0, outer);
                        }
                        ExprKind::Tuple(_) => {
                            return Err(self.syntax_error(
                                "Creating instance of non-static class does not support named parameters",
                                arguments.span,
                            ));
                        }
                        _ => return Err(self.internal("unsupported creator arguments", arguments.span)),
                    }
                }

                let anonymous_class = match anonymous_body {
                    Some(body) => Some(self.anonymous_class(body, ty.clone())?),
                    None => None,
                };
                let call = ConstructorCall {
                    ty,
                    arguments,
                    kind: ConstructorKind::New,
                    anonymous_class,
                };
                Ok(Expr::new(ExprKind::ConstructorCall(Box::new(call)), span))
            }
            _ => self.array_creator(ty, children, span),
        }
    }

    fn array_creator<'i>(
        &mut self,
        ty: TypeRef,
        children: impl Iterator<Item = Pair<'i, Rule>>,
        span: Span,
    ) -> BuildResult<Expr> {
        let mut dims: Vec<(Option<Expr>, Vec<_>, Span)> = Vec::new();
        let mut initializer = None;
        for child in children {
            match child.as_rule() {
                Rule::dim => {
                    let dim_span = self.span_of(&child);
                    let mut annotations = Vec::new();
                    let mut size = None;
                    for part in child.into_inner() {
                        match part.as_rule() {
                            Rule::annotation => annotations.push(self.annotation(part)?),
                            Rule::expression => size = Some(self.expression(part)?),
                            _ => return Err(self.unexpected(&part)),
                        }
                    }
                    dims.push((size, annotations, dim_span));
                }
                Rule::array_initializer => initializer = Some(child),
                _ => return Err(self.unexpected(&child)),
            }
        }

        let dimension_annotations: Vec<_> = dims.iter().map(|(_, a, _)| a.clone()).collect();
        if let Some(initializer) = initializer {
            if let Some((_, _, dim_span)) = dims.iter().find(|(size, _, _)| size.is_some()) {
                return Err(self.syntax_error("dimension should be empty", *dim_span));
            }
            let element_type = (1..dims.len()).fold(ty, |inner, _| {
                let inner_span = inner.span;
                inner.array_of(inner_span)
            });
            let items = self.array_initializer(initializer, &element_type)?;
            let array = ArrayCreation {
                element_type,
                sizes: Vec::new(),
                initializer: Some(items),
                dimension_annotations,
            };
            return Ok(Expr::new(ExprKind::ArrayCreation(Box::new(array)), span));
        }

        let mut seen_empty: Option<Span> = None;
        let mut sizes = Vec::new();
        let mut empties = Vec::new();
        for (size, _, dim_span) in dims {
            match size {
                Some(size) => {
                    if let Some(empty) = seen_empty {
                        return Err(self.syntax_error("dimension cannot be empty", empty));
                    }
                    sizes.push(size);
                }
                None => {
                    seen_empty = Some(dim_span);
                    empties.push(Expr::constant(Constant::Empty, dim_span));
                }
            }
        }
        if sizes.is_empty() {
            let first = empties.first().map_or(span, |e| e.span);
            return Err(self.syntax_error("dimensions cannot be all empty", first));
        }
        sizes.extend(empties);
        let array = ArrayCreation {
            element_type: ty,
            sizes,
            initializer: None,
            dimension_annotations,
        };
        Ok(Expr::new(ExprKind::ArrayCreation(Box::new(array)), span))
    }

    /// Items of `{ a, b }`. Nested initializers become arrays of the component type.
    fn array_initializer(&mut self, pair: Pair<'_, Rule>, element_type: &TypeRef) -> BuildResult<Vec<Expr>> {
        self.array_init_depth += 1;
        let result = self.array_items(pair, element_type);
        self.array_init_depth -= 1;
        result
    }

    fn array_items(&mut self, pair: Pair<'_, Rule>, element_type: &TypeRef) -> BuildResult<Vec<Expr>> {
        let mut items = Vec::new();
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::array_initializer => {
                    // The component type is written once, before the outermost braces.
                    let span = element_type.span.merge(self.span_of(&child));
                    let component = match &element_type.kind {
                        TypeKind::Array(inner) => (**inner).clone(),
                        _ => element_type.clone(),
                    };
                    let nested = self.array_initializer(child, &component)?;
                    let array = ArrayCreation {
                        element_type: component,
                        sizes: Vec::new(),
                        initializer: Some(nested),
                        dimension_annotations: Vec::new(),
                    };
                    items.push(Expr::new(ExprKind::ArrayCreation(Box::new(array)), span));
                }
                Rule::variable_initializer => items.push(self.variable_initializer(child)?),
                _ => return Err(self.unexpected(&child)),
            }
        }
        Ok(items)
    }

    pub(crate) fn variable_initializer(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let inner = self.first_child(&pair)?;
        self.enhanced_expression(inner)
    }

    // ========================================================================
    // CLOSURES AND LAMBDAS
    // ========================================================================

    /// `{ a, b -> ... }`, `{ -> ... }` or `{ ... }` with the implicit `it`.
    pub(crate) fn closure(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let array_init_depth = std::mem::take(&mut self.array_init_depth);
        let result = self.within(FlowContext::Closure, |this| {
            let mut params = ClosureParams::Implicit;
            let mut body = Vec::new();
            for child in pair.into_inner() {
                match child.as_rule() {
                    Rule::closure_head => {
                        let list = match child_of(&child, Rule::formal_parameter_list) {
                            Some(list) => this.formal_parameter_list(list)?,
                            None => Vec::new(),
                        };
                        params = ClosureParams::Explicit(list);
                    }
                    _ => body.push(child),
                }
            }
            let statements = this.block_statements(body.into_iter())?;
            let closure = Closure {
                params,
                body: Stmt::block(statements, span),
            };
            Ok(Expr::new(ExprKind::Closure(Box::new(closure)), span))
        });
        self.array_init_depth = array_init_depth;
        result
    }

    /// `(a, b) -> expr`, `x -> { ... }`.
    pub(crate) fn lambda(&mut self, pair: Pair<'_, Rule>) -> BuildResult<Expr> {
        let span = self.span_of(&pair);
        let parameters = self.expect_child(&pair, Rule::lambda_parameters)?;
        let body = self.expect_child(&pair, Rule::lambda_body)?;

        let declared = self.first_child(&parameters)?;
        let params: Vec<Parameter> = match declared.as_rule() {
            Rule::identifier => {
                let param_span = self.span_of(&declared);
                vec![Parameter::new(
                    declared.as_str(),
                    TypeRef::dynamic(param_span),
                    param_span,
                )]
            }
            _ => self.formal_parameters(declared)?,
        };

        let body = self.within(FlowContext::Lambda, |this| {
            let inner = this.first_child(&body)?;
            match inner.as_rule() {
                Rule::block => this.block(inner),
                _ => Ok(Stmt::expression(this.command_expression(inner)?)),
            }
        })?;
        let lambda = Lambda { params, body };
        Ok(Expr::new(ExprKind::Lambda(Box::new(lambda)), span))
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn method_call(object: Expr, method: Expr, arguments: Expr, implicit_this: bool, span: Span) -> Expr {
    Expr::new(
        ExprKind::MethodCall(Box::new(MethodCall {
            object,
            method,
            arguments,
            safe: false,
            spread_safe: false,
            implicit_this,
            generics: Vec::new(),
        })),
        span,
    )
}

/// `object.call(arguments)`.
fn call_method(object: Expr, arguments: Expr, implicit_this: bool, span: Span) -> Expr {
    let method = Expr::string("call", arguments.span);
    method_call(object, method, arguments, implicit_this, span)
}

/// `name(arguments)` as a call on the implicit `this`.
fn implicit_this_call(name: Expr, arguments: Expr, span: Span) -> Expr {
    let this = Expr::variable("this", name.span);
    let method = match name.kind {
        ExprKind::Variable(text) => Expr::string(text, name.span),
        _ => name,
    };
    method_call(this, method, arguments, true, span)
}

/// `obj.m(arguments)` from the property access `obj.m`.
fn property_call(
    access: PropertyAccess,
    arguments: Expr,
    generics: Vec<GenericsType>,
    span: Span,
) -> Expr {
    Expr::new(
        ExprKind::MethodCall(Box::new(MethodCall {
            object: access.object,
            method: access.property,
            arguments,
            safe: access.safe && !access.spread_safe,
            spread_safe: access.spread_safe,
            implicit_this: false,
            generics,
        })),
        span,
    )
}

fn property(object: Expr, name: Expr, span: Span) -> Expr {
    Expr::new(
        ExprKind::Property(Box::new(PropertyAccess {
            object,
            property: name,
            safe: false,
            spread_safe: false,
            attribute: false,
            implicit_this: false,
        })),
        span,
    )
}

/// A constant with the expression's text, or the expression itself when already constant.
fn constant_of(expr: Expr) -> Expr {
    match expr.kind {
        ExprKind::Constant(_) => expr,
        _ => Expr::string(expr.text(), expr.span),
    }
}

/// Bases that name a method: variables, GStrings and string constants.
fn is_name_like(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Variable(_) | ExprKind::GString(_) | ExprKind::Constant(Constant::String(_))
    )
}

fn is_non_string_constant(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Constant(c) if !matches!(c, Constant::String(_)))
}

/// The index of `Type[a: 1, b: 2]`. An empty `[:]` smuggles an empty map through a spread.
fn named_property_index(entries: Vec<MapEntry>, span: Span) -> Expr {
    if entries.is_empty() {
        let empty = Expr::new(ExprKind::Map(Vec::new()), span);
        return Expr::new(ExprKind::SpreadMap(Box::new(empty)), span);
    }
    if entries.len() == 1 && matches!(entries[0].key.kind, ExprKind::SpreadMap(_)) {
        return entries.into_iter().next().map(|e| e.key).unwrap_or_else(|| Expr::empty(span));
    }
    Expr::new(ExprKind::NamedArguments(entries), span)
}

/// A `map_entry` whose key is a parenthesized expression.
fn has_dynamic_key(entry: &Pair<'_, Rule>) -> bool {
    entry
        .clone()
        .into_inner()
        .next()
        .and_then(|label| sole_child(&label))
        .is_some_and(|key| key.as_rule() == Rule::paren_expression)
}

fn sole_child<'i>(pair: &Pair<'i, Rule>) -> Option<Pair<'i, Rule>> {
    let mut children = pair.clone().into_inner();
    let only = children.next()?;
    children.next().is_none().then_some(only)
}

/// The `paren_expression` a node consists of entirely, looking through single-child wrappers.
fn enclosing_parens<'i>(pair: &Pair<'i, Rule>) -> Option<Pair<'i, Rule>> {
    let mut current = pair.clone();
    loop {
        match current.as_rule() {
            Rule::paren_expression => return Some(current),
            Rule::command_expression
            | Rule::expression
            | Rule::operator_expression
            | Rule::path_expression => current = sole_child(&current)?,
            _ => return None,
        }
    }
}

/// How many pairs of parentheses wrap the node as a whole.
pub(crate) fn paren_depth(pair: &Pair<'_, Rule>) -> usize {
    let mut depth = 0;
    let mut current = pair.clone();
    while let Some(parens) = enclosing_parens(&current) {
        depth += 1;
        match parens.into_inner().next() {
            Some(inner) => current = inner,
            None => break,
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::ast::{ClosureParams, Constant, ConstructorKind, Expr, ExprKind};
    use crate::parse;

    fn expr(text: &str) -> Expr {
        let module = parse(text, "E.groovy").unwrap();
        module.statements[0]
            .as_expression()
            .cloned()
            .unwrap_or_else(|| panic!("not an expression: {}", module.statements[0].text()))
    }

    fn text(source: &str) -> String {
        expr(source).text()
    }

    fn initializer(source: &str) -> Expr {
        match expr(&format!("def value = {source}")).kind {
            ExprKind::Declaration(decl) => decl.value,
            other => panic!("expected a declaration, got {other:?}"),
        }
    }

    fn error(source: &str) -> String {
        let failure = parse(source, "E.groovy").unwrap_err();
        failure.messages()[0].to_string()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(text("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(text("a - b - c"), "((a - b) - c)");
        assert_eq!(text("-x ** 2"), "-((x ** 2))");
        assert_eq!(text("a || b && c"), "(a || (b && c))");
        assert_eq!(text("a == b =~ c"), "((a == b) =~ c)");
        assert_eq!(text("a ? b : c ? d : e"), "a ? b : c ? d : e");
        assert_eq!(text("x ?: y"), "x ?: y");
    }

    #[test]
    fn casts_coercions_and_type_tests() {
        assert_eq!(text("(int) x"), "(int) x");
        assert_eq!(text("a + b as int"), "((a + b) as int)");
        assert_eq!(text("a instanceof String"), "(a instanceof String)");
        assert_eq!(text("a !instanceof String"), "(a !instanceof String)");
        assert_eq!(text("a !in b"), "(a !in b)");
        assert_eq!(error("super as String"), "Cannot cast or coerce `super`");
    }

    #[test]
    fn ranges_keep_their_exclusivity() {
        assert_eq!(text("1..5"), "(1..5)");
        assert_eq!(text("1..<5"), "(1..<5)");
        assert_eq!(text("1<..<5"), "(1<..<5)");
    }

    #[test]
    fn unary_signs_fold_into_literals() {
        assert_eq!(expr("-5").kind, ExprKind::Constant(Constant::Int(-5)));
        assert_eq!(expr("+5").kind, ExprKind::Constant(Constant::Int(5)));
        assert!(matches!(expr("-(5)").kind, ExprKind::UnaryMinus(_)));
        assert!(matches!(expr("+'a'").kind, ExprKind::UnaryPlus(_)));
        assert_eq!(text("++i"), "(++i)");
        assert_eq!(text("i--"), "(i--)");
        assert_eq!(text("!done"), "!(done)");
    }

    #[test]
    fn safe_chains_stay_safe() {
        assert_eq!(text("a?.b.c"), "a?.b.c");
        assert_eq!(text("a??.b.c"), "a?.b?.c");
        assert_eq!(text("a.@f"), "a.@f");
        assert_eq!(text("a*.@f"), "a*?.@f");
        assert_eq!(text("a?[0]"), "a?[0]");
    }

    #[test]
    fn calls_take_their_shape_from_the_base() {
        assert_eq!(text("foo(1)"), "this.foo(1)");
        assert_eq!(text("obj.m(1, 2)"), "obj.m(1, 2)");
        assert_eq!(text("list*.size()"), "list*.size()");
        assert_eq!(text("(getX())(1)"), "this.getX().call(1)");
        assert_eq!(text("foo()()"), "this.foo().call()");
        assert_eq!(text("'name'(1)"), "this.name(1)");
        assert_eq!(error("int(1)"), "Primitive type literal: int cannot be used as a method name");
    }

    #[test]
    fn generic_method_calls_keep_type_arguments() {
        let call = expr("obj.<String>m()");
        let call = call.as_method_call().unwrap();
        assert_eq!(call.method_name(), Some("m"));
        assert_eq!(call.generics.len(), 1);
        assert_eq!(call.generics[0].text(), "String");
    }

    #[test]
    fn trailing_closures_join_the_call() {
        assert_eq!(text("obj.each { it }"), "obj.each({ -> ... })");
        assert_eq!(text("foo(1) { it }"), "this.foo(1, { -> ... })");
        assert_eq!(text("foo(x: 1) { it }"), "this.foo([x:1], { -> ... })");
        assert_eq!(text("run { it }"), "this.run({ -> ... })");
    }

    #[test]
    fn named_arguments_are_classified() {
        let call = expr("foo(x: 1, y: 2)");
        let call = call.as_method_call().unwrap();
        assert!(matches!(&call.arguments.kind, ExprKind::Tuple(items)
            if matches!(&items[0].kind, ExprKind::NamedArguments(entries) if entries.len() == 2)));
        assert_eq!(text("foo(1, x: 2)"), "this.foo([x:2], 1)");
        assert_eq!(error("foo(x: 1, x: 2)"), "Duplicated named parameter 'x' found");
        assert_eq!(text("foo(('x'): 1, ('x'): 2)"), "this.foo(x:1, x:2)");
    }

    #[test]
    fn command_chains() {
        assert_eq!(text("foo 1, 2"), "this.foo(1, 2)");
        assert_eq!(text("obj.m 1"), "obj.m(1)");
        assert_eq!(text("move x to y"), "this.move(x).to(y)");
        assert_eq!(text("take 2 pills"), "this.take(2).pills");
        assert_eq!(text("(a + b) c"), "(a + b).call(c)");
        assert_eq!(error("a + b c"), "Unexpected input: 'a + b'");
    }

    #[test]
    fn this_and_super_calls_depend_on_closures() {
        let ctor = expr("this(1)");
        assert!(matches!(&ctor.kind, ExprKind::ConstructorCall(c) if c.kind == ConstructorKind::This));
        let closure = initializer("{ -> super(1) }");
        let ExprKind::Closure(closure) = &closure.kind else {
            panic!("expected a closure");
        };
        let body = closure.body.block_statements().unwrap();
        assert_eq!(body[0].text(), "super.super(1)");
    }

    #[test]
    fn assignment_targets_are_checked() {
        assert_eq!(text("a = 1"), "(a = 1)");
        assert_eq!(text("a.b += 1"), "(a.b += 1)");
        assert_eq!(text("m[k] = v"), "(m[k] = v)");
        assert_eq!(text("(a) = [1]"), "((a) = [1])");
        assert_eq!(text("(a, b) = [1, 2]"), "((a, b) = [1, 2])");
        assert_eq!(
            error("((a)) = b"),
            "Nested parenthesis is not allowed in multiple assignment, e.g. ((a)) = b"
        );
        assert_eq!(
            error("a() = 1"),
            "The LHS of an assignment should be a variable or a field accessing expression"
        );
    }

    #[test]
    fn collections() {
        assert_eq!(text("[1, *rest]"), "[1, *rest]");
        assert_eq!(text("[:]"), "[:]");
        assert_eq!(text("[a: 1, (b): 2, *: m]"), "[a:1, b:2, *:m:m]");
        assert_eq!(text("[if: 1]"), "[if:1]");
        assert_eq!(text("a[1, 2]"), "a[[1, 2]]");
        assert_eq!(error("[,]"), "Empty list constructor should not contain any comma(,)");
        assert_eq!(error("foo(,)"), "Expression expected");
    }

    #[test]
    fn named_property_indexing() {
        let index = expr("Person[name: 'x']");
        assert!(matches!(&index.kind, ExprKind::Binary { right, .. }
            if matches!(right.kind, ExprKind::NamedArguments(_))));
        let empty = expr("Person[:]");
        assert!(matches!(&empty.kind, ExprKind::Binary { right, .. }
            if matches!(right.kind, ExprKind::SpreadMap(_))));
    }

    #[test]
    fn pointers_and_references() {
        assert_eq!(text("a.&m"), "a.&m");
        assert_eq!(text("String::valueOf"), "String::valueOf");
        assert_eq!(text("ArrayList::new"), "ArrayList::new");
    }

    #[test]
    fn creators() {
        assert_eq!(text("new Foo(1)"), "new Foo(1)");
        assert_eq!(text("new int[2][]"), "new int[2][]");
        assert_eq!(text("new int[] {1, 2}"), "new int[] {1, 2}");
        assert_eq!(text("new int[][] {{1}, {2, 3}}"), "new int[][] {new int[] {1}, new int[] {2, 3}}");
        assert_eq!(error("new int[][3]"), "dimension cannot be empty");
        assert_eq!(error("new int[]"), "dimensions cannot be all empty");
        assert_eq!(error("new int[2] {1}"), "dimension should be empty");
        assert_eq!(text("outer.new Inner()"), "new Inner(outer)");
        assert_eq!(
            error("outer.new Inner(a: 1)"),
            "Creating instance of non-static class does not support named parameters"
        );
        assert_eq!(
            error("def a = new int[] { foo 1 }"),
            "Command chain expression can not be used in array initializer"
        );
    }

    #[test]
    fn anonymous_classes_are_numbered_per_outer_class() {
        let module = parse(
            "def r = new Runnable() { void run() {} }\ndef s = new Runnable() { void run() {} }",
            "Anon.groovy",
        )
        .unwrap();
        let names: Vec<&str> = module.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Anon$1", "Anon$2"]);
        assert_eq!(module.classes[0].superclass.as_ref().map(|t| t.name()), Some("Runnable".into()));
    }

    #[test]
    fn closures_and_lambdas() {
        let ExprKind::Closure(implicit) = initializer("{ it }").kind else {
            panic!("expected a closure");
        };
        assert_eq!(implicit.params, ClosureParams::Implicit);
        let ExprKind::Closure(empty) = initializer("{ -> 1 }").kind else {
            panic!("expected a closure");
        };
        assert_eq!(empty.params, ClosureParams::Explicit(vec![]));
        let ExprKind::Closure(typed) = initializer("{ String a, b -> a }").kind else {
            panic!("expected a closure");
        };
        assert!(matches!(&typed.params, ClosureParams::Explicit(p) if p.len() == 2));

        assert_eq!(text("foo((a, b) -> a + b)"), "this.foo((a, b) -> { ... })");
        assert_eq!(text("foo(x -> x)"), "this.foo((x) -> { ... })");
        assert_eq!(text("foo(() -> 1)"), "this.foo(() -> { ... })");
    }
}
