//! Expression nodes and their canonical text rendering.

use serde::{Deserialize, Serialize};

use super::decl::{Annotation, Modifiers, Parameter};
use super::stmt::Stmt;
use super::types::{GenericsType, TypeRef};
use crate::syntax::Span;

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Literal values. Big numbers keep their literal digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    BigInteger(String),
    Float(f32),
    Double(f64),
    BigDecimal(String),
    String(String),
    /// Placeholder for an omitted array dimension.
    Empty,
}

impl Constant {
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Self::Int(_)
                | Self::Long(_)
                | Self::BigInteger(_)
                | Self::Float(_)
                | Self::Double(_)
                | Self::BigDecimal(_)
        )
    }

    pub fn text(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Long(n) => n.to_string(),
            Self::BigInteger(digits) | Self::BigDecimal(digits) => digits.clone(),
            Self::Float(n) => format!("{n:?}"),
            Self::Double(n) => format!("{n:?}"),
            Self::String(s) => s.clone(),
            Self::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Assign,
    PlusAssign,
    MinusAssign,
    MultiplyAssign,
    DivideAssign,
    ModAssign,
    PowerAssign,
    LeftShiftAssign,
    RightShiftAssign,
    UnsignedRightShiftAssign,
    BitAndAssign,
    BitOrAssign,
    XorAssign,
    ElvisAssign,
    Implies,
    Or,
    And,
    BitOr,
    Xor,
    BitAnd,
    RegexFind,
    RegexMatch,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Compare,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    NotIn,
    InstanceOf,
    NotInstanceOf,
    LeftShift,
    RightShift,
    UnsignedRightShift,
    Plus,
    Minus,
    Multiply,
    Divide,
    Mod,
    Power,
    Index,
    SafeIndex,
}

const BINARY_TOKENS: &[(BinaryOp, &str)] = &[
    (BinaryOp::Assign, "="),
    (BinaryOp::PlusAssign, "+="),
    (BinaryOp::MinusAssign, "-="),
    (BinaryOp::MultiplyAssign, "*="),
    (BinaryOp::DivideAssign, "/="),
    (BinaryOp::ModAssign, "%="),
    (BinaryOp::PowerAssign, "**="),
    (BinaryOp::LeftShiftAssign, "<<="),
    (BinaryOp::RightShiftAssign, ">>="),
    (BinaryOp::UnsignedRightShiftAssign, ">>>="),
    (BinaryOp::BitAndAssign, "&="),
    (BinaryOp::BitOrAssign, "|="),
    (BinaryOp::XorAssign, "^="),
    (BinaryOp::ElvisAssign, "?="),
    (BinaryOp::Implies, "==>"),
    (BinaryOp::Or, "||"),
    (BinaryOp::And, "&&"),
    (BinaryOp::BitOr, "|"),
    (BinaryOp::Xor, "^"),
    (BinaryOp::BitAnd, "&"),
    (BinaryOp::RegexFind, "=~"),
    (BinaryOp::RegexMatch, "==~"),
    (BinaryOp::Equal, "=="),
    (BinaryOp::NotEqual, "!="),
    (BinaryOp::Identical, "==="),
    (BinaryOp::NotIdentical, "!=="),
    (BinaryOp::Compare, "<=>"),
    (BinaryOp::Less, "<"),
    (BinaryOp::LessEqual, "<="),
    (BinaryOp::Greater, ">"),
    (BinaryOp::GreaterEqual, ">="),
    (BinaryOp::In, "in"),
    (BinaryOp::NotIn, "!in"),
    (BinaryOp::InstanceOf, "instanceof"),
    (BinaryOp::NotInstanceOf, "!instanceof"),
    (BinaryOp::LeftShift, "<<"),
    (BinaryOp::RightShift, ">>"),
    (BinaryOp::UnsignedRightShift, ">>>"),
    (BinaryOp::Plus, "+"),
    (BinaryOp::Minus, "-"),
    (BinaryOp::Multiply, "*"),
    (BinaryOp::Divide, "/"),
    (BinaryOp::Mod, "%"),
    (BinaryOp::Power, "**"),
    (BinaryOp::Index, "["),
    (BinaryOp::SafeIndex, "?["),
];

impl BinaryOp {
    pub fn from_token(token: &str) -> Option<Self> {
        BINARY_TOKENS
            .iter()
            .find(|(_, t)| *t == token)
            .map(|(op, _)| *op)
    }

    pub fn token(self) -> &'static str {
        BINARY_TOKENS
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, t)| *t)
            .unwrap_or("?")
    }

    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::PlusAssign
                | Self::MinusAssign
                | Self::MultiplyAssign
                | Self::DivideAssign
                | Self::ModAssign
                | Self::PowerAssign
                | Self::LeftShiftAssign
                | Self::RightShiftAssign
                | Self::UnsignedRightShiftAssign
                | Self::BitAndAssign
                | Self::BitOrAssign
                | Self::XorAssign
                | Self::ElvisAssign
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncDec {
    Increment,
    Decrement,
}

impl IncDec {
    pub fn token(self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
    pub span: Span,
}

/// An interpolated string. `strings` always has one more element than `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GString {
    pub verbatim: String,
    pub strings: Vec<String>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyAccess {
    pub object: Expr,
    pub property: Expr,
    pub safe: bool,
    pub spread_safe: bool,
    /// `a.@f` direct field access.
    pub attribute: bool,
    pub implicit_this: bool,
}

impl PropertyAccess {
    /// Property name when it is a plain constant.
    pub fn name(&self) -> Option<&str> {
        self.property.as_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub object: Expr,
    /// The method name: a string constant, or any expression for dynamic names.
    pub method: Expr,
    pub arguments: Expr,
    pub safe: bool,
    pub spread_safe: bool,
    pub implicit_this: bool,
    pub generics: Vec<GenericsType>,
}

impl MethodCall {
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructorKind {
    New,
    This,
    Super,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorCall {
    pub ty: TypeRef,
    pub arguments: Expr,
    pub kind: ConstructorKind,
    /// Name of the anonymous inner class, which lives in the module's class list.
    pub anonymous_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClosureParams {
    /// No arrow: the closure takes the implicit `it`.
    Implicit,
    Explicit(Vec<Parameter>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Closure {
    pub params: ClosureParams,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<Parameter>,
    pub body: Stmt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedName {
    pub name: String,
    pub ty: TypeRef,
    pub span: Span,
}

/// `def x = 1`, `int a, b` members, and `def (a, b) = pair`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub targets: Vec<TypedName>,
    pub multiple: bool,
    /// `Empty` when there is no initializer.
    pub value: Expr,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayCreation {
    /// For an initializer this is the type of one element, itself an array when nested.
    pub element_type: TypeRef,
    /// One entry per dimension; `Constant::Empty` for omitted sizes. Empty with an initializer.
    pub sizes: Vec<Expr>,
    pub initializer: Option<Vec<Expr>>,
    /// Annotations per dimension, outermost first.
    pub dimension_annotations: Vec<Vec<Annotation>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Constant(Constant),
    Variable(String),
    GString(Box<GString>),
    List(Vec<Expr>),
    Map(Vec<MapEntry>),
    /// Named arguments collected from an argument list.
    NamedArguments(Vec<MapEntry>),
    /// A call's argument list. Named arguments mixed with positional ones come first as one `Map`.
    Arguments(Vec<Expr>),
    /// Multiple-assignment targets, or named-only call arguments as one `NamedArguments`.
    Tuple(Vec<Expr>),
    /// Init, condition and update of a classic `for`.
    ClosureList(Vec<Expr>),
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        exclusive_from: bool,
        exclusive_to: bool,
    },
    Spread(Box<Expr>),
    SpreadMap(Box<Expr>),
    Property(Box<PropertyAccess>),
    MethodCall(Box<MethodCall>),
    ConstructorCall(Box<ConstructorCall>),
    MethodPointer {
        object: Box<Expr>,
        method: Box<Expr>,
    },
    MethodReference {
        object: Box<Expr>,
        method: Box<Expr>,
    },
    Closure(Box<Closure>),
    Lambda(Box<Lambda>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Declaration(Box<Declaration>),
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Elvis {
        condition: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Not(Box<Expr>),
    BitwiseNegation(Box<Expr>),
    UnaryMinus(Box<Expr>),
    UnaryPlus(Box<Expr>),
    Prefix {
        op: IncDec,
        expr: Box<Expr>,
    },
    Postfix {
        op: IncDec,
        expr: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        expr: Box<Expr>,
        coerce: bool,
    },
    /// A type used as a value: `String`, the right side of `instanceof`.
    Class(TypeRef),
    ArrayCreation(Box<ArrayCreation>),
    AnnotationValue(Box<Annotation>),
    Empty,
}

// ============================================================================
// CONSTRUCTORS AND QUERIES
// ============================================================================

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn constant(value: Constant, span: Span) -> Self {
        Self::new(ExprKind::Constant(value), span)
    }

    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Self::constant(Constant::String(value.into()), span)
    }

    pub fn null(span: Span) -> Self {
        Self::constant(Constant::Null, span)
    }

    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Variable(name.into()), span)
    }

    pub fn empty(span: Span) -> Self {
        Self::new(ExprKind::Empty, span)
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn arguments(args: Vec<Expr>, span: Span) -> Self {
        Self::new(ExprKind::Arguments(args), span)
    }

    /// `object.method(args)` with every flag off.
    pub fn call(object: Expr, method: &str, arguments: Expr, span: Span) -> Self {
        let method_span = arguments.span;
        Self::new(
            ExprKind::MethodCall(Box::new(MethodCall {
                object,
                method: Expr::string(method, method_span),
                arguments,
                safe: false,
                spread_safe: false,
                implicit_this: false,
                generics: Vec::new(),
            })),
            span,
        )
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ExprKind::Empty)
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Constant(Constant::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_this(&self) -> bool {
        self.as_variable() == Some("this")
    }

    pub fn is_super(&self) -> bool {
        self.as_variable() == Some("super")
    }

    pub fn as_method_call(&self) -> Option<&MethodCall> {
        match &self.kind {
            ExprKind::MethodCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn binary_op(&self) -> Option<BinaryOp> {
        match &self.kind {
            ExprKind::Binary { op, .. } => Some(*op),
            _ => None,
        }
    }

    /// Positional arguments of an `Arguments` list, or a single-element view of anything else.
    pub fn argument_items(&self) -> &[Expr] {
        match &self.kind {
            ExprKind::Arguments(items) | ExprKind::Tuple(items) => items,
            _ => std::slice::from_ref(self),
        }
    }

    // ========================================================================
    // TEXT RENDERING
    // ========================================================================

    /// Canonical source-like text, used for GString verbatim text and diagnostics.
    pub fn text(&self) -> String {
        match &self.kind {
            ExprKind::Constant(c) => c.text(),
            ExprKind::Variable(name) => name.clone(),
            ExprKind::GString(g) => g.verbatim.clone(),
            ExprKind::List(items) => format!("[{}]", join(items, ", ")),
            ExprKind::Map(entries) if entries.is_empty() => "[:]".into(),
            ExprKind::Map(entries) => format!("[{}]", join_entries(entries)),
            ExprKind::NamedArguments(entries) => join_entries(entries),
            ExprKind::Arguments(items) | ExprKind::Tuple(items) => {
                format!("({})", join(items, ", "))
            }
            ExprKind::ClosureList(items) => format!("({})", join(items, "; ")),
            ExprKind::Range {
                from,
                to,
                exclusive_from,
                exclusive_to,
            } => format!(
                "({}{}..{}{})",
                from.text(),
                if *exclusive_from { "<" } else { "" },
                if *exclusive_to { "<" } else { "" },
                to.text()
            ),
            ExprKind::Spread(inner) => format!("*{}", inner.text()),
            ExprKind::SpreadMap(inner) => format!("*:{}", inner.text()),
            ExprKind::Property(p) => format!(
                "{}{}{}.{}{}",
                p.object.text(),
                if p.spread_safe { "*" } else { "" },
                if p.safe { "?" } else { "" },
                if p.attribute { "@" } else { "" },
                p.property.text()
            ),
            ExprKind::MethodCall(call) => format!(
                "{}{}{}.{}{}",
                call.object.text(),
                if call.spread_safe { "*" } else { "" },
                if call.safe { "?" } else { "" },
                call.method.text(),
                call.arguments.text()
            ),
            ExprKind::ConstructorCall(ctor) => match ctor.kind {
                ConstructorKind::New => format!("new {}{}", ctor.ty.text(), ctor.arguments.text()),
                ConstructorKind::This => format!("this{}", ctor.arguments.text()),
                ConstructorKind::Super => format!("super{}", ctor.arguments.text()),
            },
            ExprKind::MethodPointer { object, method } => {
                format!("{}.&{}", object.text(), method.text())
            }
            ExprKind::MethodReference { object, method } => {
                format!("{}::{}", object.text(), method.text())
            }
            ExprKind::Closure(closure) => match &closure.params {
                ClosureParams::Explicit(params) if !params.is_empty() => {
                    format!("{{ {} -> ... }}", parameters_text(params))
                }
                _ => "{ -> ... }".into(),
            },
            ExprKind::Lambda(lambda) => format!("({}) -> {{ ... }}", parameters_text(&lambda.params)),
            ExprKind::Binary { left, op, right } => match op {
                BinaryOp::Index => format!("{}[{}]", left.text(), right.text()),
                BinaryOp::SafeIndex => format!("{}?[{}]", left.text(), right.text()),
                _ => format!("({} {} {})", left.text(), op.token(), right.text()),
            },
            ExprKind::Declaration(decl) => decl.text(),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => format!(
                "{} ? {} : {}",
                condition.text(),
                then_expr.text(),
                else_expr.text()
            ),
            ExprKind::Elvis {
                condition,
                else_expr,
            } => format!("{} ?: {}", condition.text(), else_expr.text()),
            ExprKind::Not(inner) => format!("!({})", inner.text()),
            ExprKind::BitwiseNegation(inner) => format!("~({})", inner.text()),
            ExprKind::UnaryMinus(inner) => format!("-({})", inner.text()),
            ExprKind::UnaryPlus(inner) => format!("+({})", inner.text()),
            ExprKind::Prefix { op, expr } => format!("({}{})", op.token(), expr.text()),
            ExprKind::Postfix { op, expr } => format!("({}{})", expr.text(), op.token()),
            ExprKind::Cast { ty, expr, coerce } => {
                if *coerce {
                    format!("({} as {})", expr.text(), ty.text())
                } else {
                    format!("({}) {}", ty.text(), expr.text())
                }
            }
            ExprKind::Class(ty) => ty.text(),
            ExprKind::ArrayCreation(array) => {
                let dims: String = array
                    .sizes
                    .iter()
                    .map(|size| format!("[{}]", size.text()))
                    .collect();
                match &array.initializer {
                    Some(items) => format!(
                        "new {}[] {{{}}}",
                        array.element_type.text(),
                        join(items, ", ")
                    ),
                    None => format!("new {}{}", array.element_type.text(), dims),
                }
            }
            ExprKind::AnnotationValue(annotation) => format!("@{}", annotation.name),
            ExprKind::Empty => String::new(),
        }
    }
}

impl Declaration {
    pub fn text(&self) -> String {
        let head = if self.multiple {
            let names: Vec<String> = self
                .targets
                .iter()
                .map(typed_name_text)
                .collect();
            format!("def ({})", names.join(", "))
        } else {
            self.targets
                .first()
                .map(|t| {
                    if t.ty.is_dynamic() {
                        format!("def {}", t.name)
                    } else {
                        typed_name_text(t)
                    }
                })
                .unwrap_or_default()
        };
        if self.value.is_empty() {
            head
        } else {
            format!("{head} = {}", self.value.text())
        }
    }
}

fn typed_name_text(target: &TypedName) -> String {
    if target.ty.is_dynamic() {
        target.name.clone()
    } else {
        format!("{} {}", target.ty.text(), target.name)
    }
}

fn join(items: &[Expr], sep: &str) -> String {
    items.iter().map(Expr::text).collect::<Vec<_>>().join(sep)
}

fn join_entries(entries: &[MapEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}:{}", e.key.text(), e.value.text()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn parameters_text(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| {
            if p.ty.is_dynamic() {
                p.name.clone()
            } else {
                format!("{} {}", p.ty.text(), p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
