//! Type references and generics.

use serde::{Deserialize, Serialize};

use super::decl::Annotation;
use crate::syntax::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn from_keyword(text: &str) -> Option<Self> {
        Some(match text {
            "boolean" => Self::Boolean,
            "byte" => Self::Byte,
            "char" => Self::Char,
            "short" => Self::Short,
            "int" => Self::Int,
            "long" => Self::Long,
            "float" => Self::Float,
            "double" => Self::Double,
            _ => return None,
        })
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    Void,
    /// `def`, `var`, or no declared type at all.
    Dynamic,
    /// A class or interface, by its name as written (possibly qualified).
    Named {
        name: String,
        generics: Vec<GenericsType>,
    },
    Array(Box<TypeRef>),
}

/// A reference to a type as it appears in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub kind: TypeKind,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

impl TypeRef {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self {
            kind,
            annotations: Vec::new(),
            span,
        }
    }

    pub fn dynamic(span: Span) -> Self {
        Self::new(TypeKind::Dynamic, span)
    }

    pub fn named(name: impl Into<String>, span: Span) -> Self {
        Self::new(
            TypeKind::Named {
                name: name.into(),
                generics: Vec::new(),
            },
            span,
        )
    }

    pub fn array_of(self, span: Span) -> Self {
        Self::new(TypeKind::Array(Box::new(self)), span)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Void)
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.kind, TypeKind::Dynamic)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_))
    }

    /// The innermost component type of an array, or the type itself.
    pub fn element_type(&self) -> &TypeRef {
        match &self.kind {
            TypeKind::Array(inner) => inner.element_type(),
            _ => self,
        }
    }

    pub fn generics(&self) -> &[GenericsType] {
        match &self.kind {
            TypeKind::Named { generics, .. } => generics,
            _ => &[],
        }
    }

    /// Name without generics, e.g. `java.util.List` or `int[]`.
    pub fn name(&self) -> String {
        match &self.kind {
            TypeKind::Primitive(p) => p.keyword().into(),
            TypeKind::Void => "void".into(),
            TypeKind::Dynamic => "java.lang.Object".into(),
            TypeKind::Named { name, .. } => name.clone(),
            TypeKind::Array(inner) => format!("{}[]", inner.name()),
        }
    }

    /// Source-like rendering including generics.
    pub fn text(&self) -> String {
        match &self.kind {
            TypeKind::Named { name, generics } if !generics.is_empty() => {
                let args: Vec<String> = generics.iter().map(GenericsType::text).collect();
                format!("{name}<{}>", args.join(", "))
            }
            TypeKind::Array(inner) => format!("{}[]", inner.text()),
            _ => self.name(),
        }
    }
}

/// One entry of a type argument or type parameter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericsType {
    /// Parameter name for placeholders, `?` for wildcards, otherwise the argument's type name.
    pub name: String,
    pub ty: Option<TypeRef>,
    pub upper_bounds: Vec<TypeRef>,
    pub lower_bound: Option<TypeRef>,
    pub wildcard: bool,
    pub placeholder: bool,
    pub span: Span,
}

impl GenericsType {
    pub fn argument(ty: TypeRef) -> Self {
        Self {
            name: ty.name(),
            span: ty.span,
            ty: Some(ty),
            upper_bounds: Vec::new(),
            lower_bound: None,
            wildcard: false,
            placeholder: false,
        }
    }

    pub fn text(&self) -> String {
        let mut text = match &self.ty {
            Some(ty) if !self.placeholder => ty.text(),
            _ => self.name.clone(),
        };
        if !self.upper_bounds.is_empty() {
            let bounds: Vec<String> = self.upper_bounds.iter().map(TypeRef::text).collect();
            text.push_str(" extends ");
            text.push_str(&bounds.join(" & "));
        }
        if let Some(lower) = &self.lower_bound {
            text.push_str(" super ");
            text.push_str(&lower.text());
        }
        text
    }
}
