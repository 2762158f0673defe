//! Declarations: classes, members, parameters, annotations, imports.

use serde::{Deserialize, Serialize};

use super::expr::Expr;
use super::stmt::Stmt;
use super::types::{GenericsType, TypeRef};
use crate::syntax::Span;

// ============================================================================
// MODIFIERS AND ANNOTATIONS
// ============================================================================

/// JVM access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(pub u32);

impl Modifiers {
    pub const PUBLIC: u32 = 0x0001;
    pub const PRIVATE: u32 = 0x0002;
    pub const PROTECTED: u32 = 0x0004;
    pub const STATIC: u32 = 0x0008;
    pub const FINAL: u32 = 0x0010;
    pub const SYNCHRONIZED: u32 = 0x0020;
    pub const VOLATILE: u32 = 0x0040;
    pub const TRANSIENT: u32 = 0x0080;
    pub const NATIVE: u32 = 0x0100;
    pub const INTERFACE: u32 = 0x0200;
    pub const ABSTRACT: u32 = 0x0400;
    pub const STRICT: u32 = 0x0800;
    pub const SYNTHETIC: u32 = 0x1000;
    pub const ANNOTATION: u32 = 0x2000;
    pub const ENUM: u32 = 0x4000;

    pub const VISIBILITY: u32 = Self::PUBLIC | Self::PRIVATE | Self::PROTECTED;

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn has(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    pub fn insert(&mut self, flag: u32) {
        self.0 |= flag;
    }

    pub fn remove(&mut self, flag: u32) {
        self.0 &= !flag;
    }

    pub const fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    pub const fn has_visibility(self) -> bool {
        self.0 & Self::VISIBILITY != 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    /// Member values in source order. A single unnamed value is stored as `value`.
    pub members: Vec<(String, Expr)>,
    pub span: Span,
}

impl Annotation {
    /// A marker annotation added by the builder, e.g. `groovy.transform.Sealed`.
    pub fn marker(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            span,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Expr> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

// ============================================================================
// MEMBERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// For a variadic parameter this is already the array type.
    pub ty: TypeRef,
    pub default_value: Option<Expr>,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub variadic: bool,
    pub span: Span,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
            variadic: false,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub initial_value: Option<Expr>,
    pub annotations: Vec<Annotation>,
    pub enum_constant: bool,
    /// Generated from a record header component.
    pub record_component: bool,
    /// Backing field created for a property that has no explicit field.
    pub synthetic: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub ty: TypeRef,
    pub annotations: Vec<Annotation>,
    /// Accessor bodies produced when a separately declared field was merged in.
    pub getter: Option<Stmt>,
    pub setter: Option<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub generics: Vec<GenericsType>,
    pub return_type: TypeRef,
    pub parameters: Vec<Parameter>,
    pub exceptions: Vec<TypeRef>,
    /// `None` for abstract and annotation methods.
    pub body: Option<Stmt>,
    /// `default` value of an annotation member.
    pub annotation_default: Option<Expr>,
    pub is_constructor: bool,
    pub script_method: bool,
    pub span: Span,
}

impl MethodDecl {
    pub fn is_abstract(&self) -> bool {
        self.modifiers.has(Modifiers::ABSTRACT)
    }
}

// ============================================================================
// CLASSES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
    Enum,
    Record,
    Annotation,
    AnonymousInner,
}

impl ClassKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Class | Self::AnonymousInner => "class",
            Self::Interface => "interface",
            Self::Trait => "trait",
            Self::Enum => "enum",
            Self::Record => "record",
            Self::Annotation => "@interface",
        }
    }

    pub fn is_interface_like(self) -> bool {
        matches!(self, Self::Interface | Self::Trait | Self::Annotation)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// Binary name: package prefix plus `Outer$Inner` nesting.
    pub name: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub generics: Vec<GenericsType>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub permitted_subclasses: Vec<TypeRef>,
    pub outer_class: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub properties: Vec<PropertyDecl>,
    pub methods: Vec<MethodDecl>,
    pub constructors: Vec<MethodDecl>,
    pub object_initializers: Vec<Stmt>,
    pub static_initializers: Vec<Stmt>,
    pub record_components: Vec<Parameter>,
    pub synthetic: bool,
    pub span: Span,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, kind: ClassKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
            generics: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            permitted_subclasses: Vec::new(),
            outer_class: None,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            object_initializers: Vec::new(),
            static_initializers: Vec::new(),
            record_components: Vec::new(),
            synthetic: false,
            span,
        }
    }

    /// Name without package or outer class prefixes.
    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit('.').next().unwrap_or(&self.name);
        tail.rsplit('$').next().unwrap_or(tail)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_annotation(&self, simple_name: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| a.simple_name() == simple_name)
    }

    pub fn enum_constants(&self) -> impl Iterator<Item = &FieldDecl> {
        self.fields.iter().filter(|f| f.enum_constant)
    }
}

// ============================================================================
// COMPILATION UNIT PARTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    Regular,
    Star,
    Static,
    StaticStar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub kind: ImportKind,
    /// Imported class, or for star imports the package (with trailing `.`) or class.
    pub target: String,
    /// Member name of a static import.
    pub member: Option<String>,
    pub alias: Option<String>,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

impl ImportDecl {
    /// The name the import binds in the unit, if any.
    pub fn simple_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        match self.kind {
            ImportKind::Regular => self.target.rsplit('.').next(),
            ImportKind::Static => self.member.as_deref(),
            ImportKind::Star | ImportKind::StaticStar => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDecl {
    /// Package name with its trailing `.`.
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}
