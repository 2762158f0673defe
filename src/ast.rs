//! AST module for Groovy compilation units
//!
//! Every node carries a [`Span`] and derives serde so a whole [`Module`] can be dumped as JSON.
//! Nodes are created once by the builder and never mutated afterwards.

// ============================================================================
// IMPORTS
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::syntax::Span;

pub mod decl;
pub mod expr;
pub mod stmt;
pub mod types;

pub use decl::{
    Annotation, ClassDecl, ClassKind, FieldDecl, ImportDecl, ImportKind, MethodDecl, Modifiers,
    PackageDecl, Parameter, PropertyDecl,
};
pub use expr::{
    ArrayCreation, BinaryOp, Closure, ClosureParams, Constant, ConstructorCall, ConstructorKind,
    Declaration, Expr, ExprKind, GString, IncDec, Lambda, MapEntry, MethodCall, PropertyAccess,
    TypedName,
};
pub use stmt::{CaseStmt, CatchClause, Stmt, StmtKind};
pub use types::{GenericsType, PrimitiveType, TypeKind, TypeRef};

// ============================================================================
// MODULE
// ============================================================================

/// One compilation unit.
///
/// # Examples
///
/// ```rust
/// let module = groovy_ast::parse("", "Empty.groovy").unwrap();
/// assert_eq!(module.statements.len(), 1);
/// assert_eq!(module.statements[0].text(), "return null");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub package: Option<PackageDecl>,
    pub imports: Vec<ImportDecl>,
    /// Top-level script statements.
    pub statements: Vec<Stmt>,
    /// Methods declared at script level.
    pub methods: Vec<MethodDecl>,
    /// Outer classes precede their inner classes.
    pub classes: Vec<ClassDecl>,
    pub script_class_name: String,
    pub span: Span,
}

impl Module {
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|p| p.name.as_str())
    }

    /// True when the unit has script content rather than only type declarations.
    pub fn is_script(&self) -> bool {
        !self.statements.is_empty() || !self.methods.is_empty()
    }

    pub fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes
            .iter()
            .find(|c| c.name == name || c.simple_name() == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Compact listing: one line per package, import, class, script method and statement.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        if let Some(package) = &self.package {
            lines.push(format!("package {}", package.name));
        }
        for import in &self.imports {
            let mut line = match import.kind {
                ImportKind::Regular => format!("import {}", import.target),
                ImportKind::Star => format!("import {}*", import.target),
                ImportKind::Static => format!(
                    "import static {}.{}",
                    import.target,
                    import.member.as_deref().unwrap_or_default()
                ),
                ImportKind::StaticStar => format!("import static {}.*", import.target),
            };
            if let Some(alias) = &import.alias {
                line.push_str(&format!(" as {alias}"));
            }
            lines.push(line);
        }
        for class in &self.classes {
            lines.push(format!("{} {}", class.kind.keyword(), class.name));
        }
        for method in &self.methods {
            let params: Vec<&str> = method.parameters.iter().map(|p| p.name.as_str()).collect();
            lines.push(format!("def {}({})", method.name, params.join(", ")));
        }
        for stmt in &self.statements {
            lines.push(stmt.text());
        }
        lines.join("\n")
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
