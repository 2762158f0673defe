//! Groovy parse-tree to AST builder.
//!
//! A pest grammar produces the concrete syntax tree of one compilation unit and [`AstBuilder`]
//! turns it into a [`Module`]: script statements, script methods and classes, with switch
//! expressions and try-with-resources already desugared. User errors are collected with their
//! line and column and reported together as one [`CompilationFailed`].
//!
//! ```rust
//! let module = groovy_ast::parse("def answer = 6 * 7", "Answer.groovy").unwrap();
//! assert_eq!(module.statements[0].text(), "def answer = (6 * 7)");
//! ```

pub use crate::ast::Module;
pub use crate::builder::AstBuilder;
pub use crate::config::BuilderConfig;
pub use crate::errors::{BuildError, CompilationFailed, ErrorKind, SourceContext};
pub use crate::syntax::{Pos, Span};

pub mod ast;
pub mod builder;
pub mod config;
pub mod errors;
pub mod syntax;

/// Builds `source` with the default configuration. `name` is the file name the script class
/// is named after.
pub fn parse(source: &str, name: &str) -> Result<Module, CompilationFailed> {
    AstBuilder::new(SourceContext::from_file(name, source), BuilderConfig::default()).build()
}
