//! Groovy AST Error Handling - Unified Diagnostic API
//!
//! Every failure the builder can report is a [`BuildError`]. Errors are collected into a
//! [`DiagnosticCollector`] while a compilation unit is walked and surface to callers as a single
//! [`CompilationFailed`] value wrapping the ordered diagnostic list.

use miette::{Diagnostic, LabeledSpan, NamedSource};
use std::fmt;
use std::sync::Arc;

use crate::syntax::Span;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source text plus the name it is reported under.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// File name without directories or extension, e.g. `Foo` for `src/Foo.groovy`.
    pub fn stem(&self) -> &str {
        let file = self
            .name
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.name);
        match file.rfind('.') {
            Some(0) | None => file,
            Some(dot) => &file[..dot],
        }
    }

    /// Convert to NamedSource for use with miette error reporting
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// What went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// A recognized but malformed construct: bad modifier combinations, misplaced `break`, and so on.
    Syntax { message: String },
    /// The CST grammar rejected the input.
    Parse { message: String },
    /// A numeric literal that could not be represented.
    NumberFormat { literal: String, message: String },
    /// Builder/grammar mismatch. Never caused by user input alone.
    Internal { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Syntax,
    Literal,
    Internal,
}

impl ErrorKind {
    /// Get the error category for test assertions
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse { .. } => ErrorCategory::Parse,
            Self::Syntax { .. } => ErrorCategory::Syntax,
            Self::NumberFormat { .. } => ErrorCategory::Literal,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Get error code suffix for diagnostic codes
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::Parse { .. } => "parse",
            Self::NumberFormat { .. } => "number_format",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message }
            | Self::Parse { message }
            | Self::NumberFormat { message, .. }
            | Self::Internal { message } => message,
        }
    }

    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}

/// A single located diagnostic.
#[derive(Debug, Clone)]
pub struct BuildError {
    pub kind: ErrorKind,
    pub span: Span,
    pub source: Arc<NamedSource<String>>,
    pub help: Option<String>,
    pub error_code: String,
}

impl BuildError {
    pub fn message(&self) -> &str {
        self.kind.message()
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }

    pub fn column(&self) -> usize {
        self.span.start.column
    }

    fn primary_label(&self) -> &'static str {
        match &self.kind {
            ErrorKind::Syntax { .. } => "here",
            ErrorKind::Parse { .. } => "unexpected input",
            ErrorKind::NumberFormat { .. } => "invalid number",
            ErrorKind::Internal { .. } => "internal error raised here",
        }
    }
}

impl std::error::Error for BuildError {}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ line {}, column {}.",
            self.kind.message(),
            self.span.start.line,
            self.span.start.column
        )
    }
}

impl Diagnostic for BuildError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label().to_string()),
            self.span.to_source_span(),
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source)
    }
}

/// Context-aware error creation
pub trait ErrorReporting {
    /// Create an error with context-appropriate enhancements
    fn report(&self, kind: ErrorKind, span: Span) -> BuildError;

    fn syntax_error(&self, message: impl Into<String>, span: Span) -> BuildError
    where
        Self: Sized,
    {
        self.report(
            ErrorKind::Syntax {
                message: message.into(),
            },
            span,
        )
    }

    /// Creates an internal error - these indicate builder bugs, not user errors.
    fn internal_error(&self, message: impl Into<String>, span: Span) -> BuildError
    where
        Self: Sized,
    {
        let mut error = self.report(
            ErrorKind::Internal {
                message: message.into(),
            },
            span,
        );
        error.help = Some("This is an internal builder error. Please report this as a bug.".into());
        error
    }
}

impl ErrorReporting for SourceContext {
    fn report(&self, kind: ErrorKind, span: Span) -> BuildError {
        let error_code = format!("groovy::parsing::{}", kind.code_suffix());
        BuildError {
            kind,
            span,
            source: self.to_named_source(),
            help: None,
            error_code,
        }
    }
}

// ============================================================================
// COLLECTION AND FAILURE
// ============================================================================

/// Ordered diagnostics gathered during one build.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    errors: Vec<BuildError>,
    max_errors: usize,
}

impl DiagnosticCollector {
    /// A `max_errors` of zero means unbounded.
    pub fn new(max_errors: usize) -> Self {
        Self {
            errors: Vec::new(),
            max_errors,
        }
    }

    /// Records an error. Returns false once the cap has been reached.
    pub fn add(&mut self, error: BuildError) -> bool {
        if self.is_full() {
            return false;
        }
        self.errors.push(error);
        true
    }

    pub fn is_full(&self) -> bool {
        self.max_errors != 0 && self.errors.len() >= self.max_errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildError> {
        self.errors.iter()
    }

    pub fn into_failure(
        self,
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> CompilationFailed {
        CompilationFailed {
            phase: "parsing".into(),
            diagnostics: self.errors,
            cause,
        }
    }
}

/// The single fatal value a build can produce.
#[derive(Debug, thiserror::Error)]
#[error("{phase} failed with {} error(s): {}", .diagnostics.len(), first_message(.diagnostics))]
pub struct CompilationFailed {
    pub phase: String,
    pub diagnostics: Vec<BuildError>,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn first_message(diagnostics: &[BuildError]) -> String {
    diagnostics
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "no diagnostics".into())
}

impl CompilationFailed {
    pub fn single(error: BuildError) -> Self {
        Self {
            phase: "parsing".into(),
            diagnostics: vec![error],
            cause: None,
        }
    }

    /// Messages of every diagnostic, in report order.
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|e| e.message()).collect()
    }

    pub fn first(&self) -> Option<&BuildError> {
        self.diagnostics.first()
    }
}

impl Diagnostic for CompilationFailed {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("groovy::parsing::failed"))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        Some(Box::new(
            self.diagnostics.iter().map(|e| e as &dyn Diagnostic),
        ))
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Renders a failure with full miette diagnostics into a string.
pub fn render_failure(failure: CompilationFailed) -> String {
    let report = miette::Report::new(failure);
    format!("{report:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::LineIndex;

    fn ctx() -> SourceContext {
        SourceContext::from_file("scripts/Hello.groovy", "def x = 1\nbreak\n")
    }

    #[test]
    fn stem_strips_directories_and_extension() {
        assert_eq!(ctx().stem(), "Hello");
        assert_eq!(SourceContext::from_file("plain", "").stem(), "plain");
    }

    #[test]
    fn display_carries_line_and_column() {
        let source = ctx();
        let index = LineIndex::new(&source.content);
        let err = source.syntax_error("break statement is only allowed inside loops or switches", index.span(10, 15));
        assert_eq!(
            err.to_string(),
            "break statement is only allowed inside loops or switches @ line 2, column 1."
        );
        assert_eq!(err.error_code, "groovy::parsing::syntax");
        assert!(err.kind.is_user_error());
    }

    #[test]
    fn internal_errors_ask_for_bug_reports() {
        let source = ctx();
        let err = source.internal_error("missing child", Span::default());
        assert_eq!(err.kind.category(), ErrorCategory::Internal);
        assert!(err.help.as_deref().unwrap_or_default().contains("bug"));
    }

    #[test]
    fn collector_respects_cap() {
        let source = ctx();
        let mut collector = DiagnosticCollector::new(1);
        assert!(collector.add(source.syntax_error("a", Span::default())));
        assert!(!collector.add(source.syntax_error("b", Span::default())));
        assert_eq!(collector.len(), 1);
        let failure = collector.into_failure(None);
        assert_eq!(failure.messages(), vec!["a"]);
        assert_eq!(failure.phase, "parsing");
    }
}
