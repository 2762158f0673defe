//! Builder configuration
//!
//! Loaded from JSON or assembled with the `with_*` methods. Every field has a default, so an
//! empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorReporting, SourceContext};
use crate::syntax::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Diagnostics kept before the collector stops recording. Zero means unbounded.
    pub max_errors: usize,
    /// File stem that marks a package-info compilation unit.
    pub package_info_name: String,
    /// Overrides the script class name normally derived from the source name.
    pub script_base_name: Option<String>,
    /// Keep the yield marker on `return` statements produced from `yield`.
    pub keep_yield_markers: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_errors: 100,
            package_info_name: "package-info".into(),
            script_base_name: None,
            keep_yield_markers: true,
        }
    }
}

impl BuilderConfig {
    /// Parses a JSON configuration. Errors are reported against the config text itself.
    pub fn from_json(text: &str) -> Result<Self, crate::errors::BuildError> {
        serde_json::from_str(text).map_err(|e| {
            let source = SourceContext::from_file("builder-config.json", text);
            let index = crate::syntax::LineIndex::new(text);
            let offset = line_col_to_offset(text, e.line(), e.column());
            let span: Span = index.span(offset, offset);
            source.report(
                crate::errors::ErrorKind::Parse {
                    message: format!("invalid builder configuration: {e}"),
                },
                span,
            )
        })
    }

    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    pub fn with_package_info_name(mut self, name: impl Into<String>) -> Self {
        self.package_info_name = name.into();
        self
    }

    pub fn with_script_base_name(mut self, name: impl Into<String>) -> Self {
        self.script_base_name = Some(name.into());
        self
    }

    pub fn with_yield_markers(mut self, keep: bool) -> Self {
        self.keep_yield_markers = keep;
        self
    }
}

fn line_col_to_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}
