//! # Groovy AST Test Harness
//!
//! Shared helpers for the integration tests, plus the loader for the `.groovy` fixtures under
//! `tests/fixtures/`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use groovy_ast::ast::Stmt;
use groovy_ast::{parse, AstBuilder, BuilderConfig, CompilationFailed, Module, SourceContext};
use walkdir::WalkDir;

/// Header line that marks a fixture as an expected failure.
const EXPECT_ERROR: &str = "// expect-error: ";

/// A single `.groovy` fixture.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub path: PathBuf,
    pub source: String,
    pub expectation: Expectation,
}

/// The expected outcome of a fixture.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    Builds,
    Fails(String),
}

/// Discovers every fixture below `dir`, sorted by path.
pub fn load_fixtures(dir: &Path) -> Result<Vec<Fixture>, String> {
    let mut fixtures = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "groovy") {
            continue;
        }
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read fixture '{}': {e}", path.display()))?;
        let expectation = match source.lines().next().and_then(|l| l.strip_prefix(EXPECT_ERROR)) {
            Some(message) => Expectation::Fails(message.trim_end().to_string()),
            None => Expectation::Builds,
        };
        fixtures.push(Fixture {
            path: path.to_path_buf(),
            source,
            expectation,
        });
    }
    Ok(fixtures)
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// Installs a test subscriber so `RUST_LOG=groovy_ast=trace` shows builder events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn build(source: &str) -> Module {
    init_tracing();
    match parse(source, "Script.groovy") {
        Ok(module) => module,
        Err(failure) => panic!("expected the source to build, got {:?}", failure.messages()),
    }
}

pub fn build_with(source: &str, name: &str, config: BuilderConfig) -> Result<Module, CompilationFailed> {
    init_tracing();
    AstBuilder::new(SourceContext::from_file(name, source), config).build()
}

pub fn failure(source: &str) -> CompilationFailed {
    init_tracing();
    match parse(source, "Script.groovy") {
        Ok(module) => panic!("expected a failure, built:\n{}", module.describe()),
        Err(failure) => failure,
    }
}

/// First diagnostic message of a failing build.
pub fn first_error(source: &str) -> String {
    let failure = failure(source);
    failure.messages().first().map(|m| m.to_string()).unwrap_or_default()
}

pub fn statement_texts(module: &Module) -> Vec<String> {
    module.statements.iter().map(Stmt::text).collect()
}

/// The single statement of a one-statement script.
pub fn only_statement(source: &str) -> Stmt {
    let mut module = build(source);
    assert_eq!(module.statements.len(), 1, "statements: {:?}", statement_texts(&module));
    module.statements.remove(0)
}
