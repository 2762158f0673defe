//! Error collection, locations and rendering.

mod common;

use common::{build_with, failure};
use groovy_ast::errors::{render_failure, ErrorCategory};
use groovy_ast::BuilderConfig;
use pretty_assertions::assert_eq;

const THREE_MISTAKES: &str = "class var {}\n\
                              break\n\
                              def f(a, a) { }\n\
                              println 'still built'\n";

#[test]
fn independent_mistakes_are_reported_together() {
    let failure = failure(THREE_MISTAKES);
    assert_eq!(failure.phase, "parsing");
    assert_eq!(
        failure.messages(),
        vec![
            "var cannot be used for type declarations",
            "break statement is only allowed inside loops or switches",
            "Duplicated parameter 'a' found.",
        ]
    );
    assert!(failure
        .diagnostics
        .iter()
        .all(|d| d.kind.category() == ErrorCategory::Syntax));
}

#[test]
fn diagnostics_carry_line_and_column() {
    let failure = failure("def ok = 1\nwhile (ok) {\n  continue\n}\n  yield 3\n");
    let first = failure.first().unwrap();
    assert_eq!(first.message(), "yield statement is only allowed inside switch expressions");
    assert_eq!((first.line(), first.column()), (5, 3));
    assert_eq!(
        first.to_string(),
        "yield statement is only allowed inside switch expressions @ line 5, column 3."
    );
    assert_eq!(first.error_code, "groovy::parsing::syntax");
}

#[test]
fn the_error_cap_stops_the_walk() {
    let config = BuilderConfig::default().with_max_errors(2);
    let failure = build_with(THREE_MISTAKES, "Capped.groovy", config).unwrap_err();
    assert_eq!(failure.diagnostics.len(), 2);
    assert_eq!(failure.messages()[1], "break statement is only allowed inside loops or switches");
}

#[test]
fn number_errors_are_reported_after_the_walk() {
    let failure = failure("def big = 3000000000i\nbreak\n");
    assert_eq!(
        failure.messages(),
        vec![
            "break statement is only allowed inside loops or switches",
            "Number of type Integer is out of range: 3000000000",
        ]
    );
    assert_eq!(failure.diagnostics[1].kind.category(), ErrorCategory::Literal);
    assert_eq!(failure.diagnostics[1].line(), 1);
}

#[test]
fn grammar_failures_stop_at_the_first_problem() {
    let failure = failure("def x = (1 +\nclass {\n");
    assert_eq!(failure.diagnostics.len(), 1);
    let error = failure.first().unwrap();
    assert_eq!(error.kind.category(), ErrorCategory::Parse);
    assert!(error.message().starts_with("Unexpected"), "{}", error.message());
    assert_eq!(error.error_code, "groovy::parsing::parse");
}

#[test]
fn rendered_reports_include_every_diagnostic() {
    let rendered = render_failure(failure(THREE_MISTAKES));
    assert!(rendered.contains("groovy::parsing::failed"), "{rendered}");
    assert!(rendered.contains("var cannot be used for type declarations"), "{rendered}");
    assert!(rendered.contains("Duplicated parameter 'a' found."), "{rendered}");
}
