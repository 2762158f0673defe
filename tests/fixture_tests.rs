//! Builds every `.groovy` file under `tests/fixtures/`.
//!
//! A fixture whose first line is `// expect-error: <message>` must fail with that message
//! first; every other fixture must build.

mod common;

use common::{fixtures_dir, init_tracing, load_fixtures, Expectation};
use groovy_ast::parse;

#[test]
fn every_fixture_meets_its_expectation() {
    init_tracing();
    let fixtures = load_fixtures(&fixtures_dir()).unwrap();
    assert!(!fixtures.is_empty(), "no fixtures under {}", fixtures_dir().display());

    let mut problems = Vec::new();
    for fixture in &fixtures {
        let name = fixture
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("Fixture.groovy");
        match (&fixture.expectation, parse(&fixture.source, name)) {
            (Expectation::Builds, Ok(_)) => {}
            (Expectation::Builds, Err(failure)) => {
                problems.push(format!("{}: {:?}", fixture.path.display(), failure.messages()));
            }
            (Expectation::Fails(expected), Ok(_)) => {
                problems.push(format!("{}: built, expected `{expected}`", fixture.path.display()));
            }
            (Expectation::Fails(expected), Err(failure)) => {
                let actual = failure.messages().first().map(|m| m.to_string()).unwrap_or_default();
                if &actual != expected {
                    problems.push(format!(
                        "{}: expected `{expected}`, got `{actual}`",
                        fixture.path.display()
                    ));
                }
            }
        }
    }
    assert!(problems.is_empty(), "fixture failures:\n{}", problems.join("\n"));
}

#[test]
fn fixture_directories_are_populated() {
    for dir in ["classes", "statements", "expressions", "errors"] {
        let fixtures = load_fixtures(&fixtures_dir().join(dir)).unwrap();
        assert!(!fixtures.is_empty(), "{dir} has no fixtures");
    }
}
