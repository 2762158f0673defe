//! Try-with-resources lowered to nested try/catch/finally blocks.

mod common;

use common::{build, first_error, only_statement};
use groovy_ast::ast::{ExprKind, Modifiers, Stmt, StmtKind};
use pretty_assertions::assert_eq;

fn try_parts(stmt: &Stmt) -> (&Stmt, usize, &Stmt) {
    match &stmt.kind {
        StmtKind::Try {
            body,
            catches,
            finally,
        } => (body, catches.len(), finally),
        _ => panic!("expected a try, got {}", stmt.text()),
    }
}

#[test]
fn typed_resource_inside_a_method() {
    let module = build(
        "class Copier {\n\
           void copy(File source) {\n\
             try (InputStream input = source.newInputStream()) {\n\
               input.transferTo(System.out)\n\
             }\n\
           }\n\
         }\n",
    );
    let copy = module.class("Copier").unwrap().method("copy").unwrap();
    let body = copy.body.as_ref().unwrap().block_statements().unwrap();
    let lowered = body[0].block_statements().expect("a lowered block");
    assert_eq!(lowered.len(), 3);
    assert_eq!(lowered[0].text(), "InputStream input = source.newInputStream()");
    assert_eq!(lowered[1].text(), "Throwable __$$primaryExc0 = null");

    let ExprKind::Declaration(decl) = &lowered[0].as_expression().unwrap().kind else {
        panic!("expected the resource declaration");
    };
    assert!(decl.modifiers.has(Modifiers::FINAL));

    let (inner_body, catch_count, finally) = try_parts(&lowered[2]);
    assert_eq!(inner_body.text(), "{ input.transferTo(System.out) }");
    assert_eq!(catch_count, 1);
    assert!(finally.text().ends_with("else input?.close() }"), "{}", finally.text());
}

#[test]
fn user_handlers_stay_on_the_outer_try() {
    let stmt = only_statement(
        "try (def conn = pool.take(); def stmt = conn.prepare(sql)) {\n\
           stmt.run()\n\
         } catch (SQLException e) {\n\
           report(e)\n\
         }\n",
    );
    let (body, catch_count, finally) = try_parts(&stmt);
    assert_eq!(catch_count, 1);
    assert!(finally.is_empty());

    let outer = &body.block_statements().unwrap()[0];
    let text = outer.text();
    assert!(text.starts_with("{ def conn = pool.take(); Throwable __$$primaryExc0 = null; try { { def stmt"));
    // The later resource is closed first.
    let closes: Vec<usize> = ["stmt?.close()", "conn?.close()"]
        .iter()
        .map(|needle| text.find(needle).unwrap())
        .collect();
    assert!(closes[0] < closes[1]);
}

#[test]
fn synthetic_names_never_repeat_within_a_unit() {
    let module = build("try (a) { }\ntry (b) { }\n");
    let first = module.statements[0].text();
    let second = module.statements[1].text();
    assert!(first.starts_with("{ def __$$resource0 = a; Throwable __$$primaryExc0 = null;"));
    assert!(second.starts_with("{ def __$$resource1 = b; Throwable __$$primaryExc1 = null;"));
    assert!(second.contains("catch (Throwable __$$t1)"));
}

#[test]
fn only_declarations_and_variables_are_resources() {
    assert_eq!(
        first_error("try (this.open()) { }"),
        "Only variable declarations or variable access are allowed to declare resource"
    );
    assert_eq!(
        first_error("try (def x = open(), y = open()) { }"),
        "Multi resources can not be declared in one statement"
    );
}
