//! End-to-end builds of whole compilation units.

mod common;

use common::{build, build_with, statement_texts};
use groovy_ast::ast::{ClassKind, ExprKind, ImportKind, Module};
use groovy_ast::BuilderConfig;
use pretty_assertions::assert_eq;

#[test]
fn script_with_classes_and_methods() {
    let module = build(
        "package demo.app\n\
         import java.util.concurrent.*\n\
         import static java.lang.Math.max as biggest\n\
         \n\
         class Greeter {\n\
           String name\n\
           def greet() { \"hello $name\" }\n\
         }\n\
         \n\
         def twice(int x) { x * 2 }\n\
         \n\
         def g = new Greeter(name: 'world')\n\
         println g.greet()\n",
    );

    assert_eq!(module.package_name(), Some("demo.app."));
    assert_eq!(module.script_class_name, "demo.app.Script");
    assert_eq!(module.imports[0].kind, ImportKind::Star);
    assert_eq!(module.imports[0].target, "java.util.concurrent.");
    assert_eq!(module.imports[1].kind, ImportKind::Static);
    assert_eq!(module.imports[1].simple_name(), Some("biggest"));

    assert_eq!(module.classes.len(), 1);
    assert_eq!(module.classes[0].name, "demo.app.Greeter");
    assert_eq!(module.methods[0].name, "twice");
    assert!(module.methods[0].script_method);
    assert!(module.is_script());

    assert_eq!(
        statement_texts(&module),
        vec!["def g = new Greeter(name:world)", "this.println(g.greet())"]
    );
}

#[test]
fn describe_lists_every_top_level_part() {
    let module = build("import a.B\ninterface Shape {}\ndef area(s) { 0 }\narea(null)\n");
    assert_eq!(
        module.describe(),
        "import a.B\ninterface Shape\ndef area(s)\nthis.area(null)"
    );
}

#[test]
fn modules_round_trip_through_json() {
    let module = build("enum Suit { HEARTS, SPADES }\ndef x = [1, 2, 3].collect { it * 2 }\n");
    let json = module.to_json_pretty().unwrap();
    let restored: Module = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, module);
    assert_eq!(restored.classes[0].kind, ClassKind::Enum);
}

#[test]
fn configuration_loads_from_json() {
    let config = BuilderConfig::from_json(r#"{ "max_errors": 1, "script_base_name": "Main" }"#).unwrap();
    assert_eq!(config.max_errors, 1);
    assert_eq!(config.script_base_name.as_deref(), Some("Main"));
    assert_eq!(config.package_info_name, "package-info");
    assert!(config.keep_yield_markers);

    let module = build_with("1", "other.groovy", config).unwrap();
    assert_eq!(module.script_class_name, "Main");

    let error = BuilderConfig::from_json("{ \"max_errors\": \"many\" }").unwrap_err();
    assert!(error.message().starts_with("invalid builder configuration"));
}

#[test]
fn closures_capture_statement_bodies() {
    let module = build("def adder = { a, b -> a + b }\ndef it2 = { it }\n");
    let ExprKind::Declaration(decl) = &module.statements[0].as_expression().unwrap().kind else {
        panic!("expected a declaration");
    };
    let ExprKind::Closure(closure) = &decl.value.kind else {
        panic!("expected a closure");
    };
    assert_eq!(closure.body.text(), "{ (a + b) }");
}

#[test]
fn command_chains_and_gstrings() {
    let module = build("please show the 'money'\ndef s = \"sum: ${a + b}\"\n");
    assert_eq!(statement_texts(&module)[0], "this.please(show).the(money)");
    let ExprKind::Declaration(decl) = &module.statements[1].as_expression().unwrap().kind else {
        panic!("expected a declaration");
    };
    let ExprKind::GString(gstring) = &decl.value.kind else {
        panic!("expected a GString");
    };
    assert_eq!(gstring.strings, vec!["sum: ", ""]);
    assert_eq!(gstring.values[0].text(), "(a + b)");
}
