//! Type declarations inside realistic compilation units.

mod common;

use common::{build, build_with, first_error};
use groovy_ast::ast::{ClassKind, ExprKind, Modifiers};
use groovy_ast::BuilderConfig;
use pretty_assertions::assert_eq;

#[test]
fn packaged_class_with_inner_and_anonymous_classes() {
    let module = build(
        "package demo\n\
         \n\
         @groovy.transform.ToString\n\
         class Registry<T extends Comparable<T>> {\n\
           private final List<T> items = []\n\
           \n\
           static class Entry {\n\
             String key\n\
           }\n\
           \n\
           Runnable task() {\n\
             new Runnable() {\n\
               void run() { println 'run' }\n\
             }\n\
           }\n\
         }\n",
    );
    let names: Vec<&str> = module.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["demo.Registry", "demo.Registry$Entry", "demo.Registry$1"]);
    assert!(!module.is_script());

    let registry = module.class("demo.Registry").unwrap();
    assert_eq!(registry.annotations[0].name, "groovy.transform.ToString");
    assert_eq!(registry.generics[0].text(), "T extends Comparable<T>");
    let items = registry.field("items").unwrap();
    assert_eq!(items.modifiers.bits(), Modifiers::PRIVATE | Modifiers::FINAL);
    assert_eq!(items.ty.text(), "List<T>");
    assert!(registry.properties.is_empty());

    let entry = module.class("demo.Registry$Entry").unwrap();
    assert_eq!(entry.outer_class.as_deref(), Some("demo.Registry"));
    assert!(entry.modifiers.has(Modifiers::STATIC));
    assert_eq!(entry.properties[0].name, "key");

    let anonymous = module.class("demo.Registry$1").unwrap();
    assert_eq!(anonymous.kind, ClassKind::AnonymousInner);
    assert_eq!(anonymous.outer_class.as_deref(), Some("demo.Registry"));
    assert!(anonymous.method("run").is_some());
}

#[test]
fn enums_with_members() {
    let module = build(
        "enum Planet {\n\
           MERCURY(3.303e+23), EARTH(5.976e+24)\n\
           \n\
           final double mass\n\
           Planet(double mass) { this.mass = mass }\n\
           double surfaceGravity() { mass * 6.67e-11 }\n\
         }\n",
    );
    let planet = &module.classes[0];
    assert_eq!(planet.kind, ClassKind::Enum);
    assert!(planet.modifiers.has(Modifiers::ENUM | Modifiers::FINAL));
    let constants: Vec<&str> = planet.enum_constants().map(|f| f.name.as_str()).collect();
    assert_eq!(constants, vec!["MERCURY", "EARTH"]);
    assert_eq!(planet.constructors.len(), 1);
    assert_eq!(planet.constructors[0].parameters[0].name, "mass");
    assert!(planet.method("surfaceGravity").is_some());
    assert!(planet.property("mass").is_some());
}

#[test]
fn annotated_members_keep_their_annotations() {
    let module = build(
        "class Service {\n\
           @Deprecated\n\
           @SuppressWarnings('unchecked')\n\
           def legacy(@Named('id') String id) { id }\n\
         }\n",
    );
    let legacy = module.class("Service").unwrap().method("legacy").unwrap();
    let annotations: Vec<&str> = legacy.annotations.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(annotations, vec!["Deprecated", "SuppressWarnings"]);
    assert_eq!(
        legacy.annotations[1].member("value").and_then(|v| v.as_string()),
        Some("unchecked")
    );
    assert_eq!(legacy.parameters[0].annotations[0].name, "Named");
    assert_eq!(legacy.modifiers.bits(), Modifiers::PUBLIC);
}

#[test]
fn package_info_units_get_a_synthetic_class() {
    let module = build_with("@Generated\npackage demo.api\n", "package-info.groovy", BuilderConfig::default())
        .unwrap();
    assert_eq!(module.package.as_ref().unwrap().annotations[0].name, "Generated");
    assert!(module.statements.is_empty());
    let class = &module.classes[0];
    assert_eq!(class.name, "demo.api.package-info");
    assert!(class.synthetic);
}

#[test]
fn records_and_compact_constructors() {
    let module = build(
        "record Range(int from, int to) {\n\
           Range {\n\
             if (from > to) throw new IllegalArgumentException()\n\
           }\n\
           int size() { to - from }\n\
         }\n",
    );
    let range = &module.classes[0];
    assert_eq!(range.kind, ClassKind::Record);
    let components: Vec<&str> = range.record_components.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(components, vec!["from", "to"]);
    assert!(range.method("size").is_some());
    let pre = range
        .annotations
        .iter()
        .find(|a| a.name == "TupleConstructor")
        .and_then(|a| a.member("pre"))
        .unwrap();
    let ExprKind::Closure(closure) = &pre.kind else {
        panic!("expected a closure");
    };
    assert!(closure.body.text().starts_with("{ if ((from > to))"));
}

#[test]
fn declaration_errors_point_at_the_offending_member() {
    assert_eq!(
        first_error("class A {\n  def m(a, a) { }\n}"),
        "Duplicated parameter 'a' found."
    );
    assert_eq!(
        first_error("class A {\n  final A() { }\n}"),
        "Constructor has an incorrect modifier 'final'."
    );
}
