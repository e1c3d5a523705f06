use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use validus::{filled, int_, pred, set, size, str_, Registry, SchemaBuilder, Value};

/// A registry with a call-counting predicate alongside the builtins.
fn counting_registry(calls: &Arc<AtomicUsize>, outcome: bool) -> Registry {
    let mut registry = Registry::with_builtins();
    let counter = Arc::clone(calls);
    registry
        .register("counted?", &["input"], move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(outcome)
        })
        .unwrap();
    registry
}

#[test]
fn disjunction_skips_right_after_left_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = SchemaBuilder::new()
        .require("x", int_().or(pred("counted?", vec![])))
        .registry(counting_registry(&calls, true))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("x", 1_i64)])).unwrap();
    assert!(result.success());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn disjunction_evaluates_right_after_left_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = SchemaBuilder::new()
        .require("x", int_().or(pred("counted?", vec![])))
        .registry(counting_registry(&calls, true))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("x", "nope")])).unwrap();
    assert!(result.success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn conjunction_skips_right_after_left_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = SchemaBuilder::new()
        .require("x", int_().and(pred("counted?", vec![])))
        .registry(counting_registry(&calls, true))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("x", "nope")])).unwrap();
    assert!(!result.success());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn conjunction_evaluates_left_to_right() {
    let calls = Arc::new(AtomicUsize::new(0));
    let schema = SchemaBuilder::new()
        .require("x", pred("counted?", vec![]).and(int_()))
        .registry(counting_registry(&calls, true))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("x", 1_i64)])).unwrap();
    assert!(result.success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn set_surfaces_every_failing_member_in_order() {
    // a scoped multi-rule group does not short-circuit between members
    let schema = SchemaBuilder::new()
        .rule("name", set("name", vec![filled(), str_().and(size(2..=4))]))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("name", "")])).unwrap();
    let tree = result.errors().unwrap().to_tree();
    assert_eq!(
        tree.get("name").unwrap().messages().unwrap(),
        &[
            "must be filled".to_owned(),
            "length must be within 2 - 4".to_owned()
        ][..]
    );
}

#[test]
fn compiling_the_same_definitions_twice_is_idempotent() {
    let build = || {
        SchemaBuilder::new()
            .require("name", filled().and(str_().and(size(2..=4))))
            .require("age", int_())
            .compile()
            .unwrap()
    };
    let a = build();
    let b = build();

    let input = Value::map(vec![("name", ""), ("age", "x")]);
    let ra = a.call(&input).unwrap();
    let rb = b.call(&input).unwrap();
    assert_eq!(ra.success(), rb.success());
    assert_eq!(
        ra.messages().unwrap().to_tree(),
        rb.messages().unwrap().to_tree()
    );
}
