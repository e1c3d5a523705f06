use std::sync::Arc;

use validus::{
    filled, float_, gt, int_, none, pred, size, str_, subschema, val, Arg, EvalError,
    MessageError, MessageTree, SchemaBuilder, StaticMessages, Value,
};

fn texts(tree: &MessageTree, key: &str) -> Vec<String> {
    tree.get(key)
        .unwrap_or_else(|| panic!("no bucket for '{key}'"))
        .messages()
        .unwrap_or_else(|| panic!("'{key}' is not a terminal bucket"))
        .to_vec()
}

#[test]
fn filled_string_with_size_range() {
    let schema = SchemaBuilder::new()
        .require("name", filled().and(str_().and(size(2..=4))))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("name", "")])).unwrap();
    assert!(!result.success());

    // errors are failures only
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(texts(&errors, "name"), vec!["must be filled"]);

    // messages add the size hint that short-circuiting skipped
    let messages = result.messages().unwrap().to_tree();
    assert_eq!(
        texts(&messages, "name"),
        vec!["must be filled", "length must be within 2 - 4"]
    );
}

#[test]
fn valid_input_produces_no_messages() {
    let schema = SchemaBuilder::new()
        .require("name", filled().and(str_().and(size(2..=4))))
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("name", "jo")])).unwrap();
    assert!(result.success());
    assert!(result.errors().unwrap().is_empty());
    assert!(result.messages().unwrap().is_empty());
}

#[test]
fn missing_required_key_is_reported() {
    let schema = SchemaBuilder::new()
        .require("name", filled())
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("other", 1_i64)])).unwrap();
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(texts(&errors, "name"), vec!["is missing"]);
}

#[test]
fn or_collapse_renders_a_single_message() {
    let schema = SchemaBuilder::new()
        .require("tag", str_().or(int_()))
        .compile()
        .unwrap();

    let result = schema
        .call(&Value::map(vec![("tag", Value::Array(vec![]))]))
        .unwrap();
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(
        texts(&errors, "tag"),
        vec!["must be a string or must be an integer"]
    );
}

#[test]
fn maybe_age_reports_only_the_substantive_failure() {
    let schema = SchemaBuilder::new()
        .rule("age", val("age", none().or(int_().and(gt(18_i64)))))
        .compile()
        .unwrap();

    // absent and null are both fine
    assert!(schema
        .call(&Value::map(vec![("name", "jane")]))
        .unwrap()
        .success());
    assert!(schema
        .call(&Value::map(vec![("age", Value::Null)]))
        .unwrap()
        .success());

    // a string age fails the type guard; none? is not reported
    let result = schema.call(&Value::map(vec![("age", "17")])).unwrap();
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(texts(&errors, "age"), vec!["must be an integer"]);

    // an underage integer fails gt?; the gt? hint deduplicates against it
    let result = schema.call(&Value::map(vec![("age", 17_i64)])).unwrap();
    let messages = result.messages().unwrap().to_tree();
    assert_eq!(texts(&messages, "age"), vec!["must be greater than 18"]);

    assert!(schema
        .call(&Value::map(vec![("age", 21_i64)]))
        .unwrap()
        .success());
}

#[test]
fn nested_each_preserves_array_indices() {
    let payment = Arc::new(
        SchemaBuilder::new()
            .require("method", str_())
            .require("amount", float_())
            .compile()
            .unwrap(),
    );
    let schema = SchemaBuilder::new()
        .each("payments", subschema(&payment))
        .compile()
        .unwrap();

    let input = Value::map(vec![(
        "payments",
        Value::Array(vec![
            Value::map(vec![
                ("method", Value::from("cc")),
                ("amount", Value::from(1.23)),
            ]),
            Value::map(vec![("amount", Value::from(4.56))]),
        ]),
    )]);

    let result = schema.call(&input).unwrap();
    assert!(!result.success());

    let tree = result.messages().unwrap().to_tree();
    let payments = tree.get("payments").unwrap();
    // the valid first element has no slot
    assert!(payments.index(0).is_none());
    assert_eq!(
        payments
            .index(1)
            .unwrap()
            .get("method")
            .unwrap()
            .messages()
            .unwrap(),
        &["is missing".to_owned()][..]
    );
}

#[test]
fn cross_field_check_attaches_to_its_name() {
    let schema = SchemaBuilder::new()
        .require("start", int_())
        .require("end", int_())
        .check(
            "end_after_start",
            vec!["start", "end"],
            pred("gt?", vec![("num", Arg::Input), ("input", Arg::Input)]),
        )
        .compile()
        .unwrap();

    assert!(schema
        .call(&Value::map(vec![("start", 1_i64), ("end", 2_i64)]))
        .unwrap()
        .success());

    let result = schema
        .call(&Value::map(vec![("start", 5_i64), ("end", 3_i64)]))
        .unwrap();
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(
        texts(&errors, "end_after_start"),
        vec!["must be greater than 5"]
    );
}

#[test]
fn full_messages_prefix_the_subject() {
    let schema = SchemaBuilder::new()
        .require("name", filled())
        .full_messages(true)
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("name", "")])).unwrap();
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(texts(&errors, "name"), vec!["name must be filled"]);
}

#[test]
fn locale_overrides_apply_with_english_fallback() {
    let mut backend = StaticMessages::english();
    backend.add("de", "filled?", "muss ausgefüllt sein");

    let schema = SchemaBuilder::new()
        .require("name", filled())
        .require("age", int_())
        .messages(Arc::new(backend))
        .locale("de")
        .compile()
        .unwrap();

    let result = schema
        .call(&Value::map(vec![("name", ""), ("age", "x")]))
        .unwrap();
    let errors = result.errors().unwrap().to_tree();
    assert_eq!(texts(&errors, "name"), vec!["muss ausgefüllt sein"]);
    // int? has no de template and falls back
    assert_eq!(texts(&errors, "age"), vec!["must be an integer"]);
}

#[test]
fn missing_template_surfaces_as_configuration_error() {
    let mut registry = validus::Registry::with_builtins();
    registry
        .register("shouty?", &["input"], |args| {
            Ok(matches!(args.last(), Some(Value::String(s)) if s.chars().all(char::is_uppercase)))
        })
        .unwrap();
    let schema = SchemaBuilder::new()
        .require("code", pred("shouty?", vec![]))
        .registry(registry)
        .compile()
        .unwrap();

    let result = schema.call(&Value::map(vec![("code", "abc")])).unwrap();
    assert!(!result.success());
    assert!(matches!(
        result.errors().unwrap_err(),
        MessageError::MissingTemplate { .. }
    ));
}

#[test]
fn unguarded_comparison_propagates_an_eval_error() {
    let schema = SchemaBuilder::new()
        .require("age", gt(18_i64))
        .compile()
        .unwrap();

    let err = schema
        .call(&Value::map(vec![("age", "seventeen")]))
        .unwrap_err();
    assert!(matches!(err, EvalError::IncomparableTypes { .. }));
}

#[test]
fn flat_message_listing_keeps_order() {
    let schema = SchemaBuilder::new()
        .require("name", filled())
        .require("age", int_())
        .compile()
        .unwrap();

    let result = schema
        .call(&Value::map(vec![("name", ""), ("age", "x")]))
        .unwrap();
    let flat = result.errors().unwrap().to_vec();
    assert_eq!(flat.len(), 2);
    assert_eq!(flat[0].1, "must be filled");
    assert_eq!(flat[1].1, "must be an integer");
}
