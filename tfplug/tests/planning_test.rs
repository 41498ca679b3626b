//! Schema driven planning through the public API

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use std::collections::HashMap;
use tfplug::defaults::StaticDefault;
use tfplug::plan::plan_resource_change;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::schema::NestedBlock;
use tfplug::validator::{OneOfValidator, Validator};
use tfplug::{AttributeBuilder, AttributePath, AttributeType, Dynamic, DynamicValue, Schema, SchemaBuilder};

fn monitor_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown)
                .build(),
        )
        .attribute(
            AttributeBuilder::new("url", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged)
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("severity", AttributeType::String)
                .optional()
                .computed()
                .validator(OneOfValidator::new(["INFO", "WARN", "SEVERE"]))
                .default(StaticDefault::string("WARN"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("updated", AttributeType::Number)
                .computed()
                .build(),
        )
        .block(NestedBlock::list(
            "source",
            SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("query", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("disabled", AttributeType::Bool)
                        .optional()
                        .default(StaticDefault::bool(false))
                        .build(),
                )
                .build_block(),
        ))
        .build()
}

fn object(values: Vec<(&str, Dynamic)>) -> Dynamic {
    Dynamic::Map(
        values
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    )
}

fn config(url: &str, name: &str) -> DynamicValue {
    DynamicValue::new(object(vec![
        ("url", Dynamic::from(url)),
        ("name", Dynamic::from(name)),
        (
            "source",
            Dynamic::List(vec![object(vec![("query", Dynamic::from("ts(cpu)"))])]),
        ),
    ]))
}

fn prior_state() -> DynamicValue {
    DynamicValue::new(object(vec![
        ("id", Dynamic::from("m-1")),
        ("url", Dynamic::from("cpu")),
        ("name", Dynamic::from("cpu")),
        ("severity", Dynamic::from("WARN")),
        ("updated", Dynamic::from(1000i64)),
        (
            "source",
            Dynamic::List(vec![object(vec![
                ("query", Dynamic::from("ts(cpu)")),
                ("disabled", Dynamic::Bool(false)),
            ])]),
        ),
    ]))
}

#[test]
fn create_plan_fills_defaults_and_unknowns() {
    let schema = monitor_schema();
    let config = config("cpu", "cpu");

    let plan = plan_resource_change(&schema, &DynamicValue::null(), &config, &config);

    assert!(plan.diagnostics.is_empty());
    assert!(plan.requires_replace.is_empty());
    let state = plan.planned_state;
    assert!(state.attr("id").is_unknown());
    assert!(state.attr("updated").is_unknown());
    assert_eq!(state.attr("severity").as_str(), Some("WARN"));

    let sources = state.attr("source").as_list().unwrap();
    assert_eq!(sources[0].as_map().unwrap()["disabled"], Dynamic::Bool(false));
}

#[test]
fn unchanged_update_keeps_computed_values() {
    let schema = monitor_schema();
    let config = config("cpu", "cpu");

    let plan = plan_resource_change(&schema, &prior_state(), &prior_state(), &config);

    let state = plan.planned_state;
    assert_eq!(state.attr("id").as_str(), Some("m-1"));
    assert_eq!(state.attr("updated").as_i64(), Some(1000));
}

#[test]
fn changed_update_refreshes_computed_values_but_keeps_id() {
    let schema = monitor_schema();
    let config = config("cpu", "cpu load");
    let mut proposed = prior_state();
    proposed
        .set_string(&AttributePath::new("name"), "cpu load".to_string())
        .unwrap();

    let plan = plan_resource_change(&schema, &prior_state(), &proposed, &config);

    let state = plan.planned_state;
    assert!(state.attr("updated").is_unknown());
    assert_eq!(state.attr("id").as_str(), Some("m-1"));
    assert!(plan.requires_replace.is_empty());
}

#[test]
fn changing_url_requires_replacement() {
    let schema = monitor_schema();
    let config = config("memory", "cpu");
    let mut proposed = prior_state();
    proposed
        .set_string(&AttributePath::new("url"), "memory".to_string())
        .unwrap();

    let plan = plan_resource_change(&schema, &prior_state(), &proposed, &config);

    assert_eq!(plan.requires_replace, vec![AttributePath::new("url")]);
}

#[test]
fn destroy_plan_is_null() {
    let schema = monitor_schema();
    let plan = plan_resource_change(
        &schema,
        &prior_state(),
        &DynamicValue::null(),
        &DynamicValue::null(),
    );
    assert!(plan.planned_state.is_null());
}

#[test]
fn schema_validators_reject_values_outside_the_set() {
    let schema = monitor_schema();
    let severity = schema.block.attribute("severity").unwrap();
    let path = AttributePath::new("severity");

    let mut diagnostics = vec![];
    for validator in &severity.validators {
        validator.validate(&Dynamic::from("LOUD"), &path, &mut diagnostics);
        validator.validate(&Dynamic::from("INFO"), &path, &mut diagnostics);
        validator.validate(&Dynamic::Unknown, &path, &mut diagnostics);
    }
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn unknown_values_survive_the_wire_encoding() {
    let state = DynamicValue::new(object(vec![
        ("id", Dynamic::Unknown),
        ("name", Dynamic::from("cpu")),
    ]));

    let decoded = DynamicValue::decode_msgpack(&state.encode_msgpack().unwrap()).unwrap();
    assert!(decoded.attr("id").is_unknown());
    assert_eq!(decoded.attr("name").as_str(), Some("cpu"));
}
