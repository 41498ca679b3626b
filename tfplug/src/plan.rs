//! Schema driven planning for PlanResourceChange
//!
//! Order of operations:
//! 1. A null proposed state is a destroy plan and is returned unchanged
//! 2. Defaults fill optional attributes left null in configuration, inside
//!    nested blocks too
//! 3. Computed attributes without configuration become unknown on create,
//!    and on update when anything else in the resource changes
//! 4. Plan modifiers run on update plans

use crate::plan_modifier::{values_equal, PlanModifyRequest};
use crate::schema::{Block, Schema};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

pub struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn plan_resource_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed_new_state: &DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    if proposed_new_state.is_null() {
        return PlannedChange {
            planned_state: DynamicValue::null(),
            requires_replace: vec![],
            diagnostics: vec![],
        };
    }

    let creating = prior_state.is_null();
    let prior = schema.normalize(&prior_state.value);
    let mut planned = match schema.normalize(&proposed_new_state.value) {
        Dynamic::Map(values) => values,
        _ => HashMap::new(),
    };

    for attr in &schema.block.attributes {
        if !config.attr(&attr.name).is_null() || attr.required {
            continue;
        }
        if let Some(default) = &attr.default {
            planned.insert(
                attr.name.clone(),
                default.default_value(&AttributePath::new(&attr.name)),
            );
        } else if attr.computed && creating {
            planned.insert(attr.name.clone(), Dynamic::Unknown);
        }
    }

    for nested in &schema.block.block_types {
        if let Some(items) = planned.get_mut(&nested.type_name) {
            let path = AttributePath::new(&nested.type_name);
            apply_nested_defaults(&nested.block, items, config.attr(&nested.type_name), &path);
        }
    }

    let mut requires_replace = Vec::new();
    let mut diagnostics = Vec::new();

    if !creating {
        let changed = !values_equal(&prior, &Dynamic::Map(planned.clone()));
        if changed {
            for attr in &schema.block.attributes {
                if attr.computed && attr.default.is_none() && config.attr(&attr.name).is_null() {
                    planned.insert(attr.name.clone(), Dynamic::Unknown);
                }
            }
        }

        let prior_values = prior.as_map();
        for attr in &schema.block.attributes {
            if attr.plan_modifiers.is_empty() {
                continue;
            }
            let path = AttributePath::new(&attr.name);
            let state = prior_values
                .and_then(|m| m.get(&attr.name))
                .cloned()
                .unwrap_or(Dynamic::Null);

            for modifier in &attr.plan_modifiers {
                let plan = planned.get(&attr.name).cloned().unwrap_or(Dynamic::Null);
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: state.clone(),
                    plan,
                    config: config.attr(&attr.name).clone(),
                    path: path.clone(),
                });
                planned.insert(attr.name.clone(), response.plan_value);
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !requires_replace.contains(&path) {
                    requires_replace.push(path.clone());
                }
            }
        }
    }

    PlannedChange {
        planned_state: DynamicValue::from_map(planned),
        requires_replace,
        diagnostics,
    }
}

/// Applies defaults to every object of a list or set block, pairing each
/// planned object with the configured object at the same position
fn apply_nested_defaults(block: &Block, items: &mut Dynamic, config: &Dynamic, path: &AttributePath) {
    let Dynamic::List(items) = items else {
        return;
    };
    let configured = config.as_list();

    for (i, item) in items.iter_mut().enumerate() {
        let item_config = configured.and_then(|c| c.get(i));
        let item_path = path.clone().index(i as i64);
        let Dynamic::Map(values) = item else {
            continue;
        };

        for attr in &block.attributes {
            let set_in_config = item_config
                .and_then(Dynamic::as_map)
                .and_then(|m| m.get(&attr.name))
                .is_some_and(|v| !v.is_null());
            if set_in_config || attr.required {
                continue;
            }
            if let Some(default) = &attr.default {
                let attr_path = item_path.clone().attribute(&attr.name);
                values.insert(attr.name.clone(), default.default_value(&attr_path));
            }
        }

        for nested in &block.block_types {
            let nested_config = item_config
                .and_then(Dynamic::as_map)
                .and_then(|m| m.get(&nested.type_name))
                .unwrap_or(&Dynamic::Null);
            if let Some(children) = values.get_mut(&nested.type_name) {
                let nested_path = item_path.clone().attribute(&nested.type_name);
                apply_nested_defaults(&nested.block, children, nested_config, &nested_path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
    use crate::schema::{AttributeBuilder, AttributeType, NestedBlock, SchemaBuilder};

    fn schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("minutes", AttributeType::Number)
                    .optional()
                    .computed()
                    .default(StaticDefault::number(5.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn value(pairs: &[(&str, Dynamic)]) -> DynamicValue {
        DynamicValue::from_map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn destroy_plan_is_null() {
        let prior = value(&[("id", Dynamic::from("1"))]);
        let change = plan_resource_change(&schema(), &prior, &DynamicValue::null(), &DynamicValue::null());

        assert!(change.planned_state.is_null());
        assert!(change.requires_replace.is_empty());
    }

    #[test]
    fn create_marks_computed_unknown_and_applies_defaults() {
        let config = value(&[("email", Dynamic::from("a@example.com"))]);
        let change = plan_resource_change(&schema(), &DynamicValue::null(), &config, &config);

        let planned = &change.planned_state;
        assert!(planned.attr("id").is_unknown());
        assert!(planned.attr("updated").is_unknown());
        assert_eq!(planned.attr("minutes"), &Dynamic::Number(5.0));
        assert_eq!(planned.attr("email"), &Dynamic::from("a@example.com"));
    }

    #[test]
    fn defaults_apply_inside_nested_blocks() {
        let source = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("query", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disabled", AttributeType::Bool)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .build_block();
        let chart = SchemaBuilder::new()
            .block(NestedBlock::list("source", source))
            .build_block();
        let schema = SchemaBuilder::new()
            .block(NestedBlock::list("chart", chart))
            .build();

        let config = value(&[(
            "chart",
            Dynamic::List(vec![Dynamic::Map(HashMap::from([(
                "source".to_string(),
                Dynamic::List(vec![
                    Dynamic::Map(HashMap::from([
                        ("query".to_string(), Dynamic::from("ts(a)")),
                        ("disabled".to_string(), Dynamic::Null),
                    ])),
                    Dynamic::Map(HashMap::from([
                        ("query".to_string(), Dynamic::from("ts(b)")),
                        ("disabled".to_string(), Dynamic::Bool(true)),
                    ])),
                ]),
            )]))]),
        )]);

        let change = plan_resource_change(&schema, &DynamicValue::null(), &config, &config);

        let sources = change.planned_state.attr("chart").as_list().unwrap()[0]
            .as_map()
            .unwrap()["source"]
            .as_list()
            .unwrap()
            .clone();
        assert_eq!(sources[0].as_map().unwrap()["disabled"], Dynamic::Bool(false));
        assert_eq!(sources[1].as_map().unwrap()["disabled"], Dynamic::Bool(true));
    }

    #[test]
    fn unchanged_update_keeps_prior_values() {
        let prior = value(&[
            ("id", Dynamic::from("1")),
            ("email", Dynamic::from("a@example.com")),
            ("minutes", Dynamic::Number(5.0)),
            ("updated", Dynamic::Number(100.0)),
        ]);
        let config = value(&[("email", Dynamic::from("a@example.com"))]);

        let change = plan_resource_change(&schema(), &prior, &prior, &config);

        assert_eq!(change.planned_state.attr("updated"), &Dynamic::Number(100.0));
        assert!(change.requires_replace.is_empty());
    }

    #[test]
    fn changed_update_requires_replace_and_keeps_id() {
        let prior = value(&[
            ("id", Dynamic::from("1")),
            ("email", Dynamic::from("a@example.com")),
            ("minutes", Dynamic::Number(5.0)),
            ("updated", Dynamic::Number(100.0)),
        ]);
        let mut proposed = prior.clone();
        proposed
            .set_string(&AttributePath::new("email"), "b@example.com".to_string())
            .unwrap();
        let config = value(&[("email", Dynamic::from("b@example.com"))]);

        let change = plan_resource_change(&schema(), &prior, &proposed, &config);

        assert_eq!(change.planned_state.attr("id"), &Dynamic::from("1"));
        assert!(change.planned_state.attr("updated").is_unknown());
        assert_eq!(change.requires_replace, vec![AttributePath::new("email")]);
    }
}
