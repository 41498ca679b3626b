//! Data source implementations
//!
//! Data sources expose the attributes of the matching resource as computed
//! attributes. Nested blocks of the resource become computed lists of
//! objects. Collection data sources page through the search API and expose
//! every entity under one list attribute.

pub mod alert;
pub mod dashboard;
pub mod derived_metric;
pub mod event;
pub mod external_link;
pub mod maintenance_window;
pub mod metrics_policy;
pub mod role;
pub mod user;
pub mod user_group;

pub use alert::{AlertDataSource, AlertsDataSource};
pub use dashboard::{DashboardDataSource, DashboardsDataSource};
pub use derived_metric::{DerivedMetricDataSource, DerivedMetricsDataSource};
pub use event::{EventDataSource, EventsDataSource};
pub use external_link::{ExternalLinkDataSource, ExternalLinksDataSource};
pub use maintenance_window::{MaintenanceWindowAllDataSource, MaintenanceWindowDataSource};
pub use metrics_policy::MetricsPolicyDataSource;
pub use role::{RoleDataSource, RolesDataSource};
pub use user::{UserDataSource, UsersDataSource};
pub use user_group::{DefaultUserGroupDataSource, UserGroupDataSource, UserGroupsDataSource};

use crate::model::{data_source_id, state_id, StateBuilder};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::data_source::ReadDataSourceResponse;
use tfplug::resource::{Resource, ResourceSchemaRequest};
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, Block, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, Dynamic, DynamicValue};

/// The root block of a resource schema
pub(crate) async fn resource_block(resource: impl Resource) -> Block {
    resource
        .schema(Context::new(), ResourceSchemaRequest)
        .await
        .schema
        .block
}

/// `resource` without the `exclude` attributes and blocks
pub(crate) fn without(mut resource: Block, exclude: &[&str]) -> Block {
    resource
        .attributes
        .retain(|attr| !exclude.contains(&attr.name.as_str()));
    resource
        .block_types
        .retain(|nested| !exclude.contains(&nested.type_name.as_str()));
    resource
}

/// The value type of a block seen as a single object
pub(crate) fn object_type(block: &Block) -> AttributeType {
    let mut fields: HashMap<String, AttributeType> = block
        .attributes
        .iter()
        .map(|attr| (attr.name.clone(), attr.r#type.clone()))
        .collect();
    for nested in &block.block_types {
        let item = object_type(&nested.block);
        let ty = match nested.nesting {
            NestingMode::Set => AttributeType::set_of(item),
            _ => AttributeType::list_of(item),
        };
        fields.insert(nested.type_name.clone(), ty);
    }
    AttributeType::Object(fields)
}

/// Every attribute and nested block of `block` as a computed attribute
pub(crate) fn computed_attributes(block: &Block) -> Vec<Attribute> {
    let mut attributes: Vec<Attribute> = block
        .attributes
        .iter()
        .map(|attr| {
            let mut builder = AttributeBuilder::new(&attr.name, attr.r#type.clone())
                .description(&attr.description)
                .computed();
            if attr.sensitive {
                builder = builder.sensitive();
            }
            builder.build()
        })
        .collect();
    attributes.extend(block.block_types.iter().map(|nested| {
        let item = object_type(&nested.block);
        let ty = match nested.nesting {
            NestingMode::Set => AttributeType::set_of(item),
            _ => AttributeType::list_of(item),
        };
        AttributeBuilder::new(&nested.type_name, ty).computed().build()
    }));
    attributes
}

/// Schema of a data source reading one entity by its required `id`
pub(crate) fn single_schema(description: &str, entity: &Block) -> Schema {
    let mut builder = SchemaBuilder::new()
        .version(0)
        .description(description)
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Id of the entity to read")
                .required()
                .build(),
        );
    for attribute in computed_attributes(entity) {
        if attribute.name != "id" {
            builder = builder.attribute(attribute);
        }
    }
    builder.build()
}

/// Schema of a data source listing every entity under `field`
pub(crate) fn collection_schema(
    description: &str,
    field: &str,
    entity: &Block,
    arguments: Vec<Attribute>,
) -> Schema {
    let mut builder = SchemaBuilder::new()
        .version(0)
        .description(description)
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(field, AttributeType::list_of(object_type(entity)))
                .computed()
                .build(),
        );
    for argument in arguments {
        builder = builder.attribute(argument);
    }
    builder.build()
}

/// An entity flattened into exactly the shape `entity` declares
pub(crate) fn flatten(entity: &Block, attributes: StateBuilder) -> Dynamic {
    entity.normalize(&attributes.into_dynamic())
}

/// State of a single entity data source
pub(crate) fn single_state(entity: &Block, attributes: StateBuilder) -> DynamicValue {
    DynamicValue::new(flatten(entity, attributes))
}

/// State of a collection data source, with a fresh id so it is read on
/// every plan
pub(crate) fn collection_state(field: &str, items: Vec<Dynamic>, config: &DynamicValue) -> DynamicValue {
    let mut values = config.values().cloned().unwrap_or_default();
    values.insert("id".to_string(), Dynamic::from(data_source_id()));
    values.insert(field.to_string(), Dynamic::List(items));
    DynamicValue::from_map(values)
}

pub(crate) fn config_id(config: &DynamicValue) -> Result<String, Diagnostic> {
    state_id(config).ok_or_else(|| {
        Diagnostic::error("Missing id", "The data source configuration does not set an id")
    })
}

pub(crate) fn data_source_response(result: Result<DynamicValue, Diagnostic>) -> ReadDataSourceResponse {
    match result {
        Ok(state) => ReadDataSourceResponse {
            state,
            diagnostics: vec![],
        },
        Err(diagnostic) => ReadDataSourceResponse {
            state: DynamicValue::null(),
            diagnostics: vec![diagnostic],
        },
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::resources::test_support::provider_data;
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::data_source::ConfigureDataSourceRequest;

    pub fn configure_request(url: &str) -> ConfigureDataSourceRequest {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(provider_data(url));
        ConfigureDataSourceRequest {
            provider_data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::schema::NestedBlock;

    fn entity() -> Block {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("secret", AttributeType::String)
                    .optional()
                    .sensitive()
                    .build(),
            )
            .block(NestedBlock::set(
                "tag",
                SchemaBuilder::new()
                    .attribute(
                        AttributeBuilder::new("key", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .build_block(),
            ))
            .build_block()
    }

    #[test]
    fn nested_blocks_become_computed_object_sets() {
        let attributes = computed_attributes(&entity());
        let tag = attributes.iter().find(|a| a.name == "tag").unwrap();
        assert!(tag.computed && !tag.optional && !tag.required);
        assert!(matches!(tag.r#type, AttributeType::Set(_)));

        let secret = attributes.iter().find(|a| a.name == "secret").unwrap();
        assert!(secret.sensitive);
    }

    #[test]
    fn single_schema_requires_id() {
        let schema = single_schema("test", &entity());
        let id = schema.block.attribute("id").unwrap();
        assert!(id.required);
        assert_eq!(schema.block.attributes.iter().filter(|a| a.name == "id").count(), 1);
        assert!(schema.block.block_types.is_empty());
    }

    #[test]
    fn excluded_attributes_are_not_flattened() {
        let block = without(entity(), &["secret"]);
        let value = flatten(
            &block,
            StateBuilder::new().set("name", "x").set("secret", "hidden"),
        );
        let map = value.as_map().unwrap();
        assert!(!map.contains_key("secret"));
        assert_eq!(map["tag"], Dynamic::List(vec![]));
        assert!(map["id"].is_null());
    }

    #[test]
    fn collection_state_keeps_arguments() {
        let config = StateBuilder::new().set("limit", 10i64).build();
        let state = collection_state("things", vec![Dynamic::from("a")], &config);
        assert_eq!(state.attr("limit").as_i64(), Some(10));
        assert!(state.attr("id").as_str().is_some());
        assert_eq!(state.attr("things").as_list().map(Vec::len), Some(1));
    }
}
