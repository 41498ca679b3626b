//! Alert target (notificant) resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::alert_target::{AlertRoute, AlertTarget};
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::OneOfValidator;

const METHODS: [&str; 3] = ["EMAIL", "PAGERDUTY", "WEBHOOK"];

const TRIGGERS: [&str; 7] = [
    "ALERT_OPENED",
    "ALERT_UPDATED",
    "ALERT_RESOLVED",
    "ALERT_MAINTENANCE",
    "ALERT_SNOOZED",
    "ALERT_NO_DATA",
    "ALERT_NO_DATA_RESOLVED",
];

/// Splits an API route filter `"<key> <value>"` into its parts
fn split_filter(filter: &str) -> HashMap<String, String> {
    match filter.split_once(' ') {
        Some((key, value)) => HashMap::from([
            ("key".to_string(), key.to_string()),
            ("value".to_string(), value.to_string()),
        ]),
        None => HashMap::new(),
    }
}

fn route_from_attrs(attrs: &Attrs<'_>) -> Result<AlertRoute, ModelError> {
    let filter = attrs.string_map("filter")?;
    let filter = match (filter.get("key"), filter.get("value")) {
        (Some(key), Some(value)) => format!("{} {}", key, value),
        (None, None) => String::new(),
        _ => {
            return Err(ModelError::invalid(
                "route.filter",
                "filter needs both a key and a value",
            ))
        }
    };

    Ok(AlertRoute {
        method: attrs.required_string("method")?,
        target: attrs.required_string("target")?,
        filter,
    })
}

pub fn alert_target_from_attrs(attrs: &Attrs<'_>) -> Result<AlertTarget, ModelError> {
    let routes = attrs
        .objects("route")?
        .iter()
        .map(route_from_attrs)
        .collect::<Result<Vec<_>, _>>()?;

    for trigger in attrs.strings("triggers")? {
        if !TRIGGERS.contains(&trigger.as_str()) {
            return Err(ModelError::invalid(
                "triggers",
                format!("unknown trigger '{}', expected one of {:?}", trigger, TRIGGERS),
            ));
        }
    }

    Ok(AlertTarget {
        id: attrs.string("id")?,
        title: attrs.required_string("name")?,
        description: attrs.required_string("description")?,
        method: attrs.required_string("method")?,
        recipient: attrs.required_string("recipient")?,
        template: attrs.required_string("template")?,
        triggers: attrs.strings("triggers")?,
        email_subject: attrs.string("email_subject")?,
        is_html_content: attrs.bool_or("is_html_content", false)?,
        content_type: attrs.string("content_type")?,
        custom_http_headers: attrs.string_map("custom_headers")?,
        routes,
    })
}

pub fn alert_target_to_state(target: &AlertTarget) -> DynamicValue {
    let routes = target
        .routes
        .iter()
        .map(|route| {
            let filter = split_filter(&route.filter);
            let builder = StateBuilder::new()
                .set("method", route.method.as_str())
                .set("target", route.target.as_str());
            builder.optional_map("filter", &filter)
        })
        .collect();

    StateBuilder::new()
        .set("id", target.id.clone())
        .set("target_id", target.target_reference())
        .set("name", target.title.as_str())
        .set("description", target.description.as_str())
        .set("method", target.method.as_str())
        .set("recipient", target.recipient.as_str())
        .set("template", target.template.as_str())
        .strings("triggers", &target.triggers)
        .non_empty(
            "email_subject",
            target.email_subject.as_deref().unwrap_or_default(),
        )
        .set("is_html_content", target.is_html_content)
        .non_empty(
            "content_type",
            target.content_type.as_deref().unwrap_or_default(),
        )
        .optional_map("custom_headers", &target.custom_http_headers)
        .objects("route", routes)
        .build()
}

#[derive(Default)]
pub struct AlertTargetResource {
    provider_data: Option<WavefrontProviderData>,
}

impl AlertTargetResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<AlertTarget, Diagnostic> {
        alert_target_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid alert target configuration"))
    }

    async fn read_target(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let target = found(
            data.client.alert_targets().get(id).await,
            "Failed to read alert target",
        )?;
        Ok(target.as_ref().map(alert_target_to_state))
    }

    async fn create_target(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let target = Self::parse(planned)?;

        let created = data
            .client
            .alert_targets()
            .create(&target)
            .await
            .map_err(|e| api_error("Failed to create alert target", e))?;
        tracing::info!("created alert target {:?}", created.id);
        Ok(alert_target_to_state(&created))
    }

    async fn update_target(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut target = Self::parse(planned)?;
        target.id = Some(id.clone());

        let updated = data
            .client
            .alert_targets()
            .update_overlay(&id, &target)
            .await
            .map_err(|e| api_error("Failed to update alert target", e))?;
        Ok(alert_target_to_state(&updated))
    }

    async fn delete_target(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.alert_targets().delete(&id).await,
            "Failed to delete alert target",
        )
    }
}

#[async_trait]
impl Resource for AlertTargetResource {
    fn type_name(&self) -> &str {
        "wavefront_alert_target"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let route = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("method", AttributeType::String)
                    .description("EMAIL, PAGERDUTY or WEBHOOK")
                    .required()
                    .validator(OneOfValidator::new(METHODS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target", AttributeType::String)
                    .description("Where notifications of this route are sent")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("filter", AttributeType::map_of(AttributeType::String))
                    .description("`key` and `value` of the alert tag this route applies to")
                    .optional()
                    .build(),
            )
            .build_block();

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront alert target")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target_id", AttributeType::String)
                    .description("The `target:<id>` reference used in alert targets")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The title of the alert target")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("method", AttributeType::String)
                    .description("EMAIL, PAGERDUTY or WEBHOOK")
                    .required()
                    .validator(OneOfValidator::new(METHODS))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("recipient", AttributeType::String)
                    .description("Email addresses, a PagerDuty key or a webhook URL")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("template", AttributeType::String)
                    .description("Mustache template of the notification")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("triggers", AttributeType::set_of(AttributeType::String))
                    .description("Alert events that send a notification")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email_subject", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_html_content", AttributeType::Bool)
                    .description("Whether email notifications are sent as HTML")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content_type", AttributeType::String)
                    .description("Content type of webhook notifications")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "custom_headers",
                    AttributeType::map_of(AttributeType::String),
                )
                .description("Extra HTTP headers of webhook notifications")
                .optional()
                .build(),
            )
            .block(NestedBlock::set("route", route))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_target(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_target(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_target(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_target(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for AlertTargetResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        self.provider_data = WavefrontProviderData::from_any(request.provider_data, &mut diagnostics);
        ConfigureResourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{configure_request, ok_body};
    use mockito::{Matcher, Server};
    use tfplug::types::Dynamic;

    fn planned() -> DynamicValue {
        StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("target_id", Dynamic::Unknown)
            .set("name", "oncall")
            .set("description", "pages the on call engineer")
            .set("method", "WEBHOOK")
            .set("recipient", "https://hooks.example.com/wf")
            .set("template", "{}")
            .strings("triggers", &["ALERT_OPENED".to_string()])
            .set("is_html_content", false)
            .set("content_type", "application/json")
            .objects(
                "route",
                vec![StateBuilder::new()
                    .set("method", "PAGERDUTY")
                    .set("target", "pd-key")
                    .string_map(
                        "filter",
                        &HashMap::from([
                            ("key".to_string(), "env".to_string()),
                            ("value".to_string(), "prod".to_string()),
                        ]),
                    )],
            )
            .build()
    }

    #[test]
    fn routes_join_filter_key_and_value() {
        let target = alert_target_from_attrs(&Attrs::new(&planned())).unwrap();
        assert_eq!(target.title, "oncall");
        assert_eq!(target.routes[0].filter, "env prod");
        assert_eq!(target.routes[0].method, "PAGERDUTY");
    }

    #[test]
    fn unknown_trigger_is_rejected() {
        let state = StateBuilder::new()
            .set("name", "t")
            .set("description", "d")
            .set("method", "EMAIL")
            .set("recipient", "a@example.com")
            .set("template", "x")
            .strings("triggers", &["ALERT_EXPLODED".to_string()])
            .build();
        let err = alert_target_from_attrs(&Attrs::new(&state)).unwrap_err();
        assert_eq!(err.attribute(), "triggers");
    }

    #[test]
    fn flatten_splits_route_filter() {
        let target = AlertTarget {
            id: Some("abc".to_string()),
            title: "oncall".to_string(),
            routes: vec![AlertRoute {
                method: "EMAIL".to_string(),
                target: "a@example.com".to_string(),
                filter: "env prod".to_string(),
            }],
            ..Default::default()
        };

        let state = alert_target_to_state(&target);
        assert_eq!(state.attr("target_id").as_str(), Some("target:abc"));
        let route = &state.attr("route").as_list().unwrap()[0];
        let filter = route.as_map().unwrap()["filter"].as_map().unwrap();
        assert_eq!(filter["key"].as_str(), Some("env"));
        assert_eq!(filter["value"].as_str(), Some("prod"));
    }

    #[tokio::test]
    async fn create_posts_notificant() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/notificant")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "oncall",
                "method": "WEBHOOK",
                "routes": [{"method": "PAGERDUTY", "target": "pd-key", "filter": "env prod"}]
            })))
            .with_body(ok_body(serde_json::json!({
                "id": "n1",
                "title": "oncall",
                "description": "pages the on call engineer",
                "method": "WEBHOOK",
                "recipient": "https://hooks.example.com/wf",
                "template": "{}",
                "triggers": ["ALERT_OPENED"],
                "contentType": "application/json",
                "routes": [{"method": "PAGERDUTY", "target": "pd-key", "filter": "env prod"}]
            })))
            .create_async()
            .await;

        let mut resource = AlertTargetResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_alert_target".to_string(),
                    planned_state: planned(),
                    config: planned(),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("target_id").as_str(), Some("target:n1"));
        mock.assert_async().await;
    }
}
