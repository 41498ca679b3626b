//! Dashboard resource managed as raw JSON
//!
//! The API returns many fields the configuration never sets. Reads compare
//! only the fields present in the configured document, so server side
//! additions do not show up as drift.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::model::{Attrs, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use serde_json::Value;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

/// The parts of `actual` at the paths `shape` defines
pub fn project(shape: &Value, actual: &Value) -> Value {
    match (shape, actual) {
        (Value::Object(shape), Value::Object(actual)) => Value::Object(
            shape
                .iter()
                .filter_map(|(key, sub)| actual.get(key).map(|v| (key.clone(), project(sub, v))))
                .collect(),
        ),
        (Value::Array(shape), Value::Array(actual)) => Value::Array(
            actual
                .iter()
                .enumerate()
                .map(|(i, v)| match shape.get(i) {
                    Some(sub) => project(sub, v),
                    None => v.clone(),
                })
                .collect(),
        ),
        (_, actual) => actual.clone(),
    }
}

fn parse_json(document: &str) -> Result<Value, Diagnostic> {
    let value: Value = serde_json::from_str(document).map_err(|e| {
        Diagnostic::error("Invalid dashboard JSON", e.to_string())
            .with_attribute(AttributePath::new("dashboard_json"))
    })?;
    if !value.is_object() {
        return Err(
            Diagnostic::error("Invalid dashboard JSON", "the document must be a JSON object")
                .with_attribute(AttributePath::new("dashboard_json")),
        );
    }
    Ok(value)
}

fn dashboard_url(document: &Value) -> Result<String, Diagnostic> {
    document
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            Diagnostic::error(
                "Invalid dashboard JSON",
                "the document must carry a non empty \"url\"",
            )
            .with_attribute(AttributePath::new("dashboard_json"))
        })
}

/// State for a dashboard document, keeping the configured text when the
/// server copy matches it
pub fn dashboard_json_state(
    id: &str,
    configured_text: &str,
    actual: &Value,
) -> Result<DynamicValue, Diagnostic> {
    let text = match serde_json::from_str::<Value>(configured_text) {
        Ok(shape) => {
            let projected = project(&shape, actual);
            if projected == shape {
                configured_text.to_string()
            } else {
                serde_json::to_string(&projected)
                    .map_err(|e| Diagnostic::error("Failed to encode dashboard JSON", e.to_string()))?
            }
        }
        Err(_) => serde_json::to_string(actual)
            .map_err(|e| Diagnostic::error("Failed to encode dashboard JSON", e.to_string()))?,
    };

    Ok(StateBuilder::new()
        .set("id", id)
        .set("dashboard_json", text)
        .build())
}

#[derive(Default)]
pub struct DashboardJsonResource {
    provider_data: Option<WavefrontProviderData>,
}

impl DashboardJsonResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn document(state: &DynamicValue) -> Result<String, Diagnostic> {
        Attrs::new(state)
            .required_string("dashboard_json")
            .map_err(|e| e.to_diagnostic("Invalid dashboard JSON"))
    }

    async fn read_document(&self, request: &ReadResourceRequest) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(&request.current_state)?;
        let text = Attrs::new(&request.current_state)
            .string("dashboard_json")
            .map_err(|e| e.to_diagnostic("Invalid dashboard JSON"))?
            .unwrap_or_else(|| "{}".to_string());

        match found(
            data.client.get_dashboard_json(&id).await,
            "Failed to read dashboard",
        )? {
            Some(actual) => dashboard_json_state(&id, &text, &actual).map(Some),
            None => Ok(None),
        }
    }

    async fn create_document(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let text = Self::document(planned)?;
        let document = parse_json(&text)?;
        let url = dashboard_url(&document)?;

        let created = data
            .client
            .create_dashboard_json(&document)
            .await
            .map_err(|e| api_error("Failed to create dashboard", e))?;
        tracing::info!("created dashboard {} from JSON", url);

        dashboard_json_state(&url, &text, &created)
    }

    async fn update_document(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let prior_id = required_id(prior)?;
        let text = Self::document(planned)?;
        let document = parse_json(&text)?;
        let url = dashboard_url(&document)?;
        if url != prior_id {
            return Err(Diagnostic::error(
                "Failed to update dashboard",
                format!("the dashboard url cannot change from {} to {}", prior_id, url),
            ));
        }

        let updated = data
            .client
            .update_dashboard_json(&url, &document)
            .await
            .map_err(|e| api_error("Failed to update dashboard", e))?;

        dashboard_json_state(&url, &text, &updated)
    }

    async fn delete_document(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.dashboards().delete(&id).await,
            "Failed to delete dashboard",
        )
    }
}

#[async_trait]
impl Resource for DashboardJsonResource {
    fn type_name(&self) -> &str {
        "wavefront_dashboard_json"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront dashboard from its JSON representation")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The dashboard url")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("dashboard_json", AttributeType::String)
                    .description("The dashboard as a JSON document, including its url")
                    .required()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if let Ok(Some(text)) = Attrs::new(&request.config).string("dashboard_json") {
            if let Err(diagnostic) = parse_json(&text).and_then(|doc| dashboard_url(&doc)) {
                diagnostics.push(diagnostic);
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_document(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_document(&request).await;
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_document(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_document(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for DashboardJsonResource {
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
    use mockito::Server;
    use serde_json::json;
    use tfplug::types::Dynamic;

    const DOCUMENT: &str = r#"{"url":"ops","name":"Ops","sections":[{"name":"s","rows":[]}]}"#;

    #[test]
    fn projection_ignores_server_fields() {
        let shape = json!({"url": "ops", "sections": [{"name": "s"}]});
        let actual = json!({
            "url": "ops",
            "creatorId": "someone",
            "sections": [{"name": "s", "rows": []}]
        });
        assert_eq!(project(&shape, &actual), shape);
    }

    #[test]
    fn matching_server_copy_keeps_configured_text() {
        let actual = json!({
            "url": "ops", "name": "Ops", "views": 12,
            "sections": [{"name": "s", "rows": []}]
        });
        let state = dashboard_json_state("ops", DOCUMENT, &actual).unwrap();
        assert_eq!(state.attr("dashboard_json").as_str(), Some(DOCUMENT));
    }

    #[test]
    fn drift_is_reported_in_the_document() {
        let actual = json!({"url": "ops", "name": "Renamed", "sections": [{"name": "s", "rows": []}]});
        let state = dashboard_json_state("ops", DOCUMENT, &actual).unwrap();
        let text = state.attr("dashboard_json").as_str().unwrap();
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["name"], "Renamed");
        assert!(value.get("views").is_none());
    }

    #[test]
    fn document_needs_url() {
        let doc = parse_json(r#"{"name":"x"}"#).unwrap();
        assert!(dashboard_url(&doc).is_err());
        assert!(parse_json("[1]").is_err());
        assert!(parse_json("not json").is_err());
    }

    #[tokio::test]
    async fn create_uses_url_as_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/dashboard")
            .match_body(mockito::Matcher::Json(serde_json::from_str(DOCUMENT).unwrap()))
            .with_body(ok_body(json!({
                "url": "ops", "name": "Ops", "sections": [{"name": "s", "rows": []}],
                "createdEpochMillis": 1
            })))
            .create_async()
            .await;

        let mut resource = DashboardJsonResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("dashboard_json", DOCUMENT)
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_dashboard_json".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("id").as_str(), Some("ops"));
        assert_eq!(response.new_state.attr("dashboard_json").as_str(), Some(DOCUMENT));
        mock.assert_async().await;
    }
}
