//! Derived metric resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::derived_metric::DerivedMetric;
use crate::api::WFTags;
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

pub fn derived_metric_from_attrs(attrs: &Attrs<'_>) -> Result<DerivedMetric, ModelError> {
    Ok(DerivedMetric {
        id: attrs.string("id")?,
        name: attrs.required_string("name")?,
        query: attrs.required_string("query")?,
        minutes: attrs.required_i64("minutes")?,
        additional_information: attrs.string("additional_information")?,
        tags: WFTags::new(attrs.strings("tags")?),
        include_obsolete_metrics: attrs.bool("include_obsolete_metrics")?,
        process_rate_minutes: attrs.i64("process_rate_minutes")?,
        ..Default::default()
    })
}

pub(crate) fn derived_metric_attributes(metric: &DerivedMetric) -> StateBuilder {
    StateBuilder::new()
        .set("id", metric.id.clone())
        .set("name", metric.name.as_str())
        .set("query", metric.query.as_str())
        .set("minutes", metric.minutes)
        .non_empty(
            "additional_information",
            metric.additional_information.as_deref().unwrap_or_default(),
        )
        .optional_strings("tags", &metric.tags())
        .set(
            "include_obsolete_metrics",
            metric.include_obsolete_metrics.unwrap_or_default(),
        )
        .set("process_rate_minutes", metric.process_rate_minutes)
}

pub fn derived_metric_to_state(metric: &DerivedMetric) -> DynamicValue {
    derived_metric_attributes(metric).build()
}

#[derive(Default)]
pub struct DerivedMetricResource {
    provider_data: Option<WavefrontProviderData>,
}

impl DerivedMetricResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<DerivedMetric, Diagnostic> {
        derived_metric_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid derived metric configuration"))
    }

    async fn read_metric(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let metric = found(
            data.client.derived_metrics().get(id).await,
            "Failed to read derived metric",
        )?;
        Ok(metric.as_ref().map(derived_metric_to_state))
    }

    async fn read_back(&self, id: &str, summary: &str) -> Result<DynamicValue, Diagnostic> {
        self.read_metric(id).await?.ok_or_else(|| {
            Diagnostic::error(summary, format!("Derived metric {} disappeared after writing it", id))
        })
    }

    async fn create_metric(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let metric = Self::parse(planned)?;

        let created = data
            .client
            .derived_metrics()
            .create(&metric)
            .await
            .map_err(|e| api_error("Failed to create derived metric", e))?;
        let id = created.id.ok_or_else(|| {
            Diagnostic::error("Failed to create derived metric", "The API response carried no id")
        })?;
        tracing::info!("created derived metric {}", id);

        self.read_back(&id, "Failed to create derived metric").await
    }

    async fn update_metric(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut metric = Self::parse(planned)?;
        metric.id = Some(id.clone());

        data.client
            .derived_metrics()
            .update_overlay(&id, &metric)
            .await
            .map_err(|e| api_error("Failed to update derived metric", e))?;
        self.read_back(&id, "Failed to update derived metric").await
    }

    async fn delete_metric(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.derived_metrics().delete(&id).await,
            "Failed to delete derived metric",
        )
    }
}

#[async_trait]
impl Resource for DerivedMetricResource {
    fn type_name(&self) -> &str {
        "wavefront_derived_metric"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront derived metric")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("query", AttributeType::String)
                    .description("The query whose results are stored as new metrics")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("minutes", AttributeType::Number)
                    .description("How often the query runs, in minutes")
                    .required()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("additional_information", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::set_of(AttributeType::String))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("include_obsolete_metrics", AttributeType::Bool)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("process_rate_minutes", AttributeType::Number)
                    .optional()
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_metric(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_metric(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_metric(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_metric(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for DerivedMetricResource {
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

    #[test]
    fn flatten_keeps_query_and_tags() {
        let metric = DerivedMetric {
            id: Some("dm-1".to_string()),
            name: "rollup".to_string(),
            query: "aliasMetric(sum(ts(req)), \"req.total\")".to_string(),
            minutes: 5,
            tags: WFTags::new(vec!["team".to_string()]),
            process_rate_minutes: Some(1),
            ..Default::default()
        };

        let state = derived_metric_to_state(&metric);
        assert_eq!(state.attr("query").as_str(), Some(metric.query.as_str()));
        assert_eq!(state.attr("process_rate_minutes").as_i64(), Some(1));
        assert_eq!(state.attr("tags").as_list().map(Vec::len), Some(1));
        assert!(state.attr("additional_information").is_null());
    }

    #[tokio::test]
    async fn delete_tolerates_missing_metric() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v2/derivedmetric/dm-1")
            .with_status(404)
            .create_async()
            .await;

        let mut resource = DerivedMetricResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "wavefront_derived_metric".to_string(),
                    prior_state: StateBuilder::new().set("id", "dm-1").build(),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_reports_api_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/derivedmetric")
            .match_body(Matcher::PartialJson(serde_json::json!({"name": "rollup"})))
            .with_status(400)
            .with_body(r#"{"status":{"result":"ERROR","message":"bad query","code":400}}"#)
            .create_async()
            .await;

        let mut resource = DerivedMetricResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("name", "rollup")
            .set("query", "ts(")
            .set("minutes", 5i64)
            .set("include_obsolete_metrics", false)
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_derived_metric".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Failed to create derived metric");
        assert!(response.diagnostics[0].detail.contains("bad query"));
        assert!(response.new_state.is_null());
    }

    #[tokio::test]
    async fn update_overlays_current_metric() {
        let mut server = Server::new_async().await;
        let current = ok_body(serde_json::json!({
            "id": "dm-1", "name": "rollup", "query": "ts(a)", "minutes": 5,
            "createUserId": "someone"
        }));
        let _get = server
            .mock("GET", "/api/v2/derivedmetric/dm-1")
            .with_body(current)
            .expect_at_least(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/v2/derivedmetric/dm-1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "query": "ts(b)", "createUserId": "someone"
            })))
            .with_body(ok_body(serde_json::json!({"id": "dm-1", "name": "rollup", "query": "ts(b)"})))
            .create_async()
            .await;

        let mut resource = DerivedMetricResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let prior = StateBuilder::new().set("id", "dm-1").build();
        let planned = StateBuilder::new()
            .set("id", "dm-1")
            .set("name", "rollup")
            .set("query", "ts(b)")
            .set("minutes", 5i64)
            .build();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "wavefront_derived_metric".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
    }
}
