//! Alert data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::alert::alert_attributes;
use crate::resources::{api_error, configured, AlertResource};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct AlertDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl AlertDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_alert(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let alert = data
            .client
            .alerts()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read alert", e))?;
        let block = resource_block(AlertResource::new()).await;
        Ok(single_state(&block, alert_attributes(&alert)))
    }
}

#[async_trait]
impl DataSource for AlertDataSource {
    fn type_name(&self) -> &str {
        "wavefront_alert"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(AlertResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront alert", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_alert(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for AlertDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        self.provider_data = WavefrontProviderData::from_any(request.provider_data, &mut diagnostics);
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[derive(Default)]
pub struct AlertsDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl AlertsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_alerts(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let alerts = data
            .client
            .alerts()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list alerts", e))?;
        tracing::debug!("found {} alerts", alerts.len());

        let block = resource_block(AlertResource::new()).await;
        let items = alerts
            .iter()
            .map(|alert| flatten(&block, alert_attributes(alert)))
            .collect();
        Ok(collection_state("alerts", items, config))
    }
}

#[async_trait]
impl DataSource for AlertsDataSource {
    fn type_name(&self) -> &str {
        "wavefront_alerts"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(AlertResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema("Lists every Wavefront alert", "alerts", &block, vec![]),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_alerts(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for AlertsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        self.provider_data = WavefrontProviderData::from_any(request.provider_data, &mut diagnostics);
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::test_support::configure_request;
    use crate::model::StateBuilder;
    use crate::resources::test_support::ok_body;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn single_alert_is_flattened() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/alert/a-1")
            .with_body(ok_body(json!({
                "id": "a-1", "name": "cpu", "target": "ops@example.com",
                "condition": "ts(cpu) > 90", "displayExpression": "ts(cpu)",
                "minutes": 5, "severity": "WARN", "alertType": "CLASSIC",
                "tags": {"customerTags": ["prod"]}
            })))
            .create_async()
            .await;

        let mut source = AlertDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_alert".to_string(),
                    config: StateBuilder::new().set("id", "a-1").build(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("id").as_str(), Some("a-1"));
        assert_eq!(response.state.attr("severity").as_str(), Some("WARN"));
        assert_eq!(response.state.attr("tags").as_list().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn alerts_are_paged_until_short_page() {
        let mut server = Server::new_async().await;
        let full_page: Vec<_> = (0..100)
            .map(|i| json!({"id": format!("a-{}", i), "name": "n", "minutes": 1}))
            .collect();
        let first = server
            .mock("POST", "/api/v2/search/alert")
            .match_body(Matcher::PartialJson(json!({"offset": 0, "limit": 100})))
            .with_body(ok_body(json!({"items": full_page})))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/api/v2/search/alert")
            .match_body(Matcher::PartialJson(json!({"offset": 100, "limit": 100})))
            .with_body(ok_body(json!({"items": [{"id": "a-100", "name": "n", "minutes": 1}]})))
            .expect(1)
            .create_async()
            .await;

        let mut source = AlertsDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_alerts".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("alerts").as_list().map(Vec::len), Some(101));
        first.assert_async().await;
        second.assert_async().await;
    }
}
