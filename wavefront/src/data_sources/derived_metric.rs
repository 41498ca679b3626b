//! Derived metric data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::derived_metric::derived_metric_attributes;
use crate::resources::{api_error, configured, DerivedMetricResource};
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
pub struct DerivedMetricDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl DerivedMetricDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_metric(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let metric = data
            .client
            .derived_metrics()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read derived metric", e))?;
        let block = resource_block(DerivedMetricResource::new()).await;
        Ok(single_state(&block, derived_metric_attributes(&metric)))
    }
}

#[async_trait]
impl DataSource for DerivedMetricDataSource {
    fn type_name(&self) -> &str {
        "wavefront_derived_metric"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(DerivedMetricResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront derived metric", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_metric(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DerivedMetricDataSource {
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
pub struct DerivedMetricsDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl DerivedMetricsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_derived_metrics(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let derived_metrics = data
            .client
            .derived_metrics()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list derived metrics", e))?;
        tracing::debug!("found {} derived metrics", derived_metrics.len());

        let block = resource_block(DerivedMetricResource::new()).await;
        let items = derived_metrics
            .iter()
            .map(|metric| flatten(&block, derived_metric_attributes(metric)))
            .collect();
        Ok(collection_state("derived_metrics", items, config))
    }
}

#[async_trait]
impl DataSource for DerivedMetricsDataSource {
    fn type_name(&self) -> &str {
        "wavefront_derived_metrics"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(DerivedMetricResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront derived metric",
                "derived_metrics",
                &block,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_derived_metrics(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DerivedMetricsDataSource {
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
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn derived_metric_is_read_by_id() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/derivedmetric/dm-1")
            .with_body(ok_body(json!({
                "id": "dm-1", "name": "errors", "query": "ts(errors)", "minutes": 5,
                "tags": {"customerTags": ["b", "a"]}
            })))
            .create_async()
            .await;

        let mut source = DerivedMetricDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_derived_metric".to_string(),
                    config: StateBuilder::new().set("id", "dm-1").build(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("query").as_str(), Some("ts(errors)"));
        assert_eq!(response.state.attr("minutes").as_i64(), Some(5));
        assert_eq!(response.state.attr("tags").as_list().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn unconfigured_data_source_reports_error() {
        let source = DerivedMetricsDataSource::new();
        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_derived_metrics".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
