//! Maintenance window data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::maintenance_window::maintenance_window_attributes;
use crate::resources::{api_error, configured, MaintenanceWindowResource};
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
pub struct MaintenanceWindowDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl MaintenanceWindowDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_window(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let window = data
            .client
            .maintenance_windows()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read maintenance window", e))?;
        let block = resource_block(MaintenanceWindowResource::new()).await;
        Ok(single_state(&block, maintenance_window_attributes(&window)))
    }
}

#[async_trait]
impl DataSource for MaintenanceWindowDataSource {
    fn type_name(&self) -> &str {
        "wavefront_maintenance_window"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(MaintenanceWindowResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront maintenance window", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_window(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for MaintenanceWindowDataSource {
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
pub struct MaintenanceWindowAllDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl MaintenanceWindowAllDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_maintenance_windows(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let maintenance_windows = data
            .client
            .maintenance_windows()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list maintenance windows", e))?;
        tracing::debug!("found {} maintenance windows", maintenance_windows.len());

        let block = resource_block(MaintenanceWindowResource::new()).await;
        let items = maintenance_windows
            .iter()
            .map(|window| flatten(&block, maintenance_window_attributes(window)))
            .collect();
        Ok(collection_state("maintenance_windows", items, config))
    }
}

#[async_trait]
impl DataSource for MaintenanceWindowAllDataSource {
    fn type_name(&self) -> &str {
        "wavefront_maintenance_window_all"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(MaintenanceWindowResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront maintenance window",
                "maintenance_windows",
                &block,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_maintenance_windows(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for MaintenanceWindowAllDataSource {
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
    use crate::resources::test_support::ok_body;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn all_windows_are_listed() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("POST", "/api/v2/search/maintenancewindow")
            .with_body(ok_body(json!({"items": [{
                "id": "mw-1", "reason": "upgrade", "title": "db",
                "startTimeInSeconds": 1_700_000_000, "endTimeInSeconds": 1_700_003_600,
                "relevantHostNames": ["db-1"], "runningState": "PENDING"
            }]})))
            .create_async()
            .await;

        let mut source = MaintenanceWindowAllDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_maintenance_window_all".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let windows = response.state.attr("maintenance_windows").as_list().unwrap();
        let window = windows[0].as_map().unwrap();
        assert_eq!(window["title"].as_str(), Some("db"));
        assert_eq!(window["end_time_in_seconds"].as_i64(), Some(1_700_003_600));
        assert_eq!(window["relevant_host_names"].as_list().map(Vec::len), Some(1));
    }
}
