//! Dashboard data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::dashboard::dashboard_attributes;
use crate::resources::{api_error, configured, DashboardResource};
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
pub struct DashboardDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl DashboardDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_dashboard(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let dashboard = data
            .client
            .dashboards()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read dashboard", e))?;
        let block = resource_block(DashboardResource::new()).await;
        Ok(single_state(&block, dashboard_attributes(&dashboard)))
    }
}

#[async_trait]
impl DataSource for DashboardDataSource {
    fn type_name(&self) -> &str {
        "wavefront_dashboard"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(DashboardResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront dashboard by its url", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_dashboard(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DashboardDataSource {
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
pub struct DashboardsDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl DashboardsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_dashboards(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let dashboards = data
            .client
            .dashboards()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list dashboards", e))?;
        tracing::debug!("found {} dashboards", dashboards.len());

        let block = resource_block(DashboardResource::new()).await;
        let items = dashboards
            .iter()
            .map(|dashboard| flatten(&block, dashboard_attributes(dashboard)))
            .collect();
        Ok(collection_state("dashboards", items, config))
    }
}

#[async_trait]
impl DataSource for DashboardsDataSource {
    fn type_name(&self) -> &str {
        "wavefront_dashboards"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(DashboardResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront dashboard",
                "dashboards",
                &block,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_dashboards(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DashboardsDataSource {
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
