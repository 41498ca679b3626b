//! External link data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::external_link::external_link_attributes;
use crate::resources::{api_error, configured, ExternalLinkResource};
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
pub struct ExternalLinkDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl ExternalLinkDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_link(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let link = data
            .client
            .external_links()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read external link", e))?;
        let block = resource_block(ExternalLinkResource::new()).await;
        Ok(single_state(&block, external_link_attributes(&link)))
    }
}

#[async_trait]
impl DataSource for ExternalLinkDataSource {
    fn type_name(&self) -> &str {
        "wavefront_external_link"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(ExternalLinkResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront external link", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_link(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for ExternalLinkDataSource {
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
pub struct ExternalLinksDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl ExternalLinksDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_external_links(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let external_links = data
            .client
            .external_links()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list external links", e))?;
        tracing::debug!("found {} external links", external_links.len());

        let block = resource_block(ExternalLinkResource::new()).await;
        let items = external_links
            .iter()
            .map(|link| flatten(&block, external_link_attributes(link)))
            .collect();
        Ok(collection_state("external_links", items, config))
    }
}

#[async_trait]
impl DataSource for ExternalLinksDataSource {
    fn type_name(&self) -> &str {
        "wavefront_external_links"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(ExternalLinkResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront external link",
                "external_links",
                &block,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_external_links(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for ExternalLinksDataSource {
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
