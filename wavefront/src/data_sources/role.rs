//! Role data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::role::role_attributes;
use crate::resources::{api_error, configured, RoleResource};
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
pub struct RoleDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl RoleDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_role(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let role = data
            .client
            .roles()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read role", e))?;
        let block = resource_block(RoleResource::new()).await;
        Ok(single_state(&block, role_attributes(&role)))
    }
}

#[async_trait]
impl DataSource for RoleDataSource {
    fn type_name(&self) -> &str {
        "wavefront_role"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(RoleResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront role", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_role(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for RoleDataSource {
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
pub struct RolesDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl RolesDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_roles(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let roles = data
            .client
            .roles()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list roles", e))?;
        tracing::debug!("found {} roles", roles.len());

        let block = resource_block(RoleResource::new()).await;
        let items = roles
            .iter()
            .map(|role| flatten(&block, role_attributes(role)))
            .collect();
        Ok(collection_state("roles", items, config))
    }
}

#[async_trait]
impl DataSource for RolesDataSource {
    fn type_name(&self) -> &str {
        "wavefront_roles"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(RoleResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront role",
                "roles",
                &block,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_roles(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for RolesDataSource {
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
    async fn role_assignees_include_accounts_and_groups() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/role/r-1")
            .with_body(ok_body(json!({
                "id": "r-1", "name": "ops", "permissions": ["alerts_management"],
                "linkedAccounts": [{"id": "a@example.com", "name": "a"}],
                "linkedGroups": [{"id": "g-1", "name": "sre"}]
            })))
            .create_async()
            .await;

        let mut source = RoleDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_role".to_string(),
                    config: StateBuilder::new().set("id", "r-1").build(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("name").as_str(), Some("ops"));
        assert_eq!(response.state.attr("assignees").as_list().map(Vec::len), Some(2));
    }
}
