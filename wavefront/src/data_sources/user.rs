//! User data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state, without,
};
use crate::resources::user::user_attributes;
use crate::resources::{api_error, configured, UserResource};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::Block;
use tfplug::types::{Diagnostic, DynamicValue};

/// The user resource block without its create-only flag
async fn user_block() -> Block {
    without(resource_block(UserResource::new()).await, &["send_email"])
}

#[derive(Default)]
pub struct UserDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl UserDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_user(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let user = data
            .client
            .users()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read user", e))?;
        Ok(single_state(&user_block().await, user_attributes(&user)))
    }
}

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &str {
        "wavefront_user"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront user by email", &user_block().await),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_user(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserDataSource {
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
pub struct UsersDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl UsersDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users are not searchable, the account endpoint returns all of them
    async fn read_users(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let users = data
            .client
            .users()
            .list()
            .await
            .map_err(|e| api_error("Failed to list users", e))?;
        tracing::debug!("found {} users", users.len());

        let block = user_block().await;
        let items = users
            .iter()
            .map(|user| flatten(&block, user_attributes(user)))
            .collect();
        Ok(collection_state("users", items, config))
    }
}

#[async_trait]
impl DataSource for UsersDataSource {
    fn type_name(&self) -> &str {
        "wavefront_users"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront user",
                "users",
                &user_block().await,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_users(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for UsersDataSource {
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
