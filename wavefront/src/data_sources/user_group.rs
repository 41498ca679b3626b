//! User group data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::resources::user_group::user_group_attributes;
use crate::resources::{api_error, configured, UserGroupResource};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use crate::model::StateBuilder;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct UserGroupDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl UserGroupDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_group(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let group = data
            .client
            .user_groups()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read user group", e))?;
        let block = resource_block(UserGroupResource::new()).await;
        Ok(single_state(&block, user_group_attributes(&group)))
    }
}

#[async_trait]
impl DataSource for UserGroupDataSource {
    fn type_name(&self) -> &str {
        "wavefront_user_group"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(UserGroupResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront user group", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_group(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserGroupDataSource {
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
pub struct UserGroupsDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl UserGroupsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_user_groups(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let user_groups = data
            .client
            .user_groups()
            .find_all()
            .await
            .map_err(|e| api_error("Failed to list user groups", e))?;
        tracing::debug!("found {} user groups", user_groups.len());

        let block = resource_block(UserGroupResource::new()).await;
        let items = user_groups
            .iter()
            .map(|group| flatten(&block, user_group_attributes(group)))
            .collect();
        Ok(collection_state("user_groups", items, config))
    }
}

#[async_trait]
impl DataSource for UserGroupsDataSource {
    fn type_name(&self) -> &str {
        "wavefront_user_groups"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(UserGroupResource::new()).await;
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists every Wavefront user group",
                "user_groups",
                &block,
                vec![],
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_user_groups(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserGroupsDataSource {
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

/// The built-in "Everyone" group every account belongs to
#[derive(Default)]
pub struct DefaultUserGroupDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl DefaultUserGroupDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_everyone(&self) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let group = data
            .client
            .user_groups()
            .everyone()
            .await
            .map_err(|e| api_error("Failed to read the default user group", e))?;
        let id = group.id.unwrap_or_default();
        Ok(StateBuilder::new()
            .set("id", id.as_str())
            .set("group_id", id)
            .build())
    }
}

#[async_trait]
impl DataSource for DefaultUserGroupDataSource {
    fn type_name(&self) -> &str {
        "wavefront_default_user_group"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Reads the id of the Everyone user group")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("group_id", AttributeType::String)
                    .description("Id of the Everyone group")
                    .computed()
                    .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_everyone().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for DefaultUserGroupDataSource {
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
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn default_group_is_found_by_name() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("POST", "/api/v2/search/usergroup")
            .match_body(Matcher::PartialJson(json!({
                "query": [{"key": "name", "value": "Everyone", "matchingMethod": "EXACT"}]
            })))
            .with_body(ok_body(json!({"items": [{"id": "g-everyone", "name": "Everyone"}]})))
            .create_async()
            .await;

        let mut source = DefaultUserGroupDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_default_user_group".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("group_id").as_str(), Some("g-everyone"));
        search.assert_async().await;
    }

    #[tokio::test]
    async fn groups_expose_role_ids() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("POST", "/api/v2/search/usergroup")
            .with_body(ok_body(json!({"items": [
                {"id": "g-1", "name": "sre", "users": ["a@example.com"],
                 "roles": [{"id": "r-1", "name": "ops"}]}
            ]})))
            .create_async()
            .await;

        let mut source = UserGroupsDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_user_groups".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let groups = response.state.attr("user_groups").as_list().unwrap();
        let group = groups[0].as_map().unwrap();
        assert_eq!(group["roles"].as_list().unwrap()[0].as_str(), Some("r-1"));
        assert!(group["description"].is_null());
    }
}
