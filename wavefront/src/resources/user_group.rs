//! User group resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::user_group::UserGroup;
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

pub fn user_group_from_attrs(attrs: &Attrs<'_>) -> Result<UserGroup, ModelError> {
    Ok(UserGroup {
        id: attrs.string("id")?,
        name: attrs.required_string("name")?,
        description: attrs.string_or_empty("description")?,
        ..Default::default()
    })
}

pub(crate) fn user_group_attributes(group: &UserGroup) -> StateBuilder {
    let roles: Vec<String> = group.roles.iter().map(|r| r.id.clone()).collect();
    StateBuilder::new()
        .set("id", group.id.clone())
        .set("name", group.name.as_str())
        .non_empty("description", &group.description)
        .strings("users", &group.users)
        .strings("roles", &roles)
}

pub fn user_group_to_state(group: &UserGroup) -> DynamicValue {
    user_group_attributes(group).build()
}

#[derive(Default)]
pub struct UserGroupResource {
    provider_data: Option<WavefrontProviderData>,
}

impl UserGroupResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<UserGroup, Diagnostic> {
        user_group_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid user group configuration"))
    }

    async fn read_group(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let group = found(
            data.client.user_groups().get(id).await,
            "Failed to read user group",
        )?;
        Ok(group.as_ref().map(user_group_to_state))
    }

    async fn create_group(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let group = Self::parse(planned)?;

        let created = data
            .client
            .user_groups()
            .create(&group)
            .await
            .map_err(|e| api_error("Failed to create user group", e))?;
        tracing::info!("created user group {:?}", created.id);
        Ok(user_group_to_state(&created))
    }

    async fn update_group(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut group = Self::parse(planned)?;
        group.id = Some(id.clone());

        let updated = data
            .client
            .user_groups()
            .update_overlay(&id, &group)
            .await
            .map_err(|e| api_error("Failed to update user group", e))?;
        Ok(user_group_to_state(&updated))
    }

    async fn delete_group(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.user_groups().delete(&id).await,
            "Failed to delete user group",
        )
    }
}

#[async_trait]
impl Resource for UserGroupResource {
    fn type_name(&self) -> &str {
        "wavefront_user_group"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront user group")
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
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("users", AttributeType::set_of(AttributeType::String))
                    .description("Members of the group")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("roles", AttributeType::set_of(AttributeType::String))
                    .description("Ids of the roles assigned to the group")
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
        create_response(self.create_group(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_group(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_group(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_group(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for UserGroupResource {
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
    use serde_json::json;
    use tfplug::types::Dynamic;

    #[tokio::test]
    async fn create_sends_only_writable_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/usergroup")
            .match_body(Matcher::Json(json!({"name": "sre", "description": "on call"})))
            .with_body(ok_body(json!({
                "id": "g-1", "name": "sre", "description": "on call",
                "users": ["a@example.com"], "roles": [{"id": "r1", "name": "ops"}]
            })))
            .create_async()
            .await;

        let mut resource = UserGroupResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("name", "sre")
            .set("description", "on call")
            .set("users", Dynamic::Unknown)
            .set("roles", Dynamic::Unknown)
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_user_group".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("id").as_str(), Some("g-1"));
        let roles = response.new_state.attr("roles").as_list().unwrap();
        assert_eq!(roles[0].as_str(), Some("r1"));
        mock.assert_async().await;
    }
}
