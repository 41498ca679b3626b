//! User resource implementation
//!
//! Users are identified by their email address. Creating one sends an
//! invitation, optionally by email.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::user::{User, UserToCreate};
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

pub struct UserModel {
    pub email: String,
    pub permissions: Vec<String>,
    pub user_groups: Vec<String>,
    pub send_email: bool,
}

impl UserModel {
    pub fn from_attrs(attrs: &Attrs<'_>) -> Result<Self, ModelError> {
        let email = attrs.required_string("email")?;
        if !email.contains('@') {
            return Err(ModelError::invalid(
                "email",
                format!("'{}' is not an email address", email),
            ));
        }
        Ok(Self {
            email,
            permissions: attrs.strings("permissions")?,
            user_groups: attrs.strings("user_groups")?,
            send_email: attrs.bool_or("send_email", false)?,
        })
    }

    fn to_create(&self) -> UserToCreate {
        UserToCreate {
            email_address: self.email.clone(),
            groups: self.permissions.clone(),
            user_groups: self.user_groups.clone(),
        }
    }

    fn to_user(&self) -> User {
        User {
            identifier: self.email.clone(),
            groups: self.permissions.clone(),
            user_groups: self.user_groups.clone(),
            ..Default::default()
        }
    }
}

pub(crate) fn user_attributes(user: &User) -> StateBuilder {
    StateBuilder::new()
        .set("id", user.identifier.as_str())
        .set("email", user.identifier.as_str())
        .optional_strings("permissions", &user.groups)
        .strings("user_groups", &user.user_groups)
        .set("customer", user.customer.clone())
}

/// State after a read, carrying over the create-only `send_email` flag
fn user_to_state(user: &User, send_email: bool) -> DynamicValue {
    user_attributes(user).set("send_email", send_email).build()
}

#[derive(Default)]
pub struct UserResource {
    provider_data: Option<WavefrontProviderData>,
}

impl UserResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<UserModel, Diagnostic> {
        UserModel::from_attrs(&Attrs::new(state)).map_err(|e| e.to_diagnostic("Invalid user configuration"))
    }

    async fn read_user(&self, state: &DynamicValue) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(state)?;
        let send_email = state.attr("send_email").as_bool().unwrap_or(false);

        let user = found(data.client.users().get(&id).await, "Failed to read user")?;
        Ok(user.map(|user| user_to_state(&user, send_email)))
    }

    async fn create_user(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let model = Self::parse(planned)?;

        let created = data
            .client
            .users()
            .invite(&model.to_create(), model.send_email)
            .await
            .map_err(|e| api_error("Failed to create user", e))?;
        tracing::info!("invited user {}", created.identifier);
        Ok(user_to_state(&created, model.send_email))
    }

    async fn update_user(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let model = Self::parse(planned)?;

        let updated = data
            .client
            .users()
            .update_overlay(&id, &model.to_user())
            .await
            .map_err(|e| api_error("Failed to update user", e))?;
        Ok(user_to_state(&updated, model.send_email))
    }

    async fn delete_user(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(data.client.users().delete(&id).await, "Failed to delete user")
    }
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &str {
        "wavefront_user"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront user account")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("email", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("permissions", AttributeType::set_of(AttributeType::String))
                    .description("Account permissions such as agent_management")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_groups", AttributeType::set_of(AttributeType::String))
                    .description("User groups of the user, the Everyone group included")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("send_email", AttributeType::Bool)
                    .description("Send an invitation email on create")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("customer", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_user(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_user(&request.current_state).await;
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_user(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_user(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for UserResource {
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
    use mockito::Server;
    use serde_json::json;

    #[test]
    fn email_must_look_like_one() {
        let state = StateBuilder::new().set("email", "jane").build();
        let err = UserModel::from_attrs(&Attrs::new(&state)).err().unwrap();
        assert_eq!(err.attribute(), "email");
    }

    #[tokio::test]
    async fn read_keeps_send_email_from_state() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/account/user/jane%40example.com")
            .with_body(ok_body(json!({
                "identifier": "jane@example.com",
                "groups": ["agent_management"],
                "userGroups": [{"id": "g1"}],
                "customer": "acme"
            })))
            .create_async()
            .await;

        let mut resource = UserResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "wavefront_user".to_string(),
                    current_state: StateBuilder::new()
                        .set("id", "jane@example.com")
                        .set("send_email", true)
                        .build(),
                    private: vec![],
                },
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(state.attr("email").as_str(), Some("jane@example.com"));
        assert_eq!(state.attr("send_email").as_bool(), Some(true));
        assert_eq!(state.attr("customer").as_str(), Some("acme"));
    }

    #[tokio::test]
    async fn vanished_user_is_dropped() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/account/user/gone%40example.com")
            .with_status(404)
            .create_async()
            .await;

        let mut resource = UserResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "wavefront_user".to_string(),
                    current_state: StateBuilder::new().set("id", "gone@example.com").build(),
                    private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }
}
