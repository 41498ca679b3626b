//! Role resource implementation
//!
//! Assignees are not part of the role payload. They are reconciled with the
//! add and remove assignee endpoints after the role itself is written.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::role::Role;
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::util::compare_string_slice_any_order;
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

pub struct RoleModel {
    pub role: Role,
    pub assignees: Vec<String>,
}

impl RoleModel {
    pub fn from_attrs(attrs: &Attrs<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            role: Role {
                id: attrs.string("id")?,
                name: attrs.required_string("name")?,
                description: attrs.string_or_empty("description")?,
                permissions: attrs.strings("permissions")?,
                ..Default::default()
            },
            assignees: attrs.strings("assignees")?,
        })
    }
}

pub(crate) fn role_attributes(role: &Role) -> StateBuilder {
    StateBuilder::new()
        .set("id", role.id.clone())
        .set("name", role.name.as_str())
        .non_empty("description", &role.description)
        .optional_strings("permissions", &role.permissions)
        .optional_strings("assignees", &role.assignees())
}

pub fn role_to_state(role: &Role) -> DynamicValue {
    role_attributes(role).build()
}

#[derive(Default)]
pub struct RoleResource {
    provider_data: Option<WavefrontProviderData>,
}

impl RoleResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<RoleModel, Diagnostic> {
        RoleModel::from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid role configuration"))
    }

    async fn read_role(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let role = found(data.client.roles().get(id).await, "Failed to read role")?;
        Ok(role.as_ref().map(role_to_state))
    }

    /// Adds and removes assignees so the role ends up with exactly `wanted`
    async fn sync_assignees(
        &self,
        id: &str,
        current: &[String],
        wanted: &[String],
    ) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let (to_add, to_remove) = compare_string_slice_any_order(wanted, current);
        let roles = data.client.roles();

        if !to_remove.is_empty() {
            tracing::debug!("removing {} assignees from role {}", to_remove.len(), id);
            roles
                .remove_assignees(id, &to_remove)
                .await
                .map_err(|e| api_error("Failed to remove role assignees", e))?;
        }
        if !to_add.is_empty() {
            tracing::debug!("adding {} assignees to role {}", to_add.len(), id);
            roles
                .add_assignees(id, &to_add)
                .await
                .map_err(|e| api_error("Failed to add role assignees", e))?;
        }
        Ok(())
    }

    async fn create_role(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let model = Self::parse(planned)?;

        let created = data
            .client
            .roles()
            .create(&model.role)
            .await
            .map_err(|e| api_error("Failed to create role", e))?;
        let id = created.id.ok_or_else(|| {
            Diagnostic::error("Failed to create role", "The API response carried no id")
        })?;
        tracing::info!("created role {}", id);

        self.sync_assignees(&id, &[], &model.assignees).await?;
        self.read_role(&id).await?.ok_or_else(|| {
            Diagnostic::error("Failed to create role", format!("Role {} disappeared", id))
        })
    }

    async fn update_role(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut model = Self::parse(planned)?;
        model.role.id = Some(id.clone());

        let updated = data
            .client
            .roles()
            .update_overlay(&id, &model.role)
            .await
            .map_err(|e| api_error("Failed to update role", e))?;

        self.sync_assignees(&id, &updated.assignees(), &model.assignees)
            .await?;
        self.read_role(&id).await?.ok_or_else(|| {
            Diagnostic::error("Failed to update role", format!("Role {} disappeared", id))
        })
    }

    async fn delete_role(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(data.client.roles().delete(&id).await, "Failed to delete role")
    }
}

#[async_trait]
impl Resource for RoleResource {
    fn type_name(&self) -> &str {
        "wavefront_role"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront role")
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
                AttributeBuilder::new("permissions", AttributeType::set_of(AttributeType::String))
                    .description("Permissions granted by the role")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("assignees", AttributeType::set_of(AttributeType::String))
                    .description("Accounts and user groups the role is assigned to")
                    .optional()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_role(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_role(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_role(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_role(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for RoleResource {
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

    #[tokio::test]
    async fn update_reconciles_assignees() {
        let mut server = Server::new_async().await;
        let current = json!({
            "id": "r1", "name": "ops", "permissions": ["alerts_management"],
            "linkedAccounts": [{"id": "old@example.com"}],
            "linkedGroups": [{"id": "g1"}]
        });
        let _get = server
            .mock("GET", "/api/v2/role/r1")
            .with_body(ok_body(current.clone()))
            .create_async()
            .await;
        let _put = server
            .mock("PUT", "/api/v2/role/r1")
            .with_body(ok_body(current))
            .create_async()
            .await;
        let remove = server
            .mock("POST", "/api/v2/role/r1/removeAssignees")
            .match_body(Matcher::Json(json!(["old@example.com"])))
            .with_body(ok_body(json!({"id": "r1", "name": "ops"})))
            .expect(1)
            .create_async()
            .await;
        let add = server
            .mock("POST", "/api/v2/role/r1/addAssignees")
            .match_body(Matcher::Json(json!(["new@example.com"])))
            .with_body(ok_body(json!({"id": "r1", "name": "ops"})))
            .expect(1)
            .create_async()
            .await;

        let mut resource = RoleResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new()
            .set("id", "r1")
            .set("name", "ops")
            .strings("permissions", &["alerts_management".to_string()])
            .strings("assignees", &["g1".to_string(), "new@example.com".to_string()])
            .build();
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "wavefront_role".to_string(),
                    prior_state: StateBuilder::new().set("id", "r1").build(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        remove.assert_async().await;
        add.assert_async().await;
    }

    #[test]
    fn flatten_lists_linked_entities_as_assignees() {
        let role: Role = serde_json::from_value(json!({
            "id": "r1", "name": "ops",
            "linkedAccounts": [{"id": "a@example.com"}],
            "linkedGroups": [{"id": "g1", "name": "Everyone"}]
        }))
        .unwrap();

        let state = role_to_state(&role);
        let assignees: Vec<_> = state
            .attr("assignees")
            .as_list()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(assignees, vec!["a@example.com", "g1"]);
        assert!(state.attr("permissions").is_null());
    }
}
