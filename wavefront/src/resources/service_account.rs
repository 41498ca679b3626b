//! Service account resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::service_account::ServiceAccount;
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
use tfplug::validator::StringPatternValidator;

pub const SERVICE_ACCOUNT_PREFIX: &str = "sa::";

/// Identifiers are `sa::` followed by a name
pub fn identifier_validator() -> tfplug::Result<StringPatternValidator> {
    StringPatternValidator::new(
        r"^sa::.+",
        format!("an identifier starting with {}", SERVICE_ACCOUNT_PREFIX),
    )
}

pub fn service_account_from_attrs(attrs: &Attrs<'_>) -> Result<ServiceAccount, ModelError> {
    Ok(ServiceAccount {
        identifier: attrs.required_string("identifier")?,
        description: attrs.string_or_empty("description")?,
        active: attrs.bool_or("active", true)?,
        groups: attrs.strings("permissions")?,
        user_groups: attrs.strings("user_groups")?,
        ingestion_policy_id: attrs.string("ingestion_policy")?.filter(|s| !s.is_empty()),
        roles: vec![],
    })
}

pub fn service_account_to_state(account: &ServiceAccount) -> DynamicValue {
    StateBuilder::new()
        .set("id", account.identifier.as_str())
        .set("identifier", account.identifier.as_str())
        .non_empty("description", &account.description)
        .set("active", account.active)
        .optional_strings("permissions", &account.groups)
        .strings("user_groups", &account.user_groups)
        .set("ingestion_policy", account.ingestion_policy_id.clone())
        .build()
}

#[derive(Default)]
pub struct ServiceAccountResource {
    provider_data: Option<WavefrontProviderData>,
}

impl ServiceAccountResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<ServiceAccount, Diagnostic> {
        service_account_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid service account configuration"))
    }

    async fn read_account(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let account = found(
            data.client.service_accounts().get(id).await,
            "Failed to read service account",
        )?;
        Ok(account.as_ref().map(service_account_to_state))
    }

    async fn create_account(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let account = Self::parse(planned)?;

        let created = data
            .client
            .service_accounts()
            .create(&account)
            .await
            .map_err(|e| api_error("Failed to create service account", e))?;
        tracing::info!("created service account {}", created.identifier);
        Ok(service_account_to_state(&created))
    }

    async fn update_account(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let account = Self::parse(planned)?;

        let updated = data
            .client
            .service_accounts()
            .update_overlay(&id, &account)
            .await
            .map_err(|e| api_error("Failed to update service account", e))?;
        Ok(service_account_to_state(&updated))
    }

    async fn delete_account(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.service_accounts().delete(&id).await,
            "Failed to delete service account",
        )
    }
}

#[async_trait]
impl Resource for ServiceAccountResource {
    fn type_name(&self) -> &str {
        "wavefront_service_account"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let mut diagnostics = vec![];
        let mut identifier = AttributeBuilder::new("identifier", AttributeType::String)
            .description("Identifier of the account, starting with sa::")
            .required()
            .plan_modifier(RequiresReplaceIfChanged);
        match identifier_validator() {
            Ok(validator) => identifier = identifier.validator(validator),
            Err(e) => diagnostics.push(Diagnostic::error(
                "Invalid service account schema",
                e.to_string(),
            )),
        }

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront service account")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(identifier.build())
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("active", AttributeType::Bool)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("permissions", AttributeType::set_of(AttributeType::String))
                    .description("Account permissions")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_groups", AttributeType::set_of(AttributeType::String))
                    .description("User groups of the account, the Everyone group included")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ingestion_policy", AttributeType::String)
                    .description("Id of the ingestion policy the account is bound to")
                    .optional()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics,
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_account(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_account(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_account(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_account(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for ServiceAccountResource {
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
    use tfplug::types::{AttributePath, Dynamic};
    use tfplug::validator::Validator;

    #[test]
    fn identifier_needs_prefix() {
        let validator = identifier_validator().unwrap();
        let path = AttributePath::new("identifier");
        let mut diagnostics = vec![];
        validator.validate(&Dynamic::from("sa::ci"), &path, &mut diagnostics);
        assert!(diagnostics.is_empty());

        validator.validate(&Dynamic::from("ci"), &path, &mut diagnostics);
        validator.validate(&Dynamic::from("sa::"), &path, &mut diagnostics);
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn inactive_flag_is_kept() {
        let state = StateBuilder::new()
            .set("identifier", "sa::ci")
            .set("active", false)
            .build();
        let account = service_account_from_attrs(&Attrs::new(&state)).unwrap();
        assert!(!account.active);
    }

    #[tokio::test]
    async fn create_uses_identifier_as_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/account/serviceaccount")
            .match_body(Matcher::PartialJson(json!({
                "identifier": "sa::ci", "active": true, "groups": ["metrics_management"]
            })))
            .with_body(ok_body(json!({
                "identifier": "sa::ci", "active": true,
                "groups": ["metrics_management"],
                "userGroups": [{"id": "everyone-id", "name": "Everyone"}]
            })))
            .create_async()
            .await;

        let mut resource = ServiceAccountResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("identifier", "sa::ci")
            .set("active", true)
            .strings("permissions", &["metrics_management".to_string()])
            .set("user_groups", Dynamic::Unknown)
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_service_account".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("id").as_str(), Some("sa::ci"));
        assert_eq!(
            response.new_state.attr("user_groups").as_list().map(Vec::len),
            Some(1)
        );
        mock.assert_async().await;
    }
}
