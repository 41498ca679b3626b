//! Ingestion policy resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::ingestion_policy::{IngestionPolicy, PointTag};
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Block, NestedBlock, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::OneOfValidator;

const SCOPES: [&str; 5] = ["ACCOUNT", "GROUP", "SOURCE", "METRIC", "POINT_TAG"];

pub(crate) fn point_tag_from_attrs(attrs: &Attrs<'_>) -> Result<PointTag, ModelError> {
    Ok(PointTag {
        key: attrs.required_string("key")?,
        value: attrs.required_string("value")?,
    })
}

pub(crate) fn point_tags_to_state(tags: &[PointTag]) -> Vec<StateBuilder> {
    tags.iter()
        .map(|tag| {
            StateBuilder::new()
                .set("key", tag.key.as_str())
                .set("value", tag.value.as_str())
        })
        .collect()
}

pub(crate) fn point_tag_block() -> Block {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("key", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("value", AttributeType::String)
                .required()
                .build(),
        )
        .build_block()
}

pub fn ingestion_policy_from_attrs(attrs: &Attrs<'_>) -> Result<IngestionPolicy, ModelError> {
    let policy = IngestionPolicy {
        id: attrs.string("id")?,
        name: attrs.required_string("name")?,
        description: attrs.string_or_empty("description")?,
        scope: attrs.required_string("scope")?,
        accounts: attrs.strings("accounts")?,
        groups: attrs.strings("groups")?,
        sources: attrs.strings("sources")?,
        namespaces: attrs.strings("namespaces")?,
        point_tags: attrs
            .objects("point_tags")?
            .iter()
            .map(point_tag_from_attrs)
            .collect::<Result<_, _>>()?,
        tags_anded: attrs.bool_or("tags_anded", false)?,
        customer: None,
    };

    // Each scope selects what the policy applies to from one attribute
    let (attribute, empty) = match policy.scope.as_str() {
        "ACCOUNT" => ("accounts", policy.accounts.is_empty()),
        "GROUP" => ("groups", policy.groups.is_empty()),
        "SOURCE" => ("sources", policy.sources.is_empty()),
        "METRIC" => ("namespaces", policy.namespaces.is_empty()),
        "POINT_TAG" => ("point_tags", policy.point_tags.is_empty()),
        other => {
            return Err(ModelError::invalid(
                "scope",
                format!("unknown scope '{}', expected one of {:?}", other, SCOPES),
            ))
        }
    };
    if empty {
        return Err(ModelError::invalid(
            attribute,
            format!("{} must be set for scope {}", attribute, policy.scope),
        ));
    }

    Ok(policy)
}

pub fn ingestion_policy_to_state(policy: &IngestionPolicy) -> DynamicValue {
    StateBuilder::new()
        .set("id", policy.id.clone())
        .set("name", policy.name.as_str())
        .non_empty("description", &policy.description)
        .set("scope", policy.scope.as_str())
        .optional_strings("accounts", &policy.accounts)
        .optional_strings("groups", &policy.groups)
        .optional_strings("sources", &policy.sources)
        .optional_strings("namespaces", &policy.namespaces)
        .objects("point_tags", point_tags_to_state(&policy.point_tags))
        .set("tags_anded", policy.tags_anded)
        .build()
}

#[derive(Default)]
pub struct IngestionPolicyResource {
    provider_data: Option<WavefrontProviderData>,
}

impl IngestionPolicyResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<IngestionPolicy, Diagnostic> {
        ingestion_policy_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid ingestion policy configuration"))
    }

    async fn read_policy(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let policy = found(
            data.client.ingestion_policies().get(id).await,
            "Failed to read ingestion policy",
        )?;
        Ok(policy.as_ref().map(ingestion_policy_to_state))
    }

    async fn create_policy(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let policy = Self::parse(planned)?;

        let created = data
            .client
            .ingestion_policies()
            .create(&policy)
            .await
            .map_err(|e| api_error("Failed to create ingestion policy", e))?;
        tracing::info!("created ingestion policy {:?}", created.id);
        Ok(ingestion_policy_to_state(&created))
    }

    async fn update_policy(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut policy = Self::parse(planned)?;
        policy.id = Some(id.clone());

        let updated = data
            .client
            .ingestion_policies()
            .update_overlay(&id, &policy)
            .await
            .map_err(|e| api_error("Failed to update ingestion policy", e))?;
        Ok(ingestion_policy_to_state(&updated))
    }

    async fn delete_policy(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.ingestion_policies().delete(&id).await,
            "Failed to delete ingestion policy",
        )
    }
}

#[async_trait]
impl Resource for IngestionPolicyResource {
    fn type_name(&self) -> &str {
        "wavefront_ingestion_policy"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let strings = || AttributeType::set_of(AttributeType::String);
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront ingestion policy")
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
                AttributeBuilder::new("scope", AttributeType::String)
                    .description("ACCOUNT, GROUP, SOURCE, METRIC or POINT_TAG")
                    .required()
                    .validator(OneOfValidator::new(SCOPES))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("accounts", strings())
                    .description("Accounts of an ACCOUNT scoped policy")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("groups", strings())
                    .description("User groups of a GROUP scoped policy")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("sources", strings())
                    .description("Sources of a SOURCE scoped policy")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("namespaces", strings())
                    .description("Metric namespaces of a METRIC scoped policy")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags_anded", AttributeType::Bool)
                    .description("Whether every point tag must match")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .block(NestedBlock::set("point_tags", point_tag_block()))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_policy(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_policy(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_policy(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_policy(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for IngestionPolicyResource {
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
    use tfplug::types::Dynamic;

    #[test]
    fn scope_needs_its_selector() {
        let state = StateBuilder::new()
            .set("name", "p")
            .set("scope", "SOURCE")
            .strings("accounts", &["a@example.com".to_string()])
            .build();
        let err = ingestion_policy_from_attrs(&Attrs::new(&state)).unwrap_err();
        assert_eq!(err.attribute(), "sources");
    }

    #[test]
    fn point_tag_scope_reads_block() {
        let state = StateBuilder::new()
            .set("name", "p")
            .set("scope", "POINT_TAG")
            .objects(
                "point_tags",
                vec![StateBuilder::new().set("key", "env").set("value", "prod")],
            )
            .build();
        let policy = ingestion_policy_from_attrs(&Attrs::new(&state)).unwrap();
        assert_eq!(
            policy.point_tags,
            vec![PointTag {
                key: "env".to_string(),
                value: "prod".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn create_posts_under_usage_path() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/usage/ingestionpolicy")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "team-a", "scope": "GROUP", "groups": ["g1"]
            })))
            .with_body(ok_body(serde_json::json!({
                "id": "team-a-1", "name": "team-a", "scope": "GROUP", "groups": ["g1"]
            })))
            .create_async()
            .await;

        let mut resource = IngestionPolicyResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("name", "team-a")
            .set("scope", "GROUP")
            .strings("groups", &["g1".to_string()])
            .set("tags_anded", false)
            .build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_ingestion_policy".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("id").as_str(), Some("team-a-1"));
        assert_eq!(response.new_state.attr("groups").as_list().map(Vec::len), Some(1));
        mock.assert_async().await;
    }
}
