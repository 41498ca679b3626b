//! Metrics policy resource implementation
//!
//! There is one metrics policy per customer. Creating the resource replaces
//! its rules and deleting it restores the single rule a fresh account starts
//! with, which lets every user read every metric.

use super::ingestion_policy::{point_tag_block, point_tag_from_attrs, point_tags_to_state};
use super::{api_error, configured, create_response, delete_response, found, read_response, update_response};
use crate::api::metrics_policy::{MetricsPolicy, PolicyRuleRequest, UpdateMetricsPolicyRequest};
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

const ACCESS_TYPES: [&str; 2] = ["ALLOW", "BLOCK"];

fn rule_from_attrs(attrs: &Attrs<'_>) -> Result<PolicyRuleRequest, ModelError> {
    let rule = PolicyRuleRequest {
        name: attrs.required_string("name")?,
        description: attrs.string_or_empty("description")?,
        prefixes: attrs.strings("prefixes")?,
        tags: attrs
            .objects("tags")?
            .iter()
            .map(point_tag_from_attrs)
            .collect::<Result<_, _>>()?,
        tags_anded: attrs.bool_or("tags_anded", false)?,
        access_type: attrs.required_string("access_type")?,
        account_ids: attrs.strings("account_ids")?,
        user_group_ids: attrs.strings("user_group_ids")?,
        role_ids: attrs.strings("role_ids")?,
    };

    if rule.prefixes.is_empty() {
        return Err(ModelError::invalid(
            "policy_rules.prefixes",
            format!("rule '{}' must match at least one metric prefix", rule.name),
        ));
    }
    if rule.account_ids.is_empty() && rule.user_group_ids.is_empty() && rule.role_ids.is_empty() {
        return Err(ModelError::invalid(
            "policy_rules.account_ids",
            format!(
                "rule '{}' must apply to at least one account, user group or role",
                rule.name
            ),
        ));
    }
    Ok(rule)
}

pub fn metrics_policy_from_attrs(attrs: &Attrs<'_>) -> Result<UpdateMetricsPolicyRequest, ModelError> {
    let policy_rules = attrs
        .objects("policy_rules")?
        .iter()
        .map(rule_from_attrs)
        .collect::<Result<Vec<_>, _>>()?;
    if policy_rules.is_empty() {
        return Err(ModelError::MissingAttribute("policy_rules".to_string()));
    }
    Ok(UpdateMetricsPolicyRequest { policy_rules })
}

pub(crate) fn metrics_policy_attributes(policy: &MetricsPolicy) -> StateBuilder {
    let rules = policy
        .policy_rules
        .iter()
        .map(|rule| {
            StateBuilder::new()
                .set("name", rule.name.as_str())
                .non_empty("description", &rule.description)
                .strings("prefixes", &rule.prefixes)
                .objects("tags", point_tags_to_state(&rule.tags))
                .set("tags_anded", rule.tags_anded)
                .set("access_type", rule.access_type.as_str())
                .optional_strings("account_ids", &rule.accounts)
                .optional_strings("user_group_ids", &rule.user_groups)
                .optional_strings("role_ids", &rule.roles)
        })
        .collect();

    StateBuilder::new()
        .set("id", policy.customer.as_str())
        .set("customer", policy.customer.as_str())
        .set("updater_id", policy.updater_id.clone())
        .set("updated_epoch_millis", policy.updated_epoch_millis)
        .objects("policy_rules", rules)
}

pub fn metrics_policy_to_state(policy: &MetricsPolicy) -> DynamicValue {
    metrics_policy_attributes(policy).build()
}

pub(crate) fn policy_rule_block() -> Block {
    let strings = || AttributeType::list_of(AttributeType::String);
    SchemaBuilder::new()
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
            AttributeBuilder::new("prefixes", strings())
                .description("Metric name prefixes the rule matches, such as aws.*")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tags_anded", AttributeType::Bool)
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_type", AttributeType::String)
                .required()
                .validator(OneOfValidator::new(ACCESS_TYPES))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("account_ids", strings())
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("user_group_ids", strings())
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("role_ids", strings())
                .optional()
                .build(),
        )
        .block(NestedBlock::set("tags", point_tag_block()))
        .build_block()
}

#[derive(Default)]
pub struct MetricsPolicyResource {
    provider_data: Option<WavefrontProviderData>,
}

impl MetricsPolicyResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_policy(&self) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let policy = found(
            data.client.get_metrics_policy().await,
            "Failed to read metrics policy",
        )?;
        Ok(policy.as_ref().map(metrics_policy_to_state))
    }

    async fn write_policy(&self, planned: &DynamicValue, summary: &str) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let request = metrics_policy_from_attrs(&Attrs::new(planned))
            .map_err(|e| e.to_diagnostic("Invalid metrics policy configuration"))?;

        let policy = data
            .client
            .update_metrics_policy(&request)
            .await
            .map_err(|e| api_error(summary, e))?;
        tracing::info!(
            "metrics policy for {} now has {} rules",
            policy.customer,
            policy.policy_rules.len()
        );
        Ok(metrics_policy_to_state(&policy))
    }

    async fn reset_policy(&self) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let everyone = data
            .client
            .user_groups()
            .everyone()
            .await
            .map_err(|e| api_error("Failed to find the Everyone user group", e))?;
        let everyone_id = everyone.id.ok_or_else(|| {
            Diagnostic::error(
                "Failed to reset metrics policy",
                "The Everyone user group has no id",
            )
        })?;

        let request = UpdateMetricsPolicyRequest {
            policy_rules: vec![PolicyRuleRequest::allow_all(&everyone_id)],
        };
        data.client
            .update_metrics_policy(&request)
            .await
            .map_err(|e| api_error("Failed to reset metrics policy", e))?;
        Ok(())
    }
}

#[async_trait]
impl Resource for MetricsPolicyResource {
    fn type_name(&self) -> &str {
        "wavefront_metrics_policy"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages the Wavefront metrics policy of the customer")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("customer", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updater_id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_epoch_millis", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .block(NestedBlock::list("policy_rules", policy_rule_block()).min_items(1))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(
            self.write_policy(&request.planned_state, "Failed to create metrics policy")
                .await,
        )
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_policy().await;
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .write_policy(&request.planned_state, "Failed to update metrics policy")
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.reset_policy().await)
    }
}

#[async_trait]
impl ResourceWithConfigure for MetricsPolicyResource {
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

    fn block_rule() -> StateBuilder {
        StateBuilder::new()
            .set("name", "hide aws")
            .strings("prefixes", &["aws.*".to_string()])
            .set("access_type", "BLOCK")
            .set("tags_anded", false)
    }

    #[test]
    fn rule_needs_an_assignee() {
        let state = StateBuilder::new()
            .objects("policy_rules", vec![block_rule()])
            .build();
        let err = metrics_policy_from_attrs(&Attrs::new(&state)).unwrap_err();
        assert_eq!(err.attribute(), "policy_rules.account_ids");
    }

    #[test]
    fn rules_keep_their_order() {
        let state = StateBuilder::new()
            .objects(
                "policy_rules",
                vec![
                    block_rule().strings("role_ids", &["r1".to_string()]),
                    StateBuilder::new()
                        .set("name", "allow")
                        .strings("prefixes", &["*".to_string()])
                        .set("access_type", "ALLOW")
                        .strings("user_group_ids", &["g1".to_string()]),
                ],
            )
            .build();
        let request = metrics_policy_from_attrs(&Attrs::new(&state)).unwrap();
        let names: Vec<_> = request.policy_rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["hide aws", "allow"]);
        assert_eq!(request.policy_rules[0].role_ids, vec!["r1".to_string()]);
    }

    #[tokio::test]
    async fn delete_restores_allow_all_for_everyone() {
        let mut server = Server::new_async().await;
        let _search = server
            .mock("POST", "/api/v2/search/usergroup")
            .with_body(ok_body(json!({
                "items": [{"id": "everyone-id", "name": "Everyone"}],
                "moreItems": false
            })))
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/v2/metricspolicy")
            .match_body(Matcher::PartialJson(json!({
                "policyRules": [{
                    "name": "Allow All Metrics",
                    "prefixes": ["*"],
                    "accessType": "ALLOW",
                    "userGroupIds": ["everyone-id"]
                }]
            })))
            .with_body(ok_body(json!({"customer": "acme", "policyRules": []})))
            .expect(1)
            .create_async()
            .await;

        let mut resource = MetricsPolicyResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "wavefront_metrics_policy".to_string(),
                    prior_state: StateBuilder::new().set("id", "acme").build(),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        put.assert_async().await;
    }

    #[test]
    fn flatten_expands_rule_assignees() {
        let policy: MetricsPolicy = serde_json::from_value(json!({
            "customer": "acme",
            "updaterId": "ops@example.com",
            "policyRules": [{
                "name": "r", "accessType": "BLOCK", "prefixes": ["aws.*"],
                "tags": [{"key": "env", "value": "dev"}],
                "userGroups": [{"id": "g1", "name": "Everyone"}]
            }]
        }))
        .unwrap();

        let state = metrics_policy_to_state(&policy);
        assert_eq!(state.attr("id").as_str(), Some("acme"));
        let rules = state.attr("policy_rules").as_list().unwrap();
        let rule = rules[0].as_map().unwrap();
        assert_eq!(rule["user_group_ids"].as_list().map(Vec::len), Some(1));
        assert!(rule["account_ids"].is_null());
        assert_eq!(rule["tags"].as_list().map(Vec::len), Some(1));
    }
}
