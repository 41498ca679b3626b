//! Metrics policy API
//!
//! The policy is a singleton per customer: it is read and replaced as a
//! whole, never created or deleted.

use super::client::Client;
use super::common::deserialize_ids;
use super::error::ApiError;
use super::ingestion_policy::PointTag;
use serde::{Deserialize, Serialize};

pub const METRICS_POLICY_PATH: &str = "/api/v2/metricspolicy";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsPolicy {
    #[serde(default)]
    pub policy_rules: Vec<PolicyRule>,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub updater_id: Option<String>,
    #[serde(default)]
    pub updated_epoch_millis: Option<i64>,
}

/// A rule as returned by the API, with accounts, groups and roles expanded
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<PointTag>,
    #[serde(default)]
    pub tags_anded: bool,
    pub access_type: String,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub accounts: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub user_groups: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricsPolicyRequest {
    pub policy_rules: Vec<PolicyRuleRequest>,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRuleRequest {
    pub name: String,
    pub description: String,
    pub prefixes: Vec<String>,
    pub tags: Vec<PointTag>,
    pub tags_anded: bool,
    pub access_type: String,
    pub account_ids: Vec<String>,
    pub user_group_ids: Vec<String>,
    pub role_ids: Vec<String>,
}

impl PolicyRuleRequest {
    /// The rule a fresh account starts with: everyone may read every metric
    pub fn allow_all(everyone_group_id: &str) -> Self {
        Self {
            name: "Allow All Metrics".to_string(),
            description: "Predefined policy rule. Allows access to all metrics.".to_string(),
            prefixes: vec!["*".to_string()],
            tags: vec![],
            tags_anded: false,
            access_type: "ALLOW".to_string(),
            account_ids: vec![],
            user_group_ids: vec![everyone_group_id.to_string()],
            role_ids: vec![],
        }
    }
}

impl From<&PolicyRule> for PolicyRuleRequest {
    fn from(rule: &PolicyRule) -> Self {
        Self {
            name: rule.name.clone(),
            description: rule.description.clone(),
            prefixes: rule.prefixes.clone(),
            tags: rule.tags.clone(),
            tags_anded: rule.tags_anded,
            access_type: rule.access_type.clone(),
            account_ids: rule.accounts.clone(),
            user_group_ids: rule.user_groups.clone(),
            role_ids: rule.roles.clone(),
        }
    }
}

impl Client {
    /// GET /api/v2/metricspolicy
    pub async fn get_metrics_policy(&self) -> Result<MetricsPolicy, ApiError> {
        self.get(METRICS_POLICY_PATH).await
    }

    /// PUT /api/v2/metricspolicy
    pub async fn update_metrics_policy(
        &self,
        request: &UpdateMetricsPolicyRequest,
    ) -> Result<MetricsPolicy, ApiError> {
        self.put(METRICS_POLICY_PATH, request).await
    }
}
