//! Service account API

use super::client::{Client, EntityApi};
use super::common::{deserialize_ids, WavefrontApiResource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccount {
    #[serde(alias = "id")]
    pub identifier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    /// Account permissions
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub user_groups: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids", skip_serializing)]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion_policy_id: Option<String>,
}

impl WavefrontApiResource for ServiceAccount {
    fn api_path() -> &'static str {
        "/api/v2/account/serviceaccount"
    }

    fn search_entity() -> &'static str {
        "serviceaccount"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["ingestionPolicyId"]
    }
}

impl Client {
    pub fn service_accounts(&self) -> EntityApi<'_, ServiceAccount> {
        self.entity()
    }
}
