//! Ingestion policy API

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngestionPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// ACCOUNT, GROUP, SOURCE, METRIC or POINT_TAG
    pub scope: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub point_tags: Vec<PointTag>,
    #[serde(default)]
    pub tags_anded: bool,
    #[serde(default, skip_serializing)]
    pub customer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PointTag {
    pub key: String,
    pub value: String,
}

impl WavefrontApiResource for IngestionPolicy {
    fn api_path() -> &'static str {
        "/api/v2/usage/ingestionpolicy"
    }

    fn search_entity() -> &'static str {
        "ingestionpolicy"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["accounts", "groups", "sources", "namespaces", "pointTags"]
    }
}

impl Client {
    pub fn ingestion_policies(&self) -> EntityApi<'_, IngestionPolicy> {
        self.entity()
    }
}
