//! Derived metric API

use super::client::{Client, EntityApi};
use super::common::{WavefrontApiResource, WFTags};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetric {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<WFTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_obsolete_metrics: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_rate_minutes: Option<i64>,
    #[serde(default, skip_serializing)]
    pub status: Vec<String>,
    #[serde(default, skip_serializing)]
    pub created_epoch_millis: Option<i64>,
    #[serde(default, skip_serializing)]
    pub updated_epoch_millis: Option<i64>,
    #[serde(default, skip_serializing)]
    pub last_processed_millis: Option<i64>,
    #[serde(default, skip_serializing)]
    pub update_user_id: Option<String>,
}

impl DerivedMetric {
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .map(|t| t.customer_tags.clone())
            .unwrap_or_default()
    }
}

impl WavefrontApiResource for DerivedMetric {
    fn api_path() -> &'static str {
        "/api/v2/derivedmetric"
    }

    fn search_entity() -> &'static str {
        "derivedmetric"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["additionalInformation", "tags"]
    }
}

impl Client {
    pub fn derived_metrics(&self) -> EntityApi<'_, DerivedMetric> {
        self.entity()
    }
}
