//! External link API

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_filter_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_filter_regex: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub point_tag_filter_regexes: HashMap<String, String>,
    #[serde(default)]
    pub is_log_integration: bool,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub updater_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_epoch_millis: Option<i64>,
    #[serde(default, skip_serializing)]
    pub updated_epoch_millis: Option<i64>,
}

impl WavefrontApiResource for ExternalLink {
    fn api_path() -> &'static str {
        "/api/v2/extlink"
    }

    fn search_entity() -> &'static str {
        "extlink"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["metricFilterRegex", "sourceFilterRegex", "pointTagFilterRegexes"]
    }
}

impl Client {
    pub fn external_links(&self) -> EntityApi<'_, ExternalLink> {
        self.entity()
    }
}
