//! Alert target (notificant) API

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub template: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub is_html_content: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_http_headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<AlertRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRoute {
    pub method: String,
    pub target: String,
    /// `"<key> <value>"` as the API expects it
    #[serde(default)]
    pub filter: String,
}

impl AlertTarget {
    /// Reference usable in an alert's `target` attribute
    pub fn target_reference(&self) -> Option<String> {
        self.id.as_ref().map(|id| format!("target:{}", id))
    }
}

impl WavefrontApiResource for AlertTarget {
    fn api_path() -> &'static str {
        "/api/v2/notificant"
    }

    fn search_entity() -> &'static str {
        "notificant"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["emailSubject", "contentType", "customHttpHeaders", "routes"]
    }
}

impl Client {
    pub fn alert_targets(&self) -> EntityApi<'_, AlertTarget> {
        self.entity()
    }
}
