//! Dashboard API

use super::client::{Client, EntityApi};
use super::common::{AccessControlList, WavefrontApiResource, WFTags};
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dashboards are addressed by their url
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    #[serde(rename = "url")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameter_details: HashMap<String, ParameterDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<WFTags>,
    #[serde(default)]
    pub display_section_table_of_contents: bool,
    #[serde(default)]
    pub display_query_parameters: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_filter_type: Option<String>,
    #[serde(default, skip_serializing)]
    pub acl: Option<AccessControlList>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    #[serde(default)]
    pub charts: Vec<Chart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarization: Option<String>,
    #[serde(default)]
    pub chart_settings: ChartSettings,
    #[serde(default)]
    pub base: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartSettings {
    #[serde(rename = "type", default)]
    pub chart_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scatter_plot_source: Option<String>,
    #[serde(default)]
    pub querybuilder_enabled: bool,
    #[serde(default)]
    pub source_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDetail {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub hide_from_view: bool,
    #[serde(default)]
    pub parameter_type: String,
    #[serde(default)]
    pub values_to_readable_strings: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_field_type: Option<String>,
}

impl Dashboard {
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .map(|t| t.customer_tags.clone())
            .unwrap_or_default()
    }
}

impl WavefrontApiResource for Dashboard {
    fn api_path() -> &'static str {
        "/api/v2/dashboard"
    }

    fn search_entity() -> &'static str {
        "dashboard"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["parameterDetails", "tags"]
    }
}

impl Client {
    pub fn dashboards(&self) -> EntityApi<'_, Dashboard> {
        self.entity()
    }

    /// GET /api/v2/dashboard/{id} as raw JSON
    pub async fn get_dashboard_json(&self, id: &str) -> Result<serde_json::Value, ApiError> {
        self.get(&Dashboard::resource_path(id)).await
    }

    /// POST /api/v2/dashboard with a raw JSON document
    pub async fn create_dashboard_json(
        &self,
        dashboard: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.post(Dashboard::api_path(), dashboard).await
    }

    /// PUT /api/v2/dashboard/{id} with a raw JSON document
    pub async fn update_dashboard_json(
        &self,
        id: &str,
        dashboard: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.put(&Dashboard::resource_path(id), dashboard).await
    }
}
