//! Maintenance window API

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
    pub title: String,
    pub start_time_in_seconds: i64,
    pub end_time_in_seconds: i64,
    #[serde(default)]
    pub relevant_customer_tags: Vec<String>,
    #[serde(default)]
    pub relevant_host_tags: Vec<String>,
    #[serde(default)]
    pub relevant_host_names: Vec<String>,
    #[serde(default)]
    pub relevant_host_tags_anded: bool,
    #[serde(default)]
    pub host_tag_group_host_names_group_anded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub running_state: Option<String>,
    #[serde(default, skip_serializing)]
    pub sort_attr: Option<i64>,
    #[serde(default, skip_serializing)]
    pub creator_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub updater_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_epoch_millis: Option<i64>,
    #[serde(default, skip_serializing)]
    pub updated_epoch_millis: Option<i64>,
}

impl WavefrontApiResource for MaintenanceWindow {
    fn api_path() -> &'static str {
        "/api/v2/maintenancewindow"
    }

    fn search_entity() -> &'static str {
        "maintenancewindow"
    }
}

impl Client {
    pub fn maintenance_windows(&self) -> EntityApi<'_, MaintenanceWindow> {
        self.entity()
    }
}
