//! Event API

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub is_ephemeral: bool,
    #[serde(default, skip_serializing)]
    pub running_state: Option<String>,
}

impl WavefrontApiResource for Event {
    fn api_path() -> &'static str {
        "/api/v2/event"
    }

    fn search_entity() -> &'static str {
        "event"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &["tags", "hosts"]
    }
}

impl EntityApi<'_, Event> {
    /// POST /api/v2/event/{id}/close
    pub async fn close(&self, id: &str) -> Result<Event, ApiError> {
        self.client()
            .post(&format!("{}/close", Event::resource_path(id)), &serde_json::json!({}))
            .await
    }
}

impl Client {
    pub fn events(&self) -> EntityApi<'_, Event> {
        self.entity()
    }
}
