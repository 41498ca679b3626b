//! Role API

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use super::error::ApiError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing)]
    pub linked_accounts: Vec<LinkedEntity>,
    #[serde(default, skip_serializing)]
    pub linked_groups: Vec<LinkedEntity>,
    #[serde(default, skip_serializing)]
    pub linked_accounts_count: Option<i64>,
    #[serde(default, skip_serializing)]
    pub linked_groups_count: Option<i64>,
}

/// Account or group reference attached to a role
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkedEntity {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Role {
    /// Ids of every account and group the role is assigned to
    pub fn assignees(&self) -> Vec<String> {
        self.linked_accounts
            .iter()
            .chain(self.linked_groups.iter())
            .map(|e| e.id.clone())
            .collect()
    }
}

impl WavefrontApiResource for Role {
    fn api_path() -> &'static str {
        "/api/v2/role"
    }

    fn search_entity() -> &'static str {
        "role"
    }
}

impl EntityApi<'_, Role> {
    /// POST /api/v2/role/{id}/addAssignees
    pub async fn add_assignees(&self, id: &str, assignees: &[String]) -> Result<(), ApiError> {
        self.client()
            .post::<serde_json::Value, _>(
                &format!("{}/addAssignees", Role::resource_path(id)),
                assignees,
            )
            .await
            .map(|_| ())
    }

    /// POST /api/v2/role/{id}/removeAssignees
    pub async fn remove_assignees(&self, id: &str, assignees: &[String]) -> Result<(), ApiError> {
        self.client()
            .post::<serde_json::Value, _>(
                &format!("{}/removeAssignees", Role::resource_path(id)),
                assignees,
            )
            .await
            .map(|_| ())
    }
}

impl Client {
    pub fn roles(&self) -> EntityApi<'_, Role> {
        self.entity()
    }
}
