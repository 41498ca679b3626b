//! User group API

use super::client::{Client, EntityApi};
use super::common::{SearchCondition, SearchRequest, WavefrontApiResource};
use super::error::ApiError;
use serde::{Deserialize, Serialize};

/// Name of the group every account belongs to
pub const EVERYONE_GROUP: &str = "Everyone";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing)]
    pub users: Vec<String>,
    #[serde(default, skip_serializing)]
    pub roles: Vec<GroupRole>,
    #[serde(default, skip_serializing)]
    pub user_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupRole {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl WavefrontApiResource for UserGroup {
    fn api_path() -> &'static str {
        "/api/v2/usergroup"
    }

    fn search_entity() -> &'static str {
        "usergroup"
    }
}

impl EntityApi<'_, UserGroup> {
    /// The built-in "Everyone" group
    pub async fn everyone(&self) -> Result<UserGroup, ApiError> {
        let request = SearchRequest {
            limit: 1,
            offset: 0,
            query: vec![SearchCondition::exact("name", EVERYONE_GROUP)],
            time_range: None,
        };

        self.search(&request)
            .await?
            .items
            .into_iter()
            .find(|g| g.name == EVERYONE_GROUP)
            .ok_or_else(|| ApiError::NotFound(format!("user group {}", EVERYONE_GROUP)))
    }
}

impl Client {
    pub fn user_groups(&self) -> EntityApi<'_, UserGroup> {
        self.entity()
    }
}
