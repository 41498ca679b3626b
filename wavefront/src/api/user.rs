//! User account API

use super::client::{Client, EntityApi};
use super::common::{deserialize_ids, ListOrPage, WavefrontApiResource};
use super::error::ApiError;
use serde::{Deserialize, Serialize};

/// Users are addressed by their email address
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "id")]
    pub identifier: String,
    /// Account permissions
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids")]
    pub user_groups: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_ids", skip_serializing)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing)]
    pub customer: Option<String>,
    #[serde(default, skip_serializing)]
    pub last_successful_login: Option<i64>,
}

/// Body of `POST /api/v2/account/user`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserToCreate {
    pub email_address: String,
    pub groups: Vec<String>,
    pub user_groups: Vec<String>,
}

impl WavefrontApiResource for User {
    fn api_path() -> &'static str {
        "/api/v2/account/user"
    }

    fn search_entity() -> &'static str {
        "account/user"
    }
}

impl EntityApi<'_, User> {
    /// POST /api/v2/account/user?sendEmail={send_email}
    pub async fn invite(&self, user: &UserToCreate, send_email: bool) -> Result<User, ApiError> {
        self.client()
            .post(
                &format!("{}?sendEmail={}", User::api_path(), send_email),
                user,
            )
            .await
    }

    /// GET /api/v2/account/user
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        self.client()
            .get::<ListOrPage<User>>(User::api_path())
            .await
            .map(ListOrPage::into_items)
    }
}

impl Client {
    pub fn users(&self) -> EntityApi<'_, User> {
        self.entity()
    }
}
