//! CSP API token exchange
//!
//! VMware Cloud Services issues short lived bearer tokens for long lived API
//! tokens. Tokens that are already access tokens are passed through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CSP_ADDRESS: &str = "console.cloud.vmware.com";

/// Length of a token that needs no exchange
pub const NON_REFRESH_TOKEN_LEN: usize = 64;

const AUTHORIZE_PATH: &str = "/api/v2//am/api/auth/api-tokens/authorize";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct CspAuthorizeResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Error payload CSP returns on every non 200 status
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CspErrorPayload {
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub module_code: Option<i64>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub csp_error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl std::fmt::Display for CspErrorPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message.as_deref().unwrap_or("no message"))?;
        if let Some(code) = &self.csp_error_code {
            write!(f, " (code {})", code)?;
        }
        if let Some(trace) = &self.trace_id {
            write!(f, " [trace {}]", trace)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CspError {
    #[error("CSP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("CSP rejected the token request (HTTP 400): {0}")]
    BadRequest(CspErrorPayload),

    #[error("CSP token endpoint not found (HTTP 404): {0}")]
    NotFound(CspErrorPayload),

    #[error("CSP reported a conflict (HTTP 409): {0}")]
    Conflict(CspErrorPayload),

    #[error("CSP rate limit exceeded (HTTP 429): {0}")]
    TooManyRequests(CspErrorPayload),

    #[error("CSP internal error (HTTP 500): {0}")]
    InternalServerError(CspErrorPayload),

    #[error("unexpected CSP response status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("failed to parse CSP response: {0}")]
    ParseError(String),

    #[error("CSP returned token type '{0}', expected bearer")]
    InvalidTokenType(String),

    #[error("CSP returned an empty access token")]
    EmptyAccessToken,
}

impl CspError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CspError::BadRequest(_) => Some(400),
            CspError::NotFound(_) => Some(404),
            CspError::Conflict(_) => Some(409),
            CspError::TooManyRequests(_) => Some(429),
            CspError::InternalServerError(_) => Some(500),
            CspError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    api_token: &'a str,
}

fn authorize_url(csp_address: &str) -> String {
    let address = csp_address.trim().trim_end_matches('/');
    if address.contains("://") {
        format!("{}{}", address, AUTHORIZE_PATH)
    } else {
        format!("https://{}{}", address, AUTHORIZE_PATH)
    }
}

/// Exchanges a CSP API token for an access token.
///
/// Returns an empty string without any request when the token already has
/// the length of an access token.
pub async fn exchange_api_token(csp_address: &str, api_token: &str) -> Result<String, CspError> {
    if api_token.len() == NON_REFRESH_TOKEN_LEN {
        tracing::debug!("CSP token has access token length, skipping exchange");
        return Ok(String::new());
    }

    let url = authorize_url(csp_address);
    tracing::debug!("POST request to: {}", url);

    let response = reqwest::Client::new()
        .post(&url)
        .json(&AuthorizeRequest { api_token })
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = response.text().await?;

    let payload = || -> Result<CspErrorPayload, CspError> {
        serde_json::from_str(&body).map_err(|e| CspError::ParseError(e.to_string()))
    };

    let authorized: CspAuthorizeResponse = match status {
        200 => serde_json::from_str(&body).map_err(|e| CspError::ParseError(e.to_string()))?,
        400 => return Err(CspError::BadRequest(payload()?)),
        404 => return Err(CspError::NotFound(payload()?)),
        409 => return Err(CspError::Conflict(payload()?)),
        429 => return Err(CspError::TooManyRequests(payload()?)),
        500 => return Err(CspError::InternalServerError(payload()?)),
        _ => return Err(CspError::UnexpectedStatus { status, body }),
    };

    if !authorized.token_type.eq_ignore_ascii_case("bearer") {
        return Err(CspError::InvalidTokenType(authorized.token_type));
    }
    if authorized.access_token.is_empty() {
        return Err(CspError::EmptyAccessToken);
    }

    tracing::info!("exchanged CSP API token for an access token");
    Ok(authorized.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn access_length_token_skips_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let token = "a".repeat(NON_REFRESH_TOKEN_LEN);
        let result = exchange_api_token(&server.url(), &token).await.unwrap();

        assert_eq!(result, "");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn bearer_token_is_returned() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", AUTHORIZE_PATH)
            .match_body(Matcher::Json(serde_json::json!({"api_token": "refresh"})))
            .with_body(
                r#"{"token_type":"Bearer","access_token":"access-1","expires_in":1799,
                    "scope":"openid","id_token":"id","refresh_token":"refresh"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let result = exchange_api_token(&server.url(), "refresh").await.unwrap();

        assert_eq!(result, "access-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn status_codes_map_to_variants() {
        for (status, expected) in [(400, 400), (404, 404), (409, 409), (429, 429), (500, 500)] {
            let mut server = Server::new_async().await;
            let _mock = server
                .mock("POST", AUTHORIZE_PATH)
                .with_status(status)
                .with_body(r#"{"statusCode":1,"message":"nope","cspErrorCode":"x"}"#)
                .create_async()
                .await;

            let err = exchange_api_token(&server.url(), "refresh").await.unwrap_err();
            assert_eq!(err.status(), Some(expected));
            assert!(err.to_string().contains("nope"));
        }
    }

    #[tokio::test]
    async fn unexpected_status_keeps_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", AUTHORIZE_PATH)
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = exchange_api_token(&server.url(), "refresh").await.unwrap_err();
        match err {
            CspError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_bearer_token_is_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", AUTHORIZE_PATH)
            .with_body(r#"{"token_type":"mac","access_token":"x"}"#)
            .create_async()
            .await;

        let err = exchange_api_token(&server.url(), "refresh").await.unwrap_err();
        assert!(matches!(err, CspError::InvalidTokenType(t) if t == "mac"));
    }

    #[tokio::test]
    async fn empty_access_token_is_rejected() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", AUTHORIZE_PATH)
            .with_body(r#"{"token_type":"bearer","access_token":""}"#)
            .create_async()
            .await;

        let err = exchange_api_token(&server.url(), "refresh").await.unwrap_err();
        assert!(matches!(err, CspError::EmptyAccessToken));
    }

    #[test]
    fn address_without_scheme_uses_https() {
        assert_eq!(
            authorize_url("console.cloud.vmware.com"),
            "https://console.cloud.vmware.com/api/v2//am/api/auth/api-tokens/authorize"
        );
    }
}
