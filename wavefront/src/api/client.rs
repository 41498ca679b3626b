use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::common::{
    ApiErrorResponse, ApiResponse, PagedResponse, SearchRequest, TimeRange, WavefrontApiResource,
    PAGE_SIZE,
};
use super::error::ApiError;

/// Wavefront API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// Adds `https://` when the address carries no scheme and drops trailing slashes
pub fn normalize_address(address: &str) -> Result<String, ApiError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ApiError::InvalidAddress("address is empty".to_string()));
    }

    let with_scheme = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };

    let parsed = url::Url::parse(&with_scheme)
        .map_err(|e| ApiError::InvalidAddress(format!("{}: {}", address, e)))?;
    if parsed.host_str().is_none() {
        return Err(ApiError::InvalidAddress(format!("{}: missing host", address)));
    }

    Ok(with_scheme.trim_end_matches('/').to_string())
}

impl Client {
    /// Create a new API client
    pub fn new(address: &str, token: &str, http_proxy: Option<&str>) -> Result<Self, ApiError> {
        let base_url = normalize_address(address)?;

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("terraform-provider-wavefront/", env!("CARGO_PKG_VERSION")));

        if let Some(proxy) = http_proxy.filter(|p| !p.is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client: builder.build()?,
                base_url,
                auth_header: format!("Bearer {}", token),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("GET request to: {}", url);

        let response = self
            .inner
            .http_client
            .get(&url)
            .header(AUTHORIZATION, &self.inner.auth_header)
            .send()
            .await?;
        self.handle_response(response, path).await
    }

    /// Execute a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("POST request to: {}", url);

        let response = self
            .inner
            .http_client
            .post(&url)
            .header(AUTHORIZATION, &self.inner.auth_header)
            .json(body)
            .send()
            .await?;
        self.handle_response(response, path).await
    }

    /// Execute a PUT request
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("PUT request to: {}", url);

        let response = self
            .inner
            .http_client
            .put(&url)
            .header(AUTHORIZATION, &self.inner.auth_header)
            .json(body)
            .send()
            .await?;
        self.handle_response(response, path).await
    }

    /// Execute a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.inner.base_url, path);
        tracing::debug!("DELETE request to: {}", url);

        let response = self
            .inner
            .http_client
            .delete(&url)
            .header(AUTHORIZATION, &self.inner.auth_header)
            .send()
            .await?;
        self.handle_response(response, path).await
    }

    /// CRUD and search operations for one entity kind
    pub fn entity<T: WavefrontApiResource>(&self) -> EntityApi<'_, T> {
        EntityApi {
            client: self,
            _entity: PhantomData,
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return self.parse_success_response(response).await;
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(path.to_string()));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::AuthError);
        }

        self.handle_error_response(response).await
    }

    /// Parse successful response, unwrapping the `response` field when present
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let text = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };

        match serde_json::from_str::<ApiResponse<T>>(text) {
            Ok(wrapper) => Ok(wrapper.response),
            Err(_) => match serde_json::from_str::<T>(text) {
                Ok(data) => Ok(data),
                Err(e) => {
                    tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
                    Err(ApiError::ParseError(format!(
                        "Failed to parse response: {}",
                        e
                    )))
                }
            },
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<ApiErrorResponse>(&text)
            .ok()
            .and_then(|e| e.status.and_then(|s| s.message).or(e.message))
            .filter(|m| !m.is_empty())
            .unwrap_or(text);

        tracing::warn!(status, "API error response: {}", message);
        Err(ApiError::ApiError { status, message })
    }
}

/// Typed access to `/api/v2/<entity>` endpoints
pub struct EntityApi<'a, T> {
    client: &'a Client,
    _entity: PhantomData<T>,
}

impl<'a, T: WavefrontApiResource> EntityApi<'a, T> {
    pub fn client(&self) -> &'a Client {
        self.client
    }

    /// GET /api/v2/{entity}/{id}
    pub async fn get(&self, id: &str) -> Result<T, ApiError> {
        self.client.get(&T::resource_path(id)).await
    }

    /// POST /api/v2/{entity}
    pub async fn create(&self, entity: &T) -> Result<T, ApiError> {
        self.client.post(T::api_path(), entity).await
    }

    /// PUT /api/v2/{entity}/{id}
    pub async fn update(&self, id: &str, entity: &T) -> Result<T, ApiError> {
        self.client.put(&T::resource_path(id), entity).await
    }

    /// Fetches the current object, overlays the fields set in `entity` and
    /// writes the result back, so fields the model does not carry survive.
    /// Clearable fields missing from `entity` are written empty.
    pub async fn update_overlay(&self, id: &str, entity: &T) -> Result<T, ApiError> {
        let path = T::resource_path(id);
        let mut current: serde_json::Value = self.client.get(&path).await?;
        let changes = serde_json::to_value(entity)
            .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;

        if let (Some(current), serde_json::Value::Object(changes)) =
            (current.as_object_mut(), changes)
        {
            for field in T::clearable_fields() {
                if changes.contains_key(*field) {
                    continue;
                }
                if let Some(value) = current.get_mut(*field) {
                    *value = cleared(value);
                }
            }
            current.extend(changes);
        } else {
            current = serde_json::to_value(entity)
                .map_err(|e| ApiError::ParseError(format!("Failed to encode request: {}", e)))?;
        }

        self.client.put(&path, &current).await
    }

    /// DELETE /api/v2/{entity}/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete::<serde_json::Value>(&T::delete_path(id))
            .await
            .map(|_| ())
    }

    /// POST /api/v2/search/{entity}
    pub async fn search(&self, request: &SearchRequest) -> Result<PagedResponse<T>, ApiError> {
        self.client
            .post(&format!("/api/v2/search/{}", T::search_entity()), request)
            .await
    }

    /// Every entity of this kind, fetched page by page until a short page
    pub async fn find_all(&self) -> Result<Vec<T>, ApiError> {
        self.find_all_in(None).await
    }

    pub async fn find_all_in(&self, time_range: Option<TimeRange>) -> Result<Vec<T>, ApiError> {
        let mut all = Vec::new();
        let mut offset = 0;

        loop {
            let request = SearchRequest::page(offset, PAGE_SIZE).with_time_range(time_range.clone());
            let page = self.search(&request).await?;
            let count = page.items.len();
            all.extend(page.items);

            if count < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(all)
    }
}

/// The empty value of the same JSON shape
fn cleared(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(_) => serde_json::Value::Array(vec![]),
        serde_json::Value::Object(_) => serde_json::Value::Object(serde_json::Map::new()),
        _ => serde_json::Value::Null,
    }
}

/// Shared helpers for ACL capable entities
impl<T: WavefrontApiResource> EntityApi<'_, T> {
    /// POST /api/v2/{entity}/acl/set
    pub async fn set_acl(
        &self,
        id: &str,
        can_view: &[String],
        can_modify: &[String],
    ) -> Result<(), ApiError> {
        let body = vec![super::common::AclSetRequest {
            entity_id: id.to_string(),
            view_acl: can_view.to_vec(),
            modify_acl: can_modify.to_vec(),
        }];
        self.client
            .post::<serde_json::Value, _>(&format!("{}/acl/set", T::api_path()), &body)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Widget {
        #[serde(default)]
        id: Option<String>,
        name: String,
    }

    impl WavefrontApiResource for Widget {
        fn api_path() -> &'static str {
            "/api/v2/widget"
        }

        fn search_entity() -> &'static str {
            "widget"
        }
    }

    fn widgets(range: std::ops::Range<usize>) -> String {
        let items: Vec<String> = range
            .map(|i| format!(r#"{{"id":"{i}","name":"w{i}"}}"#))
            .collect();
        format!(
            r#"{{"status":{{"result":"OK","code":200}},"response":{{"items":[{}]}}}}"#,
            items.join(",")
        )
    }

    #[test]
    fn address_gets_https_scheme() {
        assert_eq!(
            normalize_address("example.wavefront.com/").unwrap(),
            "https://example.wavefront.com"
        );
        assert_eq!(
            normalize_address("http://localhost:8080").unwrap(),
            "http://localhost:8080"
        );
        assert!(normalize_address("").is_err());
    }

    #[tokio::test]
    async fn get_unwraps_response_and_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v2/widget/42")
            .match_header("authorization", "Bearer secret")
            .with_body(r#"{"status":{"result":"OK","code":200},"response":{"id":"42","name":"w"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        let widget = client.entity::<Widget>().get("42").await.unwrap();

        assert_eq!(widget.name, "w");
        assert_eq!(widget.id.as_deref(), Some("42"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_entity_is_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v2/widget/gone")
            .with_status(404)
            .with_body(r#"{"status":{"result":"ERROR","message":"not found","code":404}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        let err = client.entity::<Widget>().get("gone").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn error_message_is_taken_from_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/widget")
            .with_status(400)
            .with_body(r#"{"status":{"result":"ERROR","message":"name is required","code":400}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        let err = client
            .entity::<Widget>()
            .create(&Widget {
                id: None,
                name: String::new(),
            })
            .await
            .unwrap_err();

        match err {
            ApiError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "name is required");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn find_all_stops_after_short_page() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("POST", "/api/v2/search/widget")
            .match_body(Matcher::PartialJson(serde_json::json!({"offset": 0, "limit": 100})))
            .with_body(widgets(0..100))
            .create_async()
            .await;
        let second = server
            .mock("POST", "/api/v2/search/widget")
            .match_body(Matcher::PartialJson(serde_json::json!({"offset": 100})))
            .with_body(widgets(100..130))
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        let all = client.entity::<Widget>().find_all().await.unwrap();

        assert_eq!(all.len(), 130);
        assert_eq!(all[129].name, "w129");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn update_overlay_keeps_server_fields() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/widget/7")
            .with_body(r#"{"response":{"id":"7","name":"old","creatorId":"someone"}}"#)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/v2/widget/7")
            .match_body(Matcher::Json(serde_json::json!({
                "id": "7", "name": "new", "creatorId": "someone"
            })))
            .with_body(r#"{"response":{"id":"7","name":"new"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        let updated = client
            .entity::<Widget>()
            .update_overlay(
                "7",
                &Widget {
                    id: Some("7".to_string()),
                    name: "new".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "new");
        put.assert_async().await;
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Gadget {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        labels: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        owner: Option<String>,
    }

    impl WavefrontApiResource for Gadget {
        fn api_path() -> &'static str {
            "/api/v2/gadget"
        }

        fn search_entity() -> &'static str {
            "gadget"
        }

        fn clearable_fields() -> &'static [&'static str] {
            &["labels", "note", "settings"]
        }
    }

    #[tokio::test]
    async fn update_overlay_clears_fields_left_unset() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/gadget/g")
            .with_body(
                r#"{"response":{"name":"old","labels":["a"],"note":"n","owner":"o","settings":{"x":1}}}"#,
            )
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/v2/gadget/g")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "new", "labels": [], "note": null, "owner": "o", "settings": {}
            })))
            .with_body(r#"{"response":{"name":"new"}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        client
            .entity::<Gadget>()
            .update_overlay(
                "g",
                &Gadget {
                    name: "new".to_string(),
                    labels: vec![],
                    note: None,
                    owner: None,
                },
            )
            .await
            .unwrap();

        put.assert_async().await;
    }

    #[tokio::test]
    async fn acl_set_posts_entity_lists() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/widget/acl/set")
            .match_body(Matcher::Json(serde_json::json!([
                {"entityId": "7", "viewAcl": ["a"], "modifyAcl": ["b"]}
            ])))
            .with_body(r#"{"status":{"result":"OK","code":200}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", None).unwrap();
        client
            .entity::<Widget>()
            .set_acl("7", &["a".to_string()], &["b".to_string()])
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
