//! Common types shared by the Wavefront API modules

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Number of entities requested per search page
pub const PAGE_SIZE: usize = 100;

/// Every Wavefront response is wrapped as `{"status": ..., "response": ...}`
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: Option<ResponseStatus>,
    pub response: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseStatus {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub status: Option<ResponseStatus>,
    pub message: Option<String>,
}

/// An entity kind served under `/api/v2/<path>` and searchable through
/// `/api/v2/search/<entity>`
pub trait WavefrontApiResource: Serialize + DeserializeOwned + Send + Sync {
    fn api_path() -> &'static str;

    fn search_entity() -> &'static str;

    fn resource_path(id: &str) -> String {
        format!("{}/{}", Self::api_path(), urlencoding::encode(id))
    }

    fn delete_path(id: &str) -> String {
        Self::resource_path(id)
    }

    /// Optional fields that encode as absent when unset. An overlay update
    /// clears these on the server instead of keeping the stored value.
    fn clearable_fields() -> &'static [&'static str] {
        &[]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchCondition {
    pub key: String,
    pub value: String,
    pub matching_method: String,
}

impl SearchCondition {
    pub fn exact(key: &str, value: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
            matching_method: "EXACT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub earliest_start_time_epoch_millis: i64,
    pub latest_start_time_epoch_millis: i64,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub limit: usize,
    pub offset: usize,
    pub query: Vec<SearchCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

impl SearchRequest {
    /// One page of a "find all" search.
    ///
    /// The page bounds are also sent as `limit` / `offset` conditions whose
    /// value is the code point numbered by the bound. The numeric `limit` /
    /// `offset` fields carry the real bounds.
    pub fn page(offset: usize, limit: usize) -> Self {
        Self {
            limit,
            offset,
            query: vec![
                SearchCondition::exact("limit", code_point(limit)),
                SearchCondition::exact("offset", code_point(offset)),
            ],
            time_range: None,
        }
    }

    pub fn with_time_range(mut self, time_range: Option<TimeRange>) -> Self {
        self.time_range = time_range;
        self
    }
}

/// The single character whose code point is `n`, or U+FFFD past the valid range
pub fn code_point(n: usize) -> String {
    u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
        .to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub more_items: Option<bool>,
}

/// `{"customerTags": [...]}` as attached to alerts, dashboards and derived metrics
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WFTags {
    #[serde(default)]
    pub customer_tags: Vec<String>,
}

impl WFTags {
    pub fn new(tags: Vec<String>) -> Option<Self> {
        if tags.is_empty() {
            None
        } else {
            Some(Self {
                customer_tags: tags,
            })
        }
    }
}

/// View and modify access lists as returned on an entity
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlList {
    #[serde(default)]
    pub can_view: Vec<String>,
    #[serde(default)]
    pub can_modify: Vec<String>,
}

/// Body element of `POST /api/v2/<entity>/acl/set`
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AclSetRequest {
    pub entity_id: String,
    pub view_acl: Vec<String>,
    pub modify_acl: Vec<String>,
}

/// Accepts a list of ids given either as strings or as objects carrying an `id`
pub fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdOrObject {
        Id(String),
        Object { id: String },
    }

    let items = Option::<Vec<IdOrObject>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items
        .into_iter()
        .map(|item| match item {
            IdOrObject::Id(id) => id,
            IdOrObject::Object { id } => id,
        })
        .collect())
}

/// Either a bare list or a paged `{"items": [...]}` object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListOrPage<T> {
    List(Vec<T>),
    Page(PagedResponse<T>),
}

impl<T> ListOrPage<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListOrPage::List(items) => items,
            ListOrPage::Page(page) => page.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_conditions_use_code_points() {
        let request = SearchRequest::page(0, PAGE_SIZE);
        assert_eq!(request.limit, 100);
        assert_eq!(request.offset, 0);
        assert_eq!(request.query[0].key, "limit");
        assert_eq!(request.query[0].value, "d");
        assert_eq!(request.query[1].value, "\u{0}");
        assert_eq!(request.query[1].matching_method, "EXACT");
    }

    #[test]
    fn code_point_replaces_surrogates() {
        assert_eq!(code_point(0xD800), "\u{FFFD}");
        assert_eq!(code_point(65), "A");
    }

    #[test]
    fn search_request_serializes_camel_case() {
        let request = SearchRequest::page(100, 100).with_time_range(Some(TimeRange {
            earliest_start_time_epoch_millis: 1,
            latest_start_time_epoch_millis: 2,
        }));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["offset"], 100);
        assert_eq!(json["query"][0]["matchingMethod"], "EXACT");
        assert_eq!(json["timeRange"]["latestStartTimeEpochMillis"], 2);
    }

    #[test]
    fn ids_accept_strings_and_objects() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_ids", default)]
            groups: Vec<String>,
        }

        let h: Holder = serde_json::from_str(r#"{"groups":["a",{"id":"b","name":"B"}]}"#).unwrap();
        assert_eq!(h.groups, vec!["a".to_string(), "b".to_string()]);
        let h: Holder = serde_json::from_str(r#"{"groups":null}"#).unwrap();
        assert!(h.groups.is_empty());
    }

    #[test]
    fn list_or_page_accepts_both_shapes() {
        let list: ListOrPage<String> = serde_json::from_str(r#"["a"]"#).unwrap();
        assert_eq!(list.into_items(), vec!["a".to_string()]);
        let page: ListOrPage<String> = serde_json::from_str(r#"{"items":["b"]}"#).unwrap();
        assert_eq!(page.into_items(), vec!["b".to_string()]);
    }

    #[test]
    fn empty_tags_are_omitted() {
        assert!(WFTags::new(vec![]).is_none());
        assert_eq!(
            WFTags::new(vec!["a".into()]).unwrap().customer_tags,
            vec!["a".to_string()]
        );
    }
}
