//! Alert API

use super::client::{Client, EntityApi};
use super::common::{AccessControlList, WavefrontApiResource, WFTags};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub conditions: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_expression: Option<String>,
    #[serde(default)]
    pub minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_after_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_resend_frequency_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity_list: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub targets: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<WFTags>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_rate_minutes: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing_host_label_pairs: Vec<SourceLabelPair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runbook_links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alert_triage_dashboards: Vec<AlertTriageDashboard>,
    #[serde(default, skip_serializing)]
    pub acl: Option<AccessControlList>,
    #[serde(default, skip_serializing)]
    pub status: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceLabelPair {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub firing: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertTriageDashboard {
    pub dashboard_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: HashMap<String, HashMap<String, String>>,
}

impl WavefrontApiResource for Alert {
    fn api_path() -> &'static str {
        "/api/v2/alert"
    }

    fn search_entity() -> &'static str {
        "alert"
    }

    fn clearable_fields() -> &'static [&'static str] {
        &[
            "target",
            "conditions",
            "targets",
            "displayExpression",
            "additionalInformation",
            "tags",
            "runbookLinks",
        ]
    }
}

impl Alert {
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .map(|t| t.customer_tags.clone())
            .unwrap_or_default()
    }
}

impl Client {
    pub fn alerts(&self) -> EntityApi<'_, Alert> {
        self.entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_alert_serializes_targets_and_conditions() {
        let alert = Alert {
            name: "cpu".to_string(),
            alert_type: Some("THRESHOLD".to_string()),
            conditions: HashMap::from([("severe".to_string(), "ts(cpu) > 90".to_string())]),
            targets: HashMap::from([("severe".to_string(), "target:abc".to_string())]),
            minutes: 5,
            ..Default::default()
        };

        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["alertType"], "THRESHOLD");
        assert_eq!(json["conditions"]["severe"], "ts(cpu) > 90");
        assert_eq!(json["targets"]["severe"], "target:abc");
        assert!(json.get("acl").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn alert_deserializes_acl_and_tags() {
        let alert: Alert = serde_json::from_str(
            r#"{"id":"1","name":"a","minutes":2,"severity":"WARN",
                "tags":{"customerTags":["x"]},
                "acl":{"canView":["v"],"canModify":["m"]}}"#,
        )
        .unwrap();

        assert_eq!(alert.tags(), vec!["x".to_string()]);
        assert_eq!(alert.acl.unwrap().can_modify, vec!["m".to_string()]);
    }
}
