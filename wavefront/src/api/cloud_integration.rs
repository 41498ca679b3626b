//! Cloud integration API
//!
//! One wire struct carries every service; exactly one of the per-service
//! sub-objects is populated, selected by `service`.

use super::client::{Client, EntityApi};
use super::common::WavefrontApiResource;
use super::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudIntegration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub additional_tags: HashMap<String, String>,
    #[serde(default)]
    pub force_save: bool,
    #[serde(default)]
    pub service_refresh_rate_in_mins: i64,
    #[serde(default)]
    pub in_trash: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_watch: Option<CloudWatchConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_trail: Option<CloudTrailConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec2: Option<Ec2Configuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_billing: Option<GcpBillingConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_relic: Option<NewRelicConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_dynamics: Option<AppDynamicsConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tesla: Option<TeslaConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_activity_log: Option<AzureActivityLogConfiguration>,
    #[serde(default, skip_serializing)]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing)]
    pub last_received_data_point_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsBaseCredentials {
    pub role_arn: String,
    pub external_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureBaseCredentials {
    pub client_id: String,
    pub tenant: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudWatchConfiguration {
    pub base_credentials: AwsBaseCredentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_filter_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub instance_selection_tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub volume_selection_tags: HashMap<String, String>,
    #[serde(default)]
    pub point_tag_filter_regex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudTrailConfiguration {
    pub base_credentials: AwsBaseCredentials,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub bucket_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_rule: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ec2Configuration {
    pub base_credentials: AwsBaseCredentials,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_name_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GcpConfiguration {
    pub project_id: String,
    #[serde(default)]
    pub gcp_json_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_filter_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories_to_fetch: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GcpBillingConfiguration {
    pub project_id: String,
    #[serde(default)]
    pub gcp_api_key: String,
    #[serde(default)]
    pub gcp_json_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewRelicConfiguration {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_filter_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_filter_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_relic_metric_filters: Vec<NewRelicMetricFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewRelicMetricFilter {
    pub app_name: String,
    pub metric_filter_regex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppDynamicsConfiguration {
    pub user_name: String,
    pub controller_name: String,
    #[serde(default)]
    pub encrypted_password: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub app_filter_regex: Vec<String>,
    #[serde(default)]
    pub enable_app_infra_metrics: bool,
    #[serde(default)]
    pub enable_backend_metrics: bool,
    #[serde(default)]
    pub enable_business_trx_metrics: bool,
    #[serde(default)]
    pub enable_error_metrics: bool,
    #[serde(default)]
    pub enable_individual_node_metrics: bool,
    #[serde(default)]
    pub enable_overall_perf_metrics: bool,
    #[serde(default)]
    pub enable_rollup: bool,
    #[serde(default)]
    pub enable_service_endpoint_metrics: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TeslaConfiguration {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureConfiguration {
    pub base_credentials: AzureBaseCredentials,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_filter_regex: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_filter: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_group_filter: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AzureActivityLogConfiguration {
    pub base_credentials: AzureBaseCredentials,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_filter: Vec<String>,
}

impl WavefrontApiResource for CloudIntegration {
    fn api_path() -> &'static str {
        "/api/v2/cloudintegration"
    }

    fn search_entity() -> &'static str {
        "cloudintegration"
    }

    /// Integrations are removed for good instead of moved to the trash
    fn delete_path(id: &str) -> String {
        format!("{}?skipTrash=true", Self::resource_path(id))
    }
}

const AWS_EXTERNAL_ID_PATH: &str = "/api/v2/cloudintegration/awsExternalId";

impl EntityApi<'_, CloudIntegration> {
    /// POST /api/v2/cloudintegration/awsExternalId
    pub async fn create_aws_external_id(&self) -> Result<String, ApiError> {
        self.client()
            .post(AWS_EXTERNAL_ID_PATH, &serde_json::json!({}))
            .await
    }

    /// GET /api/v2/cloudintegration/awsExternalId/{id}
    pub async fn get_aws_external_id(&self, id: &str) -> Result<String, ApiError> {
        self.client()
            .get(&format!("{}/{}", AWS_EXTERNAL_ID_PATH, urlencoding::encode(id)))
            .await
    }

    /// DELETE /api/v2/cloudintegration/awsExternalId/{id}
    pub async fn delete_aws_external_id(&self, id: &str) -> Result<(), ApiError> {
        self.client()
            .delete::<serde_json::Value>(&format!(
                "{}/{}",
                AWS_EXTERNAL_ID_PATH,
                urlencoding::encode(id)
            ))
            .await
            .map(|_| ())
    }
}

impl Client {
    pub fn cloud_integrations(&self) -> EntityApi<'_, CloudIntegration> {
        self.entity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn delete_skips_trash() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v2/cloudintegration/abc")
            .match_query(Matcher::UrlEncoded("skipTrash".into(), "true".into()))
            .with_body(r#"{"status":{"result":"OK","code":200}}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "t", None).unwrap();
        client.cloud_integrations().delete("abc").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn external_id_is_returned_as_string() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v2/cloudintegration/awsExternalId")
            .with_body(r#"{"status":{"result":"OK","code":200},"response":"ext-123"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "t", None).unwrap();
        let id = client
            .cloud_integrations()
            .create_aws_external_id()
            .await
            .unwrap();
        assert_eq!(id, "ext-123");
    }

    #[test]
    fn only_the_configured_service_is_serialized() {
        let integration = CloudIntegration {
            name: "ec2".to_string(),
            service: "EC2".to_string(),
            ec2: Some(Ec2Configuration {
                base_credentials: AwsBaseCredentials {
                    role_arn: "arn:aws:iam::1:role/x".to_string(),
                    external_id: "ext".to_string(),
                },
                host_name_tags: vec![],
            }),
            ..Default::default()
        };

        let json = serde_json::to_value(&integration).unwrap();
        assert_eq!(json["ec2"]["baseCredentials"]["roleArn"], "arn:aws:iam::1:role/x");
        assert!(json.get("cloudWatch").is_none());
        assert!(json.get("gcp").is_none());
    }
}
