//! Metrics policy data source

use super::{computed_attributes, data_source_response, resource_block, single_state};
use crate::resources::metrics_policy::metrics_policy_attributes;
use crate::resources::{api_error, configured, MetricsPolicyResource};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{Block, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct MetricsPolicyDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl MetricsPolicyDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_policy(&self) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let policy = data
            .client
            .get_metrics_policy()
            .await
            .map_err(|e| api_error("Failed to read metrics policy", e))?;
        let block = resource_block(MetricsPolicyResource::new()).await;
        Ok(single_state(&block, metrics_policy_attributes(&policy)))
    }
}

/// The policy is a singleton, so every attribute including `id` is computed
fn policy_schema(block: &Block) -> Schema {
    let mut builder = SchemaBuilder::new()
        .version(0)
        .description("Reads the metrics policy of the customer");
    for attribute in computed_attributes(block) {
        builder = builder.attribute(attribute);
    }
    builder.build()
}

#[async_trait]
impl DataSource for MetricsPolicyDataSource {
    fn type_name(&self) -> &str {
        "wavefront_metrics_policy"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(MetricsPolicyResource::new()).await;
        DataSourceSchemaResponse {
            schema: policy_schema(&block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_policy().await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for MetricsPolicyDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        self.provider_data = WavefrontProviderData::from_any(request.provider_data, &mut diagnostics);
        ConfigureDataSourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::test_support::configure_request;
    use crate::resources::test_support::ok_body;
    use mockito::Server;
    use serde_json::json;

    #[tokio::test]
    async fn schema_has_no_required_attributes() {
        let schema = MetricsPolicyDataSource::new()
            .schema(Context::new(), DataSourceSchemaRequest)
            .await
            .schema;
        assert!(schema.block.attributes.iter().all(|a| a.computed && !a.required));
        assert!(schema.block.attribute("policy_rules").is_some());
    }

    #[tokio::test]
    async fn policy_rules_are_flattened() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/metricspolicy")
            .with_body(ok_body(json!({
                "customer": "acme",
                "updaterId": "admin@example.com",
                "policyRules": [{
                    "name": "block secrets", "description": "internal",
                    "prefixes": ["secret.*"], "tagsAnded": false, "accessType": "BLOCK",
                    "accounts": [], "roles": [], "userGroups": [{"id": "g-1", "name": "Everyone"}]
                }]
            })))
            .create_async()
            .await;

        let mut source = MetricsPolicyDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_metrics_policy".to_string(),
                    config: DynamicValue::object(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("id").as_str(), Some("acme"));
        let rules = response.state.attr("policy_rules").as_list().unwrap();
        let rule = rules[0].as_map().unwrap();
        assert_eq!(rule["access_type"].as_str(), Some("BLOCK"));
        assert_eq!(rule["user_group_ids"].as_list().unwrap()[0].as_str(), Some("g-1"));
    }
}
