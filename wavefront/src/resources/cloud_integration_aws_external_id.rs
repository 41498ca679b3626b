//! AWS external id resource
//!
//! An external id is generated by Wavefront and used in the trust policy of
//! the IAM role an AWS integration assumes. It has no configurable fields.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::model::StateBuilder;
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

fn external_id_state(id: &str) -> DynamicValue {
    StateBuilder::new().set("id", id).build()
}

#[derive(Default)]
pub struct AwsExternalIdResource {
    provider_data: Option<WavefrontProviderData>,
}

impl AwsExternalIdResource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn create_external_id(&self) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = data
            .client
            .cloud_integrations()
            .create_aws_external_id()
            .await
            .map_err(|e| api_error("Failed to create AWS external id", e))?;
        if id.is_empty() {
            return Err(Diagnostic::error(
                "Failed to create AWS external id",
                "The API returned an empty external id",
            ));
        }
        tracing::info!("created AWS external id {}", id);
        Ok(external_id_state(&id))
    }

    async fn read_external_id(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let current = found(
            data.client.cloud_integrations().get_aws_external_id(id).await,
            "Failed to read AWS external id",
        )?;
        Ok(current.map(|id| external_id_state(&id)))
    }

    async fn delete_external_id(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.cloud_integrations().delete_aws_external_id(&id).await,
            "Failed to delete AWS external id",
        )
    }
}

#[async_trait]
impl Resource for AwsExternalIdResource {
    fn type_name(&self) -> &str {
        "wavefront_cloud_integration_aws_external_id"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Generates an external id for AWS cloud integrations")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The external id")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, _request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_external_id().await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_external_id(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    /// Nothing is configurable, the planned state is the prior state
    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        update_response(Ok(request.planned_state), request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_external_id(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for AwsExternalIdResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        self.provider_data = WavefrontProviderData::from_any(request.provider_data, &mut diagnostics);
        ConfigureResourceResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{configure_request, ok_body};
    use mockito::Server;
    use tfplug::types::Dynamic;

    #[tokio::test]
    async fn create_stores_generated_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/cloudintegration/awsExternalId")
            .with_body(ok_body(serde_json::json!("5e0f1c2a")))
            .create_async()
            .await;

        let mut resource = AwsExternalIdResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let planned = StateBuilder::new().set("id", Dynamic::Unknown).build();
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "wavefront_cloud_integration_aws_external_id".to_string(),
                    planned_state: planned.clone(),
                    config: planned,
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("id").as_str(), Some("5e0f1c2a"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn deleting_missing_id_succeeds() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v2/cloudintegration/awsExternalId/gone")
            .with_status(404)
            .create_async()
            .await;

        let mut resource = AwsExternalIdResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "wavefront_cloud_integration_aws_external_id".to_string(),
                    prior_state: external_id_state("gone"),
                    planned_private: vec![],
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
    }
}
