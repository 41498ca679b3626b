//! External link resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::external_link::ExternalLink;
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

pub fn external_link_from_attrs(attrs: &Attrs<'_>) -> Result<ExternalLink, ModelError> {
    Ok(ExternalLink {
        id: attrs.string("id")?,
        name: attrs.required_string("name")?,
        description: attrs.required_string("description")?,
        template: attrs.required_string("template")?,
        metric_filter_regex: attrs.string("metric_filter_regex")?,
        source_filter_regex: attrs.string("source_filter_regex")?,
        point_tag_filter_regexes: attrs.string_map("point_tag_filter_regexes")?,
        is_log_integration: attrs.bool_or("is_log_integration", false)?,
        ..Default::default()
    })
}

pub(crate) fn external_link_attributes(link: &ExternalLink) -> StateBuilder {
    StateBuilder::new()
        .set("id", link.id.clone())
        .set("name", link.name.as_str())
        .set("description", link.description.as_str())
        .set("template", link.template.as_str())
        .non_empty(
            "metric_filter_regex",
            link.metric_filter_regex.as_deref().unwrap_or_default(),
        )
        .non_empty(
            "source_filter_regex",
            link.source_filter_regex.as_deref().unwrap_or_default(),
        )
        .optional_map("point_tag_filter_regexes", &link.point_tag_filter_regexes)
        .set("is_log_integration", link.is_log_integration)
}

pub fn external_link_to_state(link: &ExternalLink) -> DynamicValue {
    external_link_attributes(link).build()
}

#[derive(Default)]
pub struct ExternalLinkResource {
    provider_data: Option<WavefrontProviderData>,
}

impl ExternalLinkResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<ExternalLink, Diagnostic> {
        external_link_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid external link configuration"))
    }

    async fn read_link(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let link = found(
            data.client.external_links().get(id).await,
            "Failed to read external link",
        )?;
        Ok(link.as_ref().map(external_link_to_state))
    }

    async fn create_link(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let link = Self::parse(planned)?;

        let created = data
            .client
            .external_links()
            .create(&link)
            .await
            .map_err(|e| api_error("Failed to create external link", e))?;
        tracing::info!("created external link {:?}", created.id);
        Ok(external_link_to_state(&created))
    }

    async fn update_link(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut link = Self::parse(planned)?;
        link.id = Some(id.clone());

        let updated = data
            .client
            .external_links()
            .update_overlay(&id, &link)
            .await
            .map_err(|e| api_error("Failed to update external link", e))?;
        Ok(external_link_to_state(&updated))
    }

    async fn delete_link(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.external_links().delete(&id).await,
            "Failed to delete external link",
        )
    }
}

#[async_trait]
impl Resource for ExternalLinkResource {
    fn type_name(&self) -> &str {
        "wavefront_external_link"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront external link")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("template", AttributeType::String)
                    .description("Mustache template of the link target")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("metric_filter_regex", AttributeType::String)
                    .description("Show the link only for metrics matching this regex")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("source_filter_regex", AttributeType::String)
                    .description("Show the link only for sources matching this regex")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "point_tag_filter_regexes",
                    AttributeType::map_of(AttributeType::String),
                )
                .description("Show the link only for point tags matching these regexes")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("is_log_integration", AttributeType::Bool)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_link(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_link(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_link(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_link(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for ExternalLinkResource {
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
    use std::collections::HashMap;

    #[test]
    fn filters_survive_flatten() {
        let link = ExternalLink {
            id: Some("el-1".to_string()),
            name: "logs".to_string(),
            description: "open logs".to_string(),
            template: "https://logs.example.com/?host={{source}}".to_string(),
            source_filter_regex: Some("web-.*".to_string()),
            point_tag_filter_regexes: HashMap::from([("env".to_string(), "prod".to_string())]),
            ..Default::default()
        };

        let state = external_link_to_state(&link);
        let parsed = external_link_from_attrs(&Attrs::new(&state)).unwrap();
        assert_eq!(parsed.source_filter_regex.as_deref(), Some("web-.*"));
        assert_eq!(parsed.metric_filter_regex, None);
        assert_eq!(parsed.point_tag_filter_regexes["env"], "prod");
    }

    #[tokio::test]
    async fn read_refreshes_from_api() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/extlink/el-1")
            .with_body(ok_body(serde_json::json!({
                "id": "el-1", "name": "logs", "description": "changed",
                "template": "https://logs.example.com"
            })))
            .create_async()
            .await;

        let mut resource = ExternalLinkResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "wavefront_external_link".to_string(),
                    current_state: StateBuilder::new()
                        .set("id", "el-1")
                        .set("description", "old")
                        .build(),
                    private: vec![],
                },
            )
            .await;

        let state = response.new_state.unwrap();
        assert_eq!(state.attr("description").as_str(), Some("changed"));
        assert_eq!(state.attr("is_log_integration").as_bool(), Some(false));
    }
}
