//! Maintenance window resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::maintenance_window::MaintenanceWindow;
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

pub fn maintenance_window_from_attrs(attrs: &Attrs<'_>) -> Result<MaintenanceWindow, ModelError> {
    let window = MaintenanceWindow {
        id: attrs.string("id")?,
        reason: attrs.required_string("reason")?,
        title: attrs.required_string("title")?,
        start_time_in_seconds: attrs.required_i64("start_time_in_seconds")?,
        end_time_in_seconds: attrs.required_i64("end_time_in_seconds")?,
        relevant_customer_tags: attrs.strings("relevant_customer_tags")?,
        relevant_host_tags: attrs.strings("relevant_host_tags")?,
        relevant_host_names: attrs.strings("relevant_host_names")?,
        relevant_host_tags_anded: attrs.bool_or("relevant_host_tags_anded", false)?,
        host_tag_group_host_names_group_anded: attrs
            .bool_or("host_tag_group_host_names_group_anded", false)?,
        event_name: attrs.string("event_name")?.filter(|s| !s.is_empty()),
        ..Default::default()
    };

    if window.end_time_in_seconds <= window.start_time_in_seconds {
        return Err(ModelError::invalid(
            "end_time_in_seconds",
            format!(
                "end time {} must be after start time {}",
                window.end_time_in_seconds, window.start_time_in_seconds
            ),
        ));
    }
    if window.relevant_customer_tags.is_empty()
        && window.relevant_host_tags.is_empty()
        && window.relevant_host_names.is_empty()
    {
        return Err(ModelError::invalid(
            "relevant_customer_tags",
            "at least one of relevant_customer_tags, relevant_host_tags or relevant_host_names must be set",
        ));
    }

    Ok(window)
}

pub(crate) fn maintenance_window_attributes(window: &MaintenanceWindow) -> StateBuilder {
    StateBuilder::new()
        .set("id", window.id.clone())
        .set("reason", window.reason.as_str())
        .set("title", window.title.as_str())
        .set("start_time_in_seconds", window.start_time_in_seconds)
        .set("end_time_in_seconds", window.end_time_in_seconds)
        .optional_strings("relevant_customer_tags", &window.relevant_customer_tags)
        .optional_strings("relevant_host_tags", &window.relevant_host_tags)
        .optional_strings("relevant_host_names", &window.relevant_host_names)
        .set("relevant_host_tags_anded", window.relevant_host_tags_anded)
        .set(
            "host_tag_group_host_names_group_anded",
            window.host_tag_group_host_names_group_anded,
        )
        .set("event_name", window.event_name.clone())
}

pub fn maintenance_window_to_state(window: &MaintenanceWindow) -> DynamicValue {
    maintenance_window_attributes(window).build()
}

#[derive(Default)]
pub struct MaintenanceWindowResource {
    provider_data: Option<WavefrontProviderData>,
}

impl MaintenanceWindowResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<MaintenanceWindow, Diagnostic> {
        maintenance_window_from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid maintenance window configuration"))
    }

    async fn read_window(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let window = found(
            data.client.maintenance_windows().get(id).await,
            "Failed to read maintenance window",
        )?;
        Ok(window.as_ref().map(maintenance_window_to_state))
    }

    async fn create_window(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let window = Self::parse(planned)?;

        let created = data
            .client
            .maintenance_windows()
            .create(&window)
            .await
            .map_err(|e| api_error("Failed to create maintenance window", e))?;
        tracing::info!("created maintenance window {:?}", created.id);
        Ok(maintenance_window_to_state(&created))
    }

    async fn update_window(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut window = Self::parse(planned)?;
        window.id = Some(id.clone());

        let updated = data
            .client
            .maintenance_windows()
            .update_overlay(&id, &window)
            .await
            .map_err(|e| api_error("Failed to update maintenance window", e))?;
        Ok(maintenance_window_to_state(&updated))
    }

    async fn delete_window(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.maintenance_windows().delete(&id).await,
            "Failed to delete maintenance window",
        )
    }
}

#[async_trait]
impl Resource for MaintenanceWindowResource {
    fn type_name(&self) -> &str {
        "wavefront_maintenance_window"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let strings = || AttributeType::set_of(AttributeType::String);
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront maintenance window")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("reason", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("title", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("start_time_in_seconds", AttributeType::Number)
                    .description("Start of the window in epoch seconds")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("end_time_in_seconds", AttributeType::Number)
                    .description("End of the window in epoch seconds")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("relevant_customer_tags", strings())
                    .description("Alert tags silenced by the window")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("relevant_host_tags", strings())
                    .description("Source tags silenced by the window")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("relevant_host_names", strings())
                    .description("Source names silenced by the window")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("relevant_host_tags_anded", AttributeType::Bool)
                    .description("Whether a source must carry every relevant source tag")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "host_tag_group_host_names_group_anded",
                    AttributeType::Bool,
                )
                .description("Whether a source must match both the tags and the names")
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .build(),
            )
            .attribute(
                AttributeBuilder::new("event_name", AttributeType::String)
                    .description("Name of the event created while the window runs")
                    .optional()
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_window(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_window(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_window(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_window(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for MaintenanceWindowResource {
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
