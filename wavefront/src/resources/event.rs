//! Event resource implementation
//!
//! An event without an end time stays ongoing. Ongoing events are closed
//! before they are deleted.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::event::Event;
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

pub const RUNNING_STATE_ONGOING: &str = "ONGOING";

pub fn event_from_attrs(attrs: &Attrs<'_>) -> Result<Event, ModelError> {
    let start_time = attrs
        .i64("start_time")?
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
    let end_time = attrs.i64("end_time")?;
    if let Some(end) = end_time {
        if end < start_time {
            return Err(ModelError::invalid(
                "end_time",
                format!("end_time {} is before start_time {}", end, start_time),
            ));
        }
    }

    Ok(Event {
        id: attrs.string("id")?,
        name: attrs.required_string("name")?,
        annotations: attrs.string_map("annotations")?,
        start_time,
        end_time,
        tags: attrs.strings("tags")?,
        hosts: attrs.strings("hosts")?,
        is_ephemeral: attrs.bool_or("is_ephemeral", false)?,
        running_state: None,
    })
}

pub(crate) fn event_attributes(event: &Event) -> StateBuilder {
    StateBuilder::new()
        .set("id", event.id.clone())
        .set("name", event.name.as_str())
        .string_map("annotations", &event.annotations)
        .set("start_time", event.start_time)
        .set("end_time", event.end_time)
        .optional_strings("tags", &event.tags)
        .optional_strings("hosts", &event.hosts)
        .set("is_ephemeral", event.is_ephemeral)
}

pub fn event_to_state(event: &Event) -> DynamicValue {
    event_attributes(event).build()
}

#[derive(Default)]
pub struct EventResource {
    provider_data: Option<WavefrontProviderData>,
}

impl EventResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<Event, Diagnostic> {
        event_from_attrs(&Attrs::new(state)).map_err(|e| e.to_diagnostic("Invalid event configuration"))
    }

    async fn read_event(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let event = found(data.client.events().get(id).await, "Failed to read event")?;
        Ok(event.as_ref().map(event_to_state))
    }

    async fn create_event(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let event = Self::parse(planned)?;

        let created = data
            .client
            .events()
            .create(&event)
            .await
            .map_err(|e| api_error("Failed to create event", e))?;
        let id = created.id.ok_or_else(|| {
            Diagnostic::error("Failed to create event", "The API response carried no id")
        })?;
        tracing::info!("created event {}", id);

        self.read_event(&id).await?.ok_or_else(|| {
            Diagnostic::error("Failed to create event", format!("Event {} disappeared", id))
        })
    }

    async fn update_event(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut event = Self::parse(planned)?;
        event.id = Some(id.clone());

        let updated = data
            .client
            .events()
            .update_overlay(&id, &event)
            .await
            .map_err(|e| api_error("Failed to update event", e))?;
        Ok(event_to_state(&updated))
    }

    async fn delete_event(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let events = data.client.events();

        let current = found(events.get(&id).await, "Failed to read event")?;
        let Some(current) = current else {
            return Ok(());
        };
        if current.running_state.as_deref() == Some(RUNNING_STATE_ONGOING) {
            tracing::debug!("closing ongoing event {} before deleting it", id);
            events
                .close(&id)
                .await
                .map_err(|e| api_error("Failed to close event", e))?;
        }

        deleted(events.delete(&id).await, "Failed to delete event")
    }
}

#[async_trait]
impl Resource for EventResource {
    fn type_name(&self) -> &str {
        "wavefront_event"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront event")
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
                AttributeBuilder::new("annotations", AttributeType::map_of(AttributeType::String))
                    .description("Annotations such as severity, type and details")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("start_time", AttributeType::Number)
                    .description("Start of the event in epoch milliseconds, defaults to now")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("end_time", AttributeType::Number)
                    .description("End of the event in epoch milliseconds, unset keeps it ongoing")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::set_of(AttributeType::String))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("hosts", AttributeType::set_of(AttributeType::String))
                    .description("Sources the event applies to")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_ephemeral", AttributeType::Bool)
                    .description("Whether the event is an instantaneous event")
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
        create_response(self.create_event(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_event(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_event(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_event(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for EventResource {
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
    fn missing_start_time_defaults_to_now() {
        let state = StateBuilder::new()
            .set("name", "deploy")
            .string_map(
                "annotations",
                &HashMap::from([("severity".to_string(), "info".to_string())]),
            )
            .build();
        let before = chrono::Utc::now().timestamp_millis();
        let event = event_from_attrs(&Attrs::new(&state)).unwrap();

        assert!(event.start_time >= before);
        assert_eq!(event.end_time, None);
        assert_eq!(event.annotations["severity"], "info");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let state = StateBuilder::new()
            .set("name", "deploy")
            .set("start_time", 2000i64)
            .set("end_time", 1000i64)
            .build();
        let err = event_from_attrs(&Attrs::new(&state)).unwrap_err();
        assert_eq!(err.attribute(), "end_time");
    }

    #[tokio::test]
    async fn ongoing_event_is_closed_before_delete() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/event/ev-1")
            .with_body(ok_body(serde_json::json!({
                "id": "ev-1", "name": "deploy", "startTime": 1, "runningState": "ONGOING"
            })))
            .create_async()
            .await;
        let close = server
            .mock("POST", "/api/v2/event/ev-1/close")
            .with_body(ok_body(serde_json::json!({"id": "ev-1", "name": "deploy"})))
            .expect(1)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/v2/event/ev-1")
            .with_body(ok_body(serde_json::Value::Null))
            .expect(1)
            .create_async()
            .await;

        let mut resource = EventResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "wavefront_event".to_string(),
                    prior_state: StateBuilder::new().set("id", "ev-1").build(),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        close.assert_async().await;
        delete.assert_async().await;
    }
}
