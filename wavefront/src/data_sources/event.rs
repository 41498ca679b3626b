//! Event data sources

use super::{
    collection_schema, collection_state, config_id, data_source_response, flatten, resource_block,
    single_schema, single_state,
};
use crate::api::common::TimeRange;
use crate::model::{Attrs, ModelError};
use crate::resources::event::event_attributes;
use crate::resources::{api_error, configured, EventResource};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType};
use tfplug::types::{Diagnostic, DynamicValue};

#[derive(Default)]
pub struct EventDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl EventDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_event(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = config_id(config)?;
        let event = data
            .client
            .events()
            .get(&id)
            .await
            .map_err(|e| api_error("Failed to read event", e))?;
        let block = resource_block(EventResource::new()).await;
        Ok(single_state(&block, event_attributes(&event)))
    }
}

#[async_trait]
impl DataSource for EventDataSource {
    fn type_name(&self) -> &str {
        "wavefront_event"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(EventResource::new()).await;
        DataSourceSchemaResponse {
            schema: single_schema("Reads a Wavefront event", &block),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_event(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for EventDataSource {
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

/// The search window of the events data source
fn time_range(config: &DynamicValue) -> Result<TimeRange, Diagnostic> {
    let attrs = Attrs::new(config);
    let invalid = |e: ModelError| e.to_diagnostic("Invalid events configuration");
    let range = TimeRange {
        earliest_start_time_epoch_millis: attrs
            .required_i64("earliest_start_time_epoch_millis")
            .map_err(invalid)?,
        latest_start_time_epoch_millis: attrs
            .required_i64("latest_start_time_epoch_millis")
            .map_err(invalid)?,
    };

    if range.latest_start_time_epoch_millis < range.earliest_start_time_epoch_millis {
        return Err(Diagnostic::error(
            "Invalid events configuration",
            "latest_start_time_epoch_millis must not be before earliest_start_time_epoch_millis",
        ));
    }
    Ok(range)
}

#[derive(Default)]
pub struct EventsDataSource {
    provider_data: Option<WavefrontProviderData>,
}

impl EventsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_events(&self, config: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let range = time_range(config)?;
        let events = data
            .client
            .events()
            .find_all_in(Some(range))
            .await
            .map_err(|e| api_error("Failed to list events", e))?;
        tracing::debug!("found {} events", events.len());

        let block = resource_block(EventResource::new()).await;
        let items = events
            .iter()
            .map(|event| flatten(&block, event_attributes(event)))
            .collect();
        Ok(collection_state("events", items, config))
    }
}

#[async_trait]
impl DataSource for EventsDataSource {
    fn type_name(&self) -> &str {
        "wavefront_events"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let block = resource_block(EventResource::new()).await;
        let arguments = vec![
            AttributeBuilder::new("earliest_start_time_epoch_millis", AttributeType::Number)
                .description("Start of the search window, in epoch milliseconds")
                .required()
                .build(),
            AttributeBuilder::new("latest_start_time_epoch_millis", AttributeType::Number)
                .description("End of the search window, in epoch milliseconds")
                .required()
                .build(),
        ];
        DataSourceSchemaResponse {
            schema: collection_schema(
                "Lists the Wavefront events that started within a time window",
                "events",
                &block,
                arguments,
            ),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        data_source_response(self.read_events(&request.config).await)
    }
}

#[async_trait]
impl DataSourceWithConfigure for EventsDataSource {
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
    use crate::model::StateBuilder;
    use crate::resources::test_support::ok_body;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn window(earliest: i64, latest: i64) -> DynamicValue {
        StateBuilder::new()
            .set("earliest_start_time_epoch_millis", earliest)
            .set("latest_start_time_epoch_millis", latest)
            .build()
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(time_range(&window(2000, 1000)).is_err());
        assert!(time_range(&window(1000, 1000)).is_ok());
        assert!(time_range(&DynamicValue::object()).is_err());
    }

    #[tokio::test]
    async fn events_search_sends_time_range() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("POST", "/api/v2/search/event")
            .match_body(Matcher::PartialJson(json!({
                "timeRange": {
                    "earliestStartTimeEpochMillis": 1000,
                    "latestStartTimeEpochMillis": 5000
                }
            })))
            .with_body(ok_body(json!({"items": [
                {"id": "e-1", "name": "deploy", "startTime": 1500,
                 "annotations": {"severity": "info"}}
            ]})))
            .create_async()
            .await;

        let mut source = EventsDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_events".to_string(),
                    config: window(1000, 5000),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.state.attr("earliest_start_time_epoch_millis").as_i64(),
            Some(1000)
        );
        let events = response.state.attr("events").as_list().unwrap();
        assert_eq!(events[0].as_map().unwrap()["name"].as_str(), Some("deploy"));
        search.assert_async().await;
    }

    #[tokio::test]
    async fn single_event_is_read_by_id() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/api/v2/event/e-1")
            .with_body(ok_body(json!({
                "id": "e-1", "name": "deploy", "startTime": 1500, "endTime": 1600,
                "annotations": {"severity": "info"}, "tags": ["release"]
            })))
            .create_async()
            .await;

        let mut source = EventDataSource::new();
        source
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: "wavefront_event".to_string(),
                    config: StateBuilder::new().set("id", "e-1").build(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.state.attr("end_time").as_i64(), Some(1600));
    }
}
