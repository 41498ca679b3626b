//! Dashboard resource implementation
//!
//! A dashboard is identified by its `url`, which cannot change in place.
//! Sections, rows, charts and sources map onto nested list blocks.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::dashboard::{Chart, ChartSettings, Dashboard, ParameterDetail, Row, Section, Source};
use crate::api::WFTags;
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Block, NestedBlock, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::{OneOfValidator, StringPatternValidator};

const SUMMARIZATIONS: [&str; 9] = [
    "MEAN", "MEDIAN", "MIN", "MAX", "SUM", "COUNT", "LAST", "FIRST", "ANOMALOUS",
];

const PARAMETER_TYPES: [&str; 3] = ["SIMPLE", "LIST", "DYNAMIC"];

/// Dashboard urls are made of letters, digits, '-' and '_'
pub fn dashboard_url_validator() -> tfplug::Result<StringPatternValidator> {
    StringPatternValidator::new(r"^[A-Za-z0-9_-]+$", "letters, digits, '-' and '_'")
}

/// A dashboard as configured, with its access lists
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardModel {
    pub dashboard: Dashboard,
    pub can_view: Vec<String>,
    pub can_modify: Vec<String>,
}

fn source_from_attrs(attrs: &Attrs<'_>) -> Result<Source, ModelError> {
    Ok(Source {
        name: attrs.required_string("name")?,
        query: attrs.required_string("query")?,
        disabled: attrs.bool_or("disabled", false)?,
        scatter_plot_source: attrs.string("scatter_plot_source")?,
        querybuilder_enabled: attrs.bool_or("query_builder_enabled", false)?,
        source_description: attrs.string_or_empty("source_description")?,
    })
}

fn chart_from_attrs(attrs: &Attrs<'_>) -> Result<Chart, ModelError> {
    let sources = attrs
        .objects("source")?
        .iter()
        .map(source_from_attrs)
        .collect::<Result<Vec<_>, _>>()?;
    if sources.is_empty() {
        return Err(ModelError::invalid("chart.source", "a chart needs at least one source"));
    }

    Ok(Chart {
        name: attrs.required_string("name")?,
        description: attrs.string_or_empty("description")?,
        units: attrs.string_or_empty("units")?,
        sources,
        summarization: attrs.string("summarization")?,
        chart_settings: ChartSettings {
            chart_type: attrs
                .string("chart_setting_type")?
                .unwrap_or_else(|| "line".to_string()),
        },
        base: attrs.i64("base")?.unwrap_or_default(),
    })
}

fn row_from_attrs(attrs: &Attrs<'_>) -> Result<Row, ModelError> {
    Ok(Row {
        charts: attrs
            .objects("chart")?
            .iter()
            .map(chart_from_attrs)
            .collect::<Result<_, _>>()?,
    })
}

fn section_from_attrs(attrs: &Attrs<'_>) -> Result<Section, ModelError> {
    Ok(Section {
        name: attrs.required_string("name")?,
        rows: attrs
            .objects("row")?
            .iter()
            .map(row_from_attrs)
            .collect::<Result<_, _>>()?,
    })
}

fn parameter_from_attrs(attrs: &Attrs<'_>) -> Result<(String, ParameterDetail), ModelError> {
    let name = attrs.required_string("name")?;
    let detail = ParameterDetail {
        label: attrs.required_string("label")?,
        default_value: attrs.required_string("default_value")?,
        hide_from_view: attrs.bool_or("hide_from_view", false)?,
        parameter_type: attrs.required_string("parameter_type")?,
        values_to_readable_strings: attrs.string_map("values_to_readable_strings")?,
        query_value: attrs.string("query_value")?,
        tag_key: attrs.string("tag_key")?,
        dynamic_field_type: attrs.string("dynamic_field_type")?,
    };
    Ok((name, detail))
}

impl DashboardModel {
    pub fn from_attrs(attrs: &Attrs<'_>) -> Result<Self, ModelError> {
        let sections = attrs
            .objects("section")?
            .iter()
            .map(section_from_attrs)
            .collect::<Result<Vec<_>, _>>()?;
        let parameter_details = attrs
            .objects("parameter_detail")?
            .iter()
            .map(parameter_from_attrs)
            .collect::<Result<HashMap<_, _>, _>>()?;

        let dashboard = Dashboard {
            id: attrs.required_string("url")?,
            name: attrs.required_string("name")?,
            description: attrs.required_string("description")?,
            sections,
            parameter_details,
            tags: WFTags::new(attrs.strings("tags")?),
            display_section_table_of_contents: attrs
                .bool_or("display_section_table_of_contents", false)?,
            display_query_parameters: attrs.bool_or("display_query_parameters", false)?,
            event_filter_type: attrs.string("event_filter_type")?,
            acl: None,
        };

        Ok(Self {
            dashboard,
            can_view: attrs.strings("can_view")?,
            can_modify: attrs.strings("can_modify")?,
        })
    }

    fn has_acl(&self) -> bool {
        !self.can_view.is_empty() || !self.can_modify.is_empty()
    }
}

fn source_to_state(source: &Source) -> StateBuilder {
    StateBuilder::new()
        .set("name", source.name.as_str())
        .set("query", source.query.as_str())
        .set("disabled", source.disabled)
        .set(
            "scatter_plot_source",
            source
                .scatter_plot_source
                .clone()
                .unwrap_or_else(|| "Y".to_string()),
        )
        .set("query_builder_enabled", source.querybuilder_enabled)
        .non_empty("source_description", &source.source_description)
}

fn chart_to_state(chart: &Chart) -> StateBuilder {
    StateBuilder::new()
        .set("name", chart.name.as_str())
        .non_empty("description", &chart.description)
        .set("units", chart.units.as_str())
        .set(
            "summarization",
            chart
                .summarization
                .clone()
                .unwrap_or_else(|| "MEAN".to_string()),
        )
        .set("chart_setting_type", chart.chart_settings.chart_type.as_str())
        .set("base", chart.base)
        .objects("source", chart.sources.iter().map(source_to_state).collect())
}

fn parameter_to_state(name: &str, detail: &ParameterDetail) -> StateBuilder {
    StateBuilder::new()
        .set("name", name)
        .set("label", detail.label.as_str())
        .set("default_value", detail.default_value.as_str())
        .set("hide_from_view", detail.hide_from_view)
        .set("parameter_type", detail.parameter_type.as_str())
        .string_map("values_to_readable_strings", &detail.values_to_readable_strings)
        .set("query_value", detail.query_value.clone())
        .set("tag_key", detail.tag_key.clone())
        .set("dynamic_field_type", detail.dynamic_field_type.clone())
}

pub fn dashboard_to_state(dashboard: &Dashboard) -> DynamicValue {
    dashboard_attributes(dashboard).build()
}

pub(crate) fn dashboard_attributes(dashboard: &Dashboard) -> StateBuilder {
    let acl = dashboard.acl.clone().unwrap_or_default();
    let sections = dashboard
        .sections
        .iter()
        .map(|section| {
            let rows = section
                .rows
                .iter()
                .map(|row| {
                    StateBuilder::new()
                        .objects("chart", row.charts.iter().map(chart_to_state).collect())
                })
                .collect();
            StateBuilder::new()
                .set("name", section.name.as_str())
                .objects("row", rows)
        })
        .collect();

    // Parameters come back as a map, sort them for a stable state
    let mut parameters: Vec<_> = dashboard.parameter_details.iter().collect();
    parameters.sort_by(|a, b| a.0.cmp(b.0));

    StateBuilder::new()
        .set("id", dashboard.id.as_str())
        .set("url", dashboard.id.as_str())
        .set("name", dashboard.name.as_str())
        .set("description", dashboard.description.as_str())
        .optional_strings("tags", &dashboard.tags())
        .strings("can_view", &acl.can_view)
        .strings("can_modify", &acl.can_modify)
        .set(
            "display_section_table_of_contents",
            dashboard.display_section_table_of_contents,
        )
        .set("display_query_parameters", dashboard.display_query_parameters)
        .set("event_filter_type", dashboard.event_filter_type.clone())
        .objects("section", sections)
        .objects(
            "parameter_detail",
            parameters
                .into_iter()
                .map(|(name, detail)| parameter_to_state(name, detail))
                .collect(),
        )
}

fn source_block() -> Block {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("query", AttributeType::String)
                .description("The Wavefront query of this source")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("disabled", AttributeType::Bool)
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("scatter_plot_source", AttributeType::String)
                .description("X or Y axis of a scatter plot")
                .optional()
                .computed()
                .default(StaticDefault::string("Y"))
                .validator(OneOfValidator::new(["X", "Y"]))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("query_builder_enabled", AttributeType::Bool)
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("source_description", AttributeType::String)
                .optional()
                .build(),
        )
        .build_block()
}

fn chart_block() -> Block {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("units", AttributeType::String)
                .description("Units of the plotted values")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("summarization", AttributeType::String)
                .description("How points are summarized when zoomed out")
                .optional()
                .computed()
                .default(StaticDefault::string("MEAN"))
                .validator(OneOfValidator::new(SUMMARIZATIONS))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("chart_setting_type", AttributeType::String)
                .description("Chart type such as line, table or sparkline")
                .optional()
                .computed()
                .default(StaticDefault::string("line"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("base", AttributeType::Number)
                .description("Logarithmic base of the y axis, 0 for linear")
                .optional()
                .computed()
                .default(StaticDefault::number(0.0))
                .build(),
        )
        .block(NestedBlock::list("source", source_block()).min_items(1))
        .build_block()
}

fn parameter_block() -> Block {
    SchemaBuilder::new()
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("label", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("default_value", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("hide_from_view", AttributeType::Bool)
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("parameter_type", AttributeType::String)
                .description("SIMPLE, LIST or DYNAMIC")
                .required()
                .validator(OneOfValidator::new(PARAMETER_TYPES))
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "values_to_readable_strings",
                AttributeType::map_of(AttributeType::String),
            )
            .required()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("query_value", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tag_key", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("dynamic_field_type", AttributeType::String)
                .description("SOURCE, SOURCE_TAG, METRIC_NAME, TAG_KEY or MATCHING_SOURCE_TAG")
                .optional()
                .build(),
        )
        .build_block()
}

#[derive(Default)]
pub struct DashboardResource {
    provider_data: Option<WavefrontProviderData>,
}

impl DashboardResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<DashboardModel, Diagnostic> {
        DashboardModel::from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid dashboard configuration"))
    }

    async fn read_dashboard(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let dashboard = found(
            data.client.dashboards().get(id).await,
            "Failed to read dashboard",
        )?;
        Ok(dashboard.as_ref().map(dashboard_to_state))
    }

    async fn read_back(&self, id: &str, summary: &str) -> Result<DynamicValue, Diagnostic> {
        self.read_dashboard(id).await?.ok_or_else(|| {
            Diagnostic::error(summary, format!("Dashboard {} disappeared after writing it", id))
        })
    }

    async fn set_acl(&self, model: &DashboardModel) -> Result<(), Diagnostic> {
        if !model.has_acl() {
            return Ok(());
        }
        let data = configured(&self.provider_data)?;
        data.client
            .dashboards()
            .set_acl(&model.dashboard.id, &model.can_view, &model.can_modify)
            .await
            .map_err(|e| api_error("Failed to set dashboard ACL", e))
    }

    async fn create_dashboard(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let model = Self::parse(planned)?;

        let created = data
            .client
            .dashboards()
            .create(&model.dashboard)
            .await
            .map_err(|e| api_error("Failed to create dashboard", e))?;
        tracing::info!("created dashboard {}", created.id);

        self.set_acl(&model).await?;
        self.read_back(&created.id, "Failed to create dashboard").await
    }

    async fn update_dashboard(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let model = Self::parse(planned)?;
        let id = model.dashboard.id.clone();

        data.client
            .dashboards()
            .update_overlay(&id, &model.dashboard)
            .await
            .map_err(|e| api_error("Failed to update dashboard", e))?;

        self.set_acl(&model).await?;
        self.read_back(&id, "Failed to update dashboard").await
    }

    async fn delete_dashboard(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.dashboards().delete(&id).await,
            "Failed to delete dashboard",
        )
    }
}

#[async_trait]
impl Resource for DashboardResource {
    fn type_name(&self) -> &str {
        "wavefront_dashboard"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let row = SchemaBuilder::new()
            .block(NestedBlock::list("chart", chart_block()).min_items(1))
            .build_block();
        let section = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .block(NestedBlock::list("row", row).min_items(1))
            .build_block();

        let mut diagnostics = vec![];
        let mut url = AttributeBuilder::new("url", AttributeType::String)
            .description("Unique identifier of the dashboard, used in its URL")
            .required()
            .plan_modifier(RequiresReplaceIfChanged);
        match dashboard_url_validator() {
            Ok(validator) => url = url.validator(validator),
            Err(e) => diagnostics.push(Diagnostic::error("Invalid dashboard schema", e.to_string())),
        }

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront dashboard")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(url.build())
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
                AttributeBuilder::new("tags", AttributeType::set_of(AttributeType::String))
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("can_view", AttributeType::set_of(AttributeType::String))
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("can_modify", AttributeType::set_of(AttributeType::String))
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_section_table_of_contents", AttributeType::Bool)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("display_query_parameters", AttributeType::Bool)
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("event_filter_type", AttributeType::String)
                    .description("BYCHART, AUTOMATIC, ALL, NONE, BYDASHBOARD or BYCHARTANDDASHBOARD")
                    .optional()
                    .computed()
                    .build(),
            )
            .block(NestedBlock::list("section", section).min_items(1))
            .block(NestedBlock::set("parameter_detail", parameter_block()))
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics,
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_dashboard(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_dashboard(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self.update_dashboard(&request.planned_state).await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_dashboard(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for DashboardResource {
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
    use mockito::{Matcher, Server};
    use tfplug::types::{AttributePath, Dynamic};
    use tfplug::validator::Validator;

    #[tokio::test]
    async fn plan_keeps_unconfigured_acl_list() {
        let schema = DashboardResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;
        let state = |name: &str, modify: &str| {
            StateBuilder::new()
                .set("id", "ops")
                .set("url", "ops")
                .set("name", name)
                .set("description", "d")
                .strings("can_view", &["g".to_string()])
                .strings("can_modify", &[modify.to_string()])
                .build()
        };
        let config = StateBuilder::new()
            .set("url", "ops")
            .set("name", "ops v2")
            .set("description", "d")
            .strings("can_modify", &["u".to_string()])
            .build();

        let plan = tfplug::plan::plan_resource_change(
            &schema,
            &state("ops", "m"),
            &state("ops v2", "u"),
            &config,
        );

        let planned = plan.planned_state;
        assert_eq!(planned.attr("can_view"), &Dynamic::string_list(["g"]));
        assert_eq!(planned.attr("can_modify"), &Dynamic::string_list(["u"]));
        assert_eq!(planned.attr("id").as_str(), Some("ops"));
    }

    #[tokio::test]
    async fn url_validator_rejects_slashes() {
        let schema = DashboardResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await;
        assert!(schema.diagnostics.is_empty());
        let url = schema.schema.block.attribute("url").unwrap();
        assert_eq!(url.validators.len(), 1);

        let mut diagnostics = vec![];
        let path = AttributePath::new("url");
        url.validators[0].validate(&Dynamic::from("ops-hosts_2"), &path, &mut diagnostics);
        assert!(diagnostics.is_empty());

        url.validators[0].validate(&Dynamic::from("ops/hosts"), &path, &mut diagnostics);
        url.validators[0].validate(&Dynamic::from(""), &path, &mut diagnostics);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].attribute, Some(path));
    }

    fn source(name: &str, query: &str) -> StateBuilder {
        StateBuilder::new()
            .set("name", name)
            .set("query", query)
            .set("disabled", false)
            .set("scatter_plot_source", "Y")
            .set("query_builder_enabled", false)
    }

    fn planned() -> DynamicValue {
        let chart = StateBuilder::new()
            .set("name", "cpu")
            .set("units", "%")
            .set("summarization", "MEAN")
            .set("chart_setting_type", "line")
            .set("base", 0i64)
            .objects("source", vec![source("usage", "ts(cpu.usage)")]);
        let row = StateBuilder::new().objects("chart", vec![chart]);
        let section = StateBuilder::new()
            .set("name", "Hosts")
            .objects("row", vec![row]);
        let parameter = StateBuilder::new()
            .set("name", "env")
            .set("label", "Environment")
            .set("default_value", "prod")
            .set("hide_from_view", false)
            .set("parameter_type", "SIMPLE")
            .string_map(
                "values_to_readable_strings",
                &HashMap::from([("prod".to_string(), "prod".to_string())]),
            );

        StateBuilder::new()
            .set("id", Dynamic::Unknown)
            .set("url", "ops-hosts")
            .set("name", "Ops hosts")
            .set("description", "Host health")
            .strings("tags", &["ops".to_string()])
            .set("can_view", Dynamic::Unknown)
            .set("can_modify", Dynamic::Unknown)
            .set("display_section_table_of_contents", false)
            .set("display_query_parameters", false)
            .set("event_filter_type", Dynamic::Unknown)
            .objects("section", vec![section])
            .objects("parameter_detail", vec![parameter])
            .build()
    }

    #[test]
    fn nested_blocks_become_sections() {
        let model = DashboardModel::from_attrs(&Attrs::new(&planned())).unwrap();
        let dashboard = &model.dashboard;

        assert_eq!(dashboard.id, "ops-hosts");
        let chart = &dashboard.sections[0].rows[0].charts[0];
        assert_eq!(chart.name, "cpu");
        assert_eq!(chart.sources[0].query, "ts(cpu.usage)");
        assert_eq!(chart.chart_settings.chart_type, "line");
        assert_eq!(dashboard.parameter_details["env"].label, "Environment");
        assert!(!model.has_acl());
    }

    #[test]
    fn chart_without_source_is_rejected() {
        let chart = StateBuilder::new().set("name", "empty").set("units", "");
        let state = StateBuilder::new()
            .set("url", "x")
            .set("name", "x")
            .set("description", "x")
            .objects(
                "section",
                vec![StateBuilder::new()
                    .set("name", "s")
                    .objects("row", vec![StateBuilder::new().objects("chart", vec![chart])])],
            )
            .build();

        let err = DashboardModel::from_attrs(&Attrs::new(&state)).unwrap_err();
        assert_eq!(err.attribute(), "chart.source");
    }

    #[test]
    fn flatten_round_trips_nested_state() {
        let model = DashboardModel::from_attrs(&Attrs::new(&planned())).unwrap();
        let state = dashboard_to_state(&model.dashboard);

        assert_eq!(state.attr("id").as_str(), Some("ops-hosts"));
        let section = &state.attr("section").as_list().unwrap()[0];
        let row = &section.as_map().unwrap()["row"].as_list().unwrap()[0];
        let chart = &row.as_map().unwrap()["chart"].as_list().unwrap()[0];
        let chart = chart.as_map().unwrap();
        assert_eq!(chart["summarization"].as_str(), Some("MEAN"));
        assert_eq!(chart["source"].as_list().map(Vec::len), Some(1));
        assert_eq!(state.attr("parameter_detail").as_list().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn update_keeps_url_as_id() {
        let mut server = Server::new_async().await;
        let model = DashboardModel::from_attrs(&Attrs::new(&planned())).unwrap();
        let body = ok_body(serde_json::to_value(&model.dashboard).unwrap());

        let _current = server
            .mock("GET", "/api/v2/dashboard/ops-hosts")
            .with_body(body.clone())
            .expect_at_least(1)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/v2/dashboard/ops-hosts")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "url": "ops-hosts",
                "name": "Ops hosts"
            })))
            .with_body(body)
            .create_async()
            .await;

        let mut resource = DashboardResource::new();
        resource
            .configure(Context::new(), configure_request(&server.url()))
            .await;

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "wavefront_dashboard".to_string(),
                    prior_state: planned(),
                    planned_state: planned(),
                    config: planned(),
                    planned_private: vec![],
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.attr("url").as_str(), Some("ops-hosts"));
        put.assert_async().await;
    }
}
