//! Alert resource implementation

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::alert::Alert;
use crate::api::WFTags;
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::WavefrontProviderData;
use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{OneOfValidator, Validator};

pub const ALERT_TYPE_CLASSIC: &str = "CLASSIC";
pub const ALERT_TYPE_THRESHOLD: &str = "THRESHOLD";

/// Severity keys of threshold alert `conditions` and `threshold_targets`
pub const SEVERITY_KEYS: [&str; 4] = ["severe", "warn", "info", "smoke"];

/// Checks a notification target: a PagerDuty key (`pd:`), an alert target
/// reference (`target:`) or an email address, or a comma separated list of
/// those
pub fn validate_alert_target(value: &str) -> Result<(), String> {
    for segment in value.split(',').map(str::trim) {
        let valid = segment.starts_with("pd:")
            || segment.starts_with("target:")
            || segment.contains('@');
        if !valid {
            return Err(format!(
                "'{}' is not a valid alert target, expected an email address, pd:<key> or target:<id>",
                segment
            ));
        }
    }
    Ok(())
}

/// Checks that the alert defines the conditions its type needs
pub fn validate_alert_conditions(alert: &Alert) -> Result<(), String> {
    let alert_type = alert.alert_type.as_deref().unwrap_or(ALERT_TYPE_CLASSIC);
    match alert_type {
        ALERT_TYPE_CLASSIC => {
            if alert.condition.as_deref().unwrap_or_default().is_empty() {
                return Err("condition must be set for CLASSIC alerts".to_string());
            }
            if alert.severity.as_deref().unwrap_or_default().is_empty() {
                return Err("severity must be set for CLASSIC alerts".to_string());
            }
            Ok(())
        }
        ALERT_TYPE_THRESHOLD => {
            if alert.conditions.is_empty() {
                return Err("conditions must be set for THRESHOLD alerts".to_string());
            }
            for key in alert.conditions.keys() {
                if !SEVERITY_KEYS.contains(&key.as_str()) {
                    return Err(format!(
                        "invalid severity '{}' in conditions, expected one of {:?}",
                        key, SEVERITY_KEYS
                    ));
                }
            }
            for key in alert.targets.keys() {
                if !SEVERITY_KEYS.contains(&key.as_str()) {
                    return Err(format!(
                        "invalid severity '{}' in threshold_targets, expected one of {:?}",
                        key, SEVERITY_KEYS
                    ));
                }
            }
            Ok(())
        }
        other => Err(format!(
            "alert_type must be {} or {}, got '{}'",
            ALERT_TYPE_CLASSIC, ALERT_TYPE_THRESHOLD, other
        )),
    }
}

pub struct AlertTargetValidator;

impl Validator for AlertTargetValidator {
    fn description(&self) -> String {
        "email addresses, pd:<key> or target:<id>, comma separated".to_string()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(target) = value.as_str() {
            if let Err(reason) = validate_alert_target(target) {
                diagnostics.push(
                    Diagnostic::error("Invalid alert target", reason).with_attribute(path.clone()),
                );
            }
        }
    }
}

/// An alert as configured, with its access lists
#[derive(Debug, Clone, PartialEq)]
pub struct AlertModel {
    pub alert: Alert,
    pub can_view: Vec<String>,
    pub can_modify: Vec<String>,
}

impl AlertModel {
    pub fn from_attrs(attrs: &Attrs<'_>) -> Result<Self, ModelError> {
        let alert = Alert {
            id: attrs.string("id")?,
            name: attrs.required_string("name")?,
            alert_type: attrs.string("alert_type")?,
            target: attrs.string("target")?,
            condition: attrs.string("condition")?,
            conditions: attrs.string_map("conditions")?,
            display_expression: attrs.string("display_expression")?,
            minutes: attrs.required_i64("minutes")?,
            resolve_after_minutes: attrs.i64("resolve_after_minutes")?,
            notification_resend_frequency_minutes: attrs
                .i64("notification_resend_frequency_minutes")?,
            additional_information: attrs.string("additional_information")?,
            severity: attrs.string("severity")?,
            targets: attrs.string_map("threshold_targets")?,
            tags: WFTags::new(attrs.strings("tags")?),
            process_rate_minutes: attrs.i64("process_rate_minutes")?,
            runbook_links: attrs.strings("runbook_links")?,
            ..Default::default()
        };

        Ok(Self {
            alert,
            can_view: attrs.strings("can_view")?,
            can_modify: attrs.strings("can_modify")?,
        })
    }

    fn has_acl(&self) -> bool {
        !self.can_view.is_empty() || !self.can_modify.is_empty()
    }
}

/// Flattens an alert into resource state
pub fn alert_to_state(alert: &Alert) -> DynamicValue {
    alert_attributes(alert).build()
}

pub(crate) fn alert_attributes(alert: &Alert) -> StateBuilder {
    let acl = alert.acl.clone().unwrap_or_default();
    let threshold = alert.alert_type.as_deref() == Some(ALERT_TYPE_THRESHOLD);

    StateBuilder::new()
        .set("id", alert.id.clone())
        .set("name", alert.name.as_str())
        .set(
            "alert_type",
            alert
                .alert_type
                .clone()
                .unwrap_or_else(|| ALERT_TYPE_CLASSIC.to_string()),
        )
        .non_empty("target", alert.target.as_deref().unwrap_or_default())
        .set("condition", alert.condition.clone())
        .optional_map("conditions", &alert.conditions)
        .optional_map(
            "threshold_targets",
            &if threshold {
                alert.targets.clone()
            } else {
                HashMap::new()
            },
        )
        .non_empty(
            "display_expression",
            alert.display_expression.as_deref().unwrap_or_default(),
        )
        .set("minutes", alert.minutes)
        .set(
            "resolve_after_minutes",
            alert.resolve_after_minutes.unwrap_or_default(),
        )
        .set(
            "notification_resend_frequency_minutes",
            alert.notification_resend_frequency_minutes.unwrap_or_default(),
        )
        .non_empty(
            "additional_information",
            alert.additional_information.as_deref().unwrap_or_default(),
        )
        .set("severity", alert.severity.clone())
        .optional_strings("tags", &alert.tags())
        .strings("can_view", &acl.can_view)
        .strings("can_modify", &acl.can_modify)
        .set("process_rate_minutes", alert.process_rate_minutes)
        .optional_strings("runbook_links", &alert.runbook_links)
}

/// The condition related attributes of a configuration
fn conditions_from_config(attrs: &Attrs<'_>) -> Result<Alert, ModelError> {
    Ok(Alert {
        alert_type: Some(
            attrs
                .string("alert_type")?
                .unwrap_or_else(|| ALERT_TYPE_CLASSIC.to_string()),
        ),
        condition: attrs.string("condition")?,
        severity: attrs.string("severity")?,
        conditions: attrs.string_map("conditions")?,
        targets: attrs.string_map("threshold_targets")?,
        ..Default::default()
    })
}

#[derive(Default)]
pub struct AlertResource {
    provider_data: Option<WavefrontProviderData>,
}

impl AlertResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse(state: &DynamicValue) -> Result<AlertModel, Diagnostic> {
        AlertModel::from_attrs(&Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid alert configuration"))
    }

    async fn read_alert(&self, id: &str) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let alert = found(data.client.alerts().get(id).await, "Failed to read alert")?;
        Ok(alert.as_ref().map(alert_to_state))
    }

    async fn read_back(&self, id: &str, summary: &str) -> Result<DynamicValue, Diagnostic> {
        self.read_alert(id).await?.ok_or_else(|| {
            Diagnostic::error(summary, format!("Alert {} disappeared after writing it", id))
        })
    }

    async fn set_acl(&self, model: &AlertModel, id: &str) -> Result<(), Diagnostic> {
        if !model.has_acl() {
            return Ok(());
        }
        let data = configured(&self.provider_data)?;
        data.client
            .alerts()
            .set_acl(id, &model.can_view, &model.can_modify)
            .await
            .map_err(|e| api_error("Failed to set alert ACL", e))
    }

    async fn create_alert(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let model = Self::parse(planned)?;

        let created = data
            .client
            .alerts()
            .create(&model.alert)
            .await
            .map_err(|e| api_error("Failed to create alert", e))?;
        let id = created.id.ok_or_else(|| {
            Diagnostic::error("Failed to create alert", "The API response carried no id")
        })?;
        tracing::info!("created alert {}", id);

        self.set_acl(&model, &id).await?;
        self.read_back(&id, "Failed to create alert").await
    }

    async fn update_alert(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut model = Self::parse(planned)?;
        model.alert.id = Some(id.clone());

        data.client
            .alerts()
            .update_overlay(&id, &model.alert)
            .await
            .map_err(|e| api_error("Failed to update alert", e))?;

        self.set_acl(&model, &id).await?;
        self.read_back(&id, "Failed to update alert").await
    }

    async fn delete_alert(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.alerts().delete(&id).await,
            "Failed to delete alert",
        )
    }
}

#[async_trait]
impl Resource for AlertResource {
    fn type_name(&self) -> &str {
        "wavefront_alert"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Wavefront alert")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("The alert id")
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the alert")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("alert_type", AttributeType::String)
                    .description("CLASSIC or THRESHOLD")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(ALERT_TYPE_CLASSIC))
                    .validator(OneOfValidator::new([
                        ALERT_TYPE_CLASSIC,
                        ALERT_TYPE_THRESHOLD,
                    ]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("target", AttributeType::String)
                    .description("Comma separated notification targets of a CLASSIC alert")
                    .optional()
                    .validator(AlertTargetValidator)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("condition", AttributeType::String)
                    .description("The query that triggers a CLASSIC alert when non zero")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("conditions", AttributeType::map_of(AttributeType::String))
                    .description("Queries per severity of a THRESHOLD alert")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "threshold_targets",
                    AttributeType::map_of(AttributeType::String),
                )
                .description("Notification targets per severity of a THRESHOLD alert")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("display_expression", AttributeType::String)
                    .description("The query shown when the alert fires")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("minutes", AttributeType::Number)
                    .description("Minutes the condition must hold before the alert fires")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("resolve_after_minutes", AttributeType::Number)
                    .description("Minutes the condition must be false before the alert resolves")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(0.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "notification_resend_frequency_minutes",
                    AttributeType::Number,
                )
                .description("How often notifications are resent while the alert fires")
                .optional()
                .computed()
                .default(StaticDefault::number(0.0))
                .build(),
            )
            .attribute(
                AttributeBuilder::new("additional_information", AttributeType::String)
                    .description("Free text added to alert notifications")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("severity", AttributeType::String)
                    .description("INFO, SMOKE, WARN or SEVERE")
                    .optional()
                    .computed()
                    .validator(OneOfValidator::new(["INFO", "SMOKE", "WARN", "SEVERE"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::set_of(AttributeType::String))
                    .description("Tags attached to the alert")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("can_view", AttributeType::set_of(AttributeType::String))
                    .description("Users and groups allowed to view the alert")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("can_modify", AttributeType::set_of(AttributeType::String))
                    .description("Users and groups allowed to modify the alert")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("process_rate_minutes", AttributeType::Number)
                    .description("How often the alert is evaluated")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "runbook_links",
                    AttributeType::list_of(AttributeType::String),
                )
                .description("Links to runbooks for this alert")
                .optional()
                .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let attrs = Attrs::new(&request.config);

        // Conditions can only be checked once every input is known
        let pending = ["alert_type", "condition", "severity", "conditions", "threshold_targets"]
            .iter()
            .any(|name| attrs.is_unknown(name));
        if pending {
            return ValidateResourceConfigResponse { diagnostics };
        }

        let alert = match conditions_from_config(&attrs) {
            Ok(alert) => alert,
            Err(e) => {
                diagnostics.push(e.to_diagnostic("Invalid alert configuration"));
                return ValidateResourceConfigResponse { diagnostics };
            }
        };

        if let Err(reason) = validate_alert_conditions(&alert) {
            diagnostics.push(Diagnostic::error("Invalid alert conditions", reason));
        }
        for (severity, target) in &alert.targets {
            if let Err(reason) = validate_alert_target(target) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid alert target",
                        format!("threshold_targets.{}: {}", severity, reason),
                    )
                    .with_attribute(AttributePath::new("threshold_targets")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_alert(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = match required_id(&request.current_state) {
            Ok(id) => self.read_alert(&id).await,
            Err(diagnostic) => Err(diagnostic),
        };
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_alert(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_alert(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for AlertResource {
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
