//! Resource implementations

pub mod alert;
pub mod alert_target;
pub mod cloud_integration;
pub mod cloud_integration_aws_external_id;
pub mod dashboard;
pub mod dashboard_json;
pub mod derived_metric;
pub mod event;
pub mod external_link;
pub mod ingestion_policy;
pub mod maintenance_window;
pub mod metrics_policy;
pub mod role;
pub mod service_account;
pub mod user;
pub mod user_group;

pub use alert::AlertResource;
pub use alert_target::AlertTargetResource;
pub use cloud_integration::{CloudIntegrationResource, CloudServiceKind};
pub use cloud_integration_aws_external_id::AwsExternalIdResource;
pub use dashboard::DashboardResource;
pub use dashboard_json::DashboardJsonResource;
pub use derived_metric::DerivedMetricResource;
pub use event::EventResource;
pub use external_link::ExternalLinkResource;
pub use ingestion_policy::IngestionPolicyResource;
pub use maintenance_window::MaintenanceWindowResource;
pub use metrics_policy::MetricsPolicyResource;
pub use role::RoleResource;
pub use service_account::ServiceAccountResource;
pub use user::UserResource;
pub use user_group::UserGroupResource;

use crate::api::ApiError;
use crate::model::state_id;
use crate::WavefrontProviderData;
use tfplug::resource::{
    CreateResourceResponse, DeleteResourceResponse, ReadResourceRequest, ReadResourceResponse,
    UpdateResourceResponse,
};
use tfplug::types::{Diagnostic, DynamicValue};

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn configured(
    provider_data: &Option<WavefrontProviderData>,
) -> Result<&WavefrontProviderData, Diagnostic> {
    provider_data.as_ref().ok_or_else(not_configured)
}

pub(crate) fn api_error(summary: &str, e: ApiError) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", e))
}

pub(crate) fn required_id(state: &DynamicValue) -> Result<String, Diagnostic> {
    state_id(state).ok_or_else(|| {
        Diagnostic::error("Missing id", "The resource state does not contain an id")
    })
}

/// On failure nothing is stored, the resource was not created
pub(crate) fn create_response(result: Result<DynamicValue, Diagnostic>) -> CreateResourceResponse {
    match result {
        Ok(new_state) => CreateResourceResponse {
            new_state,
            private: vec![],
            diagnostics: vec![],
        },
        Err(diagnostic) => CreateResourceResponse {
            new_state: DynamicValue::null(),
            private: vec![],
            diagnostics: vec![diagnostic],
        },
    }
}

/// `Ok(None)` drops the resource from state
pub(crate) fn read_response(
    result: Result<Option<DynamicValue>, Diagnostic>,
    request: ReadResourceRequest,
) -> ReadResourceResponse {
    match result {
        Ok(new_state) => ReadResourceResponse {
            new_state,
            diagnostics: vec![],
            private: request.private,
        },
        Err(diagnostic) => ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![diagnostic],
            private: request.private,
        },
    }
}

/// On failure the prior state is kept
pub(crate) fn update_response(
    result: Result<DynamicValue, Diagnostic>,
    prior_state: DynamicValue,
) -> UpdateResourceResponse {
    match result {
        Ok(new_state) => UpdateResourceResponse {
            new_state,
            private: vec![],
            diagnostics: vec![],
        },
        Err(diagnostic) => UpdateResourceResponse {
            new_state: prior_state,
            private: vec![],
            diagnostics: vec![diagnostic],
        },
    }
}

pub(crate) fn delete_response(result: Result<(), Diagnostic>) -> DeleteResourceResponse {
    DeleteResourceResponse {
        diagnostics: result.err().into_iter().collect(),
    }
}

/// A read that found nothing is not an error
pub(crate) fn found<T>(result: Result<T, ApiError>, summary: &str) -> Result<Option<T>, Diagnostic> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            tracing::warn!("{}: not found, removing from state", summary);
            Ok(None)
        }
        Err(e) => Err(api_error(summary, e)),
    }
}

/// Deleting something already gone is not an error
pub(crate) fn deleted(result: Result<(), ApiError>, summary: &str) -> Result<(), Diagnostic> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(api_error(summary, e)),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::api::Client;
    use crate::WavefrontProviderData;
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::resource::ConfigureResourceRequest;

    pub fn provider_data(url: &str) -> WavefrontProviderData {
        WavefrontProviderData::new(Client::new(url, "test-token", None).unwrap())
    }

    pub fn configure_request(url: &str) -> ConfigureResourceRequest {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(provider_data(url));
        ConfigureResourceRequest {
            provider_data: Some(data),
        }
    }

    /// Wraps an entity in the Wavefront response envelope
    pub fn ok_body(response: serde_json::Value) -> String {
        serde_json::json!({
            "status": {"result": "OK", "message": "", "code": 200},
            "response": response,
        })
        .to_string()
    }
}
