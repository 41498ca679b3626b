//! Terraform provider for the Wavefront monitoring platform

pub mod api;
pub mod csp;
pub mod data_sources;
pub mod model;
pub mod mutex_kv;
pub mod provider_data;
pub mod resources;
pub mod util;

pub use provider_data::WavefrontProviderData;

use async_trait::async_trait;
use resources::CloudServiceKind;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::defaults::StaticDefault;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};

pub const ADDRESS_ENV: &str = "WAVEFRONT_ADDRESS";
pub const TOKEN_ENV: &str = "WAVEFRONT_TOKEN";
pub const CSP_API_TOKEN_ENV: &str = "WAVEFRONT_CSP_API_TOKEN";

/// A configured string, falling back to `env` when unset or empty
fn config_string(config: &DynamicValue, name: &str, env: Option<&str>) -> Option<String> {
    config
        .attr(name)
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| env.and_then(|key| std::env::var(key).ok()))
        .filter(|s| !s.is_empty())
}

fn resource<R>() -> ResourceFactory
where
    R: ResourceWithConfigure + Default + 'static,
{
    Arc::new(|| Box::new(R::default()) as Box<dyn ResourceWithConfigure>)
}

fn cloud_integration(kind: CloudServiceKind) -> ResourceFactory {
    Arc::new(move || {
        Box::new(resources::CloudIntegrationResource::new(kind)) as Box<dyn ResourceWithConfigure>
    })
}

fn data_source<D>() -> DataSourceFactory
where
    D: DataSourceWithConfigure + Default + 'static,
{
    Arc::new(|| Box::new(D::default()) as Box<dyn DataSourceWithConfigure>)
}

/// Keys every factory by the type name of the value it creates
fn by_type_name<F>(factories: Vec<F>, type_name: impl Fn(&F) -> String) -> HashMap<String, F> {
    factories
        .into_iter()
        .map(|factory| (type_name(&factory), factory))
        .collect()
}

#[derive(Default)]
pub struct WavefrontProvider;

impl WavefrontProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bearer token for the API, exchanging the CSP API token when set
    async fn bearer_token(&self, config: &DynamicValue) -> Result<String, Diagnostic> {
        let token = config_string(config, "token", Some(TOKEN_ENV));

        if let Some(csp_api_token) = config_string(config, "csp_api_token", Some(CSP_API_TOKEN_ENV)) {
            let csp_address = config_string(config, "csp_address", None)
                .unwrap_or_else(|| csp::DEFAULT_CSP_ADDRESS.to_string());
            tracing::info!("exchanging CSP API token at {}", csp_address);

            let access_token = csp::exchange_api_token(&csp_address, &csp_api_token)
                .await
                .map_err(|e| {
                    Diagnostic::error("Failed to exchange CSP API token", e.to_string())
                })?;
            if !access_token.is_empty() {
                return Ok(access_token);
            }
        }

        token.ok_or_else(|| {
            Diagnostic::error(
                "token is required",
                format!(
                    "Set token in the provider configuration or the {} environment variable",
                    TOKEN_ENV
                ),
            )
        })
    }

    async fn configure_client(&self, config: &DynamicValue) -> Result<WavefrontProviderData, Diagnostic> {
        let address = config_string(config, "address", Some(ADDRESS_ENV)).ok_or_else(|| {
            Diagnostic::error(
                "address is required",
                format!(
                    "Set address in the provider configuration or the {} environment variable",
                    ADDRESS_ENV
                ),
            )
        })?;
        let token = self.bearer_token(config).await?;
        let http_proxy = config_string(config, "http_proxy", None);

        let client = api::Client::new(&address, &token, http_proxy.as_deref())
            .map_err(|e| Diagnostic::error("Failed to create API client", e.to_string()))?;
        tracing::info!("configured Wavefront client for {}", client.base_url());
        Ok(WavefrontProviderData::new(client))
    }
}

#[async_trait]
impl Provider for WavefrontProvider {
    fn type_name(&self) -> &str {
        "wavefront"
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages Wavefront alerts, dashboards, integrations and accounts")
            .attribute(
                AttributeBuilder::new("address", AttributeType::String)
                    .description("Wavefront cluster address, defaults to WAVEFRONT_ADDRESS")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("token", AttributeType::String)
                    .description("API token, defaults to WAVEFRONT_TOKEN")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("http_proxy", AttributeType::String)
                    .description("Proxy for requests to the Wavefront API")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("csp_api_token", AttributeType::String)
                    .description(
                        "CSP API token exchanged for the bearer token, defaults to WAVEFRONT_CSP_API_TOKEN",
                    )
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("csp_address", AttributeType::String)
                    .description("Address of the CSP console")
                    .optional()
                    .default(StaticDefault::string(csp::DEFAULT_CSP_ADDRESS))
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::debug!("configuring provider for Terraform {}", request.terraform_version);

        match self.configure_client(&request.config).await {
            Ok(data) => {
                let provider_data: Arc<dyn Any + Send + Sync> = Arc::new(data);
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(provider_data),
                }
            }
            Err(diagnostic) => ConfigureProviderResponse {
                diagnostics: vec![diagnostic],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories = vec![
            resource::<resources::AlertResource>(),
            resource::<resources::AlertTargetResource>(),
            resource::<resources::AwsExternalIdResource>(),
            resource::<resources::DashboardResource>(),
            resource::<resources::DashboardJsonResource>(),
            resource::<resources::DerivedMetricResource>(),
            resource::<resources::EventResource>(),
            resource::<resources::ExternalLinkResource>(),
            resource::<resources::IngestionPolicyResource>(),
            resource::<resources::MaintenanceWindowResource>(),
            resource::<resources::MetricsPolicyResource>(),
            resource::<resources::RoleResource>(),
            resource::<resources::ServiceAccountResource>(),
            resource::<resources::UserResource>(),
            resource::<resources::UserGroupResource>(),
        ];
        factories.extend(CloudServiceKind::ALL.iter().copied().map(cloud_integration));

        by_type_name(factories, |factory| factory().type_name().to_string())
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        use data_sources::*;

        let factories = vec![
            data_source::<AlertDataSource>(),
            data_source::<AlertsDataSource>(),
            data_source::<DashboardDataSource>(),
            data_source::<DashboardsDataSource>(),
            data_source::<DerivedMetricDataSource>(),
            data_source::<DerivedMetricsDataSource>(),
            data_source::<EventDataSource>(),
            data_source::<EventsDataSource>(),
            data_source::<ExternalLinkDataSource>(),
            data_source::<ExternalLinksDataSource>(),
            data_source::<MaintenanceWindowDataSource>(),
            data_source::<MaintenanceWindowAllDataSource>(),
            data_source::<MetricsPolicyDataSource>(),
            data_source::<RoleDataSource>(),
            data_source::<RolesDataSource>(),
            data_source::<UserDataSource>(),
            data_source::<UsersDataSource>(),
            data_source::<UserGroupDataSource>(),
            data_source::<UserGroupsDataSource>(),
            data_source::<DefaultUserGroupDataSource>(),
        ];

        by_type_name(factories, |factory| factory().type_name().to_string())
    }
}
