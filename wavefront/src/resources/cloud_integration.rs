//! Cloud integration resources
//!
//! Every cloud service is its own Terraform resource type, sharing the
//! common integration attributes. The service specific configuration is a
//! [`CloudService`] variant, encoded to and decoded from the single wire
//! struct with exhaustive matches.
//!
//! The API never returns credentials, so secret attributes keep the value
//! already in state. Create and update are serialised on a common lock.

use super::{
    api_error, configured, create_response, delete_response, deleted, found, read_response,
    required_id, update_response,
};
use crate::api::cloud_integration::{
    AppDynamicsConfiguration, AwsBaseCredentials, AzureActivityLogConfiguration,
    AzureBaseCredentials, AzureConfiguration, CloudIntegration, CloudTrailConfiguration,
    CloudWatchConfiguration, Ec2Configuration, GcpBillingConfiguration, GcpConfiguration,
    NewRelicConfiguration, NewRelicMetricFilter, TeslaConfiguration,
};
use crate::model::{Attrs, ModelError, StateBuilder};
use crate::mutex_kv::CLOUD_INTEGRATION_KEY;
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
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType, NestedBlock, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

/// The service a cloud integration resource manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudServiceKind {
    CloudWatch,
    CloudTrail,
    Ec2,
    Gcp,
    GcpBilling,
    NewRelic,
    AppDynamics,
    Tesla,
    Azure,
    AzureActivityLog,
}

impl CloudServiceKind {
    pub const ALL: [CloudServiceKind; 10] = [
        CloudServiceKind::CloudWatch,
        CloudServiceKind::CloudTrail,
        CloudServiceKind::Ec2,
        CloudServiceKind::Gcp,
        CloudServiceKind::GcpBilling,
        CloudServiceKind::NewRelic,
        CloudServiceKind::AppDynamics,
        CloudServiceKind::Tesla,
        CloudServiceKind::Azure,
        CloudServiceKind::AzureActivityLog,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            CloudServiceKind::CloudWatch => "wavefront_cloud_integration_cloudwatch",
            CloudServiceKind::CloudTrail => "wavefront_cloud_integration_cloudtrail",
            CloudServiceKind::Ec2 => "wavefront_cloud_integration_ec2",
            CloudServiceKind::Gcp => "wavefront_cloud_integration_gcp",
            CloudServiceKind::GcpBilling => "wavefront_cloud_integration_gcp_billing",
            CloudServiceKind::NewRelic => "wavefront_cloud_integration_newrelic",
            CloudServiceKind::AppDynamics => "wavefront_cloud_integration_app_dynamics",
            CloudServiceKind::Tesla => "wavefront_cloud_integration_tesla",
            CloudServiceKind::Azure => "wavefront_cloud_integration_azure",
            CloudServiceKind::AzureActivityLog => "wavefront_cloud_integration_azure_activity_log",
        }
    }

    /// The `service` value of the wire struct
    pub fn service(self) -> &'static str {
        match self {
            CloudServiceKind::CloudWatch => "CLOUDWATCH",
            CloudServiceKind::CloudTrail => "CLOUDTRAIL",
            CloudServiceKind::Ec2 => "EC2",
            CloudServiceKind::Gcp => "GCP",
            CloudServiceKind::GcpBilling => "GCPBILLING",
            CloudServiceKind::NewRelic => "NEWRELIC",
            CloudServiceKind::AppDynamics => "APPDYNAMICS",
            CloudServiceKind::Tesla => "TESLA",
            CloudServiceKind::Azure => "AZURE",
            CloudServiceKind::AzureActivityLog => "AZUREACTIVITYLOG",
        }
    }

    pub fn from_service(service: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.service().eq_ignore_ascii_case(service))
    }

    /// Attributes the API accepts but never returns
    pub fn secret_attributes(self) -> &'static [&'static str] {
        match self {
            CloudServiceKind::CloudWatch | CloudServiceKind::CloudTrail | CloudServiceKind::Ec2 => &[],
            CloudServiceKind::Gcp => &["json_key"],
            CloudServiceKind::GcpBilling => &["api_key", "json_key"],
            CloudServiceKind::NewRelic => &["api_key"],
            CloudServiceKind::AppDynamics => &["encrypted_password"],
            CloudServiceKind::Tesla => &["password"],
            CloudServiceKind::Azure | CloudServiceKind::AzureActivityLog => &["client_secret"],
        }
    }

    fn description(self) -> &'static str {
        match self {
            CloudServiceKind::CloudWatch => "Manages a Wavefront AWS CloudWatch integration",
            CloudServiceKind::CloudTrail => "Manages a Wavefront AWS CloudTrail integration",
            CloudServiceKind::Ec2 => "Manages a Wavefront AWS EC2 integration",
            CloudServiceKind::Gcp => "Manages a Wavefront Google Cloud integration",
            CloudServiceKind::GcpBilling => "Manages a Wavefront Google Cloud billing integration",
            CloudServiceKind::NewRelic => "Manages a Wavefront New Relic integration",
            CloudServiceKind::AppDynamics => "Manages a Wavefront AppDynamics integration",
            CloudServiceKind::Tesla => "Manages a Wavefront Tesla integration",
            CloudServiceKind::Azure => "Manages a Wavefront Azure integration",
            CloudServiceKind::AzureActivityLog => {
                "Manages a Wavefront Azure activity log integration"
            }
        }
    }

    fn attributes(self) -> Vec<Attribute> {
        match self {
            CloudServiceKind::CloudWatch => {
                let mut attributes = aws_attributes();
                attributes.extend([
                    optional_string("metric_filter_regex", "Only ingest metrics matching this regex"),
                    optional_set("namespaces", "CloudWatch namespaces to ingest"),
                    optional_map("instance_selection_tags", "Only ingest EC2 instances with these tags"),
                    optional_map("volume_selection_tags", "Only ingest EBS volumes with these tags"),
                    optional_string("point_tag_filter_regex", "Only keep point tags matching this regex"),
                ]);
                attributes
            }
            CloudServiceKind::CloudTrail => {
                let mut attributes = aws_attributes();
                attributes.extend([
                    required_string("region", "AWS region of the S3 bucket"),
                    required_string("bucket_name", "S3 bucket holding the CloudTrail logs"),
                    optional_string("prefix", "Key prefix of the logs in the bucket"),
                    optional_string("filter_rule", "Rule selecting the events to ingest"),
                ]);
                attributes
            }
            CloudServiceKind::Ec2 => {
                let mut attributes = aws_attributes();
                attributes.push(
                    AttributeBuilder::new("hostname_tags", AttributeType::list_of(AttributeType::String))
                        .description("Instance tags used as the source name, in order")
                        .optional()
                        .build(),
                );
                attributes
            }
            CloudServiceKind::Gcp => vec![
                required_string("project_id", "Google Cloud project id"),
                secret("json_key", "Service account key in JSON"),
                optional_string("metric_filter_regex", "Only ingest metrics matching this regex"),
                optional_set("categories", "Metric categories to fetch, such as COMPUTE"),
            ],
            CloudServiceKind::GcpBilling => vec![
                required_string("project_id", "Google Cloud project id"),
                secret("api_key", "API key of the billing account"),
                secret("json_key", "Service account key in JSON"),
            ],
            CloudServiceKind::NewRelic => vec![
                secret("api_key", "New Relic REST API key"),
                optional_string("app_filter_regex", "Only ingest applications matching this regex"),
                optional_string("host_filter_regex", "Only ingest hosts matching this regex"),
            ],
            CloudServiceKind::AppDynamics => {
                let mut attributes = vec![
                    required_string("user_name", "AppDynamics user name"),
                    required_string("controller_name", "AppDynamics controller name"),
                    secret("encrypted_password", "Password of the AppDynamics user"),
                    AttributeBuilder::new("app_filter_regex", AttributeType::list_of(AttributeType::String))
                        .description("Only ingest applications matching these regexes")
                        .optional()
                        .build(),
                ];
                attributes.extend(
                    APP_DYNAMICS_FLAGS
                        .iter()
                        .map(|(name, default)| flag(name, *default)),
                );
                attributes
            }
            CloudServiceKind::Tesla => vec![
                required_string("email", "Email of the Tesla account"),
                secret("password", "Password of the Tesla account"),
            ],
            CloudServiceKind::Azure => {
                let mut attributes = azure_attributes();
                attributes.extend([
                    optional_string("metric_filter_regex", "Only ingest metrics matching this regex"),
                    optional_list("category_filter", "Metric categories to ingest"),
                    optional_list("resource_group_filter", "Resource groups to ingest"),
                ]);
                attributes
            }
            CloudServiceKind::AzureActivityLog => {
                let mut attributes = azure_attributes();
                attributes.push(optional_list("category_filter", "Activity log categories to ingest"));
                attributes
            }
        }
    }

    fn blocks(self) -> Vec<NestedBlock> {
        match self {
            CloudServiceKind::NewRelic => vec![NestedBlock::list(
                "metric_filter",
                SchemaBuilder::new()
                    .attribute(required_string("app_name", "Application the filter applies to"))
                    .attribute(required_string(
                        "metric_filter_regex",
                        "Only ingest metrics of the application matching this regex",
                    ))
                    .build_block(),
            )],
            _ => vec![],
        }
    }
}

/// AppDynamics metric toggles and their defaults
const APP_DYNAMICS_FLAGS: [(&str, bool); 8] = [
    ("enable_app_infra_metrics", false),
    ("enable_backend_metrics", true),
    ("enable_business_trx_metrics", true),
    ("enable_error_metrics", true),
    ("enable_individual_node_metrics", false),
    ("enable_overall_perf_metrics", true),
    ("enable_rollup", true),
    ("enable_service_endpoint_metrics", false),
];

fn required_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .required()
        .build()
}

fn optional_string(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .optional()
        .build()
}

fn optional_set(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::set_of(AttributeType::String))
        .description(description)
        .optional()
        .build()
}

fn optional_list(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::list_of(AttributeType::String))
        .description(description)
        .optional()
        .build()
}

fn optional_map(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::map_of(AttributeType::String))
        .description(description)
        .optional()
        .build()
}

fn secret(name: &str, description: &str) -> Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .description(description)
        .required()
        .sensitive()
        .build()
}

fn flag(name: &str, default: bool) -> Attribute {
    AttributeBuilder::new(name, AttributeType::Bool)
        .optional()
        .computed()
        .default(StaticDefault::bool(default))
        .build()
}

fn aws_attributes() -> Vec<Attribute> {
    vec![
        required_string("role_arn", "ARN of the IAM role Wavefront assumes"),
        required_string("external_id", "External id in the trust policy of the role"),
    ]
}

fn azure_attributes() -> Vec<Attribute> {
    vec![
        required_string("client_id", "Client id of the Azure application"),
        required_string("tenant", "Azure tenant id"),
        secret("client_secret", "Client secret of the Azure application"),
    ]
}

fn aws_credentials(attrs: &Attrs<'_>) -> Result<AwsBaseCredentials, ModelError> {
    Ok(AwsBaseCredentials {
        role_arn: attrs.required_string("role_arn")?,
        external_id: attrs.required_string("external_id")?,
    })
}

fn azure_credentials(attrs: &Attrs<'_>) -> Result<AzureBaseCredentials, ModelError> {
    Ok(AzureBaseCredentials {
        client_id: attrs.required_string("client_id")?,
        tenant: attrs.required_string("tenant")?,
        client_secret: attrs.string_or_empty("client_secret")?,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Service specific configuration of a cloud integration
#[derive(Debug, Clone, PartialEq)]
pub enum CloudService {
    CloudWatch(CloudWatchConfiguration),
    CloudTrail(CloudTrailConfiguration),
    Ec2(Ec2Configuration),
    Gcp(GcpConfiguration),
    GcpBilling(GcpBillingConfiguration),
    NewRelic(NewRelicConfiguration),
    AppDynamics(AppDynamicsConfiguration),
    Tesla(TeslaConfiguration),
    Azure(AzureConfiguration),
    AzureActivityLog(AzureActivityLogConfiguration),
}

impl CloudService {
    pub fn kind(&self) -> CloudServiceKind {
        match self {
            CloudService::CloudWatch(_) => CloudServiceKind::CloudWatch,
            CloudService::CloudTrail(_) => CloudServiceKind::CloudTrail,
            CloudService::Ec2(_) => CloudServiceKind::Ec2,
            CloudService::Gcp(_) => CloudServiceKind::Gcp,
            CloudService::GcpBilling(_) => CloudServiceKind::GcpBilling,
            CloudService::NewRelic(_) => CloudServiceKind::NewRelic,
            CloudService::AppDynamics(_) => CloudServiceKind::AppDynamics,
            CloudService::Tesla(_) => CloudServiceKind::Tesla,
            CloudService::Azure(_) => CloudServiceKind::Azure,
            CloudService::AzureActivityLog(_) => CloudServiceKind::AzureActivityLog,
        }
    }

    pub fn from_attrs(kind: CloudServiceKind, attrs: &Attrs<'_>) -> Result<Self, ModelError> {
        let service = match kind {
            CloudServiceKind::CloudWatch => CloudService::CloudWatch(CloudWatchConfiguration {
                base_credentials: aws_credentials(attrs)?,
                metric_filter_regex: non_empty(attrs.string("metric_filter_regex")?),
                namespaces: attrs.strings("namespaces")?,
                instance_selection_tags: attrs.string_map("instance_selection_tags")?,
                volume_selection_tags: attrs.string_map("volume_selection_tags")?,
                point_tag_filter_regex: non_empty(attrs.string("point_tag_filter_regex")?),
            }),
            CloudServiceKind::CloudTrail => CloudService::CloudTrail(CloudTrailConfiguration {
                base_credentials: aws_credentials(attrs)?,
                region: attrs.required_string("region")?,
                prefix: non_empty(attrs.string("prefix")?),
                bucket_name: attrs.required_string("bucket_name")?,
                filter_rule: non_empty(attrs.string("filter_rule")?),
            }),
            CloudServiceKind::Ec2 => CloudService::Ec2(Ec2Configuration {
                base_credentials: aws_credentials(attrs)?,
                host_name_tags: attrs.strings("hostname_tags")?,
            }),
            CloudServiceKind::Gcp => CloudService::Gcp(GcpConfiguration {
                project_id: attrs.required_string("project_id")?,
                gcp_json_key: attrs.required_string("json_key")?,
                metric_filter_regex: non_empty(attrs.string("metric_filter_regex")?),
                categories_to_fetch: attrs.strings("categories")?,
            }),
            CloudServiceKind::GcpBilling => CloudService::GcpBilling(GcpBillingConfiguration {
                project_id: attrs.required_string("project_id")?,
                gcp_api_key: attrs.required_string("api_key")?,
                gcp_json_key: attrs.required_string("json_key")?,
            }),
            CloudServiceKind::NewRelic => CloudService::NewRelic(NewRelicConfiguration {
                api_key: attrs.required_string("api_key")?,
                app_filter_regex: non_empty(attrs.string("app_filter_regex")?),
                host_filter_regex: non_empty(attrs.string("host_filter_regex")?),
                new_relic_metric_filters: attrs
                    .objects("metric_filter")?
                    .iter()
                    .map(|filter| {
                        Ok(NewRelicMetricFilter {
                            app_name: filter.required_string("app_name")?,
                            metric_filter_regex: filter.required_string("metric_filter_regex")?,
                        })
                    })
                    .collect::<Result<_, ModelError>>()?,
            }),
            CloudServiceKind::AppDynamics => {
                let enabled = |name: &str, default: bool| attrs.bool_or(name, default);
                CloudService::AppDynamics(AppDynamicsConfiguration {
                    user_name: attrs.required_string("user_name")?,
                    controller_name: attrs.required_string("controller_name")?,
                    encrypted_password: attrs.required_string("encrypted_password")?,
                    app_filter_regex: attrs.strings("app_filter_regex")?,
                    enable_app_infra_metrics: enabled("enable_app_infra_metrics", false)?,
                    enable_backend_metrics: enabled("enable_backend_metrics", true)?,
                    enable_business_trx_metrics: enabled("enable_business_trx_metrics", true)?,
                    enable_error_metrics: enabled("enable_error_metrics", true)?,
                    enable_individual_node_metrics: enabled("enable_individual_node_metrics", false)?,
                    enable_overall_perf_metrics: enabled("enable_overall_perf_metrics", true)?,
                    enable_rollup: enabled("enable_rollup", true)?,
                    enable_service_endpoint_metrics: enabled("enable_service_endpoint_metrics", false)?,
                })
            }
            CloudServiceKind::Tesla => CloudService::Tesla(TeslaConfiguration {
                email: attrs.required_string("email")?,
                password: attrs.required_string("password")?,
            }),
            CloudServiceKind::Azure => CloudService::Azure(AzureConfiguration {
                base_credentials: azure_credentials(attrs)?,
                metric_filter_regex: non_empty(attrs.string("metric_filter_regex")?),
                category_filter: attrs.strings("category_filter")?,
                resource_group_filter: attrs.strings("resource_group_filter")?,
            }),
            CloudServiceKind::AzureActivityLog => {
                CloudService::AzureActivityLog(AzureActivityLogConfiguration {
                    base_credentials: azure_credentials(attrs)?,
                    category_filter: attrs.strings("category_filter")?,
                })
            }
        };
        Ok(service)
    }

    /// The configuration of `kind` carried by an integration, empty when the
    /// API left it out
    pub fn decode(kind: CloudServiceKind, integration: &CloudIntegration) -> Self {
        match kind {
            CloudServiceKind::CloudWatch => {
                CloudService::CloudWatch(integration.cloud_watch.clone().unwrap_or_default())
            }
            CloudServiceKind::CloudTrail => {
                CloudService::CloudTrail(integration.cloud_trail.clone().unwrap_or_default())
            }
            CloudServiceKind::Ec2 => CloudService::Ec2(integration.ec2.clone().unwrap_or_default()),
            CloudServiceKind::Gcp => CloudService::Gcp(integration.gcp.clone().unwrap_or_default()),
            CloudServiceKind::GcpBilling => {
                CloudService::GcpBilling(integration.gcp_billing.clone().unwrap_or_default())
            }
            CloudServiceKind::NewRelic => {
                CloudService::NewRelic(integration.new_relic.clone().unwrap_or_default())
            }
            CloudServiceKind::AppDynamics => {
                CloudService::AppDynamics(integration.app_dynamics.clone().unwrap_or_default())
            }
            CloudServiceKind::Tesla => {
                CloudService::Tesla(integration.tesla.clone().unwrap_or_default())
            }
            CloudServiceKind::Azure => {
                CloudService::Azure(integration.azure.clone().unwrap_or_default())
            }
            CloudServiceKind::AzureActivityLog => CloudService::AzureActivityLog(
                integration.azure_activity_log.clone().unwrap_or_default(),
            ),
        }
    }

    /// Stores the configuration in its slot of the wire struct
    pub fn encode(self, integration: &mut CloudIntegration) {
        integration.service = self.kind().service().to_string();
        match self {
            CloudService::CloudWatch(c) => integration.cloud_watch = Some(c),
            CloudService::CloudTrail(c) => integration.cloud_trail = Some(c),
            CloudService::Ec2(c) => integration.ec2 = Some(c),
            CloudService::Gcp(c) => integration.gcp = Some(c),
            CloudService::GcpBilling(c) => integration.gcp_billing = Some(c),
            CloudService::NewRelic(c) => integration.new_relic = Some(c),
            CloudService::AppDynamics(c) => integration.app_dynamics = Some(c),
            CloudService::Tesla(c) => integration.tesla = Some(c),
            CloudService::Azure(c) => integration.azure = Some(c),
            CloudService::AzureActivityLog(c) => integration.azure_activity_log = Some(c),
        }
    }

    fn write_state(&self, state: StateBuilder) -> StateBuilder {
        match self {
            CloudService::CloudWatch(c) => state
                .set("role_arn", c.base_credentials.role_arn.as_str())
                .set("external_id", c.base_credentials.external_id.as_str())
                .set("metric_filter_regex", c.metric_filter_regex.clone())
                .optional_strings("namespaces", &c.namespaces)
                .optional_map("instance_selection_tags", &c.instance_selection_tags)
                .optional_map("volume_selection_tags", &c.volume_selection_tags)
                .set("point_tag_filter_regex", c.point_tag_filter_regex.clone()),
            CloudService::CloudTrail(c) => state
                .set("role_arn", c.base_credentials.role_arn.as_str())
                .set("external_id", c.base_credentials.external_id.as_str())
                .set("region", c.region.as_str())
                .set("bucket_name", c.bucket_name.as_str())
                .set("prefix", c.prefix.clone())
                .set("filter_rule", c.filter_rule.clone()),
            CloudService::Ec2(c) => state
                .set("role_arn", c.base_credentials.role_arn.as_str())
                .set("external_id", c.base_credentials.external_id.as_str())
                .optional_strings("hostname_tags", &c.host_name_tags),
            CloudService::Gcp(c) => state
                .set("project_id", c.project_id.as_str())
                .non_empty("json_key", &c.gcp_json_key)
                .set("metric_filter_regex", c.metric_filter_regex.clone())
                .optional_strings("categories", &c.categories_to_fetch),
            CloudService::GcpBilling(c) => state
                .set("project_id", c.project_id.as_str())
                .non_empty("api_key", &c.gcp_api_key)
                .non_empty("json_key", &c.gcp_json_key),
            CloudService::NewRelic(c) => state
                .non_empty("api_key", &c.api_key)
                .set("app_filter_regex", c.app_filter_regex.clone())
                .set("host_filter_regex", c.host_filter_regex.clone())
                .objects(
                    "metric_filter",
                    c.new_relic_metric_filters
                        .iter()
                        .map(|f| {
                            StateBuilder::new()
                                .set("app_name", f.app_name.as_str())
                                .set("metric_filter_regex", f.metric_filter_regex.as_str())
                        })
                        .collect(),
                ),
            CloudService::AppDynamics(c) => state
                .set("user_name", c.user_name.as_str())
                .set("controller_name", c.controller_name.as_str())
                .non_empty("encrypted_password", &c.encrypted_password)
                .optional_strings("app_filter_regex", &c.app_filter_regex)
                .set("enable_app_infra_metrics", c.enable_app_infra_metrics)
                .set("enable_backend_metrics", c.enable_backend_metrics)
                .set("enable_business_trx_metrics", c.enable_business_trx_metrics)
                .set("enable_error_metrics", c.enable_error_metrics)
                .set("enable_individual_node_metrics", c.enable_individual_node_metrics)
                .set("enable_overall_perf_metrics", c.enable_overall_perf_metrics)
                .set("enable_rollup", c.enable_rollup)
                .set("enable_service_endpoint_metrics", c.enable_service_endpoint_metrics),
            CloudService::Tesla(c) => state
                .set("email", c.email.as_str())
                .non_empty("password", &c.password),
            CloudService::Azure(c) => state
                .set("client_id", c.base_credentials.client_id.as_str())
                .set("tenant", c.base_credentials.tenant.as_str())
                .non_empty("client_secret", &c.base_credentials.client_secret)
                .set("metric_filter_regex", c.metric_filter_regex.clone())
                .optional_strings("category_filter", &c.category_filter)
                .optional_strings("resource_group_filter", &c.resource_group_filter),
            CloudService::AzureActivityLog(c) => state
                .set("client_id", c.base_credentials.client_id.as_str())
                .set("tenant", c.base_credentials.tenant.as_str())
                .non_empty("client_secret", &c.base_credentials.client_secret)
                .optional_strings("category_filter", &c.category_filter),
        }
    }
}

pub fn cloud_integration_from_attrs(
    kind: CloudServiceKind,
    attrs: &Attrs<'_>,
) -> Result<CloudIntegration, ModelError> {
    let mut integration = CloudIntegration {
        id: attrs.string("id")?,
        name: attrs.required_string("name")?,
        additional_tags: attrs.string_map("additional_tags")?,
        force_save: attrs.bool_or("force_save", false)?,
        service_refresh_rate_in_mins: attrs
            .i64("service_refresh_rate_in_minutes")?
            .unwrap_or(DEFAULT_REFRESH_RATE),
        ..Default::default()
    };
    CloudService::from_attrs(kind, attrs)?.encode(&mut integration);
    Ok(integration)
}

const DEFAULT_REFRESH_RATE: i64 = 5;

/// State for an integration read from the API. Secrets and `force_save`
/// are never returned, so their values come from `previous`.
pub fn cloud_integration_to_state(
    kind: CloudServiceKind,
    integration: &CloudIntegration,
    previous: &DynamicValue,
) -> DynamicValue {
    let state = StateBuilder::new()
        .set("id", integration.id.clone())
        .set("name", integration.name.as_str())
        .set("service", integration.service.as_str())
        .optional_map("additional_tags", &integration.additional_tags)
        .set(
            "force_save",
            previous.attr("force_save").as_bool().unwrap_or(integration.force_save),
        )
        .set(
            "service_refresh_rate_in_minutes",
            integration.service_refresh_rate_in_mins,
        );
    let mut state = CloudService::decode(kind, integration).write_state(state);

    for name in kind.secret_attributes() {
        let carried = previous.attr(name);
        if !carried.is_null() && !carried.is_unknown() {
            state = state.set(name, carried.clone());
        }
    }
    state.build()
}

pub struct CloudIntegrationResource {
    kind: CloudServiceKind,
    provider_data: Option<WavefrontProviderData>,
}

impl CloudIntegrationResource {
    pub fn new(kind: CloudServiceKind) -> Self {
        Self {
            kind,
            provider_data: None,
        }
    }

    pub fn kind(&self) -> CloudServiceKind {
        self.kind
    }

    fn parse(&self, state: &DynamicValue) -> Result<CloudIntegration, Diagnostic> {
        cloud_integration_from_attrs(self.kind, &Attrs::new(state))
            .map_err(|e| e.to_diagnostic("Invalid cloud integration configuration"))
    }

    fn check_service(&self, integration: &CloudIntegration) -> Result<(), Diagnostic> {
        match CloudServiceKind::from_service(&integration.service) {
            Some(kind) if kind == self.kind => Ok(()),
            _ => Err(Diagnostic::error(
                "Unexpected cloud integration service",
                format!(
                    "integration {:?} is a {} integration, expected {}",
                    integration.id,
                    integration.service,
                    self.kind.service()
                ),
            )),
        }
    }

    async fn read_integration(
        &self,
        current: &DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(current)?;
        let integration = found(
            data.client.cloud_integrations().get(&id).await,
            "Failed to read cloud integration",
        )?;
        match integration {
            Some(integration) => {
                self.check_service(&integration)?;
                Ok(Some(cloud_integration_to_state(
                    self.kind,
                    &integration,
                    current,
                )))
            }
            None => Ok(None),
        }
    }

    async fn create_integration(&self, planned: &DynamicValue) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let integration = self.parse(planned)?;

        let _guard = data.mutex_kv.lock(CLOUD_INTEGRATION_KEY).await;
        let created = data
            .client
            .cloud_integrations()
            .create(&integration)
            .await
            .map_err(|e| api_error("Failed to create cloud integration", e))?;
        tracing::info!(
            "created {} cloud integration {:?}",
            self.kind.service(),
            created.id
        );
        Ok(cloud_integration_to_state(self.kind, &created, planned))
    }

    async fn update_integration(
        &self,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        let mut integration = self.parse(planned)?;
        integration.id = Some(id.clone());

        let _guard = data.mutex_kv.lock(CLOUD_INTEGRATION_KEY).await;
        let updated = data
            .client
            .cloud_integrations()
            .update(&id, &integration)
            .await
            .map_err(|e| api_error("Failed to update cloud integration", e))?;
        Ok(cloud_integration_to_state(self.kind, &updated, planned))
    }

    async fn delete_integration(&self, prior: &DynamicValue) -> Result<(), Diagnostic> {
        let data = configured(&self.provider_data)?;
        let id = required_id(prior)?;
        deleted(
            data.client.cloud_integrations().delete(&id).await,
            "Failed to delete cloud integration",
        )
    }
}

#[async_trait]
impl Resource for CloudIntegrationResource {
    fn type_name(&self) -> &str {
        self.kind.type_name()
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let mut builder = SchemaBuilder::new()
            .version(0)
            .description(self.kind.description())
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown)
                    .build(),
            )
            .attribute(required_string("name", "Name of the integration"))
            .attribute(
                AttributeBuilder::new("service", AttributeType::String)
                    .description("The integrated service")
                    .computed()
                    .default(StaticDefault::string(self.kind.service()))
                    .build(),
            )
            .attribute(optional_map(
                "additional_tags",
                "Point tags added to every ingested metric",
            ))
            .attribute(
                AttributeBuilder::new("force_save", AttributeType::Bool)
                    .description("Save the integration without validating its credentials")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("service_refresh_rate_in_minutes", AttributeType::Number)
                    .description("How often the service is polled")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(DEFAULT_REFRESH_RATE as f64))
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    })
                    .build(),
            );
        for attribute in self.kind.attributes() {
            builder = builder.attribute(attribute);
        }
        for block in self.kind.blocks() {
            builder = builder.block(block);
        }

        ResourceSchemaResponse {
            schema: builder.build(),
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        create_response(self.create_integration(&request.planned_state).await)
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result = self.read_integration(&request.current_state).await;
        read_response(result, request)
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result = self
            .update_integration(&request.prior_state, &request.planned_state)
            .await;
        update_response(result, request.prior_state)
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        delete_response(self.delete_integration(&request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithConfigure for CloudIntegrationResource {
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
