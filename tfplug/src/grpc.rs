//! gRPC service implementation for Terraform Plugin Protocol v6
//!
//! Resources and data sources are created from the provider's factories on
//! every request and configured with the data returned by ConfigureProvider.
//! Schemas are loaded once and cached for the lifetime of the plugin.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan::plan_resource_change;
use crate::proto;
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderSchemaRequest,
    ResourceFactory, StopProviderRequest, ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest, ResourceWithConfigure,
    UpdateResourceRequest, UpgradeResourceStateRequest, ValidateResourceConfigRequest,
};
use crate::schema::{Attribute, Block, NestedBlock, NestingMode, Schema, StringKind};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, Diagnostic, DiagnosticSeverity, Dynamic,
    DynamicValue, RawState,
};
use crate::Result;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

struct SchemaCache {
    provider: Schema,
    resources: HashMap<String, Schema>,
    data_sources: HashMap<String, Schema>,
    diagnostics: Vec<Diagnostic>,
}

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<ProviderData>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    schemas: Arc<OnceCell<SchemaCache>>,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();

        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            resources,
            data_sources,
            schemas: Arc::new(OnceCell::new()),
        }
    }

    async fn schemas(&self) -> &SchemaCache {
        self.schemas
            .get_or_init(|| async {
                let mut diagnostics = Vec::new();

                let provider_schema = {
                    let provider = self.provider.read().await;
                    let response = provider
                        .schema(Context::new(), ProviderSchemaRequest)
                        .await;
                    diagnostics.extend(response.diagnostics);
                    response.schema
                };

                let mut resources = HashMap::new();
                for (name, factory) in &self.resources {
                    let response = factory()
                        .schema(Context::new(), ResourceSchemaRequest)
                        .await;
                    diagnostics.extend(response.diagnostics);
                    resources.insert(name.clone(), response.schema);
                }

                let mut data_sources = HashMap::new();
                for (name, factory) in &self.data_sources {
                    let response = factory()
                        .schema(Context::new(), DataSourceSchemaRequest)
                        .await;
                    diagnostics.extend(response.diagnostics);
                    data_sources.insert(name.clone(), response.schema);
                }

                tracing::debug!(
                    resources = resources.len(),
                    data_sources = data_sources.len(),
                    "loaded provider schemas"
                );

                SchemaCache {
                    provider: provider_schema,
                    resources,
                    data_sources,
                    diagnostics,
                }
            })
            .await
    }

    async fn resource_schema(&self, type_name: &str) -> std::result::Result<&Schema, Diagnostic> {
        self.schemas()
            .await
            .resources
            .get(type_name)
            .ok_or_else(|| unknown_type("resource", type_name))
    }

    async fn data_source_schema(
        &self,
        type_name: &str,
    ) -> std::result::Result<&Schema, Diagnostic> {
        self.schemas()
            .await
            .data_sources
            .get(type_name)
            .ok_or_else(|| unknown_type("data source", type_name))
    }

    async fn new_resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self
            .resources
            .get(type_name)
            .ok_or_else(|| vec![unknown_type("resource", type_name)])?;

        let mut resource = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(Context::new(), ConfigureResourceRequest { provider_data })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    async fn new_data_source(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self
            .data_sources
            .get(type_name)
            .ok_or_else(|| vec![unknown_type("data source", type_name)])?;

        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(Context::new(), ConfigureDataSourceRequest { provider_data })
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let mut resources: Vec<_> = self.resources.keys().cloned().collect();
        resources.sort();
        let mut data_sources: Vec<_> = self.data_sources.keys().cloned().collect();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        let schemas = self.schemas().await;

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&schemas.provider)),
            resource_schemas: schemas
                .resources
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect(),
            data_source_schemas: schemas
                .data_sources
                .iter()
                .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
                .collect(),
            diagnostics: diagnostics_to_proto(&schemas.diagnostics),
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let request = request.into_inner();
        let config = decode_dynamic_value(&request.config)?;

        let mut diagnostics = Vec::new();
        validate_block(
            &self.schemas().await.provider.block,
            &config.value,
            &AttributePath::root(),
            &mut diagnostics,
        );

        let provider = self.provider.read().await;
        let response = provider
            .validate(Context::new(), ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_resource_config::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "validate resource config");

        let config = decode_dynamic_value(&request.config)?;
        let mut diagnostics = Vec::new();

        match self.resource_schema(&request.type_name).await {
            Ok(schema) => validate_block(
                &schema.block,
                &config.value,
                &AttributePath::root(),
                &mut diagnostics,
            ),
            Err(diag) => diagnostics.push(diag),
        }

        if !has_errors(&diagnostics) {
            match self.new_resource(&request.type_name).await {
                Ok(resource) => {
                    let response = resource
                        .validate(
                            Context::new(),
                            ValidateResourceConfigRequest {
                                type_name: request.type_name.clone(),
                                config,
                            },
                        )
                        .await;
                    diagnostics.extend(response.diagnostics);
                }
                Err(diags) => diagnostics.extend(diags),
            }
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_data_resource_config::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "validate data source config");

        let config = decode_dynamic_value(&request.config)?;
        let mut diagnostics = Vec::new();

        match self.data_source_schema(&request.type_name).await {
            Ok(schema) => validate_block(
                &schema.block,
                &config.value,
                &AttributePath::root(),
                &mut diagnostics,
            ),
            Err(diag) => diagnostics.push(diag),
        }

        if !has_errors(&diagnostics) {
            match self.new_data_source(&request.type_name).await {
                Ok(data_source) => {
                    let response = data_source
                        .validate(
                            Context::new(),
                            ValidateDataSourceConfigRequest {
                                type_name: request.type_name.clone(),
                                config,
                            },
                        )
                        .await;
                    diagnostics.extend(response.diagnostics);
                }
                Err(diags) => diagnostics.extend(diags),
            }
        }

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(&diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<proto::upgrade_resource_state::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, version = request.version, "upgrade resource state");

        let raw_state = request.raw_state.map(|raw| RawState {
            json: (!raw.json.is_empty()).then_some(raw.json),
            flatmap: (!raw.flatmap.is_empty()).then_some(raw.flatmap),
        });
        let Some(raw_state) = raw_state else {
            return Ok(Response::new(proto::upgrade_resource_state::Response {
                upgraded_state: Some(encode_dynamic_value(&DynamicValue::null())?),
                diagnostics: vec![],
            }));
        };

        let schema = match self.resource_schema(&request.type_name).await {
            Ok(schema) => schema,
            Err(diag) => {
                return Ok(Response::new(proto::upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: diagnostics_to_proto(&[diag]),
                }))
            }
        };

        let resource = match self.new_resource(&request.type_name).await {
            Ok(resource) => resource,
            Err(diags) => {
                return Ok(Response::new(proto::upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: diagnostics_to_proto(&diags),
                }))
            }
        };

        let response = resource
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: request.type_name,
                    version: request.version,
                    raw_state,
                },
            )
            .await;

        let upgraded = DynamicValue::new(schema.normalize(&response.upgraded_state.value));

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_dynamic_value(&upgraded)?),
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let request = request.into_inner();
        tracing::info!(terraform_version = %request.terraform_version, "configuring provider");

        let config = decode_dynamic_value(&request.config)?;
        let mut provider = self.provider.write().await;
        let response = provider
            .configure(
                Context::new(),
                ConfigureProviderRequest {
                    terraform_version: request.terraform_version,
                    config,
                },
            )
            .await;

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> std::result::Result<Response<proto::read_resource::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "read resource");

        let current_state = decode_dynamic_value(&request.current_state)?;
        let (schema, resource) = match self.schema_and_resource(&request.type_name).await {
            Ok(found) => found,
            Err(diags) => {
                return Ok(Response::new(proto::read_resource::Response {
                    new_state: request.current_state,
                    diagnostics: diagnostics_to_proto(&diags),
                    private: request.private,
                }))
            }
        };

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: request.type_name.clone(),
                    current_state: current_state.clone(),
                    private: request.private,
                },
            )
            .await;

        let new_state = match response.new_state {
            Some(state) => DynamicValue::new(schema.normalize(&state.value)),
            None => {
                tracing::info!(type_name = %request.type_name, "resource no longer exists, removing from state");
                DynamicValue::null()
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            diagnostics: diagnostics_to_proto(&response.diagnostics),
            private: response.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> std::result::Result<Response<proto::plan_resource_change::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "plan resource change");

        let prior_state = decode_dynamic_value(&request.prior_state)?;
        let proposed_new_state = decode_dynamic_value(&request.proposed_new_state)?;
        let config = decode_dynamic_value(&request.config)?;

        let schema = match self.resource_schema(&request.type_name).await {
            Ok(schema) => schema,
            Err(diag) => {
                return Ok(Response::new(proto::plan_resource_change::Response {
                    planned_state: request.proposed_new_state,
                    requires_replace: vec![],
                    planned_private: request.prior_private,
                    diagnostics: diagnostics_to_proto(&[diag]),
                    legacy_type_system: true,
                }))
            }
        };

        let change = plan_resource_change(schema, &prior_state, &proposed_new_state, &config);

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&change.planned_state)?),
            requires_replace: change
                .requires_replace
                .iter()
                .map(attribute_path_to_proto)
                .collect(),
            planned_private: request.prior_private,
            diagnostics: diagnostics_to_proto(&change.diagnostics),
            legacy_type_system: true,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> std::result::Result<Response<proto::apply_resource_change::Response>, Status> {
        let request = request.into_inner();

        let prior_state = decode_dynamic_value(&request.prior_state)?;
        let planned_state = decode_dynamic_value(&request.planned_state)?;
        let config = decode_dynamic_value(&request.config)?;

        let (schema, resource) = match self.schema_and_resource(&request.type_name).await {
            Ok(found) => found,
            Err(diags) => {
                return Ok(Response::new(proto::apply_resource_change::Response {
                    new_state: request.prior_state,
                    private: request.planned_private,
                    diagnostics: diagnostics_to_proto(&diags),
                    legacy_type_system: true,
                }))
            }
        };

        let creating = prior_state.is_null();
        let type_name = request.type_name.clone();
        let ctx = Context::new();

        let (new_state, private, mut diagnostics) = if planned_state.is_null() {
            tracing::info!(type_name = %type_name, "deleting resource");
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name,
                        prior_state: prior_state.clone(),
                        planned_private: request.planned_private,
                    },
                )
                .await;
            let state = if has_errors(&response.diagnostics) {
                prior_state.clone()
            } else {
                DynamicValue::null()
            };
            (state, vec![], response.diagnostics)
        } else if creating {
            tracing::info!(type_name = %type_name, "creating resource");
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name,
                        planned_state,
                        config,
                        planned_private: request.planned_private,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        } else {
            tracing::info!(type_name = %type_name, "updating resource");
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name,
                        prior_state: prior_state.clone(),
                        planned_state,
                        config,
                        planned_private: request.planned_private,
                    },
                )
                .await;
            (response.new_state, response.private, response.diagnostics)
        };

        let mut new_state = if new_state.is_null() {
            new_state
        } else {
            DynamicValue::new(schema.normalize(&new_state.value))
        };

        // Terraform rejects unknown values in applied state
        if !new_state.value.is_fully_known() {
            if !has_errors(&diagnostics) {
                diagnostics.push(Diagnostic::error(
                    "Provider returned unknown values after apply",
                    format!(
                        "{} left computed attributes unset; this is a bug in the provider",
                        request.type_name
                    ),
                ));
            }
            new_state = if creating {
                DynamicValue::null()
            } else {
                prior_state
            };
        }

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(&diagnostics),
            legacy_type_system: true,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> std::result::Result<Response<proto::import_resource_state::Response>, Status> {
        let request = request.into_inner();
        tracing::info!(type_name = %request.type_name, id = %request.id, "importing resource");

        let (schema, resource) = match self.schema_and_resource(&request.type_name).await {
            Ok(found) => found,
            Err(diags) => {
                return Ok(Response::new(proto::import_resource_state::Response {
                    imported_resources: vec![],
                    diagnostics: diagnostics_to_proto(&diags),
                }))
            }
        };

        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: request.type_name,
                    id: request.id,
                },
            )
            .await;

        let mut imported_resources = Vec::with_capacity(response.imported_resources.len());
        for imported in response.imported_resources {
            let state = DynamicValue::new(schema.normalize(&imported.state.value));
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: imported.type_name,
                state: Some(encode_dynamic_value(&state)?),
                private: imported.private,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> std::result::Result<Response<proto::read_data_source::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "read data source");

        let config = decode_dynamic_value(&request.config)?;

        let schema = match self.data_source_schema(&request.type_name).await {
            Ok(schema) => schema,
            Err(diag) => {
                return Ok(Response::new(proto::read_data_source::Response {
                    state: None,
                    diagnostics: diagnostics_to_proto(&[diag]),
                }))
            }
        };

        let data_source = match self.new_data_source(&request.type_name).await {
            Ok(data_source) => data_source,
            Err(diags) => {
                return Ok(Response::new(proto::read_data_source::Response {
                    state: None,
                    diagnostics: diagnostics_to_proto(&diags),
                }))
            }
        };

        let response = data_source
            .read(
                Context::new(),
                ReadDataSourceRequest {
                    type_name: request.type_name,
                    config,
                },
            )
            .await;

        let state = DynamicValue::new(schema.normalize(&response.state.value));

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic_value(&state)?),
            diagnostics: diagnostics_to_proto(&response.diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        tracing::info!("stop requested");
        let provider = self.provider.read().await;
        let response = provider.stop(Context::new(), StopProviderRequest).await;

        Ok(Response::new(proto::stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    async fn schema_and_resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<(&Schema, Box<dyn ResourceWithConfigure>), Vec<Diagnostic>> {
        let schema = self
            .resource_schema(type_name)
            .await
            .map_err(|diag| vec![diag])?;
        let resource = self.new_resource(type_name).await?;
        Ok((schema, resource))
    }
}

fn unknown_type(kind: &str, type_name: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Unknown {} type", kind),
        format!("This provider does not support the {} \"{}\"", kind, type_name),
    )
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: true,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

/// Checks value types and runs attribute validators through a block,
/// descending into nested blocks
fn validate_block(
    block: &Block,
    value: &Dynamic,
    path: &AttributePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(values) = value.as_map() else {
        return;
    };

    for attr in &block.attributes {
        let Some(v) = values.get(&attr.name) else {
            continue;
        };
        let attr_path = path.clone().attribute(&attr.name);
        if !attr.r#type.accepts(v) {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid attribute type",
                    format!(
                        "{} must be a {}, got {}",
                        attr_path,
                        attr.r#type.name(),
                        v.type_name()
                    ),
                )
                .with_attribute(attr_path),
            );
            continue;
        }
        for validator in &attr.validators {
            validator.validate(v, &attr_path, diagnostics);
        }
    }

    for nested in &block.block_types {
        let nested_path = path.clone().attribute(&nested.type_name);
        match values.get(&nested.type_name) {
            Some(Dynamic::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    validate_block(
                        &nested.block,
                        item,
                        &nested_path.clone().index(i as i64),
                        diagnostics,
                    );
                }
            }
            Some(item @ Dynamic::Map(_)) => {
                validate_block(&nested.block, item, &nested_path, diagnostics)
            }
            _ => {}
        }
    }
}

pub(crate) fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> proto::schema::Block {
    proto::schema::Block {
        version: block.version,
        attributes: block.attributes.iter().map(attribute_to_proto).collect(),
        block_types: block.block_types.iter().map(nested_block_to_proto).collect(),
        description: block.description.clone(),
        description_kind: string_kind_to_proto(block.description_kind) as i32,
        deprecated: block.deprecated,
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type: attr.r#type.to_bytes(),
        nested_type: None,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attr.deprecated,
        write_only: false,
    }
}

fn nested_block_to_proto(nested: &NestedBlock) -> proto::schema::NestedBlock {
    use proto::schema::nested_block::NestingMode as ProtoNesting;

    let nesting = match nested.nesting {
        NestingMode::Invalid => ProtoNesting::Invalid,
        NestingMode::Single => ProtoNesting::Single,
        NestingMode::List => ProtoNesting::List,
        NestingMode::Set => ProtoNesting::Set,
        NestingMode::Map => ProtoNesting::Map,
        NestingMode::Group => ProtoNesting::Group,
    };

    proto::schema::NestedBlock {
        type_name: nested.type_name.clone(),
        block: Some(block_to_proto(&nested.block)),
        nesting: nesting as i32,
        min_items: nested.min_items,
        max_items: nested.max_items,
    }
}

fn string_kind_to_proto(kind: StringKind) -> proto::StringKind {
    match kind {
        StringKind::Plain => proto::StringKind::Plain,
        StringKind::Markdown => proto::StringKind::Markdown,
    }
}

fn decode_dynamic_value(value: &Option<proto::DynamicValue>) -> Result<DynamicValue> {
    match value {
        Some(dv) if !dv.msgpack.is_empty() => DynamicValue::decode_msgpack(&dv.msgpack),
        Some(dv) if !dv.json.is_empty() => DynamicValue::decode_json(&dv.json),
        _ => Ok(DynamicValue::null()),
    }
}

fn encode_dynamic_value(value: &DynamicValue) -> Result<proto::DynamicValue> {
    Ok(proto::DynamicValue {
        msgpack: value.encode_msgpack()?,
        json: vec![],
    })
}

fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| proto::attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: &[Diagnostic]) -> Vec<proto::Diagnostic> {
    diagnostics
        .iter()
        .map(|diag| proto::Diagnostic {
            severity: match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            } as i32,
            summary: diag.summary.clone(),
            detail: diag.detail.clone(),
            attribute: diag.attribute.as_ref().map(attribute_path_to_proto),
        })
        .collect()
}
