//! Protocol buffer types for Terraform Plugin Protocol v6
//!
//! Generated at build time by tonic_build from `proto/tfplugin6.proto` and
//! included here.
//!
//! # Type Naming
//!
//! - Top-level messages become structs (e.g., `DynamicValue`, `Schema`)
//! - RPC methods have nested `Request` and `Response` types in snake_case modules
//!   (e.g., `get_provider_schema::Request`, `read_resource::Response`)
//! - Nested messages are in sub-modules (e.g., `diagnostic::Severity`)
//! - The gRPC service trait is available as `provider_server::Provider`
//!
//! Some protobuf types share names with tfplug framework types. Always use
//! the `proto::` prefix when referring to the generated ones.

include!(concat!(env!("OUT_DIR"), "/tfplugin6.rs"));

pub use provider_server::{Provider as ProviderService, ProviderServer};
