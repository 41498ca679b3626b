//! Wavefront REST API client and entity models

pub mod client;
pub mod common;
pub mod error;

pub mod alert;
pub mod alert_target;
pub mod cloud_integration;
pub mod dashboard;
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

pub use client::{Client, EntityApi};
pub use common::{AccessControlList, SearchCondition, SearchRequest, WFTags, PAGE_SIZE};
pub use error::ApiError;
