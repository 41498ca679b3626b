//! Default value providers for attributes
//!
//! Defaults are applied during planning to optional attributes that are null
//! in configuration. The attribute must also be computed, otherwise Terraform
//! rejects a planned value that differs from configuration.
//!
//! ```no_run
//! use tfplug::schema::{AttributeBuilder, AttributeType};
//! use tfplug::defaults::StaticDefault;
//!
//! let minutes = AttributeBuilder::new("resolve_after_minutes", AttributeType::Number)
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::number(0.0))
//!     .build();
//! ```

use crate::types::{AttributePath, Dynamic};
use std::env;

/// Default provides a value for an attribute absent from configuration
pub trait Default: Send + Sync {
    fn description(&self) -> String;

    fn default_value(&self, path: &AttributePath) -> Dynamic;
}

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Self {
        Self { value }
    }

    pub fn string(value: &str) -> Self {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Self {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Self {
        Self::create(Dynamic::List(values))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _path: &AttributePath) -> Dynamic {
        self.value.clone()
    }
}

/// EnvDefault reads the default from an environment variable
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Self {
        Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        }
    }

    pub fn create_optional(env_var: &str) -> Self {
        Self {
            env_var: env_var.to_string(),
            fallback: None,
        }
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                self.env_var, fallback
            ),
            None => format!("default from environment variable {}", self.env_var),
        }
    }

    fn default_value(&self, _path: &AttributePath) -> Dynamic {
        match env::var(&self.env_var) {
            Ok(value) if !value.is_empty() => Dynamic::String(value),
            _ => self
                .fallback
                .clone()
                .map(Dynamic::String)
                .unwrap_or(Dynamic::Null),
        }
    }
}
