//! Conversion between Terraform attribute values and typed models
//!
//! Resources parse planned state once into their model structs with
//! [`Attrs`], and build new state from API objects with [`StateBuilder`].
//! Unknown values read as absent.

use std::collections::HashMap;
use thiserror::Error;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("missing required attribute '{0}'")]
    MissingAttribute(String),

    #[error("attribute '{name}' must be {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("attribute '{name}' is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

impl ModelError {
    pub fn invalid(name: &str, reason: impl Into<String>) -> Self {
        ModelError::Invalid {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn attribute(&self) -> &str {
        match self {
            ModelError::MissingAttribute(name) => name,
            ModelError::TypeMismatch { name, .. } => name,
            ModelError::Invalid { name, .. } => name,
        }
    }

    /// Error diagnostic pointing at the offending top level attribute
    pub fn to_diagnostic(&self, summary: &str) -> Diagnostic {
        let diagnostic = Diagnostic::error(summary, self.to_string());
        match self.attribute().split('.').next() {
            Some(root) if !root.is_empty() => diagnostic.with_attribute(AttributePath::new(root)),
            _ => diagnostic,
        }
    }
}

/// Read access to an object value
#[derive(Clone, Copy)]
pub struct Attrs<'a> {
    values: Option<&'a HashMap<String, Dynamic>>,
    prefix: &'a str,
}

impl<'a> Attrs<'a> {
    pub fn new(value: &'a DynamicValue) -> Self {
        Self::from_dynamic(&value.value)
    }

    pub fn from_dynamic(value: &'a Dynamic) -> Self {
        Self {
            values: value.as_map(),
            prefix: "",
        }
    }

    fn nested(value: &'a Dynamic, prefix: &'a str) -> Self {
        Self {
            values: value.as_map(),
            prefix,
        }
    }

    fn name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix, name)
        }
    }

    /// The value of an attribute when it is neither null nor unknown
    pub fn get(&self, name: &str) -> Option<&'a Dynamic> {
        self.values
            .and_then(|m| m.get(name))
            .filter(|v| !v.is_null() && !v.is_unknown())
    }

    pub fn is_unknown(&self, name: &str) -> bool {
        self.values
            .and_then(|m| m.get(name))
            .is_some_and(Dynamic::is_unknown)
    }

    fn mismatch(&self, name: &str, expected: &'static str, actual: &Dynamic) -> ModelError {
        ModelError::TypeMismatch {
            name: self.name(name),
            expected,
            actual: actual.type_name(),
        }
    }

    pub fn string(&self, name: &str) -> Result<Option<String>, ModelError> {
        match self.get(name) {
            None => Ok(None),
            Some(Dynamic::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.mismatch(name, "a string", other)),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<String, ModelError> {
        self.string(name)?
            .ok_or_else(|| ModelError::MissingAttribute(self.name(name)))
    }

    /// The string value, or "" when absent
    pub fn string_or_empty(&self, name: &str) -> Result<String, ModelError> {
        Ok(self.string(name)?.unwrap_or_default())
    }

    pub fn i64(&self, name: &str) -> Result<Option<i64>, ModelError> {
        match self.get(name) {
            None => Ok(None),
            Some(Dynamic::Number(n)) if n.fract() == 0.0 => Ok(Some(*n as i64)),
            Some(other) => Err(self.mismatch(name, "a whole number", other)),
        }
    }

    pub fn required_i64(&self, name: &str) -> Result<i64, ModelError> {
        self.i64(name)?
            .ok_or_else(|| ModelError::MissingAttribute(self.name(name)))
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>, ModelError> {
        match self.get(name) {
            None => Ok(None),
            Some(Dynamic::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.mismatch(name, "a bool", other)),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ModelError> {
        Ok(self.bool(name)?.unwrap_or(default))
    }

    /// A list or set of strings, empty when absent
    pub fn strings(&self, name: &str) -> Result<Vec<String>, ModelError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Dynamic::List(items)) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| match item {
                    Dynamic::String(s) => Ok(s.clone()),
                    other => Err(self.mismatch(name, "a list of strings", other)),
                })
                .collect(),
            Some(other) => Err(self.mismatch(name, "a list of strings", other)),
        }
    }

    /// A map of strings, empty when absent
    pub fn string_map(&self, name: &str) -> Result<HashMap<String, String>, ModelError> {
        match self.get(name) {
            None => Ok(HashMap::new()),
            Some(Dynamic::Map(items)) => items
                .iter()
                .map(|(k, v)| match v {
                    Dynamic::String(s) => Ok((k.clone(), s.clone())),
                    other => Err(self.mismatch(name, "a map of strings", other)),
                })
                .collect(),
            Some(other) => Err(self.mismatch(name, "a map of strings", other)),
        }
    }

    /// The objects of a nested block or list of objects, empty when absent
    pub fn objects(&self, name: &'a str) -> Result<Vec<Attrs<'a>>, ModelError> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(Dynamic::List(items)) => Ok(items
                .iter()
                .map(|item| Attrs::nested(item, name))
                .collect()),
            Some(other) => Err(self.mismatch(name, "a list of objects", other)),
        }
    }

    /// The single object of an at-most-one nested block
    pub fn object(&self, name: &'a str) -> Result<Option<Attrs<'a>>, ModelError> {
        match self.get(name) {
            None => Ok(None),
            Some(Dynamic::List(items)) => Ok(items.first().map(|item| Attrs::nested(item, name))),
            Some(item @ Dynamic::Map(_)) => Ok(Some(Attrs::nested(item, name))),
            Some(other) => Err(self.mismatch(name, "an object", other)),
        }
    }
}

/// Builds an object value attribute by attribute
#[derive(Debug, Default, Clone)]
pub struct StateBuilder {
    values: HashMap<String, Dynamic>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn strings(self, name: &str, items: &[String]) -> Self {
        self.set(name, Dynamic::string_list(items.iter().cloned()))
    }

    pub fn string_map(self, name: &str, items: &HashMap<String, String>) -> Self {
        self.set(
            name,
            Dynamic::string_map(items.iter().map(|(k, v)| (k.clone(), v.clone()))),
        )
    }

    /// A list that reads as null when empty
    pub fn optional_strings(self, name: &str, items: &[String]) -> Self {
        if items.is_empty() {
            self.set(name, Dynamic::Null)
        } else {
            self.strings(name, items)
        }
    }

    /// A map that reads as null when empty
    pub fn optional_map(self, name: &str, items: &HashMap<String, String>) -> Self {
        if items.is_empty() {
            self.set(name, Dynamic::Null)
        } else {
            self.string_map(name, items)
        }
    }

    /// A string that reads as null when empty
    pub fn non_empty(self, name: &str, value: &str) -> Self {
        if value.is_empty() {
            self.set(name, Dynamic::Null)
        } else {
            self.set(name, value)
        }
    }

    pub fn objects(self, name: &str, items: Vec<StateBuilder>) -> Self {
        self.set(
            name,
            Dynamic::List(items.into_iter().map(StateBuilder::into_dynamic).collect()),
        )
    }

    pub fn into_dynamic(self) -> Dynamic {
        Dynamic::Map(self.values)
    }

    pub fn build(self) -> DynamicValue {
        DynamicValue::from_map(self.values)
    }
}

/// Id for data sources: the current Unix time, so they are re-read on every plan
pub fn data_source_id() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// The `id` attribute of a state value
pub fn state_id(state: &DynamicValue) -> Option<String> {
    state
        .attr("id")
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value() -> DynamicValue {
        StateBuilder::new()
            .set("name", "cpu")
            .set("minutes", 5i64)
            .set("enabled", true)
            .set("id", Dynamic::Unknown)
            .strings("tags", &["a".to_string(), "b".to_string()])
            .set(
                "source",
                Dynamic::List(vec![StateBuilder::new().set("query", "ts(x)").into_dynamic()]),
            )
            .build()
    }

    #[test]
    fn reads_typed_values() {
        let state = value();
        let attrs = Attrs::new(&state);

        assert_eq!(attrs.required_string("name").unwrap(), "cpu");
        assert_eq!(attrs.i64("minutes").unwrap(), Some(5));
        assert_eq!(attrs.bool("enabled").unwrap(), Some(true));
        assert_eq!(attrs.strings("tags").unwrap(), vec!["a", "b"]);
        assert!(attrs.string_map("missing").unwrap().is_empty());
    }

    #[test]
    fn unknown_reads_as_absent() {
        let state = value();
        let attrs = Attrs::new(&state);

        assert!(attrs.is_unknown("id"));
        assert_eq!(attrs.string("id").unwrap(), None);
        assert_eq!(
            attrs.required_string("id").unwrap_err(),
            ModelError::MissingAttribute("id".to_string())
        );
    }

    #[test]
    fn type_mismatch_names_the_attribute() {
        let state = value();
        let err = Attrs::new(&state).string("minutes").unwrap_err();
        assert_eq!(err.attribute(), "minutes");
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn nested_errors_carry_the_block_name() {
        let state = value();
        let attrs = Attrs::new(&state);
        let sources = attrs.objects("source").unwrap();

        assert_eq!(sources[0].required_string("query").unwrap(), "ts(x)");
        let err = sources[0].required_string("name").unwrap_err();
        assert_eq!(err.attribute(), "source.name");

        let diagnostic = err.to_diagnostic("Invalid dashboard");
        assert_eq!(diagnostic.attribute, Some(AttributePath::new("source")));
    }

    #[test]
    fn empty_strings_become_null() {
        let state = StateBuilder::new().non_empty("a", "").non_empty("b", "x").build();
        assert!(state.attr("a").is_null());
        assert_eq!(state.attr("b").as_str(), Some("x"));
    }

    #[test]
    fn empty_collections_become_null() {
        let state = StateBuilder::new()
            .optional_strings("tags", &[])
            .optional_map("conditions", &HashMap::new())
            .optional_strings("links", &["a".to_string()])
            .build();
        assert!(state.attr("tags").is_null());
        assert!(state.attr("conditions").is_null());
        assert_eq!(state.attr("links").as_list().map(Vec::len), Some(1));
    }

    #[test]
    fn state_id_ignores_empty_and_unknown() {
        assert_eq!(state_id(&value()), None);
        let state = StateBuilder::new().set("id", "42").build();
        assert_eq!(state_id(&state), Some("42".to_string()));
    }
}
