//! Attribute validators
//!
//! Validators run against configuration values during ValidateResourceConfig
//! and ValidateDataResourceConfig. Null and unknown values are never checked.

use crate::error::TfplugError;
use crate::types::{AttributePath, Diagnostic, Dynamic};

pub trait Validator: Send + Sync {
    fn description(&self) -> String;

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>);
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if let Some(min) = self.min {
                if s.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", path, min),
                            format!("Got length {}", s.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if s.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", path, max),
                            format!("Got length {}", s.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn new(pattern: &str, description: impl Into<String>) -> crate::Result<Self> {
        let pattern = regex::Regex::new(pattern).map_err(|e| {
            TfplugError::InvalidConfiguration(format!("pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern,
            description: description.into(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

/// Accepts only strings from a fixed set of values
pub struct OneOfValidator {
    pub values: Vec<String>,
}

impl OneOfValidator {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for OneOfValidator {
    fn description(&self) -> String {
        format!("one of {}", self.values.join(", "))
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(s) = value.as_str() {
            if !self.values.iter().any(|v| v == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} has an unsupported value", path),
                        format!("Expected one of [{}], got '{}'", self.values.join(", "), s),
                    )
                    .with_attribute(path.clone()),
                );
            }
        }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        format!("number between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(n) = value.as_number() {
            if let Some(min) = self.min {
                if n < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at least {}", path, min),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if n > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must be at most {}", path, max),
                            format!("Got {}", n),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, value: &Dynamic, path: &AttributePath, diagnostics: &mut Vec<Diagnostic>) {
        if let Some(items) = value.as_list() {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at least {} items", path, min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at most {} items", path, max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(path.clone()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> AttributePath {
        AttributePath::new("field")
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator {
            min: Some(5),
            max: None,
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("hi"), &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length"));
        assert_eq!(diags[0].attribute, Some(path()));
    }

    #[test]
    fn string_pattern_validator_checks_prefix() {
        let validator = StringPatternValidator {
            pattern: regex::Regex::new(r"^sa::").unwrap(),
            description: "a service account identifier starting with sa::".to_string(),
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("sa::robot"), &path(), &mut diags);
        assert!(diags.is_empty());

        validator.validate(&Dynamic::from("robot"), &path(), &mut diags);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("sa::"));
    }

    #[test]
    fn string_pattern_validator_reports_bad_pattern() {
        let err = StringPatternValidator::new("[a-", "broken").err().unwrap();
        assert!(matches!(err, TfplugError::InvalidConfiguration(_)));

        let validator = StringPatternValidator::new(r"^[a-z]+$", "lowercase letters").unwrap();
        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("ok"), &path(), &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn one_of_validator_rejects_unlisted_value() {
        let validator = OneOfValidator::new(["CLASSIC", "THRESHOLD"]);

        let mut diags = Vec::new();
        validator.validate(&Dynamic::from("CLASSIC"), &path(), &mut diags);
        assert!(diags.is_empty());

        validator.validate(&Dynamic::from("classic"), &path(), &mut diags);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn validators_skip_unknown_and_null() {
        let validator = OneOfValidator::new(["A"]);

        let mut diags = Vec::new();
        validator.validate(&Dynamic::Unknown, &path(), &mut diags);
        validator.validate(&Dynamic::Null, &path(), &mut diags);

        assert!(diags.is_empty());
    }

    #[test]
    fn number_range_validator_rejects_too_small() {
        let validator = NumberRangeValidator {
            min: Some(10.0),
            max: None,
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::Number(5.0), &path(), &mut diags);

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("at least"));
    }

    #[test]
    fn list_length_validator_accepts_valid_length() {
        let validator = ListLengthValidator {
            min: Some(1),
            max: Some(5),
        };

        let mut diags = Vec::new();
        validator.validate(&Dynamic::string_list(["a", "b"]), &path(), &mut diags);

        assert!(diags.is_empty());
    }
}
