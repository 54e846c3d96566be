//! Validator configuration
//!
//! A [`ValidatorConfig`] is built once at startup and shared read-only by
//! every request through an `Arc`. It owns the predicate and sanitizer
//! registries, the error formatter and the coercion step.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::coerce::{legacy_string, CoerceFn};
use crate::predicates::{
    FnPredicate, FnTransform, Input, Outcome, Predicates, Sanitizers,
};

/// Builds the error shape recorded for a failed check from
/// `(param, msg, value)`
pub type ErrorFormatter = Arc<dyn Fn(&str, &str, Option<&Value>) -> Value + Send + Sync>;

/// Error shape produced by [`default_error_formatter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub param: String,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(param: impl Into<String>, msg: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            param: param.into(),
            msg: msg.into(),
            value,
        }
    }
}

/// `{param, msg, value}`; `value` is left out when the field was absent
pub fn default_error_formatter(param: &str, msg: &str, value: Option<&Value>) -> Value {
    let mut error = Map::new();
    error.insert("param".to_string(), Value::String(param.to_string()));
    error.insert("msg".to_string(), Value::String(msg.to_string()));
    if let Some(value) = value {
        error.insert("value".to_string(), value.clone());
    }
    Value::Object(error)
}

/// Shared, immutable validator configuration
#[derive(Clone)]
pub struct ValidatorConfig {
    predicates: Predicates,
    sanitizers: Sanitizers,
    error_formatter: ErrorFormatter,
    coerce: CoerceFn,
}

impl ValidatorConfig {
    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::default()
    }

    pub fn predicates(&self) -> &Predicates {
        &self.predicates
    }

    pub fn sanitizers(&self) -> &Sanitizers {
        &self.sanitizers
    }

    /// Run the configured error formatter
    pub fn format_error(&self, param: &str, msg: &str, value: Option<&Value>) -> Value {
        (self.error_formatter)(param, msg, value)
    }

    /// Wrap a request value for a predicate or transform call
    pub fn input(&self, value: Option<&Value>) -> Input {
        Input::new(value.cloned(), self.coerce)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("predicates", &self.predicates)
            .field("sanitizers", &self.sanitizers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ValidatorConfig`]
pub struct ValidatorConfigBuilder {
    predicates: Predicates,
    sanitizers: Sanitizers,
    error_formatter: ErrorFormatter,
    coerce: CoerceFn,
}

impl Default for ValidatorConfigBuilder {
    fn default() -> Self {
        Self {
            predicates: Predicates::new(),
            sanitizers: Sanitizers::new(),
            error_formatter: Arc::new(default_error_formatter),
            coerce: legacy_string,
        }
    }
}

impl ValidatorConfigBuilder {
    /// Register a validator. The closure returns `bool` for synchronous checks
    /// or [`Outcome::deferred`] for asynchronous ones. A name matching a
    /// built-in replaces the built-in.
    pub fn custom_validator<F, O>(mut self, name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Input, &[Value]) -> O + Send + Sync + 'static,
        O: Into<Outcome> + 'static,
    {
        self.predicates.insert(name, Arc::new(FnPredicate(validator)));
        self
    }

    /// Register a sanitizer
    pub fn custom_sanitizer<F>(mut self, name: impl Into<String>, sanitizer: F) -> Self
    where
        F: Fn(&Input, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.sanitizers.insert(name, Arc::new(FnTransform(sanitizer)));
        self
    }

    pub fn error_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str, &str, Option<&Value>) -> Value + Send + Sync + 'static,
    {
        self.error_formatter = Arc::new(formatter);
        self
    }

    /// Replace the string coercion applied before every predicate call
    pub fn coerce_with(mut self, coerce: CoerceFn) -> Self {
        self.coerce = coerce;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        ValidatorConfig {
            predicates: self.predicates,
            sanitizers: self.sanitizers,
            error_formatter: self.error_formatter,
            coerce: self.coerce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_formatter_shape() {
        let error = default_error_formatter("email", "Invalid value", Some(&json!("incorrect")));
        assert_eq!(
            error,
            json!({ "param": "email", "msg": "Invalid value", "value": "incorrect" })
        );

        let error = default_error_formatter("email", "Invalid value", None);
        assert_eq!(error, json!({ "param": "email", "msg": "Invalid value" }));
    }

    #[test]
    fn test_field_error_deserializes_default_shape() {
        let error: FieldError =
            serde_json::from_value(default_error_formatter("age", "bad age", None)).unwrap();
        assert_eq!(error, FieldError::new("age", "bad age", None));
    }

    #[test]
    fn test_builder_registers_extensions() {
        let config = ValidatorConfig::builder()
            .custom_validator("isAnswer", |input: &Input, _: &[Value]| input.as_str() == "42")
            .custom_sanitizer("toShout", |input: &Input, _: &[Value]| {
                json!(input.as_str().to_uppercase())
            })
            .build();

        assert!(config.predicates().has("isAnswer"));
        assert!(config.sanitizers().has("toShout"));

        let value = config
            .sanitizers()
            .invoke("toShout", &config.input(Some(&json!("hey"))), &[])
            .unwrap();
        assert_eq!(value, json!("HEY"));
    }

    #[test]
    fn test_custom_formatter_and_coercion() {
        fn always_x(_: Option<&Value>) -> String {
            "x".to_string()
        }

        let config = ValidatorConfig::builder()
            .error_formatter(|param: &str, msg: &str, _: Option<&Value>| {
                json!(format!("{}: {}", param, msg))
            })
            .coerce_with(always_x)
            .build();

        assert_eq!(config.format_error("a", "b", None), json!("a: b"));
        assert_eq!(config.input(Some(&json!(1))).as_str(), "x");
    }
}
