//! Aggregated validation output
//!
//! [`ValidationErrors`] is what the aggregation calls hand back when a request
//! failed validation. It serializes to the bare list or mapping of formatted
//! errors and converts into a `400 Bad Request` response.
//! [`ValidationResult`] is the never-failing view returned by
//! `ValidationContext::validation_result`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// A formatted error together with the rendered path it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    param: String,
    error: Value,
}

impl ErrorEntry {
    pub fn new(param: impl Into<String>, error: Value) -> Self {
        Self {
            param: param.into(),
            error,
        }
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// The value produced by the error formatter
    pub fn error(&self) -> &Value {
        &self.error
    }
}

/// Errors collected for one request
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(untagged)]
pub enum ValidationErrors {
    #[error("validation failed with {} error(s)", .0.len())]
    List(Vec<Value>),

    /// Keyed by rendered path; the last error recorded for a path wins
    #[error("validation failed for {} field(s)", .0.len())]
    Mapped(Map<String, Value>),
}

impl ValidationErrors {
    pub fn from_entries(entries: &[ErrorEntry], mapped: bool) -> Self {
        if mapped {
            ValidationErrors::Mapped(
                entries
                    .iter()
                    .map(|entry| (entry.param.clone(), entry.error.clone()))
                    .collect(),
            )
        } else {
            ValidationErrors::List(entries.iter().map(|entry| entry.error.clone()).collect())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValidationErrors::List(errors) => errors.len(),
            ValidationErrors::Mapped(errors) => errors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            ValidationErrors::List(errors) => Some(errors),
            ValidationErrors::Mapped(_) => None,
        }
    }

    pub fn as_mapped(&self) -> Option<&Map<String, Value>> {
        match self {
            ValidationErrors::Mapped(errors) => Some(errors),
            ValidationErrors::List(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            ValidationErrors::List(errors) => Value::Array(errors.clone()),
            ValidationErrors::Mapped(errors) => Value::Object(errors.clone()),
        }
    }

    /// Field names mentioned by the errors, when the formatter exposes them
    fn fields(&self) -> Vec<String> {
        match self {
            ValidationErrors::List(errors) => errors
                .iter()
                .filter_map(|error| error.get("param").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
            ValidationErrors::Mapped(errors) => errors.keys().cloned().collect(),
        }
    }
}

/// Validation error response body
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub message: String,
    pub errors: ValidationErrors,
    pub code: u16,
    pub timestamp: String,
    pub correlation_id: String,
}

impl ValidationErrorResponse {
    pub fn new(errors: ValidationErrors) -> Self {
        let fields = errors.fields();
        let message = match (errors.len(), fields.first()) {
            (1, Some(field)) => format!("Validation failed for field '{}'", field),
            (count, _) => format!("Validation failed for {} fields", count),
        };

        Self {
            error: "ValidationError".to_string(),
            message,
            errors,
            code: StatusCode::BAD_REQUEST.as_u16(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        let response = ValidationErrorResponse::new(self);
        (StatusCode::BAD_REQUEST, Json(response)).into_response()
    }
}

/// Settled validation outcome for one request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    entries: Vec<ErrorEntry>,
    first_only: bool,
}

impl ValidationResult {
    pub fn new(entries: Vec<ErrorEntry>) -> Self {
        Self {
            entries,
            first_only: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Errors in recording order
    pub fn array(&self) -> Vec<Value> {
        self.selected().map(|entry| entry.error.clone()).collect()
    }

    /// Errors keyed by rendered path
    pub fn mapped(&self) -> Map<String, Value> {
        self.selected()
            .map(|entry| (entry.param.clone(), entry.error.clone()))
            .collect()
    }

    /// Keep only the first error recorded for each path
    pub fn use_first_error_only(mut self) -> Self {
        self.first_only = true;
        self
    }

    /// `Err` with the error list when anything failed
    pub fn throw(&self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors::List(self.array()))
        }
    }

    fn selected(&self) -> impl Iterator<Item = &ErrorEntry> + '_ {
        let mut seen = HashSet::new();
        let first_only = self.first_only;
        self.entries
            .iter()
            .filter(move |entry| !first_only || seen.insert(entry.param.as_str()))
    }
}
