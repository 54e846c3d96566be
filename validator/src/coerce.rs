//! String coercion applied before every predicate and transform call
//!
//! Built-in predicates only ever see strings. The coercion used is part of
//! the configuration (`ValidatorConfig::builder().coerce_with(..)`); this
//! module provides the legacy rules as the default.

use serde_json::{Number, Value};

/// Signature of a coercion step
pub type CoerceFn = fn(Option<&Value>) -> String;

/// Legacy coercion: absent and null become `""`, numbers print without a
/// trailing `.0`, arrays join their elements with `,` and objects become
/// `[object Object]`.
pub fn legacy_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(other) => display(other),
    }
}

/// String form of a message argument. Differs from [`legacy_string`] only for
/// absent (`undefined`) and null (`null`) values.
pub fn message_arg(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(other) => display(other),
    }
}

/// Truthiness of a request value: absent, null, `""`, `0` and `false` are falsy
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
