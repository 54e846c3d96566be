//! Declarative validation schemas
//!
//! A schema maps field paths to rule sets:
//!
//! ```json
//! {
//!   "age": {
//!     "in": "params",
//!     "errorMessage": "age is required",
//!     "notEmpty": true,
//!     "isInt": { "options": [{ "min": 0, "max": 120 }], "errorMessage": "bad age" }
//!   }
//! }
//! ```
//!
//! `in`, `errorMessage` and `optional` are reserved keys; every other key
//! names a validator. Fields and rules run in declared order.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::chain::OptionalOptions;
use crate::coerce::is_truthy;
use crate::context::ValidationContext;
use crate::error::{Result, ValidatorError};
use crate::location::{locate, Location, SchemaLocation};
use crate::path::FieldPath;

const DEFAULT_PARAM_MESSAGE: &str = "Invalid param";

/// Options and message for one rule
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSpec {
    options: Vec<Value>,
    error_message: Option<String>,
}

impl RuleSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call arguments passed after the value
    pub fn options(mut self, options: Vec<Value>) -> Self {
        self.options = options;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// `true` or any scalar runs the rule without options; an object may carry
    /// `options` (a lone value is wrapped into a one-element list) and
    /// `errorMessage`.
    fn from_value(value: &Value) -> Self {
        let Value::Object(spec) = value else {
            return Self::default();
        };

        let options = match spec.get("options") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(options)) => options.clone(),
            Some(option) => vec![option.clone()],
        };

        Self {
            options,
            error_message: message_of(spec),
        }
    }
}

/// Where a field's rules read from when it overrides the schema default
#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldLocation {
    Supported(Location),
    /// Any other `in` value; the field is skipped
    Unsupported(String),
}

/// Rules for one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSchema {
    location: Option<FieldLocation>,
    error_message: Option<String>,
    optional: Option<RuleSpec>,
    rules: Vec<(String, RuleSpec)>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this field from `location` whatever the schema default is
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(FieldLocation::Supported(location));
        self
    }

    /// Field-level message used by rules without their own
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn optional(self) -> Self {
        self.optional_with(RuleSpec::new())
    }

    /// `options` may carry `{ "checkFalsy": true }`
    pub fn optional_with(mut self, spec: RuleSpec) -> Self {
        self.optional = Some(spec);
        self
    }

    pub fn rule(mut self, name: impl Into<String>, spec: RuleSpec) -> Self {
        self.rules.push((name.into(), spec));
        self
    }

    /// Rule without options or message
    pub fn check(self, name: impl Into<String>) -> Self {
        self.rule(name, RuleSpec::new())
    }

    fn from_value(name: &str, value: &Value) -> Result<Self> {
        let Value::Object(spec) = value else {
            return Err(ValidatorError::InvalidSchema(format!(
                "rules for '{}' must be an object",
                name
            )));
        };

        let mut field = FieldSchema {
            error_message: message_of(spec),
            ..FieldSchema::default()
        };

        for (key, value) in spec {
            match key.as_str() {
                "in" => {
                    field.location = Some(match value.as_str() {
                        Some(name) => match name.parse::<Location>() {
                            Ok(location) => FieldLocation::Supported(location),
                            Err(_) => FieldLocation::Unsupported(name.to_string()),
                        },
                        None => FieldLocation::Unsupported(value.to_string()),
                    });
                }
                "errorMessage" => {}
                "optional" => {
                    if is_truthy(Some(value)) {
                        field.optional = Some(RuleSpec::from_value(value));
                    }
                }
                rule => field.rules.push((rule.to_string(), RuleSpec::from_value(value))),
            }
        }

        Ok(field)
    }
}

/// An ordered set of field rules
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub struct Schema {
    fields: Vec<(FieldPath, FieldSchema)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, path: impl Into<FieldPath>, field: FieldSchema) -> Self {
        self.fields.push((path.into(), field));
        self
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(ValidatorError::InvalidSchema(
                "schema must be an object".to_string(),
            ));
        };

        let fields = fields
            .iter()
            .map(|(name, spec)| Ok((FieldPath::parse(name), FieldSchema::from_value(name, spec)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl TryFrom<Value> for Schema {
    type Error = ValidatorError;

    fn try_from(value: Value) -> Result<Self> {
        Schema::from_value(&value)
    }
}

/// Run every field of `schema` against the request held by `ctx`.
///
/// Failures are recorded on the context. Only configuration problems, such
/// as a rule naming an unknown validator, are returned as errors.
pub fn evaluate(
    schema: &Schema,
    ctx: &mut ValidationContext,
    default: SchemaLocation,
) -> Result<()> {
    for (path, field) in &schema.fields {
        let location = match (&field.location, default) {
            (Some(FieldLocation::Supported(location)), _) => Some(*location),
            (Some(FieldLocation::Unsupported(name)), _) => {
                debug!(param = %path, location = %name, "skipping field with unsupported location");
                continue;
            }
            (None, SchemaLocation::Fixed(location)) => Some(location),
            (None, SchemaLocation::Any) => locate(ctx.request(), path),
        };

        let fallback = field
            .error_message
            .as_deref()
            .unwrap_or(DEFAULT_PARAM_MESSAGE);
        let mut chain = ctx.chain(path.clone(), location, None);

        if let Some(optional) = &field.optional {
            chain.optional_with(OptionalOptions::from_args(&optional.options));
            if chain.is_skipped() {
                chain.set_fail_message(optional.error_message.as_deref().unwrap_or(fallback));
                continue;
            }
        }

        for (name, rule) in &field.rules {
            chain.set_fail_message(rule.error_message.as_deref().unwrap_or(fallback));
            chain.apply(name, &rule.options)?;
        }
    }

    Ok(())
}

fn message_of(spec: &Map<String, Value>) -> Option<String> {
    spec.get("errorMessage")
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_keeps_declared_order() {
        let schema = Schema::from_value(&json!({
            "b": { "notEmpty": true },
            "a": { "isInt": true, "notEmpty": true }
        }))
        .unwrap();

        let names: Vec<String> = schema.fields.iter().map(|(path, _)| path.render()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let rules: Vec<&str> = schema.fields[1].1.rules.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(rules, vec!["isInt", "notEmpty"]);
    }

    #[test]
    fn test_parse_rule_options_and_messages() {
        let schema = Schema::from_value(&json!({
            "age": {
                "in": "params",
                "errorMessage": "field",
                "isInt": { "options": [{ "min": 0, "max": 120 }], "errorMessage": "bad age" },
                "isLength": { "options": { "min": 1 } }
            }
        }))
        .unwrap();

        let expected = FieldSchema::new()
            .location(Location::Params)
            .message("field")
            .rule(
                "isInt",
                RuleSpec::new()
                    .options(vec![json!({ "min": 0, "max": 120 })])
                    .message("bad age"),
            )
            .rule("isLength", RuleSpec::new().options(vec![json!({ "min": 1 })]));

        assert_eq!(schema, Schema::new().field("age", expected));
    }

    #[test]
    fn test_parse_unsupported_location() {
        let schema = Schema::from_value(&json!({ "skipped": { "in": "notSupportedOne" } })).unwrap();
        assert_eq!(
            schema.fields[0].1.location,
            Some(FieldLocation::Unsupported("notSupportedOne".into()))
        );
    }

    #[test]
    fn test_parse_falsy_optional_ignored() {
        let schema = Schema::from_value(&json!({ "f": { "optional": false, "isInt": true } })).unwrap();
        assert_eq!(schema.fields[0].1.optional, None);

        let schema = Schema::from_value(&json!({
            "f": { "optional": { "options": { "checkFalsy": true } } }
        }))
        .unwrap();
        assert_eq!(
            schema.fields[0].1.optional,
            Some(RuleSpec::new().options(vec![json!({ "checkFalsy": true })]))
        );
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert_eq!(
            Schema::from_value(&json!(["age"])),
            Err(ValidatorError::InvalidSchema("schema must be an object".into()))
        );
        assert!(matches!(
            Schema::from_value(&json!({ "age": "isInt" })),
            Err(ValidatorError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_deserialize_through_serde() {
        let schema: Schema = serde_json::from_value(json!({ "email": { "isEmail": true } })).unwrap();
        assert_eq!(schema.len(), 1);

        assert!(serde_json::from_value::<Schema>(json!(42)).is_err());
    }
}
