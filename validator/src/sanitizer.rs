//! Field sanitizers
//!
//! A [`Sanitizer`] rewrites one field in every location it was asked to
//! cover. Each transform call writes its result back into the request and
//! into the legal sanitized object.
//!
//! # Return value
//!
//! A transform call returns the result for the **last** location that held
//! a value, not an aggregate. `ctx.sanitize("name")` covers body, params and
//! query in that order, so when `name` appears in both body and query the
//! query result is returned (and is also what the legal sanitized object
//! ends up holding).

use serde_json::{json, Value};
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::error::{Result, ValidatorError};
use crate::location::Location;
use crate::path::FieldPath;
use crate::predicates::{Input, SanitizerKind};
use crate::request::RequestData;

/// Per-field sanitizer bound to one request
pub struct Sanitizer<'a> {
    config: &'a ValidatorConfig,
    request: &'a mut RequestData,
    sanitized: &'a mut Value,
    param: FieldPath,
    locations: Vec<Location>,
    values: Vec<Option<Value>>,
}

impl<'a> Sanitizer<'a> {
    pub(crate) fn new(
        config: &'a ValidatorConfig,
        request: &'a mut RequestData,
        sanitized: &'a mut Value,
        param: FieldPath,
        locations: Vec<Location>,
    ) -> Self {
        let values = locations
            .iter()
            .map(|location| param.get(request.get(*location)).cloned())
            .collect();

        Self {
            config,
            request,
            sanitized,
            param,
            locations,
            values,
        }
    }

    pub fn param(&self) -> &FieldPath {
        &self.param
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Current value per location, parallel to [`locations`](Self::locations)
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn to_string(&mut self) -> Option<Value> {
        self.builtin(SanitizerKind::ToString, &[])
    }

    /// Strict mode only treats `1` and `true` as `true`
    pub fn to_boolean(&mut self, strict: bool) -> Option<Value> {
        self.builtin(SanitizerKind::ToBoolean, &[json!(strict)])
    }

    /// `null` when no integer prefix can be parsed
    pub fn to_int(&mut self, radix: Option<u32>) -> Option<Value> {
        let args: Vec<Value> = radix.into_iter().map(Value::from).collect();
        self.builtin(SanitizerKind::ToInt, &args)
    }

    pub fn to_float(&mut self) -> Option<Value> {
        self.builtin(SanitizerKind::ToFloat, &[])
    }

    /// RFC 3339 string, or `null` when the date cannot be parsed
    pub fn to_date(&mut self) -> Option<Value> {
        self.builtin(SanitizerKind::ToDate, &[])
    }

    /// Trim whitespace, or the given characters
    pub fn trim(&mut self, chars: Option<&str>) -> Option<Value> {
        self.builtin(SanitizerKind::Trim, &char_args(chars))
    }

    pub fn ltrim(&mut self, chars: Option<&str>) -> Option<Value> {
        self.builtin(SanitizerKind::Ltrim, &char_args(chars))
    }

    pub fn rtrim(&mut self, chars: Option<&str>) -> Option<Value> {
        self.builtin(SanitizerKind::Rtrim, &char_args(chars))
    }

    pub fn escape(&mut self) -> Option<Value> {
        self.builtin(SanitizerKind::Escape, &[])
    }

    pub fn unescape(&mut self) -> Option<Value> {
        self.builtin(SanitizerKind::Unescape, &[])
    }

    pub fn strip_low(&mut self, keep_new_lines: bool) -> Option<Value> {
        self.builtin(SanitizerKind::StripLow, &[json!(keep_new_lines)])
    }

    /// Keep only the given characters. An array of characters is accepted.
    pub fn whitelist(&mut self, chars: impl Into<Value>) -> Option<Value> {
        self.builtin(SanitizerKind::Whitelist, &[chars.into()])
    }

    pub fn blacklist(&mut self, chars: impl Into<Value>) -> Option<Value> {
        self.builtin(SanitizerKind::Blacklist, &[chars.into()])
    }

    pub fn normalize_email(&mut self) -> Option<Value> {
        self.builtin(SanitizerKind::NormalizeEmail, &[])
    }

    /// Run a sanitizer by name: a built-in or a registered extension
    pub fn apply(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>> {
        let handle = self
            .config
            .sanitizers()
            .resolve(name)
            .ok_or_else(|| ValidatorError::UnknownSanitizer(name.to_string()))?;
        Ok(self.run(|input| handle.apply(input, args)))
    }

    fn builtin(&mut self, kind: SanitizerKind, args: &[Value]) -> Option<Value> {
        let config = self.config;
        let sanitizers = config.sanitizers();
        self.run(|input| sanitizers.invoke_kind(kind, input, args))
    }

    /// Apply `transform` to every present, non-null value. Returns the result
    /// for the last location processed.
    fn run<F>(&mut self, transform: F) -> Option<Value>
    where
        F: Fn(&Input) -> Value,
    {
        let mut result = None;

        for (location, slot) in self.locations.iter().zip(self.values.iter_mut()) {
            let input = match slot.as_ref() {
                Some(current) if !current.is_null() => self.config.input(Some(current)),
                _ => continue,
            };
            let output = transform(&input);

            self.param.set(self.request.get_mut(*location), output.clone());
            self.param.set(self.sanitized, output.clone());
            debug!(param = %self.param, location = %location, "sanitized field");

            *slot = Some(output.clone());
            result = Some(output);
        }

        result
    }
}

fn char_args(chars: Option<&str>) -> Vec<Value> {
    chars.into_iter().map(|chars| json!(chars)).collect()
}

impl std::fmt::Debug for Sanitizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer")
            .field("param", &self.param.render())
            .field("locations", &self.locations)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ValidatorConfig;
    use crate::context::ValidationContext;
    use crate::error::ValidatorError;
    use crate::predicates::Input;
    use crate::request::RequestData;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn context(config: ValidatorConfig, request: RequestData) -> ValidationContext {
        ValidationContext::new(Arc::new(config), request)
    }

    #[test]
    fn test_writes_back_and_records_legal_value() {
        let mut ctx = context(
            ValidatorConfig::default(),
            RequestData::new().with_body(json!({ "name": "  ada  " })),
        );

        assert_eq!(ctx.sanitize_body("name").trim(None), Some(json!("ada")));
        assert_eq!(ctx.request().body(), &json!({ "name": "ada" }));
        assert_eq!(ctx.sanitizer_legal_result(), json!({ "name": "ada" }));
    }

    #[test]
    fn test_absent_and_null_values_skipped() {
        let mut ctx = context(
            ValidatorConfig::default(),
            RequestData::new().with_body(json!({ "gone": null })),
        );

        assert_eq!(ctx.sanitize_body("gone").trim(None), None);
        assert_eq!(ctx.sanitize_body("missing").trim(None), None);
        assert_eq!(ctx.request().body(), &json!({ "gone": null }));
        assert_eq!(ctx.sanitizer_legal_result(), json!({}));
    }

    #[test]
    fn test_multi_location_returns_last_processed() {
        let mut ctx = context(
            ValidatorConfig::default(),
            RequestData::new()
                .with_body(json!({ "name": " body " }))
                .with_query(json!({ "name": " query " })),
        );

        let mut sanitizer = ctx.sanitize("name");
        assert_eq!(sanitizer.trim(None), Some(json!("query")));
        assert_eq!(sanitizer.values(), &[Some(json!("body")), None, Some(json!("query"))]);
        drop(sanitizer);

        assert_eq!(ctx.sanitizer_legal_result(), json!({ "name": "query" }));
    }

    #[test]
    fn test_chained_transforms_see_previous_result() {
        let mut ctx = context(
            ValidatorConfig::default(),
            RequestData::new().with_body(json!({ "flag": " 1 " })),
        );

        let mut sanitizer = ctx.sanitize_body("flag");
        sanitizer.trim(None);
        assert_eq!(sanitizer.to_boolean(true), Some(json!(true)));
    }

    #[test]
    fn test_custom_and_unknown_sanitizers() {
        let config = ValidatorConfig::builder()
            .custom_sanitizer("toTestSanitize", |_: &Input, _: &[Value]| json!("!!!!"))
            .build();
        let mut ctx = context(config, RequestData::new().with_query(json!({ "q": "x" })));

        assert_eq!(
            ctx.sanitize_query("q").apply("toTestSanitize", &[]),
            Ok(Some(json!("!!!!")))
        );
        assert_eq!(
            ctx.sanitize_query("q").apply("toWidget", &[]),
            Err(ValidatorError::UnknownSanitizer("toWidget".into()))
        );
    }

    #[test]
    fn test_named_sanitizer_runs_every_location() {
        let config = ValidatorConfig::builder()
            .custom_sanitizer("toUpper", |input: &Input, _: &[Value]| {
                json!(input.as_str().to_uppercase())
            })
            .build();
        let mut ctx = context(
            config,
            RequestData::new()
                .with_params(json!({ "code": "ab" }))
                .with_query(json!({ "code": "cd" }))
                .with_body(json!({ "code": "ef" })),
        );

        assert_eq!(ctx.sanitize("code").apply("toUpper", &[]), Ok(Some(json!("CD"))));
        assert_eq!(ctx.request().body(), &json!({ "code": "EF" }));
        assert_eq!(ctx.request().params(), &json!({ "code": "AB" }));
        assert_eq!(ctx.request().query(), &json!({ "code": "CD" }));
    }

    #[test]
    fn test_unknown_sanitizer_leaves_request_untouched() {
        let mut ctx = context(
            ValidatorConfig::default(),
            RequestData::new().with_body(json!({ "code": " ab " })),
        );

        assert!(ctx.sanitize_body("code").apply("toWidget", &[]).is_err());
        assert_eq!(ctx.request().body(), &json!({ "code": " ab " }));
        assert_eq!(ctx.sanitizer_legal_result(), json!({}));
    }
}
