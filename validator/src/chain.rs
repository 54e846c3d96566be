//! Validation chains
//!
//! A [`ValidatorChain`] is created by one `check*` call on a
//! [`ValidationContext`](crate::ValidationContext) and validates a single
//! field. Failures are recorded on the request's aggregator; they are never
//! returned as errors.
//!
//! ```ignore
//! ctx.check("email", None).not_empty().with_message("required").is_email();
//! ```

use serde_json::{json, Value};
use tracing::debug;

use crate::coerce::{is_truthy, message_arg};
use crate::config::ValidatorConfig;
use crate::context::{Aggregator, PendingCheck};
use crate::error::{Result, ValidatorError};
use crate::location::Location;
use crate::path::FieldPath;
use crate::predicates::{Input, Outcome, ValidatorKind};
use crate::request::RequestData;
use crate::result::ErrorEntry;

const DEFAULT_MESSAGE: &str = "Invalid value";

/// How the most recent predicate call failed, if it did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastError {
    Sync,
    /// Index of the check on the aggregator's pending list
    Async(usize),
}

/// Options for [`ValidatorChain::optional_with`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionalOptions {
    /// Skip when the value is falsy rather than only when it is absent
    pub check_falsy: bool,
}

impl OptionalOptions {
    pub fn check_falsy() -> Self {
        Self { check_falsy: true }
    }

    /// Read `{ "checkFalsy": .. }` from the first call argument
    pub fn from_args(args: &[Value]) -> Self {
        let check_falsy = args
            .first()
            .map(|options| is_truthy(options.get("checkFalsy")))
            .unwrap_or(false);
        Self { check_falsy }
    }
}

macro_rules! builtin_methods {
    ($($(#[$meta:meta])* $method:ident => $kind:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $method(&mut self) -> &mut Self {
                self.builtin(ValidatorKind::$kind, &[])
            }
        )*
    };
}

/// Per-field validator bound to one request
pub struct ValidatorChain<'a> {
    config: &'a ValidatorConfig,
    aggregator: &'a mut Aggregator,
    param: FieldPath,
    rendered: String,
    location: Option<Location>,
    value: Option<Value>,
    fail_message: Option<String>,
    skip: bool,
    errors: Vec<Value>,
    last_error: Option<LastError>,
}

impl<'a> ValidatorChain<'a> {
    /// Reads the field and records it as the legal validated value before any
    /// predicate runs. An unknown location yields an absent value.
    pub(crate) fn new(
        config: &'a ValidatorConfig,
        aggregator: &'a mut Aggregator,
        request: &RequestData,
        param: FieldPath,
        location: Option<Location>,
        fail_message: Option<String>,
    ) -> Self {
        let value = location.and_then(|location| param.get(request.get(location)).cloned());
        let rendered = param.render();

        match &value {
            Some(value) => {
                aggregator.validated.insert(rendered.clone(), value.clone());
            }
            None => {
                aggregator.validated.remove(&rendered);
            }
        }

        Self {
            config,
            aggregator,
            param,
            rendered,
            location,
            value,
            fail_message,
            skip: false,
            errors: Vec::new(),
            last_error: None,
        }
    }

    pub fn param(&self) -> &FieldPath {
        &self.param
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    /// Value read at construction; `None` when the field is absent
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Errors recorded by this chain, in order
    pub fn errors(&self) -> &[Value] {
        &self.errors
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub(crate) fn set_fail_message(&mut self, message: impl Into<String>) {
        self.fail_message = Some(message.into());
    }

    /// Skip every later predicate when the value is absent
    pub fn optional(&mut self) -> &mut Self {
        self.optional_with(OptionalOptions::default())
    }

    pub fn optional_with(&mut self, options: OptionalOptions) -> &mut Self {
        let skip = if options.check_falsy {
            !is_truthy(self.value.as_ref())
        } else {
            self.value.is_none()
        };
        if skip {
            self.skip = true;
        }
        self
    }

    /// Replace the message of the error produced by the previous call.
    ///
    /// The message is used literally; `%n` placeholders are not expanded.
    /// Does nothing when the previous call passed.
    pub fn with_message(&mut self, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        match self.last_error {
            Some(LastError::Sync) => {
                self.errors.pop();
                self.aggregator.errors.pop();

                let error = self.format(&message);
                self.errors.push(error.clone());
                self.aggregator
                    .errors
                    .push(ErrorEntry::new(self.rendered.clone(), error));
                self.last_error = None;
            }
            Some(LastError::Async(index)) => {
                let entry = ErrorEntry::new(self.rendered.clone(), self.format(&message));
                if let Some(check) = self.aggregator.pending.get_mut(index) {
                    check.error = entry;
                }
            }
            None => {}
        }
        self
    }

    /// `isLength({ min: 1 })`
    pub fn not_empty(&mut self) -> &mut Self {
        self.builtin(ValidatorKind::IsLength, &[json!({ "min": 1 })])
    }

    /// `isLength` with every argument forwarded: either `[{ min, max }]` or
    /// positional `[min, max]`
    pub fn len(&mut self, args: &[Value]) -> &mut Self {
        self.builtin(ValidatorKind::IsLength, args)
    }

    builtin_methods! {
        is_email => IsEmail;
        is_numeric => IsNumeric;
        is_alpha => IsAlpha;
        is_alphanumeric => IsAlphanumeric;
        is_url => IsUrl;
        /// Any RFC 4122 version
        is_uuid => IsUuid;
        is_boolean => IsBoolean;
        is_json => IsJson;
        is_empty => IsEmpty;
        is_lowercase => IsLowercase;
        is_uppercase => IsUppercase;
    }

    /// Options: `min`, `max`, `gt`, `lt`, `allow_leading_zeroes`
    pub fn is_int(&mut self, options: Value) -> &mut Self {
        self.builtin(ValidatorKind::IsInt, &[options])
    }

    /// Options: `min`, `max`, `gt`, `lt`
    pub fn is_float(&mut self, options: Value) -> &mut Self {
        self.builtin(ValidatorKind::IsFloat, &[options])
    }

    /// Options: `{ min, max }` in characters
    pub fn is_length(&mut self, options: Value) -> &mut Self {
        self.builtin(ValidatorKind::IsLength, &[options])
    }

    /// Membership in an array, the keys of an object, or a string
    pub fn is_in(&mut self, values: Value) -> &mut Self {
        self.builtin(ValidatorKind::IsIn, &[values])
    }

    pub fn is_before(&mut self, date: &str) -> &mut Self {
        self.builtin(ValidatorKind::IsBefore, &[json!(date)])
    }

    pub fn is_after(&mut self, date: &str) -> &mut Self {
        self.builtin(ValidatorKind::IsAfter, &[json!(date)])
    }

    pub fn contains(&mut self, seed: &str) -> &mut Self {
        self.builtin(ValidatorKind::Contains, &[json!(seed)])
    }

    pub fn equals(&mut self, comparison: impl Into<Value>) -> &mut Self {
        self.builtin(ValidatorKind::Equals, &[comparison.into()])
    }

    /// Regex match; `flags` may contain `i`, `m`, `s` and `x`
    pub fn matches(&mut self, pattern: &str, flags: Option<&str>) -> &mut Self {
        let mut args = vec![json!(pattern)];
        if let Some(flags) = flags {
            args.push(json!(flags));
        }
        self.builtin(ValidatorKind::Matches, &args)
    }

    /// Run a validator by name: a built-in, a registered extension, or one
    /// of `notEmpty`, `len` and `optional`.
    pub fn apply(&mut self, name: &str, args: &[Value]) -> Result<&mut Self> {
        match name {
            "notEmpty" => Ok(self.not_empty()),
            "len" => Ok(self.len(args)),
            "optional" => Ok(self.optional_with(OptionalOptions::from_args(args))),
            _ => {
                if !self.config.predicates().has(name) {
                    return Err(ValidatorError::UnknownValidator(name.to_string()));
                }
                if self.skip {
                    return Ok(self);
                }
                let outcome = self.config.predicates().invoke(name, &self.input(), args)?;
                Ok(self.record(outcome, args))
            }
        }
    }

    fn builtin(&mut self, kind: ValidatorKind, args: &[Value]) -> &mut Self {
        if self.skip {
            return self;
        }
        let outcome = self
            .config
            .predicates()
            .invoke_kind(kind, &self.input(), args);
        self.record(outcome, args)
    }

    fn input(&self) -> Input {
        self.config.input(self.value.as_ref())
    }

    fn record(&mut self, outcome: Outcome, args: &[Value]) -> &mut Self {
        match outcome {
            Outcome::Valid => {
                self.last_error = None;
            }
            Outcome::Invalid => {
                let error = self.format(&self.message(args));
                debug!(param = %self.rendered, location = ?self.location, "validation failed");

                self.errors.push(error.clone());
                self.aggregator
                    .errors
                    .push(ErrorEntry::new(self.rendered.clone(), error));
                self.last_error = Some(LastError::Sync);
            }
            Outcome::Deferred(outcome) => {
                let error = ErrorEntry::new(self.rendered.clone(), self.format(&self.message(args)));
                self.aggregator.pending.push(PendingCheck { outcome, error });
                self.last_error = Some(LastError::Async(self.aggregator.pending.len() - 1));
            }
        }
        self
    }

    /// Failure message for a call with `args`: `%0` is the value, `%1` the
    /// first argument and so on.
    fn message(&self, args: &[Value]) -> String {
        let template = match self.fail_message.as_deref() {
            Some(template) if !template.is_empty() => template,
            _ => return DEFAULT_MESSAGE.to_string(),
        };

        let message = std::iter::once(self.value.as_ref())
            .chain(args.iter().map(Some))
            .enumerate()
            .fold(template.to_string(), |message, (i, arg)| {
                message.replacen(&format!("%{}", i), &message_arg(arg), 1)
            });

        if message.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            message
        }
    }

    fn format(&self, message: &str) -> Value {
        self.config
            .format_error(&self.rendered, message, self.value.as_ref())
    }
}

impl std::fmt::Debug for ValidatorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorChain")
            .field("param", &self.rendered)
            .field("location", &self.location)
            .field("value", &self.value)
            .field("skip", &self.skip)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}
