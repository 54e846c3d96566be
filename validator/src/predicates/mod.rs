//! Predicate library adapter
//!
//! Validators and sanitizers are reached through two capability registries:
//!
//! 1. [`Predicates`] - named boolean-or-deferred tests used by validation chains
//! 2. [`Sanitizers`] - named transforms used by sanitizers
//!
//! Each registry is backed by a static built-in table ([`ValidatorKind`],
//! [`SanitizerKind`]) plus user extensions registered at configuration time.
//! An extension registered under a built-in name replaces the built-in.
//!
//! Every call receives an [`Input`] carrying the raw request value and its
//! coerced string form, so coercion happens once and uniformly before any
//! predicate runs.

use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::coerce::CoerceFn;
use crate::error::{Result, ValidatorError};

pub mod sanitizers;
pub mod validators;

pub use sanitizers::SanitizerKind;
pub use validators::ValidatorKind;

/// Value handed to a predicate or transform
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    raw: Option<Value>,
    text: String,
}

impl Input {
    pub fn new(raw: Option<Value>, coerce: CoerceFn) -> Self {
        let text = coerce(raw.as_ref());
        Self { raw, text }
    }

    /// The value as found in the request (`None` when absent)
    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    /// The coerced string form
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Future resolving to `true` when a deferred check passes
pub type Deferred = BoxFuture<'static, bool>;

/// Result of running a predicate
pub enum Outcome {
    Valid,
    Invalid,
    Deferred(Deferred),
}

impl Outcome {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = bool> + Send + 'static,
    {
        Outcome::Deferred(Box::pin(future))
    }
}

impl From<bool> for Outcome {
    fn from(valid: bool) -> Self {
        if valid {
            Outcome::Valid
        } else {
            Outcome::Invalid
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Valid => f.write_str("Valid"),
            Outcome::Invalid => f.write_str("Invalid"),
            Outcome::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A named test applied to a value plus call arguments
pub trait Predicate: Send + Sync {
    fn check(&self, input: &Input, args: &[Value]) -> Outcome;
}

/// A named function mapping a value plus call arguments to a replacement
pub trait Transform: Send + Sync {
    fn apply(&self, input: &Input, args: &[Value]) -> Value;
}

/// Adapts a closure returning `bool` or [`Outcome`] into a [`Predicate`]
pub(crate) struct FnPredicate<F>(pub(crate) F);

impl<F, O> Predicate for FnPredicate<F>
where
    F: Fn(&Input, &[Value]) -> O + Send + Sync,
    O: Into<Outcome>,
{
    fn check(&self, input: &Input, args: &[Value]) -> Outcome {
        (self.0)(input, args).into()
    }
}

/// Adapts a closure into a [`Transform`]
pub(crate) struct FnTransform<F>(pub(crate) F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(&Input, &[Value]) -> Value + Send + Sync,
{
    fn apply(&self, input: &Input, args: &[Value]) -> Value {
        (self.0)(input, args)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registries
// ─────────────────────────────────────────────────────────────────────────────

/// Validator registry: built-ins plus custom extensions
#[derive(Clone, Default)]
pub struct Predicates {
    custom: HashMap<String, Arc<dyn Predicate>>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, predicate: Arc<dyn Predicate>) {
        self.custom.insert(name.into(), predicate);
    }

    pub fn has(&self, name: &str) -> bool {
        self.custom.contains_key(name) || ValidatorKind::from_name(name).is_some()
    }

    /// Run the predicate registered under `name`
    pub fn invoke(&self, name: &str, input: &Input, args: &[Value]) -> Result<Outcome> {
        if let Some(custom) = self.custom.get(name) {
            return Ok(custom.check(input, args));
        }
        ValidatorKind::from_name(name)
            .map(|kind| kind.check(input.as_str(), args).into())
            .ok_or_else(|| ValidatorError::UnknownValidator(name.to_string()))
    }

    /// Run a built-in, honouring any extension registered under its name
    pub fn invoke_kind(&self, kind: ValidatorKind, input: &Input, args: &[Value]) -> Outcome {
        match self.custom.get(kind.name()) {
            Some(custom) => custom.check(input, args),
            None => kind.check(input.as_str(), args).into(),
        }
    }
}

impl fmt::Debug for Predicates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("Predicates").field("custom", &names).finish()
    }
}

/// Sanitizer registry: built-ins plus custom extensions
#[derive(Clone, Default)]
pub struct Sanitizers {
    custom: HashMap<String, Arc<dyn Transform>>,
}

impl Sanitizers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, transform: Arc<dyn Transform>) {
        self.custom.insert(name.into(), transform);
    }

    pub fn has(&self, name: &str) -> bool {
        self.custom.contains_key(name) || SanitizerKind::from_name(name).is_some()
    }

    /// Look a sanitizer up once; extensions shadow built-ins of the same name
    pub fn resolve(&self, name: &str) -> Option<SanitizerHandle> {
        match self.custom.get(name) {
            Some(custom) => Some(SanitizerHandle::Custom(Arc::clone(custom))),
            None => SanitizerKind::from_name(name).map(SanitizerHandle::Builtin),
        }
    }

    pub fn invoke(&self, name: &str, input: &Input, args: &[Value]) -> Result<Value> {
        self.resolve(name)
            .map(|handle| handle.apply(input, args))
            .ok_or_else(|| ValidatorError::UnknownSanitizer(name.to_string()))
    }

    pub fn invoke_kind(&self, kind: SanitizerKind, input: &Input, args: &[Value]) -> Value {
        match self.custom.get(kind.name()) {
            Some(custom) => custom.apply(input, args),
            None => kind.apply(input.as_str(), args),
        }
    }
}

/// A resolved sanitizer, ready to run against any number of inputs
#[derive(Clone)]
pub enum SanitizerHandle {
    Custom(Arc<dyn Transform>),
    Builtin(SanitizerKind),
}

impl SanitizerHandle {
    pub fn apply(&self, input: &Input, args: &[Value]) -> Value {
        match self {
            SanitizerHandle::Custom(custom) => custom.apply(input, args),
            SanitizerHandle::Builtin(kind) => kind.apply(input.as_str(), args),
        }
    }
}

impl fmt::Debug for SanitizerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizerHandle::Custom(_) => f.write_str("Custom"),
            SanitizerHandle::Builtin(kind) => write!(f, "Builtin({})", kind.name()),
        }
    }
}

impl fmt::Debug for Sanitizers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.custom.keys().collect();
        names.sort();
        f.debug_struct("Sanitizers").field("custom", &names).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument helpers shared by the built-in tables
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric option from the first argument when it is an options object
pub(crate) fn option_number(args: &[Value], key: &str) -> Option<f64> {
    args.first()
        .and_then(|options| options.get(key))
        .and_then(number_of)
}

pub(crate) fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Argument `index` coerced to a string, `None` when absent or null
pub(crate) fn arg_string(args: &[Value], index: usize) -> Option<String> {
    match args.get(index) {
        None | Some(Value::Null) => None,
        Some(value) => Some(crate::coerce::legacy_string(Some(value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::legacy_string;
    use serde_json::json;

    fn input(value: Value) -> Input {
        Input::new(Some(value), legacy_string)
    }

    #[test]
    fn test_input_coerces_once() {
        let input = input(json!(42));
        assert_eq!(input.as_str(), "42");
        assert_eq!(input.raw(), Some(&json!(42)));

        let absent = Input::new(None, legacy_string);
        assert_eq!(absent.as_str(), "");
        assert_eq!(absent.raw(), None);
    }

    #[test]
    fn test_invoke_builtin_and_unknown() {
        let predicates = Predicates::new();
        assert!(predicates.has("isEmail"));
        assert!(!predicates.has("isWidget"));

        let outcome = predicates.invoke("isEmail", &input(json!("a@b.co")), &[]).unwrap();
        assert!(matches!(outcome, Outcome::Valid));

        let err = predicates.invoke("isWidget", &input(json!("x")), &[]).unwrap_err();
        assert_eq!(err, ValidatorError::UnknownValidator("isWidget".into()));
    }

    #[test]
    fn test_resolve_sanitizer_handle() {
        let mut sanitizers = Sanitizers::new();
        assert!(sanitizers.resolve("toWidget").is_none());

        let trim = sanitizers.resolve("trim").unwrap();
        assert!(matches!(trim, SanitizerHandle::Builtin(SanitizerKind::Trim)));
        assert_eq!(trim.apply(&input(json!("  a  ")), &[]), json!("a"));

        sanitizers.insert("trim", Arc::new(FnTransform(|_: &Input, _: &[Value]| json!("custom"))));
        let trim = sanitizers.resolve("trim").unwrap();
        assert!(matches!(trim, SanitizerHandle::Custom(_)));
        assert_eq!(trim.apply(&input(json!("  a  ")), &[]), json!("custom"));
    }

    #[test]
    fn test_custom_overrides_builtin() {
        let mut predicates = Predicates::new();
        predicates.insert("isEmail", Arc::new(FnPredicate(|_: &Input, _: &[Value]| true)));

        let outcome = predicates.invoke_kind(ValidatorKind::IsEmail, &input(json!("nope")), &[]);
        assert!(matches!(outcome, Outcome::Valid));
    }

    #[test]
    fn test_custom_sees_raw_value() {
        let mut predicates = Predicates::new();
        predicates.insert(
            "isArray",
            Arc::new(FnPredicate(|input: &Input, _: &[Value]| {
                matches!(input.raw(), Some(Value::Array(_)))
            })),
        );

        let outcome = predicates.invoke("isArray", &input(json!(["a"])), &[]).unwrap();
        assert!(matches!(outcome, Outcome::Valid));
    }

    #[test]
    fn test_unknown_sanitizer() {
        let sanitizers = Sanitizers::new();
        let err = sanitizers.invoke("toWidget", &input(json!("x")), &[]).unwrap_err();
        assert_eq!(err, ValidatorError::UnknownSanitizer("toWidget".into()));
    }
}
