//! Request-scoped validation context
//!
//! A [`ValidationContext`] owns one request's data snapshot and the
//! aggregator collecting everything its chains and sanitizers record:
//!
//! - synchronous errors, in recording order
//! - pending asynchronous checks, each with the error it contributes on failure
//! - the legal validated values (snapshot taken when each chain is built)
//! - the legal sanitized object (latest transform result per path)
//!
//! Pending checks only run when one of the async aggregation calls is awaited.

use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chain::ValidatorChain;
use crate::config::ValidatorConfig;
use crate::error::Result;
use crate::location::{locate, Location, SchemaLocation};
use crate::path::FieldPath;
use crate::predicates::Deferred;
use crate::request::RequestData;
use crate::result::{ErrorEntry, ValidationErrors, ValidationResult};
use crate::sanitizer::Sanitizer;
use crate::schema::{self, Schema};

/// Locations covered by [`ValidationContext::sanitize`], in processing order
const SANITIZE_LOCATIONS: [Location; 3] = [Location::Body, Location::Params, Location::Query];

/// An asynchronous check waiting to be settled
pub(crate) struct PendingCheck {
    pub(crate) outcome: Deferred,
    pub(crate) error: ErrorEntry,
}

/// Per-request accumulation state
pub(crate) struct Aggregator {
    pub(crate) errors: Vec<ErrorEntry>,
    pub(crate) pending: Vec<PendingCheck>,
    pub(crate) validated: Map<String, Value>,
    pub(crate) sanitized: Value,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self {
            errors: Vec::new(),
            pending: Vec::new(),
            validated: Map::new(),
            sanitized: Value::Object(Map::new()),
        }
    }
}

/// Validation state for one request
pub struct ValidationContext {
    config: Arc<ValidatorConfig>,
    request: RequestData,
    state: Aggregator,
}

impl ValidationContext {
    pub fn new(config: Arc<ValidatorConfig>, request: RequestData) -> Self {
        debug!("validation context created");
        Self {
            config,
            request,
            state: Aggregator::default(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The request data, including any sanitized rewrites
    pub fn request(&self) -> &RequestData {
        &self.request
    }

    pub fn into_request(self) -> RequestData {
        self.request
    }

    pub(crate) fn chain(
        &mut self,
        path: FieldPath,
        location: Option<Location>,
        message: Option<&str>,
    ) -> ValidatorChain<'_> {
        ValidatorChain::new(
            &self.config,
            &mut self.state,
            &self.request,
            path,
            location,
            message.map(str::to_string),
        )
    }

    // ── Validation ──────────────────────────────────────────────────────────

    /// Validate a field found in params (when truthy), query or body
    pub fn check(&mut self, field: impl Into<FieldPath>, message: Option<&str>) -> ValidatorChain<'_> {
        let path = field.into();
        let location = locate(&self.request, &path);
        self.chain(path, location, message)
    }

    pub fn check_params(&mut self, field: impl Into<FieldPath>, message: Option<&str>) -> ValidatorChain<'_> {
        self.chain(field.into(), Some(Location::Params), message)
    }

    pub fn check_query(&mut self, field: impl Into<FieldPath>, message: Option<&str>) -> ValidatorChain<'_> {
        self.chain(field.into(), Some(Location::Query), message)
    }

    pub fn check_body(&mut self, field: impl Into<FieldPath>, message: Option<&str>) -> ValidatorChain<'_> {
        self.chain(field.into(), Some(Location::Body), message)
    }

    /// Header names are case-insensitive; `referrer` is read as `referer`
    pub fn check_headers(&mut self, name: &str, message: Option<&str>) -> ValidatorChain<'_> {
        self.chain(header_path(name), Some(Location::Headers), message)
    }

    /// Evaluate a schema, locating each field that has no `in`
    pub fn check_schema(&mut self, schema: &Schema) -> Result<()> {
        schema::evaluate(schema, self, SchemaLocation::Any)
    }

    /// Evaluate a schema with `location` as the default for every field
    pub fn check_schema_in(&mut self, location: Location, schema: &Schema) -> Result<()> {
        schema::evaluate(schema, self, SchemaLocation::Fixed(location))
    }

    // ── Sanitization ────────────────────────────────────────────────────────

    /// Sanitize a field in body, params and query
    pub fn sanitize(&mut self, field: impl Into<FieldPath>) -> Sanitizer<'_> {
        self.sanitizer(field.into(), SANITIZE_LOCATIONS.to_vec())
    }

    pub fn sanitize_params(&mut self, field: impl Into<FieldPath>) -> Sanitizer<'_> {
        self.sanitizer(field.into(), vec![Location::Params])
    }

    pub fn sanitize_query(&mut self, field: impl Into<FieldPath>) -> Sanitizer<'_> {
        self.sanitizer(field.into(), vec![Location::Query])
    }

    pub fn sanitize_body(&mut self, field: impl Into<FieldPath>) -> Sanitizer<'_> {
        self.sanitizer(field.into(), vec![Location::Body])
    }

    pub fn sanitize_headers(&mut self, name: &str) -> Sanitizer<'_> {
        self.sanitizer(header_path(name), vec![Location::Headers])
    }

    fn sanitizer(&mut self, path: FieldPath, locations: Vec<Location>) -> Sanitizer<'_> {
        Sanitizer::new(
            &self.config,
            &mut self.request,
            &mut self.state.sanitized,
            path,
            locations,
        )
    }

    // ── Aggregation ─────────────────────────────────────────────────────────

    /// Synchronous errors recorded so far, `None` when there are none.
    ///
    /// Pending asynchronous checks are not included; a warning is logged when
    /// any exist.
    pub fn validation_errors(&self, mapped: bool) -> Option<ValidationErrors> {
        self.validation_errors_with(mapped, false)
    }

    /// As [`validation_errors`](Self::validation_errors); `promises_resolved`
    /// suppresses the pending-check warning.
    pub fn validation_errors_with(
        &self,
        mapped: bool,
        promises_resolved: bool,
    ) -> Option<ValidationErrors> {
        if !promises_resolved && !self.state.pending.is_empty() {
            warn!(
                pending = self.state.pending.len(),
                "asynchronous validators are pending; use async_validation_errors to collect their errors"
            );
        }

        if self.state.errors.is_empty() {
            None
        } else {
            Some(ValidationErrors::from_entries(&self.state.errors, mapped))
        }
    }

    /// Settle pending checks, then fail with every recorded error
    pub async fn async_validation_errors(&mut self, mapped: bool) -> std::result::Result<(), ValidationErrors> {
        self.settle().await;
        match self.validation_errors_with(mapped, true) {
            Some(errors) => Err(errors),
            None => Ok(()),
        }
    }

    /// Settle pending checks and return the outcome; never fails
    pub async fn validation_result(&mut self) -> ValidationResult {
        self.settle().await;
        ValidationResult::new(self.state.errors.clone())
    }

    /// Settle pending checks, then return the legal validated values or the
    /// recorded errors
    pub async fn validation_legal_result(
        &mut self,
        mapped: bool,
    ) -> std::result::Result<Map<String, Value>, ValidationErrors> {
        self.settle().await;
        match self.validation_errors_with(mapped, true) {
            Some(errors) => Err(errors),
            None => Ok(self.state.validated.clone()),
        }
    }

    /// Latest sanitized value per path, as a nested object
    pub fn sanitizer_legal_result(&self) -> Value {
        self.state.sanitized.clone()
    }

    /// Values captured by every chain built so far, keyed by rendered path
    pub fn validated_values(&self) -> &Map<String, Value> {
        &self.state.validated
    }

    pub fn pending_checks(&self) -> usize {
        self.state.pending.len()
    }

    /// Drive every pending check to completion. Failed checks append their
    /// error in completion order. The pending list is drained, so settling
    /// twice never records an error twice.
    async fn settle(&mut self) {
        let pending = std::mem::take(&mut self.state.pending);
        if pending.is_empty() {
            return;
        }
        debug!(pending = pending.len(), "settling asynchronous validators");

        let mut running: FuturesUnordered<_> = pending
            .into_iter()
            .map(|PendingCheck { outcome, error }| async move { (outcome.await, error) })
            .collect();

        while let Some((passed, error)) = running.next().await {
            if !passed {
                self.state.errors.push(error);
            }
        }
    }
}

fn header_path(name: &str) -> FieldPath {
    let name = name.to_ascii_lowercase();
    if name == "referrer" {
        FieldPath::parse("referer")
    } else {
        FieldPath::parse(&name)
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("request", &self.request)
            .field("errors", &self.state.errors)
            .field("pending", &self.state.pending.len())
            .field("validated", &self.state.validated)
            .field("sanitized", &self.state.sanitized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::{Input, Outcome};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts warnings emitted by this crate
    #[derive(Clone, Default)]
    struct WarnCounter(Arc<AtomicUsize>);

    impl WarnCounter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let metadata = event.metadata();
            if *metadata.level() == tracing::Level::WARN
                && metadata.target().starts_with("request_validator")
            {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn async_config() -> Arc<ValidatorConfig> {
        Arc::new(
            ValidatorConfig::builder()
                .custom_validator("isAnswer", |input: &Input, _: &[Value]| {
                    let passed = input.as_str() == "42";
                    Outcome::deferred(async move { passed })
                })
                .build(),
        )
    }

    #[test]
    fn test_check_headers_normalizes_name() {
        let mut ctx = ValidationContext::new(
            Arc::new(ValidatorConfig::default()),
            RequestData::new().with_headers(json!({ "Referer": "https://example.com" })),
        );

        let chain = ctx.check_headers("Referrer", None);
        assert_eq!(chain.param().render(), "referer");
        assert_eq!(chain.value(), Some(&json!("https://example.com")));
    }

    #[test]
    fn test_pending_checks_warn_unless_resolved() {
        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());

        tracing::subscriber::with_default(subscriber, || {
            let mut ctx = ValidationContext::new(
                async_config(),
                RequestData::new().with_query(json!({ "answer": "41" })),
            );
            assert!(ctx.validation_errors(false).is_none());
            assert_eq!(counter.count(), 0);

            ctx.check_query("answer", None).apply("isAnswer", &[]).unwrap();

            assert!(ctx.validation_errors(false).is_none());
            assert_eq!(counter.count(), 1);

            assert!(ctx.validation_errors_with(true, true).is_none());
            assert_eq!(counter.count(), 1);
        });
    }

    #[test]
    fn test_no_errors_is_none() {
        let ctx = ValidationContext::new(Arc::new(ValidatorConfig::default()), RequestData::new());
        assert!(ctx.validation_errors(false).is_none());
        assert_eq!(ctx.sanitizer_legal_result(), json!({}));
    }

    #[tokio::test]
    async fn test_pending_checks_only_run_on_settle() {
        let mut ctx = ValidationContext::new(
            async_config(),
            RequestData::new().with_query(json!({ "answer": "41" })),
        );
        ctx.check_query("answer", None).apply("isAnswer", &[]).unwrap();

        assert_eq!(ctx.pending_checks(), 1);
        assert!(ctx.validation_errors(false).is_none());

        let errors = ctx.async_validation_errors(false).await.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(ctx.pending_checks(), 0);

        // Settling again must not re-append the same failure
        let errors = ctx.async_validation_errors(false).await.unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn test_async_with_message_replaces_pending_error() {
        let mut ctx = ValidationContext::new(
            async_config(),
            RequestData::new().with_query(json!({ "answer": "41" })),
        );
        ctx.check_query("answer", Some("first"))
            .apply("isAnswer", &[])
            .unwrap()
            .with_message("not the answer");

        let errors = ctx.async_validation_errors(true).await.unwrap_err();
        assert_eq!(errors.as_mapped().unwrap()["answer"]["msg"], "not the answer");
    }

    #[tokio::test]
    async fn test_legal_result_and_result_views() {
        let mut ctx = ValidationContext::new(
            async_config(),
            RequestData::new().with_query(json!({ "answer": "42" })),
        );
        ctx.check_query("answer", None).apply("isAnswer", &[]).unwrap();

        let legal = ctx.validation_legal_result(false).await.unwrap();
        assert_eq!(Value::Object(legal), json!({ "answer": "42" }));
        assert!(ctx.validation_result().await.is_empty());
    }
}
