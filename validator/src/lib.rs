//! Request validation and sanitization middleware for axum.
//!
//! Each request gets a [`ValidationContext`] holding a snapshot of its path
//! params, query string, body and headers. Handlers build validation chains
//! and sanitizers against it, or evaluate a declarative [`Schema`], then ask
//! the context for the aggregated outcome.
//!
//! ```ignore
//! async fn register(mut ctx: ValidationContext) -> Result<Json<Value>, ValidationErrors> {
//!     ctx.check_body("email", Some("valid email required")).is_email();
//!     ctx.sanitize_body("email").normalize_email();
//!     ctx.async_validation_errors(false).await?;
//!     Ok(Json(ctx.sanitizer_legal_result()))
//! }
//! ```

pub mod chain;
pub mod coerce;
pub mod config;
pub mod context;
pub mod error;
pub mod location;
pub mod middleware;
pub mod path;
pub mod predicates;
pub mod request;
pub mod result;
pub mod sanitizer;
pub mod schema;

pub use chain::{OptionalOptions, ValidatorChain};
pub use config::{default_error_formatter, FieldError, ValidatorConfig, ValidatorConfigBuilder};
pub use context::ValidationContext;
pub use error::ValidatorError;
pub use location::{locate, Location, SchemaLocation};
pub use middleware::{validator_middleware, ContextRejection};
pub use path::{FieldPath, Segment};
pub use predicates::{
    Input, Outcome, Predicate, SanitizerHandle, SanitizerKind, Transform, ValidatorKind,
};
pub use request::RequestData;
pub use result::{ErrorEntry, ValidationErrors, ValidationResult};
pub use sanitizer::Sanitizer;
pub use schema::{FieldSchema, RuleSpec, Schema};
