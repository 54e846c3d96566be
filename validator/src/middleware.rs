//! axum integration
//!
//! [`validator_middleware`] installs the shared configuration on every
//! request; handlers then take a [`ValidationContext`] as an extractor:
//!
//! ```ignore
//! let config = Arc::new(ValidatorConfig::default());
//! let app = Router::new()
//!     .route("/users/:id", post(create_user))
//!     .layer(middleware::from_fn_with_state(config, validator_middleware));
//!
//! async fn create_user(mut ctx: ValidationContext) -> Response {
//!     ctx.check_body("email", None).is_email();
//!     // ...
//! }
//! ```

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;
use serde_json::{map::Entry, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::context::ValidationContext;
use crate::request::RequestData;

/// Makes `config` available to the [`ValidationContext`] extractor
pub async fn validator_middleware(
    State(config): State<Arc<ValidatorConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(config);
    next.run(request).await
}

/// Why a [`ValidationContext`] could not be extracted
#[derive(Debug, Error)]
pub enum ContextRejection {
    #[error("validator middleware is not installed on this route")]
    MissingConfig,
    #[error("failed to read request body: {0}")]
    Body(String),
    #[error("malformed JSON body: {0}")]
    Json(String),
    #[error("malformed form body: {0}")]
    Form(String),
}

#[derive(Serialize)]
struct RejectionBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ContextRejection {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ContextRejection::MissingConfig => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError")
            }
            _ => (StatusCode::BAD_REQUEST, "BadRequest"),
        };

        (
            status,
            Json(RejectionBody {
                error,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequest<S> for ValidationContext
where
    S: Send + Sync,
{
    type Rejection = ContextRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        let config = parts
            .extensions
            .get::<Arc<ValidatorConfig>>()
            .cloned()
            .ok_or(ContextRejection::MissingConfig)?;

        let params = match RawPathParams::from_request_parts(&mut parts, state).await {
            Ok(params) => Value::Object(
                params
                    .iter()
                    .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
                    .collect(),
            ),
            Err(_) => Value::Object(Map::new()),
        };

        let query = match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
            Ok(Query(pairs)) => pairs_to_object(pairs),
            Err(err) => {
                debug!(error = %err, "ignoring unparseable query string");
                Value::Object(Map::new())
            }
        };

        let headers = parts.headers.clone();
        let body = read_body(&headers, Request::from_parts(parts, body), state).await?;

        let request = RequestData::new()
            .with_params(params)
            .with_query(query)
            .with_body(body)
            .with_header_map(&headers);

        Ok(ValidationContext::new(config, request))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return BodyKind::Other;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if mime == "application/json" || mime.ends_with("+json") {
        BodyKind::Json
    } else if mime == "application/x-www-form-urlencoded" {
        BodyKind::Form
    } else {
        BodyKind::Other
    }
}

/// JSON and urlencoded bodies are parsed; anything else reads as `{}`
async fn read_body<S>(headers: &HeaderMap, request: Request, state: &S) -> Result<Value, ContextRejection>
where
    S: Send + Sync,
{
    match body_kind(headers) {
        BodyKind::Json => {
            let bytes = Bytes::from_request(request, state)
                .await
                .map_err(|err| ContextRejection::Body(err.body_text()))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Object(Map::new()));
            }
            match serde_json::from_slice(&bytes) {
                Ok(Value::Null) => Ok(Value::Object(Map::new())),
                Ok(value) => Ok(value),
                Err(err) => Err(ContextRejection::Json(err.to_string())),
            }
        }
        BodyKind::Form => {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, state)
                .await
                .map_err(|err| ContextRejection::Form(err.body_text()))?;
            Ok(pairs_to_object(pairs))
        }
        BodyKind::Other => Ok(Value::Object(Map::new())),
    }
}

/// Flat object from key/value pairs; a repeated key collects its values in
/// an array
fn pairs_to_object(pairs: Vec<(String, String)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Value::String(value));
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(Value::String(value)),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, Value::String(value)]);
                }
            },
        }
    }
    Value::Object(map)
}
