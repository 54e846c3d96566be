use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use request_validator::{ValidationErrors, ValidatorError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("validator misconfigured: {0}")]
    Validator(#[from] ValidatorError),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    code: u16,
    timestamp: String,
    correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            ApiError::Validation(errors) => errors.into_response(),
            ApiError::Validator(_) => {
                tracing::error!(error = %message, "validator configuration error");
                internal(message)
            }
        }
    }
}

fn internal(message: String) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let payload = ErrorResponse {
        error: "InternalServerError".to_string(),
        message,
        code: status.as_u16(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        correlation_id: correlation_id.clone(),
    };

    let mut response = (status, Json(payload)).into_response();
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response
            .headers_mut()
            .insert(header::HeaderName::from_static("x-correlation-id"), value);
    }
    response
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
