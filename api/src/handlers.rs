use axum::{http::StatusCode, Json};
use request_validator::{Location, Schema, ValidationContext};
use serde_json::{json, Value};

use crate::error::ApiResult;

/// `POST /users`
pub async fn create_user(mut ctx: ValidationContext) -> ApiResult<(StatusCode, Json<Value>)> {
    ctx.check_body("email", Some("valid email required"))
        .is_email();
    ctx.check_body("password", None)
        .is_length(json!({ "min": 8 }))
        .with_message("password must be at least 8 characters");
    ctx.check_body("username", Some("%0 is already taken"))
        .not_empty()
        .apply("isUsernameAvailable", &[])?;

    ctx.sanitize_body("email").normalize_email();
    ctx.sanitize_body("username").trim(None);
    ctx.sanitize_body("bio").escape();
    ctx.sanitize_body("handle").apply("toSlug", &[])?;

    ctx.async_validation_errors(false).await?;

    tracing::info!("user payload accepted");
    Ok((StatusCode::CREATED, Json(ctx.sanitizer_legal_result())))
}

fn user_query_schema() -> ApiResult<Schema> {
    Ok(Schema::from_value(&json!({
        "id": {
            "in": "params",
            "isInt": { "options": [{ "min": 1 }], "errorMessage": "id must be a positive integer" }
        },
        "fields": {
            "optional": { "options": { "checkFalsy": true } },
            "matches": { "options": ["^[a-z,]+$"], "errorMessage": "fields must be a comma separated list" }
        },
        "x-request-id": {
            "in": "headers",
            "optional": true,
            "isUUID": { "errorMessage": "x-request-id must be a UUID" }
        }
    }))?)
}

/// `GET /users/:id`
pub async fn show_user(mut ctx: ValidationContext) -> ApiResult<Json<Value>> {
    ctx.check_schema_in(Location::Query, &user_query_schema()?)?;
    let legal = ctx.validation_legal_result(true).await?;
    Ok(Json(Value::Object(legal)))
}

/// `GET /search`
pub async fn search(mut ctx: ValidationContext) -> Json<Value> {
    ctx.check_query("q", Some("a search term is required")).not_empty();
    ctx.check_query("limit", None)
        .optional()
        .is_int(json!({ "min": 1, "max": 100 }));
    ctx.sanitize_query("q").trim(None);
    ctx.sanitize_query("limit").to_int(None);

    let result = ctx.validation_result().await.use_first_error_only();
    if result.is_empty() {
        Json(json!({ "query": ctx.request().query().clone() }))
    } else {
        Json(json!({ "errors": result.mapped() }))
    }
}
