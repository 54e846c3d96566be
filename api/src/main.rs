mod config;
mod error;
mod handlers;
mod observability;
mod routes;

use anyhow::Result;
use axum::http::{header, Method};
use axum::{middleware, Router};
use dotenv::dotenv;
use request_validator::{validator_middleware, Input, Outcome, ValidatorConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::observability::Observability;

const RESERVED_USERNAMES: [&str; 3] = ["admin", "root", "system"];

/// Built-in predicates plus the service's own checks
pub(crate) fn validator_config() -> ValidatorConfig {
    ValidatorConfig::builder()
        .custom_validator("isUsernameAvailable", |input: &Input, _: &[Value]| {
            let username = input.as_str().trim().to_ascii_lowercase();
            Outcome::deferred(async move {
                // stands in for a user store lookup
                tokio::time::sleep(Duration::from_millis(5)).await;
                !RESERVED_USERNAMES.contains(&username.as_str())
            })
        })
        .custom_sanitizer("toSlug", |input: &Input, _: &[Value]| {
            let slug: String = input
                .as_str()
                .trim()
                .to_lowercase()
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect();
            Value::String(slug)
        })
        .build()
}

pub(crate) fn app(config: Arc<ValidatorConfig>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(routes::user_routes())
        .merge(routes::search_routes())
        .layer(middleware::from_fn_with_state(config, validator_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    Observability::init()?;

    let server = ServerConfig::from_env()?;
    let app = app(Arc::new(validator_config()));

    let addr = server.addr();
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
