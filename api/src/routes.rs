use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;

pub fn user_routes() -> Router {
    Router::new()
        .route("/users", post(handlers::create_user))
        .route("/users/:id", get(handlers::show_user))
}

pub fn search_routes() -> Router {
    Router::new().route("/search", get(handlers::search))
}
