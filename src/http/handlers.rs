//! Static handlers for the API and health listeners.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Body served at `/` by the API listener.
pub const API_BODY: &str = "hello world";

/// Body served by the health listener.
pub const HEALTH_BODY: &str = "ok";

/// Router for the API listener.
pub fn api_router() -> Router {
    Router::new()
        .route("/", get(hello))
        .layer(TraceLayer::new_for_http())
}

/// Router for the health listener, answering on `path`.
pub fn health_router(path: &str) -> Router {
    Router::new()
        .route(path, get(healthz))
        .layer(TraceLayer::new_for_http())
}

async fn hello() -> &'static str {
    API_BODY
}

async fn healthz() -> &'static str {
    HEALTH_BODY
}
