//! HTTP surface of the upload relay.

use axum::Router;
use axum::routing::{any, post};

use crate::AppState;

pub mod handlers;
pub mod models;

/// The relay's two routes. Unmatched methods on `/api/upload` fall through
/// to a JSON 405; `/api/test` echoes whatever method it is called with.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/upload",
            post(handlers::upload::submit_contract).fallback(handlers::upload::method_not_allowed),
        )
        .route("/api/test", any(handlers::health::api_test))
}
