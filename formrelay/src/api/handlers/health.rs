//! Connectivity probe endpoint.

use axum::Json;
use axum::http::Method;
use axum::response::IntoResponse;
use chrono::Utc;
use serde_json::json;

/// `GET /api/test` (any method, really): confirms the API is reachable and
/// echoes the method and server time.
pub async fn api_test(method: Method) -> impl IntoResponse {
    Json(json!({
        "message": "API is working!",
        "method": method.as_str(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
