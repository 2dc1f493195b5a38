use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::{instrument, warn};

use super::AppState;

/// Health check endpoint handler
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let policy = state.cart_service.policy().to_string();

    match state.cart_service.session_count().await {
        Ok(sessions) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "sessioncart-rs",
                "version": env!("CARGO_PKG_VERSION"),
                "sessions": sessions,
                "concurrency_policy": policy,
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        ),
        Err(err) => {
            warn!("Session store health check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "sessioncart-rs",
                    "version": env!("CARGO_PKG_VERSION"),
                    "error": err.to_string(),
                    "timestamp": chrono::Utc::now().to_rfc3339()
                })),
            )
        }
    }
}
