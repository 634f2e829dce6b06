//! Liveness endpoint. No credential required.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `initializing`, `healthy` or `unhealthy`.
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// `GET /health` — readiness of the completion backend.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: ctx.core.backend_state().label(),
        version: crate::config::APP_VERSION,
        timestamp: Utc::now().to_rfc3339(),
    })
}
