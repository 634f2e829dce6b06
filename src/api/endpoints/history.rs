//! Article history endpoints.
//!
//! The client persists a finished run explicitly after stage 5; listing is
//! newest-first and deletion is bulk-only.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Deserialize)]
pub struct SaveArticleRequest {
    pub subject: String,
    pub html: String,
    #[serde(rename = "seoAnalysis")]
    pub seo_analysis: Value,
}

/// `POST /api/history` — persist one completed pipeline run.
pub async fn save(
    State(ctx): State<ApiContext>,
    Json(body): Json<SaveArticleRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.subject.trim().is_empty() || body.html.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "\"subject\" and \"html\" must be non-empty".into(),
        ));
    }
    let record = ctx
        .core
        .history()
        .insert(&body.subject, &body.html, &body.seo_analysis)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "success": true, "article": record })))
}

/// `GET /api/history` — all saved articles, newest first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let records = ctx
        .core
        .history()
        .list()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "success": true, "articles": records })))
}

/// `DELETE /api/history` — bulk clear.
pub async fn clear(State(ctx): State<ApiContext>) -> Result<Json<Value>, ApiError> {
    let deleted = ctx
        .core
        .history()
        .clear()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}
