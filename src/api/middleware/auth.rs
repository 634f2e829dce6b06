//! Bearer API-key authentication middleware.
//!
//! Extracts `Authorization: Bearer <key>`, checks its SHA-256 hash against
//! the configured key set, and injects `CallerContext` into request
//! extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{caller_id_for, hash_key, ApiContext, CallerContext};

/// Require a valid API key. Missing/malformed header → 401, unknown key → 403.
pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let key_hash = hash_key(key);
    if !ctx.api_keys.contains(&key_hash) {
        tracing::warn!("rejected request with unrecognized API key");
        return Err(ApiError::Forbidden);
    }

    req.extensions_mut().insert(CallerContext {
        caller_id: caller_id_for(&key_hash),
    });

    Ok(next.run(req).await)
}
