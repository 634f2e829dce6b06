//! HTTP router.
//!
//! `/health` is open; everything under `/api/` goes through the rate
//! limiter and API-key auth. Middleware reads `Extension<ApiContext>`
//! (injected as the outermost layer); handlers use `State<ApiContext>`.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::error::{ErrorBody, ErrorDetail};
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::AppConfig;
use crate::core_state::CoreState;

/// Build the service router.
pub fn api_router(core: Arc<CoreState>, config: &AppConfig) -> Router {
    build_router(ApiContext::new(core, config), config)
}

fn build_router(ctx: ApiContext, config: &AppConfig) -> Router {
    // Protected routes. Layers run outermost-last:
    //   Extension → rate limit → auth → handler
    let protected = Router::new()
        .route("/article/step1", post(endpoints::article::step1))
        .route("/article/step2", post(endpoints::article::step2))
        .route("/article/step3", post(endpoints::article::step3))
        .route("/article/step4", post(endpoints::article::step4))
        .route("/article/step5", post(endpoints::article::step5))
        .route(
            "/history",
            get(endpoints::history::list)
                .post(endpoints::history::save)
                .delete(endpoints::history::clear),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::middleware::from_fn(middleware::rate::limit))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .nest("/api", protected)
        .fallback(not_found)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// JSON 404 for unmatched routes, matching the error body shape.
async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody {
            error: ErrorDetail {
                code: "NOT_FOUND",
                message: "route not found".to_string(),
            },
        }),
    )
}
