//! The five article-generation endpoints, one per pipeline stage.
//!
//! Each handler validates its request body against the stage's input
//! schema, fetches the completion client (503 until the backend is ready),
//! runs the stage and wraps the validated result in a `success: true`
//! envelope. The server keeps no state between stages; stage N+1's request
//! carries stage N's validated result.

use axum::extract::State;
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, CallerContext};
use crate::pipeline::schema;
use crate::pipeline::stages;
use crate::pipeline::{PipelineError, Stage};

fn validation_error(stage: Stage, message: String) -> ApiError {
    PipelineError::Validation { stage, message }.into()
}

/// Merge a serializable result into a `success: true` envelope.
fn success_body<T: serde::Serialize>(result: &T) -> Result<Json<Value>, ApiError> {
    let mut value =
        serde_json::to_value(result).map_err(|e| ApiError::Internal(e.to_string()))?;
    match value.as_object_mut() {
        Some(map) => {
            map.insert("success".into(), json!(true));
            Ok(Json(value))
        }
        None => Err(ApiError::Internal("stage result is not an object".into())),
    }
}

/// `POST /api/article/step1` — keyword discovery.
pub async fn step1(
    Extension(caller): Extension<CallerContext>,
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = schema::validate_step1_request(&body)
        .map_err(|m| validation_error(Stage::Keywords, m))?;
    let client = ctx.core.completion()?;
    let result = stages::run_step1(&client, &request, &caller.caller_id).await?;
    success_body(&result)
}

/// `POST /api/article/step2` — outline generation.
pub async fn step2(
    Extension(caller): Extension<CallerContext>,
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = schema::validate_step2_request(&body)
        .map_err(|m| validation_error(Stage::Outline, m))?;
    let client = ctx.core.completion()?;
    let result = stages::run_step2(&client, &request, &caller.caller_id).await?;
    success_body(&result)
}

/// `POST /api/article/step3` — research and citations.
pub async fn step3(
    Extension(caller): Extension<CallerContext>,
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = schema::validate_step3_request(&body)
        .map_err(|m| validation_error(Stage::Research, m))?;
    let client = ctx.core.completion()?;
    let result = stages::run_step3(&client, &request, &caller.caller_id).await?;
    success_body(&result)
}

/// `POST /api/article/step4` — article assembly.
pub async fn step4(
    Extension(caller): Extension<CallerContext>,
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = schema::validate_step4_request(&body)
        .map_err(|m| validation_error(Stage::Article, m))?;
    let client = ctx.core.completion()?;
    let html = stages::run_step4(&client, &request, &caller.caller_id).await?;
    Ok(Json(json!({ "success": true, "htmlArticle": html })))
}

/// `POST /api/article/step5` — SEO scoring. Degrades to a fixed advisory
/// report instead of failing; a completed article always gets a response.
pub async fn step5(
    Extension(caller): Extension<CallerContext>,
    State(ctx): State<ApiContext>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = schema::validate_step5_request(&body)
        .map_err(|m| validation_error(Stage::SeoReport, m))?;
    let client = ctx.core.completion()?;
    let report = stages::run_step5(&client, &request, &caller.caller_id).await;
    Ok(Json(json!({ "success": true, "seoReport": report })))
}
