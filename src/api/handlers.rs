use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{ApiResponse, PromptRequest},
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Turn a free-text prompt into movie recommendations
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(
            request_id = %request_id,
            error = %rejection.body_text(),
            "Request binding error"
        );
        AppError::Validation("Invalid request format".to_string())
    })?;

    tracing::info!(
        request_id = %request_id,
        prompt = %request.prompt,
        "Processing recommendation request"
    );

    let response = state.pipeline.run(&request.prompt).await?;

    tracing::info!(
        request_id = %request_id,
        optimized_prompt = %response.optimized_prompt,
        "Recommendation request completed"
    );

    Ok(Json(response))
}
