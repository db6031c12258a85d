use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::llm_api_error;
use crate::models::{
    validation_error, ApiResponse, ChatRequest, ChatResponseData, ErrorResponse,
};
use crate::routes::auth_middleware::AuthUser;
use crate::services::llm_service::extract_suggestions;
use crate::AppState;

/// Blocking chat completion; returns the full reply plus follow-up suggestions
pub async fn chat(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<ChatRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatResponseData>>), (StatusCode, Json<ErrorResponse>)> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let message = app_state
        .llm
        .generate_response(&request.message, &request.context)
        .await
        .map_err(llm_api_error)?;

    let suggestions = extract_suggestions(&message, &request.context);

    info!("Chat response generated for user {}", user.id);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(ChatResponseData {
            message,
            suggestions,
        })),
    ))
}
