use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::llm_api_error;
use crate::models::{ApiResponse, ErrorResponse, QuestionsRequest, QuestionsResponseData};
use crate::routes::auth_middleware::AuthUser;
use crate::services::llm_service::categorize_questions;
use crate::AppState;

/// Generate clarifying questions about the curriculum being drafted
pub async fn generate_questions(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<QuestionsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QuestionsResponseData>>), (StatusCode, Json<ErrorResponse>)>
{
    let questions = app_state
        .llm
        .generate_clarifying_questions(&request.context)
        .await
        .map_err(llm_api_error)?;

    let categories = categorize_questions(&questions);

    info!("Clarifying questions generated for user {}", user.id);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(QuestionsResponseData {
            questions,
            categories,
        })),
    ))
}
