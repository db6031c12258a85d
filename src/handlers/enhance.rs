use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use crate::handlers::llm_api_error;
use crate::models::{
    validation_error, ApiResponse, EnhanceRequest, EnhanceResponseData, ErrorResponse,
};
use crate::routes::auth_middleware::AuthUser;
use crate::services::llm_service::analyze_improvements;
use crate::AppState;

/// Rework curriculum content into an improved draft
pub async fn enhance_content(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<EnhanceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EnhanceResponseData>>), (StatusCode, Json<ErrorResponse>)>
{
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let enhanced_content = app_state
        .llm
        .enhance_content(&request.content, &request.context)
        .await
        .map_err(llm_api_error)?;

    let improvements = analyze_improvements(&request.content, &enhanced_content);

    info!("Content enhancement completed for user {}", user.id);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(EnhanceResponseData {
            original_length: request.content.chars().count(),
            enhanced_length: enhanced_content.chars().count(),
            enhanced_content,
            improvements,
        })),
    ))
}
