use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::database;
use crate::models::{
    self, api_error, validation_error, ApiResponse, CurriculumRow, ErrorResponse,
    UpdateCurriculumRequest,
};
use crate::routes::auth_middleware::AuthUser;

/// Update a curriculum; a content change appends a new version snapshot
pub async fn curriculum_update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCurriculumRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CurriculumRow>>), (StatusCode, Json<ErrorResponse>)> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }
    if request.is_empty() {
        return Err(validation_error(vec![models::FieldError {
            field: "body".to_string(),
            message: "at least one field must be provided".to_string(),
        }]));
    }

    let db = database()?;
    let row = match db.update_curriculum(user.id, id, &request).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                models::error::CURRICULUM_NOT_FOUND,
                "Curriculum not found",
            ));
        }
        Err(e) => {
            error!("Failed to update curriculum '{}': {}", id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to update curriculum",
            ));
        }
    };

    info!("Curriculum updated: {} by user {}", id, user.id);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(row, "Curriculum updated")),
    ))
}
