use axum::{extract::Extension, http::StatusCode, Json};
use tracing::{error, info};

use crate::handlers::database;
use crate::models::{
    self, api_error, validation_error, ApiResponse, CreateCurriculumRequest, CurriculumRow,
    ErrorResponse,
};
use crate::routes::auth_middleware::AuthUser;

/// Create a curriculum; its first version snapshot is written alongside
pub async fn curriculum_create(
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateCurriculumRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CurriculumRow>>), (StatusCode, Json<ErrorResponse>)> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let db = database()?;
    let row = match db.insert_curriculum(user.id, &request).await {
        Ok(row) => row,
        Err(e) => {
            error!("Failed to create curriculum for user {}: {}", user.id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to create curriculum",
            ));
        }
    };

    info!("Curriculum created: {} by user {}", row.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(row, "Curriculum created")),
    ))
}
