use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::{database, fetch_owned_curriculum};
use crate::models::{self, api_error, ApiResponse, CurriculumRow, ErrorResponse};
use crate::routes::auth_middleware::AuthUser;

/// Copy a curriculum into a new one owned by the caller
pub async fn curriculum_duplicate(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<CurriculumRow>>), (StatusCode, Json<ErrorResponse>)> {
    let db = database()?;
    let original = fetch_owned_curriculum(&db, user.id, id).await?;

    let copy = match db.duplicate_curriculum(user.id, &original).await {
        Ok(copy) => copy,
        Err(e) => {
            error!("Failed to duplicate curriculum '{}': {}", id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to duplicate curriculum",
            ));
        }
    };

    info!("Curriculum duplicated: {} -> {} by user {}", id, copy.id, user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(copy, "Curriculum duplicated")),
    ))
}
