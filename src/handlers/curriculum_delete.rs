use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::database;
use crate::models::{self, api_error, ApiResponse, ErrorResponse};
use crate::routes::auth_middleware::AuthUser;

/// Delete a curriculum together with its versions and chat history
pub async fn curriculum_delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), (StatusCode, Json<ErrorResponse>)> {
    let db = database()?;
    match db.delete_curriculum(user.id, id).await {
        Ok(true) => {
            info!("Curriculum deleted: {} by user {}", id, user.id);
            Ok((
                StatusCode::OK,
                Json(ApiResponse::with_message((), "Curriculum deleted")),
            ))
        }
        Ok(false) => Err(api_error(
            StatusCode::NOT_FOUND,
            models::error::CURRICULUM_NOT_FOUND,
            "Curriculum not found",
        )),
        Err(e) => {
            error!("Failed to delete curriculum '{}': {}", id, e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to delete curriculum",
            ))
        }
    }
}
