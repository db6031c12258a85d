use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::handlers::{database, fetch_owned_curriculum};
use crate::models::{ApiResponse, CurriculumRow, ErrorResponse};
use crate::routes::auth_middleware::AuthUser;

/// Fetch one curriculum owned by the caller
pub async fn curriculum_get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<CurriculumRow>>), (StatusCode, Json<ErrorResponse>)> {
    let db = database()?;
    let row = fetch_owned_curriculum(&db, user.id, id).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new(row))))
}
