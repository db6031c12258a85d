use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::handlers::database;
use crate::models::{
    self, api_error, validation_error, CurriculumListQuery, CurriculumRow, PagedResponse,
    Pagination, ErrorResponse,
};
use crate::routes::auth_middleware::AuthUser;

/// List the caller's curricula with search, filters and pagination
pub async fn curriculum_list(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CurriculumListQuery>,
) -> Result<(StatusCode, Json<PagedResponse<CurriculumRow>>), (StatusCode, Json<ErrorResponse>)> {
    let errors = query.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let db = database()?;
    let (rows, total) = match db.list_curriculums(user.id, &query).await {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to list curricula for user {}: {}", user.id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to list curricula",
            ));
        }
    };

    let pagination = Pagination::new(query.page(), query.limit(), total);
    Ok((StatusCode::OK, Json(PagedResponse::new(rows, pagination))))
}
