use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::{database, fetch_owned_curriculum};
use crate::models::{
    self, api_error, ApiResponse, CurriculumUpdatePayload, CurriculumVersionRow, ErrorResponse,
    RestoreVersionResponse, ServerEvent,
};
use crate::routes::auth_middleware::AuthUser;
use crate::AppState;

/// List a curriculum's version snapshots, newest first
pub async fn version_list(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<CurriculumVersionRow>>>), (StatusCode, Json<ErrorResponse>)>
{
    let db = database()?;
    fetch_owned_curriculum(&db, user.id, id).await?;

    let versions = match db.list_versions(id).await {
        Ok(versions) => versions,
        Err(e) => {
            error!("Failed to list versions for curriculum '{}': {}", id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to list versions",
            ));
        }
    };

    Ok((StatusCode::OK, Json(ApiResponse::new(versions))))
}

/// Restore a curriculum's content from a snapshot. The restore itself is
/// recorded as a fresh version on top of the history.
pub async fn version_restore(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((id, version_number)): Path<(Uuid, i32)>,
) -> Result<(StatusCode, Json<ApiResponse<RestoreVersionResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let db = database()?;
    fetch_owned_curriculum(&db, user.id, id).await?;

    let snapshot = match db.get_version(id, version_number).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                models::error::VERSION_NOT_FOUND,
                "Version not found",
            ));
        }
        Err(e) => {
            error!(
                "Failed to fetch version {} of curriculum '{}': {}",
                version_number, id, e
            );
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to fetch version",
            ));
        }
    };

    let (row, saved_as) = match db.restore_version(user.id, id, &snapshot).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            return Err(api_error(
                StatusCode::NOT_FOUND,
                models::error::CURRICULUM_NOT_FOUND,
                "Curriculum not found",
            ));
        }
        Err(e) => {
            error!("Failed to restore curriculum '{}': {}", id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to restore version",
            ));
        }
    };

    // Editors with the curriculum open see the restored content right away
    app_state
        .hub
        .send_to_curriculum(
            &id.to_string(),
            ServerEvent::CurriculumUpdated {
                update: CurriculumUpdatePayload {
                    curriculum_id: id.to_string(),
                    field: "content".to_string(),
                    value: snapshot.content.clone(),
                    timestamp: Utc::now().to_rfc3339(),
                },
                user_id: user.id.to_string(),
            },
        )
        .await;

    info!(
        "Curriculum restored to version {}: {} by user {}",
        version_number, id, user.id
    );
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message(
            RestoreVersionResponse {
                id: row.id,
                current_version: saved_as,
                restored_from_version: version_number,
            },
            format!("Restored to version {}", version_number),
        )),
    ))
}
