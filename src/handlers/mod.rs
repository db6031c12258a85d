pub mod chat;
pub mod chat_history;
pub mod chat_stream;
pub mod curriculum_create;
pub mod curriculum_delete;
pub mod curriculum_duplicate;
pub mod curriculum_get;
pub mod curriculum_list;
pub mod curriculum_update;
pub mod curriculum_versions;
pub mod diagnostics;
pub mod enhance;
pub mod health;
pub mod questions;

pub use chat::*;
pub use chat_history::*;
pub use chat_stream::*;
pub use curriculum_create::*;
pub use curriculum_delete::*;
pub use curriculum_duplicate::*;
pub use curriculum_get::*;
pub use curriculum_list::*;
pub use curriculum_update::*;
pub use curriculum_versions::*;
pub use diagnostics::*;
pub use enhance::*;
pub use health::*;
pub use questions::*;

use axum::{http::StatusCode, Json};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::db::dbcurricula::{self, DbCurricula};
use crate::models::{self, api_error, CurriculumRow, ErrorResponse};
use crate::services::llm_service::LlmError;

/// Convert a provider error into the response envelope
pub(crate) fn llm_api_error(e: LlmError) -> (StatusCode, Json<ErrorResponse>) {
    error!("LLM provider error: {}", e);
    api_error(e.status(), e.code(), e.user_message())
}

/// Fetch the database handle or fail the request
pub(crate) fn database() -> Result<Arc<DbCurricula>, (StatusCode, Json<ErrorResponse>)> {
    match dbcurricula::get_db() {
        Some(db) => Ok(db),
        None => {
            error!("Database not initialized");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::INTERNAL_SERVER_ERROR,
                "Database not initialized",
            ))
        }
    }
}

/// Load a curriculum and verify the caller owns it
pub(crate) async fn fetch_owned_curriculum(
    db: &DbCurricula,
    user_id: Uuid,
    id: Uuid,
) -> Result<CurriculumRow, (StatusCode, Json<ErrorResponse>)> {
    match db.get_curriculum(user_id, id).await {
        Ok(Some(row)) => Ok(row),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            models::error::CURRICULUM_NOT_FOUND,
            "Curriculum not found",
        )),
        Err(e) => {
            error!("Failed to fetch curriculum '{}': {}", id, e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to fetch curriculum",
            ))
        }
    }
}
