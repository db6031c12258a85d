use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::{database, fetch_owned_curriculum};
use crate::models::{
    self, api_error, validation_error, ApiResponse, ChatMessageRow, ErrorResponse,
    SaveChatMessageRequest,
};
use crate::routes::auth_middleware::AuthUser;

/// Chat history of a curriculum, oldest first
pub async fn chat_history_get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ChatMessageRow>>>), (StatusCode, Json<ErrorResponse>)>
{
    let db = database()?;
    fetch_owned_curriculum(&db, user.id, id).await?;

    let history = match db.list_chat_messages(id).await {
        Ok(history) => history,
        Err(e) => {
            error!("Failed to fetch chat history for curriculum '{}': {}", id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to fetch chat history",
            ));
        }
    };

    Ok((StatusCode::OK, Json(ApiResponse::new(history))))
}

/// Append a chat message to a curriculum's history
pub async fn chat_history_save(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<SaveChatMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ChatMessageRow>>), (StatusCode, Json<ErrorResponse>)> {
    let errors = request.validate();
    if !errors.is_empty() {
        return Err(validation_error(errors));
    }

    let db = database()?;
    fetch_owned_curriculum(&db, user.id, id).await?;

    let message = match db.insert_chat_message(id, &request.role, &request.content).await {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to save chat message for curriculum '{}': {}", id, e);
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                models::error::DATABASE_ERROR,
                "Failed to save chat message",
            ));
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(message, "Chat message saved")),
    ))
}

/// Clear the chat history of a curriculum
pub async fn chat_history_clear(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), (StatusCode, Json<ErrorResponse>)> {
    let db = database()?;
    fetch_owned_curriculum(&db, user.id, id).await?;

    if let Err(e) = db.clear_chat_messages(id).await {
        error!("Failed to clear chat history for curriculum '{}': {}", id, e);
        return Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            models::error::DATABASE_ERROR,
            "Failed to clear chat history",
        ));
    }

    info!("Chat history cleared for curriculum {} by user {}", id, user.id);
    Ok((
        StatusCode::OK,
        Json(ApiResponse::with_message((), "Chat history cleared")),
    ))
}
