use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{
    chat, chat_history_clear, chat_history_get, chat_history_save, chat_stream, curriculum_create,
    curriculum_delete, curriculum_duplicate, curriculum_get, curriculum_list, curriculum_update,
    diagnostics, enhance_content, generate_questions, health_check, ready_check, version_list,
    version_restore,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::ws::handler::websocket_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check));

    let protected = Router::new()
        .route("/diagnostics", get(diagnostics))
        .route("/curriculums", get(curriculum_list).post(curriculum_create))
        .route(
            "/curriculums/:id",
            get(curriculum_get)
                .put(curriculum_update)
                .delete(curriculum_delete),
        )
        .route("/curriculums/:id/duplicate", post(curriculum_duplicate))
        .route("/curriculums/:id/versions", get(version_list))
        .route(
            "/curriculums/:id/versions/:version_number/restore",
            post(version_restore),
        )
        .route(
            "/curriculums/:id/chat",
            get(chat_history_get)
                .post(chat_history_save)
                .delete(chat_history_clear),
        )
        .route("/claude/chat", post(chat))
        .route("/claude/stream", post(chat_stream))
        .route("/claude/enhance", post(enhance_content))
        .route("/claude/questions", post(generate_questions))
        .route_layer(middleware::from_fn(auth_middleware)); // Applies to all routes added above

    public.merge(protected).with_state(state)
}

/// Create the realtime route. Authentication happens in-band through the
/// `authenticate` event, so the HTTP middleware is not applied here.
pub fn create_ws_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state)
}
