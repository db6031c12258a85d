use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// List curricula
#[utoipa::path(
    get,
    path = "/api/curriculums",
    params(
        ("page" = Option<i64>, Query, description = "Page number, 1-based"),
        ("limit" = Option<i64>, Query, description = "Page size, max 50"),
        ("search" = Option<String>, Query, description = "Title search"),
        ("type" = Option<String>, Query, description = "online, offline or hybrid"),
        ("sort" = Option<String>, Query, description = "created_at, updated_at or title"),
        ("order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "Page of curricula", body = [CurriculumRow]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn curriculum_list_doc() {}

/// Create a curriculum
#[utoipa::path(
    post,
    path = "/api/curriculums",
    request_body = CreateCurriculumRequest,
    responses(
        (status = 201, description = "Curriculum created", body = CurriculumRow),
        (status = 400, description = "Validation failed", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn curriculum_create_doc() {}

/// Restore a curriculum version
#[utoipa::path(
    post,
    path = "/api/curriculums/{id}/versions/{version_number}/restore",
    params(
        ("id" = uuid::Uuid, Path, description = "Curriculum id"),
        ("version_number" = i32, Path, description = "Snapshot to restore")
    ),
    responses(
        (status = 200, description = "Version restored", body = RestoreVersionResponse),
        (status = 404, description = "Curriculum or version not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn version_restore_doc() {}

/// Blocking AI chat completion
#[utoipa::path(
    post,
    path = "/api/claude/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Full completion with suggestions", body = ChatResponseData),
        (status = 429, description = "Provider rate limit", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn chat_doc() {}

/// Streaming AI chat completion (Server-Sent Events)
#[utoipa::path(
    post,
    path = "/api/claude/stream",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "SSE stream of start/chunk/end/error frames")
    )
)]
#[allow(dead_code)]
pub async fn chat_stream_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        curriculum_list_doc,
        curriculum_create_doc,
        version_restore_doc,
        chat_doc,
        chat_stream_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            CurriculumRow,
            CreateCurriculumRequest,
            UpdateCurriculumRequest,
            CurriculumVersionRow,
            RestoreVersionResponse,
            ChatMessageRow,
            SaveChatMessageRequest,
            ChatRequest,
            ChatTurn,
            CurriculumContext,
            ChatResponseData,
            EnhanceRequest,
            EnhanceResponseData,
            QuestionsRequest,
            QuestionsResponseData,
            QuestionCategory,
            Pagination,
            ErrorResponse,
            ErrorBody,
            FieldError,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
