use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Snapshot of a curriculum's content at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CurriculumVersionRow {
    pub id: Uuid,
    pub curriculum_id: Uuid,
    pub version_number: i32,
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Response payload for a version restore
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub struct RestoreVersionResponse {
    pub id: Uuid,
    pub current_version: i32,
    pub restored_from_version: i32,
}
