use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::FieldError;

pub const CURRICULUM_TYPES: [&str; 3] = ["online", "offline", "hybrid"];

/// Curriculum row as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CurriculumRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub target_audience: Option<String>,
    pub duration: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub curriculum_type: Option<String>,
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a curriculum
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCurriculumRequest {
    pub title: String,
    pub target_audience: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "type")]
    pub curriculum_type: Option<String>,
    #[schema(value_type = Object)]
    pub content: serde_json::Value,
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
}

impl CreateCurriculumRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_title(Some(&self.title), &mut errors);
        check_optional_fields(
            self.target_audience.as_deref(),
            self.duration.as_deref(),
            self.curriculum_type.as_deref(),
            &mut errors,
        );
        if !self.content.is_object() {
            errors.push(FieldError {
                field: "content".to_string(),
                message: "content must be an object".to_string(),
            });
        }
        errors
    }
}

/// Request to update a curriculum; all fields optional
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateCurriculumRequest {
    pub title: Option<String>,
    pub target_audience: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "type")]
    pub curriculum_type: Option<String>,
    #[schema(value_type = Object)]
    pub content: Option<serde_json::Value>,
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
}

impl UpdateCurriculumRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.title.is_some() {
            check_title(self.title.as_deref(), &mut errors);
        }
        check_optional_fields(
            self.target_audience.as_deref(),
            self.duration.as_deref(),
            self.curriculum_type.as_deref(),
            &mut errors,
        );
        if let Some(content) = &self.content {
            if !content.is_object() {
                errors.push(FieldError {
                    field: "content".to_string(),
                    message: "content must be an object".to_string(),
                });
            }
        }
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.target_audience.is_none()
            && self.duration.is_none()
            && self.curriculum_type.is_none()
            && self.content.is_none()
            && self.metadata.is_none()
    }
}

fn check_title(title: Option<&str>, errors: &mut Vec<FieldError>) {
    match title {
        Some(t) if t.trim().is_empty() => errors.push(FieldError {
            field: "title".to_string(),
            message: "title is required".to_string(),
        }),
        Some(t) if t.chars().count() > 200 => errors.push(FieldError {
            field: "title".to_string(),
            message: "title must not exceed 200 characters".to_string(),
        }),
        _ => {}
    }
}

fn check_optional_fields(
    target_audience: Option<&str>,
    duration: Option<&str>,
    curriculum_type: Option<&str>,
    errors: &mut Vec<FieldError>,
) {
    if let Some(audience) = target_audience {
        if audience.chars().count() > 100 {
            errors.push(FieldError {
                field: "target_audience".to_string(),
                message: "target_audience must not exceed 100 characters".to_string(),
            });
        }
    }
    if let Some(duration) = duration {
        if duration.chars().count() > 50 {
            errors.push(FieldError {
                field: "duration".to_string(),
                message: "duration must not exceed 50 characters".to_string(),
            });
        }
    }
    if let Some(kind) = curriculum_type {
        if !CURRICULUM_TYPES.contains(&kind) {
            errors.push(FieldError {
                field: "type".to_string(),
                message: "type must be one of online, offline, hybrid".to_string(),
            });
        }
    }
}

/// Query parameters for the curriculum list endpoint
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CurriculumListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub curriculum_type: Option<String>,
    pub target_audience: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

pub const SORT_COLUMNS: [&str; 3] = ["created_at", "updated_at", "title"];

impl CurriculumListQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 50)
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if let Some(sort) = &self.sort {
            if !SORT_COLUMNS.contains(&sort.as_str()) {
                errors.push(FieldError {
                    field: "sort".to_string(),
                    message: "sort must be one of created_at, updated_at, title".to_string(),
                });
            }
        }
        if let Some(order) = &self.order {
            if order != "asc" && order != "desc" {
                errors.push(FieldError {
                    field: "order".to_string(),
                    message: "order must be asc or desc".to_string(),
                });
            }
        }
        if let Some(kind) = &self.curriculum_type {
            if !CURRICULUM_TYPES.contains(&kind.as_str()) {
                errors.push(FieldError {
                    field: "type".to_string(),
                    message: "type must be one of online, offline, hybrid".to_string(),
                });
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_request() -> CreateCurriculumRequest {
        CreateCurriculumRequest {
            title: "Intro to AI tools".to_string(),
            target_audience: Some("marketing teams".to_string()),
            duration: Some("4 weeks".to_string()),
            curriculum_type: Some("online".to_string()),
            content: json!({"summary": "hands-on course"}),
            metadata: None,
        }
    }

    #[test]
    fn valid_create_request_passes() {
        assert!(create_request().validate().is_empty());
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut req = create_request();
        req.title = "   ".to_string();
        let errors = req.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "title");
    }

    #[test]
    fn overlong_title_is_rejected() {
        let mut req = create_request();
        req.title = "x".repeat(201);
        assert_eq!(req.validate()[0].field, "title");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut req = create_request();
        req.curriculum_type = Some("on-demand".to_string());
        assert_eq!(req.validate()[0].field, "type");
    }

    #[test]
    fn non_object_content_is_rejected() {
        let mut req = create_request();
        req.content = json!("just a string");
        assert_eq!(req.validate()[0].field, "content");
    }

    #[test]
    fn list_query_defaults_and_clamps() {
        let q = CurriculumListQuery {
            page: None,
            limit: Some(500),
            search: None,
            curriculum_type: None,
            target_audience: None,
            sort: None,
            order: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 50);
        assert!(q.validate().is_empty());
    }

    #[test]
    fn list_query_rejects_unknown_sort() {
        let q = CurriculumListQuery {
            page: None,
            limit: None,
            search: None,
            curriculum_type: None,
            target_audience: None,
            sort: Some("user_id".to_string()),
            order: None,
        };
        assert_eq!(q.validate()[0].field, "sort");
    }
}
