use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::FieldError;

/// Persisted chat message attached to a curriculum
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub curriculum_id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Request to append a chat message to a curriculum's history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SaveChatMessageRequest {
    pub role: String,
    pub content: String,
}

impl SaveChatMessageRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.role != "user" && self.role != "assistant" {
            errors.push(FieldError {
                field: "role".to_string(),
                message: "role must be user or assistant".to_string(),
            });
        }
        if self.content.trim().is_empty() {
            errors.push(FieldError {
                field: "content".to_string(),
                message: "content is required".to_string(),
            });
        } else if self.content.chars().count() > 10_000 {
            errors.push(FieldError {
                field: "content".to_string(),
                message: "content must not exceed 10000 characters".to_string(),
            });
        }
        errors
    }
}

/// One prior turn of the AI conversation, as sent to the provider
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Curriculum context accompanying every AI request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumContext {
    pub target_audience: Option<String>,
    pub duration: Option<String>,
    #[serde(rename = "type")]
    pub curriculum_type: Option<String>,
    pub current_content: Option<String>,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

/// Request body for the chat and streaming endpoints
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    pub context: CurriculumContext,
}

impl ChatRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.message.trim().is_empty() {
            errors.push(FieldError {
                field: "message".to_string(),
                message: "message is required".to_string(),
            });
        } else if self.message.chars().count() > 10_000 {
            errors.push(FieldError {
                field: "message".to_string(),
                message: "message must not exceed 10000 characters".to_string(),
            });
        }
        for turn in &self.context.chat_history {
            if turn.role != "user" && turn.role != "assistant" {
                errors.push(FieldError {
                    field: "context.chatHistory".to_string(),
                    message: "chat history roles must be user or assistant".to_string(),
                });
                break;
            }
        }
        errors
    }
}

/// Response payload for the non-streaming chat endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatResponseData {
    pub message: String,
    pub suggestions: Vec<String>,
}

/// Request body for the content enhancement endpoint
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnhanceRequest {
    pub content: String,
    pub context: CurriculumContext,
}

impl EnhanceRequest {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.content.trim().is_empty() {
            errors.push(FieldError {
                field: "content".to_string(),
                message: "content is required".to_string(),
            });
        } else if self.content.chars().count() > 50_000 {
            errors.push(FieldError {
                field: "content".to_string(),
                message: "content must not exceed 50000 characters".to_string(),
            });
        }
        errors
    }
}

/// Response payload for the content enhancement endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponseData {
    pub enhanced_content: String,
    pub improvements: Vec<String>,
    pub original_length: usize,
    pub enhanced_length: usize,
}

/// Request body for the clarifying questions endpoint
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub context: CurriculumContext,
}

/// A category of clarifying questions
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct QuestionCategory {
    pub name: String,
    pub questions: Vec<String>,
}

/// Response payload for the clarifying questions endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionsResponseData {
    pub questions: Vec<String>,
    pub categories: Vec<QuestionCategory>,
}

/// Frames emitted by the streaming relay, in SSE `data:` lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrame {
    Start {
        message: String,
    },
    Chunk {
        content: String,
    },
    End {
        suggestions: Vec<String>,
        #[serde(rename = "fullMessage")]
        full_message: String,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_requires_message() {
        let req = ChatRequest {
            message: "".to_string(),
            context: CurriculumContext::default(),
        };
        assert_eq!(req.validate()[0].field, "message");
    }

    #[test]
    fn chat_request_rejects_bad_history_role() {
        let req = ChatRequest {
            message: "help me plan a course".to_string(),
            context: CurriculumContext {
                chat_history: vec![ChatTurn {
                    role: "system".to_string(),
                    content: "hi".to_string(),
                }],
                ..Default::default()
            },
        };
        assert_eq!(req.validate()[0].field, "context.chatHistory");
    }

    #[test]
    fn save_chat_message_limits_length() {
        let req = SaveChatMessageRequest {
            role: "user".to_string(),
            content: "y".repeat(10_001),
        };
        assert_eq!(req.validate()[0].field, "content");
    }

    #[test]
    fn stream_frames_serialize_to_wire_shape() {
        let start = serde_json::to_value(StreamFrame::Start {
            message: "Generating response...".to_string(),
        })
        .unwrap();
        assert_eq!(start["type"], "start");

        let end = serde_json::to_value(StreamFrame::End {
            suggestions: vec!["one".to_string()],
            full_message: "Hello world".to_string(),
        })
        .unwrap();
        assert_eq!(end["type"], "end");
        assert_eq!(end["fullMessage"], "Hello world");

        let chunk = serde_json::to_value(StreamFrame::Chunk {
            content: "Hel".to_string(),
        })
        .unwrap();
        assert_eq!(chunk["type"], "chunk");
        assert_eq!(chunk["content"], "Hel");
    }

    #[test]
    fn curriculum_context_accepts_camel_case() {
        let ctx: CurriculumContext = serde_json::from_str(
            r#"{"targetAudience":"designers","duration":"2 days","type":"online","chatHistory":[]}"#,
        )
        .unwrap();
        assert_eq!(ctx.target_audience.as_deref(), Some("designers"));
        assert_eq!(ctx.curriculum_type.as_deref(), Some("online"));
    }
}
