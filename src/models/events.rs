use serde::{Deserialize, Serialize};

/// Field-level edit relayed between editors of the same curriculum
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumUpdatePayload {
    pub curriculum_id: String,
    pub field: String,
    pub value: serde_json::Value,
    pub timestamp: String,
}

/// Chat message mirrored to the other editors of a curriculum
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    pub curriculum_id: String,
    pub role: String,
    pub content: String,
    pub timestamp: String,
}

/// Events a client may send over the realtime connection
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "authenticate")]
    Authenticate { token: String },
    #[serde(rename = "join_curriculum")]
    JoinCurriculum {
        #[serde(rename = "curriculumId")]
        curriculum_id: String,
    },
    #[serde(rename = "leave_curriculum")]
    LeaveCurriculum {
        #[serde(rename = "curriculumId")]
        curriculum_id: String,
    },
    #[serde(rename = "curriculum_update")]
    CurriculumUpdate(CurriculumUpdatePayload),
    #[serde(rename = "chat_message")]
    ChatMessage(ChatMessagePayload),
    #[serde(rename = "typing")]
    Typing {
        #[serde(rename = "curriculumId")]
        curriculum_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

/// Events the hub sends to clients
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "authenticated")]
    Authenticated {
        #[serde(rename = "userId")]
        user_id: String,
    },
    #[serde(rename = "auth_error")]
    AuthError { message: String },
    #[serde(rename = "error")]
    Error { message: String },
    #[serde(rename = "user_joined")]
    UserJoined {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "curriculumId")]
        curriculum_id: String,
    },
    #[serde(rename = "user_left")]
    UserLeft {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "curriculumId")]
        curriculum_id: String,
    },
    #[serde(rename = "user_disconnected")]
    UserDisconnected {
        #[serde(rename = "userId")]
        user_id: String,
    },
    #[serde(rename = "curriculum_updated")]
    CurriculumUpdated {
        #[serde(flatten)]
        update: CurriculumUpdatePayload,
        #[serde(rename = "userId")]
        user_id: String,
    },
    #[serde(rename = "chat_message_received")]
    ChatMessageReceived {
        #[serde(flatten)]
        message: ChatMessagePayload,
        #[serde(rename = "userId")]
        user_id: String,
    },
    #[serde(rename = "typing_status")]
    TypingStatus {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "curriculumId")]
        curriculum_id: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_events_deserialize_from_wire_names() {
        let auth: ClientEvent =
            serde_json::from_value(json!({"type": "authenticate", "token": "jwt"})).unwrap();
        assert!(matches!(auth, ClientEvent::Authenticate { .. }));

        let join: ClientEvent =
            serde_json::from_value(json!({"type": "join_curriculum", "curriculumId": "c1"}))
                .unwrap();
        match join {
            ClientEvent::JoinCurriculum { curriculum_id } => assert_eq!(curriculum_id, "c1"),
            other => panic!("unexpected event: {:?}", other),
        }

        let update: ClientEvent = serde_json::from_value(json!({
            "type": "curriculum_update",
            "curriculumId": "c1",
            "field": "title",
            "value": "X",
            "timestamp": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        match update {
            ClientEvent::CurriculumUpdate(payload) => {
                assert_eq!(payload.field, "title");
                assert_eq!(payload.value, json!("X"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn curriculum_updated_flattens_payload_and_injects_user() {
        let event = ServerEvent::CurriculumUpdated {
            update: CurriculumUpdatePayload {
                curriculum_id: "c1".to_string(),
                field: "title".to_string(),
                value: json!("X"),
                timestamp: "2026-01-01T00:00:00Z".to_string(),
            },
            user_id: "u1".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "curriculum_updated");
        assert_eq!(value["curriculumId"], "c1");
        assert_eq!(value["field"], "title");
        assert_eq!(value["userId"], "u1");
    }

    #[test]
    fn malformed_event_fails_to_parse() {
        let result: Result<ClientEvent, _> =
            serde_json::from_value(json!({"type": "launch_missiles"}));
        assert!(result.is_err());
    }
}
