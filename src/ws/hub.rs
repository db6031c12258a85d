use std::collections::{HashMap, HashSet};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{ChatMessagePayload, CurriculumUpdatePayload, ServerEvent};

/// Room holding every session of one authenticated user
pub fn user_room(user_id: &str) -> String {
    format!("user:{}", user_id)
}

/// Room holding every session editing one curriculum
pub fn curriculum_room(curriculum_id: &str) -> String {
    format!("curriculum:{}", curriculum_id)
}

#[derive(Debug, Error, PartialEq)]
pub enum HubError {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("connection is already authenticated")]
    AlreadyAuthenticated,
    #[error("curriculum has not been joined")]
    NotJoined,
    #[error("unknown connection")]
    UnknownConnection,
}

struct Session {
    user_id: Option<String>,
    rooms: HashSet<String>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<Uuid, Session>,
    rooms: HashMap<String, HashSet<Uuid>>,
}

/// Pub/sub relay between realtime sessions.
///
/// Pure addressing: rooms hold no data and nothing is persisted or replayed.
/// A session that disconnects and reconnects misses every event sent in the
/// gap. Delivery is at-most-once, best effort.
///
/// Constructed once in main and shared through axum state; all mutation goes
/// through the internal mutex, which also fixes the per-room delivery order.
pub struct RealtimeHub {
    state: Mutex<HubState>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HubState::default()),
        }
    }

    /// Admit a new, not yet authenticated connection
    pub async fn register(&self, connection_id: Uuid, tx: mpsc::UnboundedSender<ServerEvent>) {
        let mut state = self.state.lock().await;
        state.sessions.insert(
            connection_id,
            Session {
                user_id: None,
                rooms: HashSet::new(),
                tx,
            },
        );
        debug!("Connection registered: {}", connection_id);
    }

    /// Bind a verified user identity to the connection and join its user room.
    ///
    /// The binding is immutable; a second authenticate on the same connection
    /// is rejected.
    pub async fn authenticate(
        &self,
        connection_id: Uuid,
        user_id: &str,
    ) -> Result<(), HubError> {
        let mut state = self.state.lock().await;
        let session = state
            .sessions
            .get_mut(&connection_id)
            .ok_or(HubError::UnknownConnection)?;
        if session.user_id.is_some() {
            return Err(HubError::AlreadyAuthenticated);
        }
        session.user_id = Some(user_id.to_string());

        let room = user_room(user_id);
        session.rooms.insert(room.clone());
        state.rooms.entry(room).or_default().insert(connection_id);

        info!("Connection authenticated: {} (user: {})", connection_id, user_id);
        Ok(())
    }

    /// Join the curriculum room and announce the user to the other members
    pub async fn join_curriculum(
        &self,
        connection_id: Uuid,
        curriculum_id: &str,
    ) -> Result<(), HubError> {
        let mut state = self.state.lock().await;
        let user_id = require_user(&state, connection_id)?;

        let room = curriculum_room(curriculum_id);
        broadcast_to_room(
            &state,
            &room,
            Some(connection_id),
            &ServerEvent::UserJoined {
                user_id: user_id.clone(),
                curriculum_id: curriculum_id.to_string(),
            },
        );

        if let Some(session) = state.sessions.get_mut(&connection_id) {
            session.rooms.insert(room.clone());
        }
        state.rooms.entry(room).or_default().insert(connection_id);

        info!("User {} joined curriculum {}", user_id, curriculum_id);
        Ok(())
    }

    /// Leave the curriculum room and announce the departure
    pub async fn leave_curriculum(
        &self,
        connection_id: Uuid,
        curriculum_id: &str,
    ) -> Result<(), HubError> {
        let mut state = self.state.lock().await;
        let user_id = require_member(&state, connection_id, curriculum_id)?;

        let room = curriculum_room(curriculum_id);
        remove_membership(&mut state, connection_id, &room);
        broadcast_to_room(
            &state,
            &room,
            Some(connection_id),
            &ServerEvent::UserLeft {
                user_id: user_id.clone(),
                curriculum_id: curriculum_id.to_string(),
            },
        );

        info!("User {} left curriculum {}", user_id, curriculum_id);
        Ok(())
    }

    /// Relay a field-level edit to every other member of the curriculum room.
    ///
    /// Fire and forget: the sender gets no acknowledgement and never sees its
    /// own event. The timestamp is replaced with the hub's clock.
    pub async fn submit_update(
        &self,
        connection_id: Uuid,
        mut update: CurriculumUpdatePayload,
    ) -> Result<(), HubError> {
        let state = self.state.lock().await;
        let user_id = require_member(&state, connection_id, &update.curriculum_id)?;

        update.timestamp = Utc::now().to_rfc3339();
        let room = curriculum_room(&update.curriculum_id);
        debug!(
            "Curriculum {} field '{}' updated by user {}",
            update.curriculum_id, update.field, user_id
        );
        broadcast_to_room(
            &state,
            &room,
            Some(connection_id),
            &ServerEvent::CurriculumUpdated { update, user_id },
        );
        Ok(())
    }

    /// Mirror a chat message to the other members of the curriculum room
    pub async fn submit_chat(
        &self,
        connection_id: Uuid,
        message: ChatMessagePayload,
    ) -> Result<(), HubError> {
        let state = self.state.lock().await;
        let user_id = require_member(&state, connection_id, &message.curriculum_id)?;

        let room = curriculum_room(&message.curriculum_id);
        debug!("Chat message relayed to curriculum {}", message.curriculum_id);
        broadcast_to_room(
            &state,
            &room,
            Some(connection_id),
            &ServerEvent::ChatMessageReceived { message, user_id },
        );
        Ok(())
    }

    /// Relay a typing indicator; the client is responsible for debouncing
    pub async fn submit_typing(
        &self,
        connection_id: Uuid,
        curriculum_id: &str,
        is_typing: bool,
    ) -> Result<(), HubError> {
        let state = self.state.lock().await;
        let user_id = require_member(&state, connection_id, curriculum_id)?;

        broadcast_to_room(
            &state,
            &curriculum_room(curriculum_id),
            Some(connection_id),
            &ServerEvent::TypingStatus {
                user_id,
                curriculum_id: curriculum_id.to_string(),
                is_typing,
            },
        );
        Ok(())
    }

    /// Release all hub state for a connection and tell the curriculum rooms
    /// it belonged to. Safe to call for connections that never authenticated.
    pub async fn disconnect(&self, connection_id: Uuid) {
        let mut state = self.state.lock().await;
        let session = match state.sessions.remove(&connection_id) {
            Some(session) => session,
            None => return,
        };

        for room in &session.rooms {
            let mut emptied = false;
            if let Some(members) = state.rooms.get_mut(room) {
                members.remove(&connection_id);
                emptied = members.is_empty();
            }
            if emptied {
                state.rooms.remove(room);
            }
            if let (Some(user_id), true) = (&session.user_id, room.starts_with("curriculum:")) {
                broadcast_to_room(
                    &state,
                    room,
                    None,
                    &ServerEvent::UserDisconnected {
                        user_id: user_id.clone(),
                    },
                );
            }
        }

        match &session.user_id {
            Some(user_id) => info!("Connection closed: {} (user: {})", connection_id, user_id),
            None => debug!("Unauthenticated connection closed: {}", connection_id),
        }
    }

    /// Send an event to every session of one user
    pub async fn send_to_user(&self, user_id: &str, event: ServerEvent) {
        let state = self.state.lock().await;
        broadcast_to_room(&state, &user_room(user_id), None, &event);
    }

    /// Send an event to every session editing one curriculum
    pub async fn send_to_curriculum(&self, curriculum_id: &str, event: ServerEvent) {
        let state = self.state.lock().await;
        broadcast_to_room(&state, &curriculum_room(curriculum_id), None, &event);
    }

    /// Send an event to every connected session
    pub async fn broadcast_all(&self, event: ServerEvent) {
        let state = self.state.lock().await;
        for session in state.sessions.values() {
            let _ = session.tx.send(event.clone());
        }
    }

    /// Number of connected sessions
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Number of active rooms of any kind
    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    /// Number of active curriculum rooms
    pub async fn curriculum_room_count(&self) -> usize {
        self.state
            .lock()
            .await
            .rooms
            .keys()
            .filter(|room| room.starts_with("curriculum:"))
            .count()
    }

    /// Users currently editing a curriculum
    pub async fn curriculum_editors(&self, curriculum_id: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let room = curriculum_room(curriculum_id);
        let Some(members) = state.rooms.get(&room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|id| state.sessions.get(id))
            .filter_map(|session| session.user_id.clone())
            .collect()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

fn require_user(state: &HubState, connection_id: Uuid) -> Result<String, HubError> {
    let session = state
        .sessions
        .get(&connection_id)
        .ok_or(HubError::UnknownConnection)?;
    session.user_id.clone().ok_or(HubError::NotAuthenticated)
}

fn require_member(
    state: &HubState,
    connection_id: Uuid,
    curriculum_id: &str,
) -> Result<String, HubError> {
    let user_id = require_user(state, connection_id)?;
    let room = curriculum_room(curriculum_id);
    let is_member = state
        .sessions
        .get(&connection_id)
        .map(|session| session.rooms.contains(&room))
        .unwrap_or(false);
    if !is_member {
        return Err(HubError::NotJoined);
    }
    Ok(user_id)
}

fn remove_membership(state: &mut HubState, connection_id: Uuid, room: &str) {
    if let Some(session) = state.sessions.get_mut(&connection_id) {
        session.rooms.remove(room);
    }
    let mut emptied = false;
    if let Some(members) = state.rooms.get_mut(room) {
        members.remove(&connection_id);
        emptied = members.is_empty();
    }
    if emptied {
        state.rooms.remove(room);
    }
}

// Sends are non-blocking; a failed send means the receiver is already gone
// and its disconnect cleanup will run shortly.
fn broadcast_to_room(
    state: &HubState,
    room: &str,
    except: Option<Uuid>,
    event: &ServerEvent,
) {
    let Some(members) = state.rooms.get(room) else {
        return;
    };
    for member in members {
        if Some(*member) == except {
            continue;
        }
        if let Some(session) = state.sessions.get(member) {
            let _ = session.tx.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    async fn connect(hub: &RealtimeHub) -> (Uuid, UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        hub.register(id, tx).await;
        (id, rx)
    }

    async fn connect_joined(
        hub: &RealtimeHub,
        user: &str,
        curriculum: &str,
    ) -> (Uuid, UnboundedReceiver<ServerEvent>) {
        let (id, rx) = connect(hub).await;
        hub.authenticate(id, user).await.unwrap();
        hub.join_curriculum(id, curriculum).await.unwrap();
        (id, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn update(curriculum_id: &str, field: &str, value: serde_json::Value) -> CurriculumUpdatePayload {
        CurriculumUpdatePayload {
            curriculum_id: curriculum_id.to_string(),
            field: field.to_string(),
            value,
            timestamp: "client-clock".to_string(),
        }
    }

    #[tokio::test]
    async fn edits_reach_other_members_but_never_the_sender() {
        let hub = RealtimeHub::new();
        let (a, mut rx_a) = connect_joined(&hub, "user-a", "doc1").await;
        let (_b, mut rx_b) = connect_joined(&hub, "user-b", "doc1").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        hub.submit_update(a, update("doc1", "title", json!("X")))
            .await
            .unwrap();

        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        match &received[0] {
            ServerEvent::CurriculumUpdated { update, user_id } => {
                assert_eq!(user_id, "user-a");
                assert_eq!(update.field, "title");
                assert_eq!(update.value, json!("X"));
                // server clock replaces whatever the client sent
                assert_ne!(update.timestamp, "client-clock");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn events_before_authentication_are_rejected_without_mutation() {
        let hub = RealtimeHub::new();
        let (conn, _rx) = connect(&hub).await;

        assert_eq!(
            hub.join_curriculum(conn, "doc1").await,
            Err(HubError::NotAuthenticated)
        );
        assert_eq!(
            hub.submit_update(conn, update("doc1", "title", json!("X")))
                .await,
            Err(HubError::NotAuthenticated)
        );
        assert_eq!(hub.room_count().await, 0);
    }

    #[tokio::test]
    async fn update_requires_prior_join() {
        let hub = RealtimeHub::new();
        let (conn, _rx) = connect(&hub).await;
        hub.authenticate(conn, "user-a").await.unwrap();

        assert_eq!(
            hub.submit_update(conn, update("doc1", "title", json!("X")))
                .await,
            Err(HubError::NotJoined)
        );
    }

    #[tokio::test]
    async fn authentication_binds_once() {
        let hub = RealtimeHub::new();
        let (conn, _rx) = connect(&hub).await;
        hub.authenticate(conn, "user-a").await.unwrap();
        assert_eq!(
            hub.authenticate(conn, "user-b").await,
            Err(HubError::AlreadyAuthenticated)
        );
    }

    #[tokio::test]
    async fn join_announces_to_existing_members_only() {
        let hub = RealtimeHub::new();
        let (_a, mut rx_a) = connect_joined(&hub, "user-a", "doc1").await;
        let (_b, mut rx_b) = connect_joined(&hub, "user-b", "doc1").await;

        let seen_by_a = drain(&mut rx_a);
        assert_eq!(seen_by_a.len(), 1);
        assert!(matches!(
            &seen_by_a[0],
            ServerEvent::UserJoined { user_id, curriculum_id }
                if user_id == "user-b" && curriculum_id == "doc1"
        ));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn leave_announces_to_remaining_members() {
        let hub = RealtimeHub::new();
        let (a, mut rx_a) = connect_joined(&hub, "user-a", "doc1").await;
        let (_b, mut rx_b) = connect_joined(&hub, "user-b", "doc1").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        hub.leave_curriculum(a, "doc1").await.unwrap();

        let seen_by_b = drain(&mut rx_b);
        assert_eq!(seen_by_b.len(), 1);
        assert!(matches!(
            &seen_by_b[0],
            ServerEvent::UserLeft { user_id, .. } if user_id == "user-a"
        ));
        // leaving twice is a protocol error
        assert_eq!(
            hub.leave_curriculum(a, "doc1").await,
            Err(HubError::NotJoined)
        );
    }

    #[tokio::test]
    async fn disconnect_notifies_each_room_exactly_once() {
        let hub = RealtimeHub::new();
        let (a, _rx_a) = connect_joined(&hub, "user-a", "doc1").await;
        hub.join_curriculum(a, "doc2").await.unwrap();
        let (_b, mut rx_b) = connect_joined(&hub, "user-b", "doc1").await;
        let (_c, mut rx_c) = connect_joined(&hub, "user-c", "doc2").await;
        drain(&mut rx_b);
        drain(&mut rx_c);

        hub.disconnect(a).await;
        // a second disconnect for the same connection is a no-op
        hub.disconnect(a).await;

        let to_b: Vec<_> = drain(&mut rx_b)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::UserDisconnected { .. }))
            .collect();
        assert_eq!(to_b.len(), 1);
        let to_c: Vec<_> = drain(&mut rx_c)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::UserDisconnected { .. }))
            .collect();
        assert_eq!(to_c.len(), 1);
        assert_eq!(hub.session_count().await, 2);
    }

    #[tokio::test]
    async fn typing_status_reaches_other_members() {
        let hub = RealtimeHub::new();
        let (a, mut rx_a) = connect_joined(&hub, "user-a", "doc1").await;
        let (_b, mut rx_b) = connect_joined(&hub, "user-b", "doc1").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        hub.submit_typing(a, "doc1", true).await.unwrap();

        let seen = drain(&mut rx_b);
        assert!(matches!(
            &seen[0],
            ServerEvent::TypingStatus { user_id, is_typing: true, .. } if user_id == "user-a"
        ));
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn send_to_user_reaches_every_session_of_that_user() {
        let hub = RealtimeHub::new();
        let (a1, mut rx_a1) = connect(&hub).await;
        let (a2, mut rx_a2) = connect(&hub).await;
        let (b, mut rx_b) = connect(&hub).await;
        hub.authenticate(a1, "user-a").await.unwrap();
        hub.authenticate(a2, "user-a").await.unwrap();
        hub.authenticate(b, "user-b").await.unwrap();

        hub.send_to_user(
            "user-a",
            ServerEvent::Error {
                message: "export finished".to_string(),
            },
        )
        .await;

        assert_eq!(drain(&mut rx_a1).len(), 1);
        assert_eq!(drain(&mut rx_a2).len(), 1);
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn counters_track_rooms_and_editors() {
        let hub = RealtimeHub::new();
        let (a, _rx_a) = connect_joined(&hub, "user-a", "doc1").await;
        let (_b, _rx_b) = connect_joined(&hub, "user-b", "doc1").await;

        assert_eq!(hub.session_count().await, 2);
        // one curriculum room plus two user rooms
        assert_eq!(hub.room_count().await, 3);
        assert_eq!(hub.curriculum_room_count().await, 1);

        let mut editors = hub.curriculum_editors("doc1").await;
        editors.sort();
        assert_eq!(editors, vec!["user-a", "user-b"]);

        hub.disconnect(a).await;
        assert_eq!(hub.curriculum_editors("doc1").await, vec!["user-b"]);
    }
}
