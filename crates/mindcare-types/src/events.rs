use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ReplyRecord, ThreadSummary};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A new discussion thread was posted; delivered to every client.
    ThreadCreated { thread: ThreadSummary },

    /// A new reply was posted; delivered only to clients in the thread's room.
    ReplyCreated { reply: ReplyRecord },

    /// Command rejected (unauthenticated mutation, unknown thread, write failure).
    /// Sent only to the offending connection, never broadcast.
    Error { message: String },
}

impl GatewayEvent {
    /// Returns the room name if this event is scoped to a single room.
    /// Events that return `None` are global and delivered to all clients.
    pub fn room(&self) -> Option<String> {
        match self {
            Self::ReplyCreated { reply } => Some(thread_room(reply.thread_id)),
            // ThreadCreated is global; Error is targeted and never broadcast
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Create a discussion thread. Requires an authenticated connection.
    NewThread {
        title: String,
        category: String,
        body: String,
    },

    /// Reply to an existing thread. Requires an authenticated connection.
    NewReply { thread_id: Uuid, body: String },

    /// Join a broadcast room. The room name is client-supplied and is not
    /// validated against thread existence.
    JoinRoom { room: String },

    /// Leave a broadcast room.
    LeaveRoom { room: String },
}

/// Canonical room name for a thread's reply events.
pub fn thread_room(thread_id: Uuid) -> String {
    format!("thread_{}", thread_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_snake_case_tags() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"new_thread","data":{"title":"Exam stress","category":"Academic","body":"..."}}"#,
        )
        .unwrap();
        assert!(matches!(cmd, GatewayCommand::NewThread { .. }));

        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"join_room","data":{"room":"thread_abc"}}"#).unwrap();
        assert!(matches!(cmd, GatewayCommand::JoinRoom { room } if room == "thread_abc"));
    }

    #[test]
    fn reply_created_is_room_scoped() {
        let thread_id = Uuid::new_v4();
        let event = GatewayEvent::ReplyCreated {
            reply: ReplyRecord {
                id: Uuid::new_v4(),
                thread_id,
                author_name: "Asha".into(),
                body: "hang in there".into(),
                created_at: chrono::Utc::now(),
            },
        };

        assert_eq!(event.room(), Some(format!("thread_{}", thread_id)));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "reply_created");
    }

    #[test]
    fn thread_created_is_global() {
        let event = GatewayEvent::ThreadCreated {
            thread: ThreadSummary {
                id: Uuid::new_v4(),
                title: "Sleep help".into(),
                category: "Wellness".into(),
                author_name: "Ravi".into(),
                body: "...".into(),
                created_at: chrono::Utc::now(),
                reply_count: 0,
            },
        };

        assert_eq!(event.room(), None);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "thread_created");
    }
}
