//! The closed set of events exchanged over a live connection. Payloads are
//! validated at the connection boundary: a frame that does not parse into
//! `ClientEvent` never reaches any component.

use crate::models::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum characters of message content carried in a notification preview.
const PREVIEW_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        conversation_id: Uuid,
    },
    Send {
        conversation_id: Uuid,
        content: String,
        /// Accepted for wire compatibility; the recipient is derived from the
        /// stored participant pair, never trusted from the client.
        #[serde(default)]
        recipient_hint: Option<Uuid>,
        /// Client-generated correlation token, echoed back on the
        /// `message_received` broadcast so the sender can replace its
        /// optimistic local copy by exact key instead of content matching.
        #[serde(default)]
        client_tag: Option<String>,
    },
    Typing {
        conversation_id: Uuid,
    },
    StopTyping {
        conversation_id: Uuid,
    },
    MarkRead {
        conversation_id: Uuid,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Full presence membership, sent once to a newly connected session.
    OnlineUsers {
        user_ids: Vec<Uuid>,
    },
    UserStatus {
        user_id: Uuid,
        status: UserStatus,
    },
    MessageReceived {
        message: Message,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_tag: Option<String>,
    },
    /// Personal-channel alert for the non-sending participant, for surfacing
    /// a badge even when the recipient is not viewing the conversation.
    Notification {
        conversation_id: Uuid,
        sender_id: Uuid,
        sender_name: String,
        content_preview: String,
    },
    Typing {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    StopTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    ReadStateChanged {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    /// Local delivery of a rejected operation to the acting client only.
    Error {
        message: String,
    },
}

/// Char-boundary-safe preview of message content for notifications.
pub fn content_preview(content: &str) -> String {
    let mut preview: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
    if preview.len() < content.len() {
        preview.push('…');
    }
    preview
}
