use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cached summary of the most recent message, for conversation list views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub sender_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// A two-party conversation. The participant pair is unordered, unique per
/// pair, and immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.participants.contains(&user_id)
    }

    /// The participant other than `user_id`. Callers must have checked
    /// membership first.
    pub fn peer_of(&self, user_id: Uuid) -> Uuid {
        if self.participants[0] == user_id {
            self.participants[1]
        } else {
            self.participants[0]
        }
    }
}
