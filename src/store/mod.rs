use crate::error::AppError;
use crate::models::{Conversation, Message};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read/write contract of the durable conversation store. The store owns
/// conversation and message persistence; everything above it treats it as an
/// external collaborator.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Create the conversation for an unordered participant pair, or return
    /// the existing one. Never creates a second conversation for the same
    /// pair. The flag is true when this call created the conversation.
    async fn create_or_get(&self, a: Uuid, b: Uuid) -> Result<(Conversation, bool), AppError>;

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>, AppError>;

    /// All conversations the user participates in, most recent activity first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>, AppError>;

    /// Remove a conversation and its message log entirely.
    async fn delete(&self, conversation_id: Uuid) -> Result<(), AppError>;

    /// Append a message with a server-assigned id and timestamp, read=false,
    /// and update the conversation's cached last-message summary atomically.
    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, AppError>;

    /// The conversation's message log in append order.
    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError>;

    /// Mark every unread message not authored by `reader_id` as read.
    /// Returns the number of messages transitioned; repeating the call with no
    /// new messages in between returns 0.
    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64, AppError>;
}

/// Normalize an unordered participant pair to a canonical order so pair
/// uniqueness can be enforced with a single index or map key.
pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
