//! In-memory store used by the test suite and as a dev fallback when no
//! database is configured. Not durable across restarts.

use crate::error::AppError;
use crate::models::{Conversation, LastMessage, Message};
use crate::store::{normalize_pair, ConversationStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    conversations: HashMap<Uuid, Conversation>,
    // canonical pair -> conversation id
    pairs: HashMap<(Uuid, Uuid), Uuid>,
    // conversation id -> append-ordered log
    logs: HashMap<Uuid, Vec<Message>>,
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_or_get(&self, a: Uuid, b: Uuid) -> Result<(Conversation, bool), AppError> {
        let pair = normalize_pair(a, b);
        let mut inner = self.inner.write().await;
        if let Some(id) = inner.pairs.get(&pair) {
            return Ok((inner.conversations[id].clone(), false));
        }
        let conversation = Conversation {
            id: Uuid::new_v4(),
            participants: [a, b],
            last_message: None,
            created_at: Utc::now(),
        };
        inner.pairs.insert(pair, conversation.id);
        inner.logs.insert(conversation.id, Vec::new());
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok((conversation, true))
    }

    async fn get(&self, conversation_id: Uuid) -> Result<Option<Conversation>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.conversations.get(&conversation_id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>, AppError> {
        let inner = self.inner.read().await;
        let mut list: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();
        // Most recent activity first; conversations without messages sort by
        // creation time.
        list.sort_by_key(|c| {
            std::cmp::Reverse(
                c.last_message
                    .as_ref()
                    .map(|m| m.timestamp)
                    .unwrap_or(c.created_at),
            )
        });
        Ok(list)
    }

    async fn delete(&self, conversation_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .remove(&conversation_id)
            .ok_or(AppError::NotFound)?;
        let pair = normalize_pair(conversation.participants[0], conversation.participants[1]);
        inner.pairs.remove(&pair);
        inner.logs.remove(&conversation_id);
        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, AppError> {
        let mut inner = self.inner.write().await;
        if !inner.conversations.contains_key(&conversation_id) {
            return Err(AppError::NotFound);
        }
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
            read: false,
            read_at: None,
        };
        inner
            .logs
            .entry(conversation_id)
            .or_default()
            .push(message.clone());
        if let Some(conversation) = inner.conversations.get_mut(&conversation_id) {
            conversation.last_message = Some(LastMessage {
                content: message.content.clone(),
                sender_id,
                timestamp: message.created_at,
            });
        }
        Ok(message)
    }

    async fn messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
        let inner = self.inner.read().await;
        inner
            .logs
            .get(&conversation_id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64, AppError> {
        let mut inner = self.inner.write().await;
        let log = inner
            .logs
            .get_mut(&conversation_id)
            .ok_or(AppError::NotFound)?;
        let now = Utc::now();
        let mut changed = 0;
        for message in log.iter_mut() {
            if !message.read && message.sender_id != reader_id {
                message.read = true;
                message.read_at = Some(now);
                changed += 1;
            }
        }
        Ok(changed)
    }
}
