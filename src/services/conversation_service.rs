use crate::error::{AppError, AppResult};
use crate::models::{Conversation, Message};
use crate::state::AppState;
use crate::store::ConversationStore;
use crate::websocket::events::ServerEvent;
use uuid::Uuid;

pub struct ConversationService;

impl ConversationService {
    /// Create-or-fetch the conversation between the caller and a peer.
    /// Calling twice for the same pair returns the same conversation.
    pub async fn create_or_get(
        store: &dyn ConversationStore,
        caller: Uuid,
        peer: Uuid,
    ) -> AppResult<(Conversation, bool)> {
        if caller == peer {
            return Err(AppError::BadRequest(
                "cannot start a conversation with yourself".into(),
            ));
        }
        store.create_or_get(caller, peer).await
    }

    pub async fn list(
        store: &dyn ConversationStore,
        caller: Uuid,
    ) -> AppResult<Vec<Conversation>> {
        store.list_for_user(caller).await
    }

    /// Fetch one conversation with its full message log. Participant-only.
    pub async fn fetch(
        store: &dyn ConversationStore,
        caller: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<(Conversation, Vec<Message>)> {
        let conversation = Self::require_participant(store, caller, conversation_id).await?;
        let messages = store.messages(conversation_id).await?;
        Ok((conversation, messages))
    }

    /// Remove a conversation entirely. Participant-only.
    pub async fn delete(
        store: &dyn ConversationStore,
        caller: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<()> {
        Self::require_participant(store, caller, conversation_id).await?;
        store.delete(conversation_id).await
    }

    /// Mark every message in the conversation not authored by the caller as
    /// read, then broadcast the state change to the room. The store update
    /// commits before the broadcast goes out. Returns the number of messages
    /// transitioned (0 on a repeat call - the operation is idempotent).
    pub async fn mark_read(
        state: &AppState,
        caller: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<u64> {
        Self::require_participant(state.store.as_ref(), caller, conversation_id).await?;
        let changed = state.store.mark_read(conversation_id, caller).await?;

        state
            .rooms
            .broadcast(
                conversation_id,
                &ServerEvent::ReadStateChanged {
                    conversation_id,
                    user_id: caller,
                },
            )
            .await;

        Ok(changed)
    }

    pub(crate) async fn require_participant(
        store: &dyn ConversationStore,
        caller: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = store
            .get(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.has_participant(caller) {
            return Err(AppError::Forbidden);
        }
        Ok(conversation)
    }
}
