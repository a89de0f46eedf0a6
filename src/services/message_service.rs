use crate::error::{AppError, AppResult};
use crate::middleware::guards::AuthUser;
use crate::models::Message;
use crate::state::AppState;
use crate::websocket::events::{content_preview, ServerEvent};
use uuid::Uuid;

pub struct MessageService;

impl MessageService {
    /// The message delivery pipeline: validate, persist, then fan out.
    ///
    /// Persistence is the durability boundary - if the store write fails the
    /// error goes back to the sender and nothing is broadcast. After a
    /// successful append the message is broadcast to the conversation's room
    /// and the other participant's personal channel gets a notification.
    /// Resubmission after a reported failure appends a new message; there is
    /// no server-side dedupe.
    pub async fn send(
        state: &AppState,
        sender: &AuthUser,
        conversation_id: Uuid,
        content: &str,
        client_tag: Option<String>,
    ) -> AppResult<Message> {
        if content.trim().is_empty() {
            return Err(AppError::BadRequest("message content is empty".into()));
        }

        let conversation = state
            .store
            .get(conversation_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !conversation.has_participant(sender.id) {
            return Err(AppError::Forbidden);
        }

        let message = state
            .store
            .append_message(conversation_id, sender.id, content)
            .await?;

        state
            .rooms
            .broadcast(
                conversation_id,
                &ServerEvent::MessageReceived {
                    message: message.clone(),
                    client_tag,
                },
            )
            .await;

        let recipient = conversation.peer_of(sender.id);
        state
            .rooms
            .notify_user(
                recipient,
                &ServerEvent::Notification {
                    conversation_id,
                    sender_id: sender.id,
                    sender_name: sender.name.clone(),
                    content_preview: content_preview(content),
                },
            )
            .await;

        Ok(message)
    }
}
