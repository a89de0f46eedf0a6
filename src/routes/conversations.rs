//! REST collaborator endpoints around the live core: the catch-up path
//! clients use after reconnecting or before joining live events.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::guards::AuthUser;
use crate::models::{Conversation, LastMessage, Message};
use crate::services::conversation_service::ConversationService;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participants: [Uuid; 2],
    pub last_message: Option<LastMessage>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Conversation> for ConversationResponse {
    fn from(c: Conversation) -> Self {
        Self {
            id: c.id,
            participants: c.participants,
            last_message: c.last_message,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: ConversationResponse,
    pub messages: Vec<Message>,
}

#[derive(Deserialize)]
pub struct CreateConversationRequest {
    pub peer_id: Uuid,
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// GET /api/conversations - the caller's conversations, most recent first.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    let list = ConversationService::list(state.store.as_ref(), user.id).await?;
    Ok(Json(list.into_iter().map(Into::into).collect()))
}

/// POST /api/conversations - create-or-fetch the conversation with a peer.
/// 201 when created, 200 when the pair already had one.
pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), AppError> {
    let (conversation, created) =
        ConversationService::create_or_get(state.store.as_ref(), user.id, body.peer_id).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(conversation.into())))
}

/// GET /api/conversations/:id - one conversation with its full message log.
pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationWithMessages>, AppError> {
    let (conversation, messages) =
        ConversationService::fetch(state.store.as_ref(), user.id, id).await?;
    Ok(Json(ConversationWithMessages {
        conversation: conversation.into(),
        messages,
    }))
}

/// DELETE /api/conversations/:id - participant-only full removal.
pub async fn delete_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    ConversationService::delete(state.store.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/conversations/:id/read - REST twin of the `mark_read` socket
/// event, for catch-up after reconnect.
pub async fn mark_as_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let updated = ConversationService::mark_read(&state, user.id, id).await?;
    Ok(Json(MarkReadResponse { updated }))
}
