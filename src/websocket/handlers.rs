use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::auth::verify_token;
use crate::middleware::error_handling;
use crate::middleware::guards::AuthUser;
use crate::services::conversation_service::ConversationService;
use crate::services::message_service::MessageService;
use crate::state::AppState;
use crate::websocket::events::{ClientEvent, ServerEvent, UserStatus};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// One live connection of one authenticated user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: AuthUser,
    pub conn_id: Uuid,
}

/// Resolve the bearer credential presented at connect time, from the query
/// string or the Authorization header. Runs before the upgrade so a rejected
/// connection never touches presence or room state.
fn authenticate(
    state: &AppState,
    params: &WsParams,
    headers: &HeaderMap,
) -> Result<AuthUser, StatusCode> {
    let token = params.token.clone().or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    });

    match token {
        None => Err(StatusCode::UNAUTHORIZED),
        Some(t) => verify_token(&state.config.jwt_secret, &t).map_err(|_| {
            warn!("websocket connection rejected: invalid credential");
            StatusCode::UNAUTHORIZED
        }),
    }
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user = match authenticate(&state, &params, &headers) {
        Ok(user) => user,
        Err(status) => return status.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

/// Connect-time bookkeeping: register the personal channel, record presence,
/// send the current presence snapshot to the new connection and announce it
/// online. The returned receiver feeds the connection's socket writer.
pub async fn open_session(state: &AppState, session: &Session) -> UnboundedReceiver<Message> {
    // Register the personal channel first so nothing between snapshot and
    // loop start can be missed, then announce presence.
    let rx = state.rooms.register(session.user.id, session.conn_id).await;
    state.presence.connect(session.user.id, session.conn_id).await;

    let snapshot = ServerEvent::OnlineUsers {
        user_ids: state.presence.snapshot().await,
    };
    state
        .rooms
        .send_to_connection(session.conn_id, &snapshot)
        .await;
    state
        .rooms
        .broadcast_all(&ServerEvent::UserStatus {
            user_id: session.user.id,
            status: UserStatus::Online,
        })
        .await;
    rx
}

/// Disconnect bookkeeping: drop room subscriptions and the presence entry,
/// announcing offline only when the user's last live connection is gone.
/// Committed persistence and other sessions stay untouched.
pub async fn close_session(state: &AppState, session: &Session) {
    state.rooms.deregister(session.conn_id).await;
    let went_offline = state
        .presence
        .disconnect(session.user.id, session.conn_id)
        .await;
    if went_offline {
        state
            .rooms
            .broadcast_all(&ServerEvent::UserStatus {
                user_id: session.user.id,
                status: UserStatus::Offline,
            })
            .await;
    }
}

async fn handle_socket(state: AppState, user: AuthUser, socket: WebSocket) {
    let session = Session {
        user,
        conn_id: Uuid::new_v4(),
    };
    info!(user_id = %session.user.id, conn_id = %session.conn_id, "client connected");

    let mut rx = open_session(&state, &session).await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // Outbound: events fanned in from rooms and the personal channel.
            maybe = rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Inbound: client frames.
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(txt))) => {
                        handle_client_frame(&state, &session, &txt).await;
                    }
                    // Ping/pong liveness is answered by the framework.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                }
            }
        }
    }

    close_session(&state, &session).await;
    info!(user_id = %session.user.id, conn_id = %session.conn_id, "client disconnected");
}

/// Parse and dispatch one inbound frame. Malformed or unknown frames are
/// logged and dropped; errors from an operation go back to this connection
/// only and never degrade shared state.
pub async fn handle_client_frame(state: &AppState, session: &Session, raw: &str) {
    let event = match serde_json::from_str::<ClientEvent>(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(user_id = %session.user.id, error = %e, "dropping malformed client frame");
            return;
        }
    };

    if let Err(err) = dispatch(state, session, event).await {
        let (_, body) = error_handling::map_error(&err);
        state
            .rooms
            .send_to_connection(
                session.conn_id,
                &ServerEvent::Error {
                    message: body.message,
                },
            )
            .await;
    }
}

async fn dispatch(
    state: &AppState,
    session: &Session,
    event: ClientEvent,
) -> crate::error::AppResult<()> {
    match event {
        ClientEvent::Join { conversation_id } => {
            // Only participants may subscribe to a conversation's events.
            ConversationService::require_participant(
                state.store.as_ref(),
                session.user.id,
                conversation_id,
            )
            .await?;
            state.rooms.join(conversation_id, session.conn_id).await;
            info!(user_id = %session.user.id, %conversation_id, "joined room");
        }
        ClientEvent::Send {
            conversation_id,
            content,
            recipient_hint: _,
            client_tag,
        } => {
            MessageService::send(state, &session.user, conversation_id, &content, client_tag)
                .await?;
        }
        ClientEvent::Typing { conversation_id } => {
            relay_typing(state, session, conversation_id, true).await?;
        }
        ClientEvent::StopTyping { conversation_id } => {
            relay_typing(state, session, conversation_id, false).await?;
        }
        ClientEvent::MarkRead { conversation_id } => {
            ConversationService::mark_read(state, session.user.id, conversation_id).await?;
        }
    }
    Ok(())
}

/// Typing indicators are ephemeral: relayed to the room tagged with the acting
/// user, never persisted, no server-side timers. A client that disconnects
/// mid-typing leaves peers to clear the indicator on their own timeout.
async fn relay_typing(
    state: &AppState,
    session: &Session,
    conversation_id: Uuid,
    typing: bool,
) -> crate::error::AppResult<()> {
    ConversationService::require_participant(state.store.as_ref(), session.user.id, conversation_id)
        .await?;
    let event = if typing {
        ServerEvent::Typing {
            conversation_id,
            user_id: session.user.id,
        }
    } else {
        ServerEvent::StopTyping {
            conversation_id,
            user_id: session.user.id,
        }
    };
    state.rooms.broadcast(conversation_id, &event).await;
    Ok(())
}
