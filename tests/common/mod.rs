use axum::extract::ws::Message;
use chat_service::config::Config;
use chat_service::middleware::guards::AuthUser;
use chat_service::state::AppState;
use chat_service::store::MemoryStore;
use chat_service::websocket::events::ServerEvent;
use chat_service::websocket::handlers::Session;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

#[allow(dead_code)]
pub fn test_state() -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(Config::test_defaults()),
    )
}

#[allow(dead_code)]
pub fn session(name: &str) -> Session {
    Session {
        user: AuthUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
        },
        conn_id: Uuid::new_v4(),
    }
}

/// Register a session's connection the way the gateway does: personal channel
/// plus presence. Returns the receiver that would feed the socket writer.
#[allow(dead_code)]
pub async fn connect(state: &AppState, session: &Session) -> UnboundedReceiver<Message> {
    let rx = state.rooms.register(session.user.id, session.conn_id).await;
    state
        .presence
        .connect(session.user.id, session.conn_id)
        .await;
    rx
}

#[allow(dead_code)]
pub fn decode(msg: Message) -> ServerEvent {
    match msg {
        Message::Text(txt) => serde_json::from_str(&txt).expect("valid server event"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[allow(dead_code)]
pub fn next_event(rx: &mut UnboundedReceiver<Message>) -> ServerEvent {
    decode(rx.try_recv().expect("expected a queued event"))
}
