use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

use crate::websocket::events::ServerEvent;

pub mod events;
pub mod handlers;

struct Connection {
    user_id: Uuid,
    tx: UnboundedSender<Message>,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<Uuid, Connection>,
    // conversation id -> subscribed connection ids
    rooms: HashMap<Uuid, HashSet<Uuid>>,
}

/// Room multiplexer. Tracks, per conversation, the live connections subscribed
/// to its events, plus an implicit per-user personal channel (every connection
/// of a user). Delivery is best-effort and non-blocking: each connection gets
/// an unbounded outbound channel and a sender whose receiver is gone is pruned
/// on the spot, so a dead subscriber never stalls the rest.
#[derive(Default, Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and its personal channel. The returned receiver
    /// feeds the connection's socket writer.
    pub async fn register(&self, user_id: Uuid, conn_id: Uuid) -> UnboundedReceiver<Message> {
        let (tx, rx) = unbounded_channel();
        let mut guard = self.inner.write().await;
        guard.connections.insert(conn_id, Connection { user_id, tx });
        rx
    }

    /// Subscribe a connection to a conversation's room. Idempotent.
    pub async fn join(&self, conversation_id: Uuid, conn_id: Uuid) {
        let mut guard = self.inner.write().await;
        if guard.connections.contains_key(&conn_id) {
            guard.rooms.entry(conversation_id).or_default().insert(conn_id);
        }
    }

    /// Drop a connection from every room and its personal channel.
    pub async fn deregister(&self, conn_id: Uuid) {
        let mut guard = self.inner.write().await;
        guard.connections.remove(&conn_id);
        guard.rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Deliver an event to every live connection subscribed to the room.
    pub async fn broadcast(&self, conversation_id: Uuid, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        let mut guard = self.inner.write().await;
        let Some(members) = guard.rooms.get(&conversation_id) else {
            return;
        };
        let dead = send_to(&guard.connections, members.iter().copied(), &frame);
        prune(&mut guard, &dead);
    }

    /// Deliver an event to all of a user's connections (the personal channel).
    pub async fn notify_user(&self, user_id: Uuid, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        let mut guard = self.inner.write().await;
        let targets: Vec<Uuid> = guard
            .connections
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .map(|(id, _)| *id)
            .collect();
        let dead = send_to(&guard.connections, targets.into_iter(), &frame);
        prune(&mut guard, &dead);
    }

    /// Deliver an event to every live connection (presence transitions).
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        let mut guard = self.inner.write().await;
        let targets: Vec<Uuid> = guard.connections.keys().copied().collect();
        let dead = send_to(&guard.connections, targets.into_iter(), &frame);
        prune(&mut guard, &dead);
    }

    /// Deliver an event to one connection only (local error reporting).
    pub async fn send_to_connection(&self, conn_id: Uuid, event: &ServerEvent) {
        let Some(frame) = encode(event) else { return };
        let mut guard = self.inner.write().await;
        let dead = send_to(&guard.connections, std::iter::once(conn_id), &frame);
        prune(&mut guard, &dead);
    }

    #[doc(hidden)]
    pub async fn room_size(&self, conversation_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.rooms.get(&conversation_id).map_or(0, HashSet::len)
    }
}

fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(txt) => Some(Message::Text(txt)),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize server event");
            None
        }
    }
}

fn send_to(
    connections: &HashMap<Uuid, Connection>,
    targets: impl Iterator<Item = Uuid>,
    frame: &Message,
) -> Vec<Uuid> {
    let mut dead = Vec::new();
    for conn_id in targets {
        if let Some(conn) = connections.get(&conn_id) {
            if conn.tx.send(frame.clone()).is_err() {
                dead.push(conn_id);
            }
        }
    }
    dead
}

fn prune(inner: &mut Inner, dead: &[Uuid]) {
    for conn_id in dead {
        inner.connections.remove(conn_id);
    }
    if !dead.is_empty() {
        inner.rooms.retain(|_, members| {
            for conn_id in dead {
                members.remove(conn_id);
            }
            !members.is_empty()
        });
    }
}
