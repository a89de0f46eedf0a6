//! Presence registry: user identity -> set of live connection ids.
//! A user is online iff the set is non-empty; multiple simultaneous
//! connections (devices, tabs) are expected.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<HashMap<Uuid, HashSet<Uuid>>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live connection. Returns true when this is the user's first
    /// live connection, i.e. the user just came online.
    pub async fn connect(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        let set = guard.entry(user_id).or_default();
        let was_offline = set.is_empty();
        set.insert(conn_id);
        was_offline
    }

    /// Remove a connection. Returns true when it was the user's last live
    /// connection, i.e. the user just went offline.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get_mut(&user_id) {
            Some(set) => {
                set.remove(&conn_id);
                if set.is_empty() {
                    guard.remove(&user_id);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        let guard = self.inner.read().await;
        guard.get(&user_id).is_some_and(|set| !set.is_empty())
    }

    /// Current full membership, sent to newly connecting sessions so they do
    /// not have to wait for incremental events.
    pub async fn snapshot(&self) -> Vec<Uuid> {
        let guard = self.inner.read().await;
        guard.keys().copied().collect()
    }
}
