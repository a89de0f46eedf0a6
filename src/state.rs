use crate::{config::Config, presence::PresenceRegistry, store::ConversationStore, websocket::RoomRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub rooms: RoomRegistry,
    pub presence: PresenceRegistry,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn ConversationStore>, config: Arc<Config>) -> Self {
        Self {
            store,
            rooms: RoomRegistry::new(),
            presence: PresenceRegistry::new(),
            config,
        }
    }
}
