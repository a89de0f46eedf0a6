pub mod conversation;
pub mod message;

pub use conversation::{Conversation, LastMessage};
pub use message::Message;
