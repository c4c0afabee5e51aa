pub mod chat;
pub mod message;

pub use chat::ChatSummary;
pub use message::{MessageMeta, StoredMessage};
