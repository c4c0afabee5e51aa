use crate::{config::Config, services::chat_store::ChatStore, websocket::RelayRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub registry: RelayRegistry,
    pub config: Arc<Config>,
}
