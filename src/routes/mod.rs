use crate::middleware::auth;
use crate::state::AppState;
use crate::websocket::handlers::ws_handler;
use axum::{
    middleware,
    routing::{delete, get, post},
    Json, Router,
};

pub mod chats;
pub mod messages;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/messages/:message_id", delete(messages::delete_message))
        .route("/chats/:chat_id", delete(chats::delete_chat))
        .route("/chats/:chat_id/clear", post(chats::clear_chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .nest("/api", api)
        .with_state(state)
}
