use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::services::relay::RelayEngine;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

/// Purge a chat and all of its messages
pub async fn delete_chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    RelayEngine::delete_chat(state.store.as_ref(), &state.registry, user.id, chat_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Chat deleted"
    })))
}

/// Purge a chat's messages, keeping the chat itself
pub async fn clear_chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    RelayEngine::clear_chat(state.store.as_ref(), &state.registry, user.id, chat_id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Messages cleared"
    })))
}
