use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::services::relay::RelayEngine;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

/// Soft-delete a message. The deletion notice reaches the room over the
/// live-connection layer.
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(message_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    RelayEngine::delete_message(state.store.as_ref(), &state.registry, user.id, message_id)
        .await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Message deleted"
    })))
}
