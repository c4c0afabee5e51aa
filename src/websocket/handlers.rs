use crate::error::AppError;
use crate::middleware::auth::{verify_token, AuthUser};
use crate::services::relay::RelayEngine;
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::ConnectionId;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Resolve the bearer token (query param or Authorization header) and
/// validate it. Runs before the upgrade completes; an unauthenticated
/// connection never reaches the registry or any room.
fn authenticate(params: &WsParams, headers: &HeaderMap, secret: &str) -> Result<AuthUser, AppError> {
    let token = params
        .token
        .clone()
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string())
        })
        .ok_or(AppError::Unauthorized)?;

    verify_token(&token, secret)
}

pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let user = match authenticate(&params, &headers, &state.config.jwt_secret) {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "websocket connection refused");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, user, socket))
}

async fn handle_socket(state: AppState, user: AuthUser, socket: WebSocket) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = unbounded_channel::<String>();

    let connection_id =
        match RelayEngine::admit(state.store.as_ref(), &state.registry, &user, tx.clone()).await {
            Ok(id) => id,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "admission failed");
                let _ = ws_sender.send(Message::Close(None)).await;
                return;
            }
        };

    info!(user_id = %user.id, nickname = %user.nickname, "user connected");

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(payload) => {
                        if ws_sender.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = ws_receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&state, &user, connection_id, &tx, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    RelayEngine::disconnect(state.store.as_ref(), &state.registry, user.id, connection_id).await;
    info!(user_id = %user.id, nickname = %user.nickname, "user disconnected");
}

fn send_event(tx: &UnboundedSender<String>, event: &WsOutboundEvent) {
    if let Ok(payload) = event.to_json() {
        let _ = tx.send(payload);
    }
}

/// Handle one inbound event. Errors are converted to a caller-only
/// `error` (or `call_failed`) event; they never tear the connection down
/// or touch other participants.
async fn dispatch(
    state: &AppState,
    user: &AuthUser,
    connection_id: ConnectionId,
    tx: &UnboundedSender<String>,
    text: &str,
) {
    let event: WsInboundEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "malformed event payload");
            send_event(
                tx,
                &WsOutboundEvent::Error {
                    message: "Malformed event payload".into(),
                },
            );
            return;
        }
    };

    let store = state.store.as_ref();
    let registry = &state.registry;

    match event {
        WsInboundEvent::SendMessage {
            chat_id,
            content,
            encrypted_keys,
        } => {
            let result =
                RelayEngine::send_message(store, registry, user, chat_id, content, encrypted_keys)
                    .await;
            match result {
                Ok(()) => {}
                Err(AppError::Forbidden) => send_event(
                    tx,
                    &WsOutboundEvent::Error {
                        message: "Access denied to this chat".into(),
                    },
                ),
                Err(e) => {
                    warn!(user_id = %user.id, %chat_id, error = %e, "send message failed");
                    send_event(
                        tx,
                        &WsOutboundEvent::Error {
                            message: "Failed to send message".into(),
                        },
                    );
                }
            }
        }
        WsInboundEvent::CallUser {
            target_user_id,
            offer,
        } => {
            if let Err(AppError::TargetOffline) =
                RelayEngine::call_user(registry, user, target_user_id, offer).await
            {
                send_event(
                    tx,
                    &WsOutboundEvent::CallFailed {
                        message: "User is offline".into(),
                    },
                );
            }
        }
        WsInboundEvent::AnswerCall {
            target_user_id,
            answer,
        } => {
            let _ = RelayEngine::answer_call(registry, user, target_user_id, answer).await;
        }
        WsInboundEvent::IceCandidate {
            target_user_id,
            candidate,
        } => {
            let _ = RelayEngine::ice_candidate(registry, user, target_user_id, candidate).await;
        }
        WsInboundEvent::EndCall { target_user_id } => {
            let _ = RelayEngine::end_call(registry, user, target_user_id).await;
        }
        WsInboundEvent::GetChats => {
            if let Err(e) =
                RelayEngine::refresh_chats(store, registry, user, connection_id, tx).await
            {
                warn!(user_id = %user.id, error = %e, "chat snapshot refresh failed");
                send_event(
                    tx,
                    &WsOutboundEvent::Error {
                        message: "Failed to get chats".into(),
                    },
                );
            }
        }
    }
}
