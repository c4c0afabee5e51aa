use crate::error::AppError;
use crate::state::AppState;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub nickname: String,
    pub exp: i64,
}

/// Identity attached to an admitted connection or request
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub nickname: String,
}

/// Issue a bearer token for a user (consumed by the excluded login flow and by tests)
pub fn issue_token(
    user_id: Uuid,
    nickname: &str,
    secret: &str,
    ttl_days: i64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        nickname: nickname.to_string(),
        exp: (Utc::now() + Duration::days(ttl_days)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal)
}

/// Validate token signature and expiry, extract the connection identity
pub fn verify_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let id = Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid user_id in token".into()))?;

    Ok(AuthUser {
        id,
        nickname: token_data.claims.nickname,
    })
}

/// Middleware to extract the bearer token and add the identity to extensions
pub async fn auth_middleware(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, AppError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    let user = verify_token(token, &state.config.jwt_secret)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
