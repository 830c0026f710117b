/**
 * Session Tokens
 *
 * Bearer tokens are issued elsewhere; this module only decodes them into a
 * [`Principal`] during the WebSocket handshake and on internal HTTP
 * endpoints. `create_token` exists so
 * tests and local tooling can mint tokens signed with the same secret.
 */

use crate::backend::realtime::session::Principal;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Username (optional for backwards compatibility)
    #[serde(default)]
    pub username: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Create a signed token for a user
///
/// # Arguments
/// * `user_id` - User ID
/// * `username` - Display name, if any
/// * `secret` - HS256 secret
/// * `ttl` - Lifetime of the token
pub fn create_token(
    user_id: &str,
    username: Option<String>,
    secret: &str,
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = now_secs();
    let claims = Claims {
        sub: user_id.to_string(),
        username,
        exp: now + ttl.as_secs(),
        iat: now,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verify and decode a token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let token_data = decode::<Claims>(token, &key, &Validation::default())?;
    Ok(token_data.claims)
}

/// Decode the principal a token was issued to
pub fn principal_from_token(token: &str, secret: &str) -> Result<Principal, jsonwebtoken::errors::Error> {
    let claims = verify_token(token, secret)?;
    Ok(Principal {
        user_id: claims.sub,
        username: claims.username,
    })
}

/// Token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}
