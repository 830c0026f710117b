//! Authentication test helpers
//!
//! Tokens signed with the secret of [`super::test_config`].

use axum::http::HeaderValue;
use boardsync::backend::auth::create_token;
use std::time::Duration;

pub const TEST_SECRET: &str = "boardsync-test-secret";

/// Valid bearer token for `user_id`.
pub fn token_for(user_id: &str) -> String {
    create_token(user_id, Some(format!("{}-name", user_id)), TEST_SECRET, Duration::from_secs(3600))
        .expect("Failed to create test token")
}

/// Token signed with a different secret.
pub fn foreign_token(user_id: &str) -> String {
    create_token(user_id, None, "some-other-secret", Duration::from_secs(3600))
        .expect("Failed to create test token")
}

/// `Authorization` header value carrying `token`.
pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).expect("Invalid header value")
}
