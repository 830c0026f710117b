//! Mock server helpers for client transport tests
//!
//! Thin wrappers over `wiremock` for the two endpoints the client talks to.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount `POST /{mutation_path}` answering with `status` and `body`.
pub async fn mock_mutation(server: &MockServer, mutation_path: &str, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/{}", mutation_path.trim_matches('/'))))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount `POST /revert/{mutation_path}` answering with `status` and `body`.
pub async fn mock_revert(server: &MockServer, mutation_path: &str, status: u16, body: Value) {
    mock_mutation(server, &format!("revert/{}", mutation_path.trim_matches('/')), status, body).await;
}

/// Error body in the shape the backend produces.
pub fn error_body(status: u16, message: &str) -> Value {
    json!({"error": message, "status": status})
}
