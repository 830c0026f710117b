//! `HttpTransport` against a mock backend

use crate::common::{error_body, mock_mutation, mock_revert};
use assert_matches::assert_matches;
use boardsync::client::{ClientError, HttpTransport, MutationTransport};
use boardsync::shared::RevertKey;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn body(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_write_returns_revert_key_and_version() {
    let server = MockServer::start().await;
    mock_mutation(&server, "cards/c1", 200, json!({"revert_key": "k1", "version": 4})).await;

    let transport = HttpTransport::new(server.uri());
    let response = transport
        .write("/cards/c1", &body(json!({"title": "after"})))
        .await
        .unwrap();

    assert_eq!(response.revert_key, RevertKey::new("k1"));
    assert_eq!(response.version, Some(4));
}

#[tokio::test]
async fn test_write_sends_body_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cards/c1"))
        .and(header("authorization", "Bearer secret-token"))
        .and(body_json(json!({"title": "after"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"revert_key": "k2"})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(format!("{}/", server.uri())).with_token("secret-token");
    let response = transport.write("cards/c1", &body(json!({"title": "after"}))).await.unwrap();

    assert_eq!(response.revert_key, RevertKey::new("k2"));
    assert_eq!(response.version, None);
}

#[tokio::test]
async fn test_error_body_becomes_rejection_message() {
    let server = MockServer::start().await;
    mock_mutation(&server, "cards/c1", 422, error_body(422, "title too long")).await;

    let transport = HttpTransport::new(server.uri());
    let result = transport.write("cards/c1", &Map::new()).await;

    assert_matches!(
        result,
        Err(ClientError::Rejected { status: 422, message }) if message == "title too long"
    );
}

#[tokio::test]
async fn test_plain_text_error_is_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cards/c1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let result = transport.write("cards/c1", &Map::new()).await;

    assert_matches!(
        result,
        Err(ClientError::Rejected { status: 503, message }) if message == "upstream down"
    );
}

#[tokio::test]
async fn test_revert_posts_key_under_revert_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/revert/cards/c1"))
        .and(body_json(json!({"revert_key": "k1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"title": "before"}})))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new(server.uri());
    let response = transport.revert("/cards/c1/", &RevertKey::new("k1")).await.unwrap();

    assert_eq!(response.data, body(json!({"title": "before"})));
}

#[tokio::test]
async fn test_used_revert_key_is_rejected() {
    let server = MockServer::start().await;
    mock_revert(&server, "cards/c1", 409, error_body(409, "revert key already used")).await;

    let transport = HttpTransport::new(server.uri());
    let result = transport.revert("cards/c1", &RevertKey::new("k1")).await;

    assert_matches!(result, Err(ClientError::Rejected { status: 409, .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Nothing listens on port 9 of localhost in the test environment
    let transport = HttpTransport::new("http://127.0.0.1:9");
    let result = transport.write("cards/c1", &Map::new()).await;

    assert_matches!(result, Err(ClientError::Transport(_)));
}
