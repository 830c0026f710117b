//! `POST /revert/{*path}`: redemption, rejection codes and the restore broadcast

use crate::common::{connect, test_state};
use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use boardsync::backend::revert::Compensator;
use boardsync::backend::routes::create_router;
use boardsync::backend::server::spawn_background;
use boardsync::shared::{CardEvent, PublishModel, RevertKey, RevertResponse, ServerFrame, Topic, TopicEvent};
use chrono::Utc;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use tokio::time::{timeout, Duration};

fn pre_state() -> Map<String, Value> {
    json!({"uid": "c1", "title": "Before"}).as_object().cloned().unwrap_or_default()
}

fn body(key: &RevertKey) -> Value {
    json!({"revert_key": key})
}

/// Compensator whose backing store is unavailable.
struct Failing;

#[async_trait]
impl Compensator for Failing {
    async fn compensate(&self, _path: &str, _pre_state: &Map<String, Value>) -> Result<Map<String, Value>, String> {
        Err("store unavailable".to_string())
    }
}

#[tokio::test]
async fn test_revert_returns_restored_state_once() {
    let (state, _queue_rx) = test_state();
    let key = state.revert_ledger.issue("cards/c1", pre_state(), Vec::new());
    let server = TestServer::new(create_router(state.clone())).unwrap();

    let response = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let restored: RevertResponse = response.json();
    assert_eq!(restored.data, pre_state());
    assert_eq!(state.revert_ledger.live_count(), 0);

    let replay = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(replay.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_key_is_not_found() {
    let (state, _queue_rx) = test_state();
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server
        .post("/revert/cards/c1")
        .json(&body(&RevertKey::new("never-issued")))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let error: Value = response.json();
    assert_eq!(error["status"], 404);
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn test_expired_key_is_gone() {
    let (state, _queue_rx) = test_state();
    let issued = Utc::now() - chrono::Duration::seconds(120);
    let key = state.revert_ledger.issue_at("cards/c1", pre_state(), Vec::new(), issued);
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::GONE);
}

#[tokio::test]
async fn test_key_for_another_path_is_rejected_and_kept() {
    let (state, _queue_rx) = test_state();
    let key = state.revert_ledger.issue("cards/c1", pre_state(), Vec::new());
    let server = TestServer::new(create_router(state.clone())).unwrap();

    let response = server.post("/revert/cards/c2").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(state.revert_ledger.live_count(), 1);

    let response = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_failed_compensation_keeps_key_redeemable() {
    let (state, _queue_rx) = test_state();
    let key = state.revert_ledger.issue("cards/c1", pre_state(), Vec::new());
    let failing = state.clone().with_compensator(Failing);
    let server = TestServer::new(create_router(failing)).unwrap();

    let response = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(state.revert_ledger.live_count(), 1);

    let server = TestServer::new(create_router(state)).unwrap();
    let response = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_revert_broadcasts_restored_state_to_subscribers() {
    let (state, queue_rx) = test_state();
    let (_watcher, mut rx) = connect(&state, "ben", &[(Topic::BoardCard, "c1")]);
    let (_other, mut other_rx) = connect(&state, "cy", &[(Topic::BoardCard, "c2")]);
    let tasks = spawn_background(&state, queue_rx);

    let target = PublishModel::new(Topic::BoardCard, "c1", CardEvent::TEMPLATES[0]).data_keys(["title"]);
    let key = state.revert_ledger.issue("cards/c1", pre_state(), vec![target]);
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server.post("/revert/cards/c1").json(&body(&key)).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let frame = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no restore broadcast in time")
        .expect("session channel closed");
    match frame {
        ServerFrame::Event(event) => {
            assert_eq!(event.event, "board:card:details-changed:c1");
            assert_eq!(event.data, json!({"title": "Before"}));
        }
        other => panic!("unexpected frame {:?}", other),
    }

    tasks.shutdown().await;
    assert!(other_rx.try_recv().is_err());
}
