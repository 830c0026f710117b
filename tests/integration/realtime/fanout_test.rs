//! Fan-out consumer end to end: queue, projection, delivery, handlers

use crate::common::{connect, test_state};
use crate::{assert_event, assert_no_frame};
use boardsync::backend::realtime::{handler_fn, FanoutConsumer, HandlerError};
use boardsync::backend::server::spawn_background;
use boardsync::shared::{CardEvent, PublishInstruction, PublishModel, Topic, TopicEvent};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};

fn data(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn wait_for(counter: &AtomicUsize, expected: usize) {
    timeout(Duration::from_secs(2), async {
        while counter.load(Ordering::SeqCst) < expected {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("handlers did not run in time");
}

#[tokio::test]
async fn test_each_target_is_emitted_exactly_once() {
    let (state, queue_rx) = test_state();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    state.dispatcher.on_template(
        Topic::BoardCard,
        CardEvent::TEMPLATES[0],
        &boardsync::shared::event_params([("uid", "c1")]),
        handler_fn(move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), HandlerError>(())
            }
        }),
    );
    let tasks = spawn_background(&state, queue_rx);

    for _ in 0..3 {
        let instruction = PublishInstruction::new(data(json!({"uid": "c1", "title": "T"})))
            .target(PublishModel::new(Topic::BoardCard, "c1", CardEvent::TEMPLATES[0]).data_keys(["title"]));
        state.queue.enqueue(&instruction).await.unwrap();
    }

    wait_for(&calls, 3).await;
    tasks.shutdown().await;
    sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_only_subscribers_of_the_target_receive() {
    let (state, _queue_rx) = test_state();
    let (_a, mut on_card) = connect(&state, "a", &[(Topic::BoardCard, "c1")]);
    let (_b, mut other_card) = connect(&state, "b", &[(Topic::BoardCard, "c2")]);
    let (_c, mut on_board) = connect(&state, "c", &[(Topic::Board, "b1")]);

    let consumer = FanoutConsumer::new(state.publisher.clone());
    let instruction = PublishInstruction::new(data(json!({"uid": "c1", "title": "T", "column_uid": "k1"})))
        .target(PublishModel::new(Topic::BoardCard, "c1", "board:card:details-changed:{uid}").data_keys(["title"]))
        .target(PublishModel::new(Topic::Board, "b1", "board:card:created:{column_uid}").data_keys(["uid", "title"]));
    let report = consumer.handle(&instruction);

    assert_eq!(report.targets, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(assert_event!(on_card, "board:card:details-changed:c1"), json!({"title": "T"}));
    assert_eq!(assert_event!(on_board, "board:card:created:k1"), json!({"uid": "c1", "title": "T"}));
    assert_no_frame!(other_card);
    assert_no_frame!(on_card);
}

#[tokio::test]
async fn test_projection_never_leaks_unlisted_fields() {
    let (state, _queue_rx) = test_state();
    let (_s, mut rx) = connect(&state, "a", &[(Topic::User, "u1")]);
    let consumer = FanoutConsumer::new(state.publisher.clone());

    consumer.handle_raw(&json!({
        "data": {"uid": "u1", "email": "a@b.c", "password_hash": "x", "name": "Ana"},
        "publish_models": {"topic": "user", "topic_id": "u1", "event": "user:profile:updated", "data_keys": "name"}
    }));
    assert_eq!(assert_event!(rx, "user:profile:updated"), json!({"name": "Ana"}));

    consumer.handle_raw(&json!({
        "data": {"uid": "u1", "email": "a@b.c"},
        "publish_models": [{"topic": "user", "topic_id": "u1", "event": "user:profile:updated"}]
    }));
    assert_eq!(assert_event!(rx, "user:profile:updated"), json!({}));
}

#[tokio::test]
async fn test_global_targets_are_normalised() {
    let (state, _queue_rx) = test_state();
    let (_s, mut rx) = connect(&state, "a", &[(Topic::Global, "all")]);
    let consumer = FanoutConsumer::new(state.publisher.clone());

    let report = consumer.handle_raw(&json!({
        "data": {"text": "maintenance"},
        "publish_models": [{"topic": "global", "topic_id": "anything", "event": "global:announcement:posted", "data_keys": ["text"]}]
    }));
    assert_eq!(report.delivered, 1);
    assert_eq!(assert_event!(rx, "global:announcement:posted"), json!({"text": "maintenance"}));
}

#[tokio::test]
async fn test_malformed_target_does_not_block_siblings() {
    let (state, _queue_rx) = test_state();
    let (_s, mut rx) = connect(&state, "a", &[(Topic::BoardWiki, "w1")]);
    let consumer = FanoutConsumer::new(state.publisher.clone());

    let report = consumer.handle_raw(&json!({
        "data": {"uid": "w1", "title": "Docs"},
        "publish_models": [
            {"topic": "no-such-topic", "topic_id": "w1", "event": "x"},
            {"topic": "board-wiki", "topic_id": "w1", "event": "board:wiki:details-changed:{uid}", "data_keys": ["title"]}
        ]
    }));

    assert_eq!(report.skipped, 1);
    assert_eq!(report.targets, 1);
    assert_eq!(assert_event!(rx, "board:wiki:details-changed:w1"), json!({"title": "Docs"}));
}

#[tokio::test]
async fn test_closed_sessions_are_released_on_publish() {
    let (state, _queue_rx) = test_state();
    let (gone, rx) = connect(&state, "a", &[(Topic::Board, "b1")]);
    drop(rx);

    let report = state
        .publisher
        .publish(Topic::Board, &"b1".into(), "board:column:order-changed", json!({}));
    assert_eq!(report.delivered, 0);
    assert!(state.registry.subscriptions_of(&gone.id).is_empty());
}
