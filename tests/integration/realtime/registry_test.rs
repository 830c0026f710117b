//! Registry and dispatcher bookkeeping under repeated and concurrent use

use crate::common::{connect, test_state};
use boardsync::backend::realtime::{handler_fn, HandlerError};
use boardsync::shared::{Topic, TopicId};

#[tokio::test]
async fn test_repeated_join_delivers_once() {
    let (state, _queue_rx) = test_state();
    let (session, mut rx) = connect(&state, "a", &[(Topic::Board, "b1"), (Topic::Board, "b1")]);
    state.registry.join(&session.id, Topic::Board, &TopicId::new("b1"));

    assert_eq!(state.registry.subscriptions_of(&session.id).len(), 1);
    let report = state
        .publisher
        .publish(Topic::Board, &TopicId::new("b1"), "board:column:order-changed", serde_json::json!({}));
    assert_eq!(report.delivered, 1);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_releases_every_subscription() {
    let (state, _queue_rx) = test_state();
    let (session, _rx) = connect(
        &state,
        "a",
        &[(Topic::Board, "b1"), (Topic::BoardCard, "c1"), (Topic::User, "a")],
    );
    let (_other, _other_rx) = connect(&state, "b", &[(Topic::Board, "b1")]);

    assert_eq!(state.registry.disconnect(&session.id), 3);
    assert_eq!(state.registry.connection_count(), 1);
    assert_eq!(state.registry.connections_for(Topic::Board, &TopicId::new("b1")).len(), 1);
    assert!(state.registry.connections_for(Topic::BoardCard, &TopicId::new("c1")).is_empty());
    assert_eq!(state.registry.topic_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_and_leaves() {
    let (state, _queue_rx) = test_state();
    let mut sessions = Vec::new();
    for i in 0..16 {
        sessions.push(connect(&state, &format!("u{}", i), &[]));
    }

    let mut tasks = Vec::new();
    for (session, _) in &sessions {
        let registry = state.registry.clone();
        let id = session.id;
        tasks.push(tokio::spawn(async move {
            for round in 0..50 {
                let topic_id = TopicId::new(format!("b{}", round % 5));
                registry.join(&id, Topic::Board, &topic_id);
                if round % 2 == 0 {
                    registry.leave(&id, Topic::Board, &topic_id);
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let total: usize = (0..5)
        .map(|i| state.registry.connections_for(Topic::Board, &TopicId::new(format!("b{}", i))).len())
        .sum();
    assert_eq!(total, state.registry.subscription_count());

    for (session, _) in &sessions {
        state.registry.disconnect(&session.id);
    }
    assert_eq!(state.registry.subscription_count(), 0);
    assert_eq!(state.registry.topic_count(), 0);
}

#[tokio::test]
async fn test_dispatcher_on_off_cycles_leave_no_bindings() {
    let (state, _queue_rx) = test_state();
    for _ in 0..1000 {
        let id = state.dispatcher.on(
            Topic::BoardCard,
            "board:card:deleted:c1",
            handler_fn(|_ctx| async { Ok::<(), HandlerError>(()) }),
        );
        assert!(state.dispatcher.off(Topic::BoardCard, "board:card:deleted:c1", id));
    }
    assert_eq!(state.dispatcher.total_handlers(), 0);
    assert_eq!(state.dispatcher.handler_count(Topic::BoardCard, "board:card:deleted:c1"), 0);
}

#[tokio::test]
async fn test_session_inbound_on_off_cycles() {
    let (state, _queue_rx) = test_state();
    let (session, _rx) = connect(&state, "a", &[]);
    for _ in 0..1000 {
        let id = session.on("typing", |_, _| Ok(()));
        session.off("typing", id);
    }
    assert_eq!(session.handler_count("typing"), 0);
}
