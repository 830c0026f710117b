//! Optimistic writes through the HTTP transport, with broadcasts arriving mid-flight

use crate::common::{error_body, mock_mutation, mock_revert};
use assert_matches::assert_matches;
use boardsync::client::{
    watch_card, Card, CardField, ClientError, ClientSocket, EntityPatch, EntityStore, HttpTransport,
    MutationCoordinator, MutationRequest, MutationState, MutationTransport, UpdateOrigin,
};
use boardsync::shared::RevertKey;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use wiremock::MockServer;

fn seeded_store() -> Rc<RefCell<EntityStore<Card>>> {
    let store = Rc::new(RefCell::new(EntityStore::new()));
    store.borrow_mut().upsert(
        EntityPatch::new("c1")
            .set(CardField::Title, "before")
            .set(CardField::Description, "details")
            .with_version(1),
        UpdateOrigin::Broadcast,
    );
    store
}

#[tokio::test]
async fn test_committed_write_then_undo_restores_snapshot() {
    let server = MockServer::start().await;
    mock_mutation(&server, "cards/c1", 200, json!({"revert_key": "k1", "version": 2})).await;
    mock_revert(&server, "cards/c1", 200, json!({"data": {"uid": "c1", "title": "before"}})).await;

    let store = seeded_store();
    let transport = HttpTransport::new(server.uri());
    let coordinator = MutationCoordinator::new(Duration::from_secs(10));

    let undo = coordinator
        .mutate(&store, &transport, MutationRequest::new("cards/c1", "c1").set(CardField::Title, "after"))
        .await
        .unwrap();
    assert_eq!(undo.revert_key, RevertKey::new("k1"));
    assert_eq!(store.borrow().get("c1").unwrap().title, "after");
    assert_eq!(store.borrow().get("c1").unwrap().version, 2);

    let response = coordinator.undo(&store, &transport, &undo).await.unwrap();
    assert_eq!(response.data.get("title"), Some(&json!("before")));

    let store = store.borrow();
    let card = store.get("c1").unwrap();
    assert_eq!(card.title, "before");
    assert_eq!(card.description, "details");
}

#[tokio::test]
async fn test_rejected_write_rolls_back_only_touched_fields() {
    let server = MockServer::start().await;
    mock_mutation(&server, "cards/c1", 422, error_body(422, "title too long")).await;

    let store = seeded_store();
    let transport = HttpTransport::new(server.uri());
    let coordinator = MutationCoordinator::new(Duration::from_secs(10));

    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = changes.clone();
    store
        .borrow_mut()
        .subscribe_field("c1", CardField::Title, move |change| sink.borrow_mut().push(change.new.clone()));

    let result = coordinator
        .mutate(&store, &transport, MutationRequest::new("cards/c1", "c1").set(CardField::Title, "way too long"))
        .await;

    assert_matches!(result, Err(ClientError::Rejected { status: 422, .. }));
    assert_eq!(coordinator.state(), MutationState::Failed);
    assert_eq!(store.borrow().get("c1").unwrap().title, "before");
    assert_eq!(store.borrow().get("c1").unwrap().description, "details");
    assert!(!store.borrow().is_claimed("c1", CardField::Title));
    assert_eq!(*changes.borrow(), vec![json!("way too long"), json!("before")]);
}

#[tokio::test]
async fn test_failed_undo_leaves_store_unchanged() {
    let server = MockServer::start().await;
    mock_mutation(&server, "cards/c1", 200, json!({"revert_key": "k1"})).await;
    mock_revert(&server, "cards/c1", 410, error_body(410, "revert key expired")).await;

    let store = seeded_store();
    let transport = HttpTransport::new(server.uri());
    let coordinator = MutationCoordinator::new(Duration::from_secs(10));

    let undo = coordinator
        .mutate(&store, &transport, MutationRequest::new("cards/c1", "c1").set(CardField::Title, "after"))
        .await
        .unwrap();
    let result = coordinator.undo(&store, &transport, &undo).await;

    assert_matches!(result, Err(ClientError::Rejected { status: 410, .. }));
    assert_eq!(store.borrow().get("c1").unwrap().title, "after");
}

#[test]
fn test_broadcast_of_claimed_field_is_held_until_settled() {
    let (socket, _outbox) = ClientSocket::new();
    let store = seeded_store();
    let _watch = watch_card(&socket, &store, "c1").unwrap();
    let coordinator = MutationCoordinator::new(Duration::from_secs(10));

    let pending = coordinator
        .begin(
            &mut store.borrow_mut(),
            MutationRequest::new("cards/c1", "c1").set(CardField::Title, "mine"),
        )
        .unwrap();

    // Echo of someone else's write lands while ours is in flight
    socket.dispatch(
        "board:card:details-changed:c1",
        &json!({"title": "theirs", "description": "also theirs"}),
    );
    {
        let store = store.borrow();
        let card = store.get("c1").unwrap();
        assert_eq!(card.title, "mine");
        assert_eq!(card.description, "also theirs");
    }

    coordinator.fail(&mut store.borrow_mut(), pending);
    assert_eq!(store.borrow().get("c1").unwrap().title, "theirs");
    assert_eq!(coordinator.in_flight(), 0);

    socket.dispatch("board:card:details-changed:c1", &json!({"title": "newest"}));
    assert_eq!(store.borrow().get("c1").unwrap().title, "newest");
}

#[test]
fn test_stale_broadcast_is_discarded() {
    let (socket, _outbox) = ClientSocket::new();
    let store = seeded_store();
    let _watch = watch_card(&socket, &store, "c1").unwrap();

    socket.dispatch("board:card:details-changed:c1", &json!({"title": "v3", "version": 3}));
    socket.dispatch("board:card:details-changed:c1", &json!({"title": "v2", "version": 2}));

    let store = store.borrow();
    let card = store.get("c1").unwrap();
    assert_eq!(card.title, "v3");
    assert_eq!(card.version, 3);
}

#[tokio::test]
async fn test_broadcast_during_rejected_write_is_kept() {
    let server = MockServer::start().await;
    mock_mutation(&server, "cards/c1", 500, error_body(500, "database unavailable")).await;

    let (socket, _outbox) = ClientSocket::new();
    let store = seeded_store();
    let _watch = watch_card(&socket, &store, "c1").unwrap();
    let coordinator = MutationCoordinator::new(Duration::from_secs(10));

    let pending = coordinator
        .begin(
            &mut store.borrow_mut(),
            MutationRequest::new("cards/c1", "c1").set(CardField::Title, "mine"),
        )
        .unwrap();
    socket.dispatch("board:card:details-changed:c1", &json!({"title": "theirs", "version": 2}));

    let transport = HttpTransport::new(server.uri());
    let result = transport.write(&pending.request.path, &pending.request.body()).await;
    assert_matches!(result, Err(ClientError::Rejected { status: 500, .. }));
    coordinator.fail(&mut store.borrow_mut(), pending);

    let store = store.borrow();
    let card = store.get("c1").unwrap();
    assert_eq!(card.title, "theirs");
    assert_eq!(card.version, 2);
}
