//! Client undo against the real revert ledger
//!
//! The transport here issues and redeems keys on a `RevertLedger` in process,
//! so the client sees the same single-use and expiry behavior as over HTTP.

use assert_matches::assert_matches;
use async_trait::async_trait;
use boardsync::backend::revert::{RevertError, RevertLedger};
use boardsync::client::{
    Card, CardField, ClientError, EntityPatch, EntityStore, MutationCoordinator, MutationRequest, MutationTransport,
    UpdateOrigin,
};
use boardsync::shared::{MutationResponse, RevertKey, RevertResponse};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Stores one card document and keeps undo keys in a ledger.
struct LedgerBacked {
    ledger: RevertLedger,
    document: RefCell<Map<String, Value>>,
}

impl LedgerBacked {
    fn new(ttl: Duration) -> Self {
        Self {
            ledger: RevertLedger::new(ttl),
            document: RefCell::new(json!({"uid": "c1", "title": "before"}).as_object().cloned().unwrap_or_default()),
        }
    }
}

fn status_of(err: &RevertError) -> u16 {
    match err {
        RevertError::UnknownKey => 404,
        RevertError::Expired => 410,
        RevertError::AlreadyUsed => 409,
        RevertError::PathMismatch { .. } => 400,
        RevertError::Compensation(_) => 502,
    }
}

#[async_trait(?Send)]
impl MutationTransport for LedgerBacked {
    async fn write(&self, path: &str, body: &Map<String, Value>) -> Result<MutationResponse, ClientError> {
        let mut document = self.document.borrow_mut();
        let pre_state = body
            .keys()
            .filter_map(|key| document.get(key).map(|value| (key.clone(), value.clone())))
            .collect();
        for (key, value) in body {
            document.insert(key.clone(), value.clone());
        }
        Ok(MutationResponse {
            revert_key: self.ledger.issue(path, pre_state, Vec::new()),
            version: None,
        })
    }

    async fn revert(&self, path: &str, key: &RevertKey) -> Result<RevertResponse, ClientError> {
        let consumed = self
            .ledger
            .consume(path, key)
            .map_err(|e| ClientError::rejected(status_of(&e), e.to_string()))?;
        let mut document = self.document.borrow_mut();
        for (key, value) in &consumed.pre_state {
            document.insert(key.clone(), value.clone());
        }
        Ok(RevertResponse {
            data: consumed.pre_state,
        })
    }
}

fn seeded_store() -> Rc<RefCell<EntityStore<Card>>> {
    let store = Rc::new(RefCell::new(EntityStore::new()));
    store
        .borrow_mut()
        .upsert(EntityPatch::new("c1").set(CardField::Title, "before"), UpdateOrigin::Broadcast);
    store
}

#[tokio::test]
async fn test_undo_round_trip_and_single_use() {
    let backend = LedgerBacked::new(Duration::from_secs(30));
    let store = seeded_store();
    let coordinator = MutationCoordinator::new(Duration::from_secs(30));

    let undo = coordinator
        .mutate(&store, &backend, MutationRequest::new("cards/c1", "c1").set(CardField::Title, "after"))
        .await
        .unwrap();
    assert_eq!(backend.document.borrow().get("title"), Some(&json!("after")));

    let response = coordinator.undo(&store, &backend, &undo).await.unwrap();
    assert_eq!(response.data.get("title"), Some(&json!("before")));
    assert_eq!(backend.document.borrow().get("title"), Some(&json!("before")));
    assert_eq!(store.borrow().get("c1").unwrap().title, "before");

    let replay = coordinator.undo(&store, &backend, &undo).await;
    assert_matches!(replay, Err(ClientError::Rejected { status: 409, .. }));
}

#[tokio::test]
async fn test_undo_after_ledger_expiry_is_rejected() {
    let backend = LedgerBacked::new(Duration::from_millis(10));
    let store = seeded_store();
    let coordinator = MutationCoordinator::new(Duration::from_secs(30));

    let undo = coordinator
        .mutate(&store, &backend, MutationRequest::new("cards/c1", "c1").set(CardField::Title, "after"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    let result = coordinator.undo(&store, &backend, &undo).await;
    assert_matches!(result, Err(ClientError::Rejected { status: 410, .. }));
    assert_eq!(store.borrow().get("c1").unwrap().title, "after");
}
