//! # Optimistic Mutations
//!
//! Applies a write to the local store immediately, then reconciles with the
//! server's answer.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──begin──▶ Applying ──commit──▶ Committed  (UndoAction with revert key)
//!                     │
//!                     └──fail──▶ Failed  (snapshot restored, no token)
//! ```
//!
//! While a mutation is `Applying`, its fields are claimed in the store so
//! broadcast echoes of older state cannot overwrite the optimistic value.
//! Broadcasts held back that way are applied when the mutation settles.
//! An undo claims the same fields while its revert request is out.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use boardsync::client::{Card, CardField, EntityStore, HttpTransport, MutationCoordinator, MutationRequest};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), boardsync::client::ClientError> {
//! let store = Rc::new(RefCell::new(EntityStore::<Card>::new()));
//! let transport = HttpTransport::new("http://127.0.0.1:3000");
//! let coordinator = MutationCoordinator::new(Duration::from_secs(10));
//!
//! let request = MutationRequest::new("cards/c1", "c1").set(CardField::Title, "Renamed");
//! let undo = coordinator.mutate(&store, &transport, request).await?;
//! coordinator.undo(&store, &transport, &undo).await?;
//! # Ok(())
//! # }
//! ```

use crate::client::entity::{Entity, EntityField, EntityPatch};
use crate::client::error::ClientError;
use crate::client::store::{EntityStore, UpdateOrigin};
use crate::client::transport::MutationTransport;
use crate::shared::revert::{MutationResponse, RevertKey, RevertResponse};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    Idle,
    Applying,
    Committed,
    Failed,
}

/// A write against one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest<F> {
    /// Endpoint path; also the path the revert key is bound to
    pub path: String,
    pub uid: String,
    pub values: Vec<(F, Value)>,
}

impl<F: EntityField> MutationRequest<F> {
    pub fn new(path: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            uid: uid.into(),
            values: Vec::new(),
        }
    }

    pub fn set(mut self, field: F, value: impl Into<Value>) -> Self {
        self.values.push((field, value.into()));
        self
    }

    pub fn fields(&self) -> Vec<F> {
        self.values.iter().map(|(field, _)| *field).collect()
    }

    /// Request body: `uid` plus the changed fields by wire name.
    pub fn body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("uid".into(), Value::from(self.uid.clone()));
        for (field, value) in &self.values {
            body.insert(field.name().to_string(), value.clone());
        }
        body
    }
}

/// A mutation applied locally and awaiting the server.
#[derive(Debug)]
pub struct PendingMutation<F> {
    pub id: MutationId,
    pub request: MutationRequest<F>,
    /// Pre-mutation values of the written fields
    pub snapshot: Vec<(F, Value)>,
}

/// Everything needed to undo a committed mutation.
#[derive(Debug, Clone)]
pub struct UndoAction<F> {
    /// Mutation this undoes
    pub id: MutationId,
    pub revert_key: RevertKey,
    pub path: String,
    pub uid: String,
    pub snapshot: Vec<(F, Value)>,
    /// When the undo affordance should disappear
    pub deadline: DateTime<Utc>,
}

impl<F> UndoAction<F> {
    /// Time left before `deadline`, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        (self.deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

pub struct MutationCoordinator {
    undo_window: Duration,
    next_id: Cell<u64>,
    last_settled: Cell<MutationState>,
    in_flight: Cell<usize>,
}

impl MutationCoordinator {
    pub fn new(undo_window: Duration) -> Self {
        Self {
            undo_window,
            next_id: Cell::new(0),
            last_settled: Cell::new(MutationState::Idle),
            in_flight: Cell::new(0),
        }
    }

    /// Aggregate state across this coordinator's mutations.
    ///
    /// `Applying` while any mutation is in flight, otherwise how the most
    /// recently settled one ended. The outcome of one particular mutation is
    /// carried by its [`PendingMutation`] turning into an [`UndoAction`] or
    /// an error.
    pub fn state(&self) -> MutationState {
        if self.in_flight.get() > 0 {
            MutationState::Applying
        } else {
            self.last_settled.get()
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    /// Apply `request` locally and claim its fields.
    pub fn begin<E: Entity>(
        &self,
        store: &mut EntityStore<E>,
        request: MutationRequest<E::Field>,
    ) -> Result<PendingMutation<E::Field>, ClientError> {
        let fields = request.fields();
        reject_claimed(store, &request.uid, &fields)?;
        let snapshot = store
            .snapshot(&request.uid, &fields)
            .ok_or_else(|| ClientError::UnknownEntity(request.uid.clone()))?;

        let patch = EntityPatch {
            uid: request.uid.clone(),
            version: None,
            values: request.values.clone(),
        };
        store.upsert(patch, UpdateOrigin::Local);
        store.claim(&request.uid, &fields);

        self.next_id.set(self.next_id.get() + 1);
        self.in_flight.set(self.in_flight.get() + 1);
        tracing::debug!("[Client] Applying {} {} optimistically", E::KIND, request.uid);

        Ok(PendingMutation {
            id: MutationId(self.next_id.get()),
            request,
            snapshot,
        })
    }

    /// The server accepted the write.
    ///
    /// Broadcasts held back while the fields were claimed are applied if they
    /// are newer than `response.version`.
    pub fn commit<E: Entity>(
        &self,
        store: &mut EntityStore<E>,
        pending: PendingMutation<E::Field>,
        response: MutationResponse,
    ) -> UndoAction<E::Field> {
        let PendingMutation { id, request, snapshot } = pending;
        if let Some(version) = response.version {
            store.upsert(EntityPatch::new(request.uid.clone()).with_version(version), UpdateOrigin::Local);
        }
        store.release(&request.uid, &request.fields(), response.version);
        self.settle(MutationState::Committed);

        let window = chrono::Duration::from_std(self.undo_window).unwrap_or_else(|_| chrono::Duration::zero());
        UndoAction {
            id,
            revert_key: response.revert_key,
            path: request.path,
            uid: request.uid,
            snapshot,
            deadline: Utc::now() + window,
        }
    }

    /// The write failed; put the pre-mutation values back.
    ///
    /// Broadcasts that arrived meanwhile are applied on top of the restored
    /// values.
    pub fn fail<E: Entity>(&self, store: &mut EntityStore<E>, pending: PendingMutation<E::Field>) {
        let PendingMutation { request, snapshot, .. } = pending;
        let fields = request.fields();
        store.upsert(
            EntityPatch {
                uid: request.uid.clone(),
                version: None,
                values: snapshot,
            },
            UpdateOrigin::Local,
        );
        store.release(&request.uid, &fields, None);
        self.settle(MutationState::Failed);
    }

    fn settle(&self, state: MutationState) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        self.last_settled.set(state);
    }

    /// Apply locally, write through `transport`, then commit or roll back.
    pub async fn mutate<E, T>(
        &self,
        store: &Rc<RefCell<EntityStore<E>>>,
        transport: &T,
        request: MutationRequest<E::Field>,
    ) -> Result<UndoAction<E::Field>, ClientError>
    where
        E: Entity,
        T: MutationTransport + ?Sized,
    {
        let pending = with_store(store, |store| self.begin(store, request))?;
        let body = pending.request.body();

        match transport.write(&pending.request.path, &body).await {
            Ok(response) => Ok(with_store(store, |store| self.commit(store, pending, response))),
            Err(e) => {
                tracing::info!("[Client] Write to {} failed, rolling back: {}", pending.request.path, e);
                with_store(store, |store| self.fail(store, pending));
                Err(e)
            }
        }
    }

    /// Redeem the revert key and restore the snapshot.
    ///
    /// The snapshot's fields are claimed while the revert request is out, so
    /// an undo is refused while another mutation owns any of them. On failure
    /// the store keeps its values and the error is returned; there is no
    /// retry.
    pub async fn undo<E, T>(
        &self,
        store: &Rc<RefCell<EntityStore<E>>>,
        transport: &T,
        action: &UndoAction<E::Field>,
    ) -> Result<RevertResponse, ClientError>
    where
        E: Entity,
        T: MutationTransport + ?Sized,
    {
        let fields: Vec<E::Field> = action.snapshot.iter().map(|(field, _)| *field).collect();
        {
            let mut store = store.borrow_mut();
            reject_claimed(&*store, &action.uid, &fields)?;
            store.claim(&action.uid, &fields);
        }

        let result = transport.revert(&action.path, &action.revert_key).await;

        with_store(store, |store| {
            if result.is_ok() {
                store.upsert(
                    EntityPatch {
                        uid: action.uid.clone(),
                        version: None,
                        values: action.snapshot.clone(),
                    },
                    UpdateOrigin::Local,
                );
            }
            store.release(&action.uid, &fields, None);
        });

        match &result {
            Ok(_) => tracing::debug!("[Client] Reverted {}", action.path),
            Err(e) => tracing::info!("[Client] Revert of {} failed: {}", action.path, e),
        }
        result
    }
}

fn reject_claimed<E: Entity>(store: &EntityStore<E>, uid: &str, fields: &[E::Field]) -> Result<(), ClientError> {
    match fields.iter().find(|field| store.is_claimed(uid, **field)) {
        Some(field) => Err(ClientError::MutationInFlight {
            field: field.name().to_string(),
        }),
        None => Ok(()),
    }
}

/// Run `f` against the store, then deliver its notifications after the
/// borrow is released.
fn with_store<E: Entity, R>(store: &Rc<RefCell<EntityStore<E>>>, f: impl FnOnce(&mut EntityStore<E>) -> R) -> R {
    let (result, notifications) = {
        let mut store = store.borrow_mut();
        let result = f(&mut *store);
        (result, store.take_notifications())
    };
    notifications.deliver();
    result
}
