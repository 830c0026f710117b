//! Reactive entity store
//!
//! Keeps one copy of each entity by uid and notifies per-field listeners when
//! a merge actually changes a value.
//!
//! # Merge Rules
//!
//! - Only fields whose value differs are written and notified.
//! - A `Broadcast` patch older than the entity's version is discarded.
//! - A `Broadcast` patch never touches fields claimed by an in-flight
//!   optimistic mutation. The newest such value is held back and applied
//!   when the claim is released, unless the settled write is newer.
//!
//! # Notifications
//!
//! Merges only queue [`FieldChange`]s. Listeners run from
//! [`PendingNotifications::deliver`], which callers invoke after the store's
//! borrow has ended, so a listener may read the same
//! `Rc<RefCell<EntityStore>>` it is attached to.

use crate::client::entity::{Entity, EntityField, EntityPatch};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Where a patch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOrigin {
    /// Server broadcast
    Broadcast,
    /// Local optimistic write or rollback
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldSubscriptionId(u64);

/// One field value that changed during a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange<F> {
    pub uid: String,
    pub field: F,
    pub old: Value,
    pub new: Value,
}

type FieldListener<F> = Rc<RefCell<dyn FnMut(&FieldChange<F>)>>;
type FieldKey<F> = (String, F);

/// Broadcast value held back while its field was claimed.
#[derive(Debug, Clone, PartialEq)]
struct Deferred {
    value: Value,
    version: Option<u64>,
}

/// Changes drained from a store together with the listeners they concern.
pub struct PendingNotifications<F> {
    batch: Vec<(FieldChange<F>, Vec<FieldListener<F>>)>,
}

impl<F> PendingNotifications<F> {
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Run the listeners. Returns how many calls were made.
    ///
    /// A listener that is already running (re-entrant delivery) is skipped.
    pub fn deliver(self) -> usize {
        let mut calls = 0;
        for (change, listeners) in self.batch {
            for listener in listeners {
                match listener.try_borrow_mut() {
                    Ok(mut listener) => {
                        (&mut *listener)(&change);
                        calls += 1;
                    }
                    Err(_) => tracing::debug!("[Client] Skipping re-entrant field listener"),
                }
            }
        }
        calls
    }
}

pub struct EntityStore<E: Entity> {
    entities: HashMap<String, E>,
    listeners: HashMap<FieldKey<E::Field>, Vec<(FieldSubscriptionId, FieldListener<E::Field>)>>,
    subscriptions: HashMap<FieldSubscriptionId, FieldKey<E::Field>>,
    claims: HashSet<FieldKey<E::Field>>,
    deferred: HashMap<FieldKey<E::Field>, Deferred>,
    pending: Vec<FieldChange<E::Field>>,
    next_id: u64,
}

impl<E: Entity> Default for EntityStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            listeners: HashMap::new(),
            subscriptions: HashMap::new(),
            claims: HashSet::new(),
            deferred: HashMap::new(),
            pending: Vec::new(),
            next_id: 0,
        }
    }

    pub fn get(&self, uid: &str) -> Option<&E> {
        self.entities.get(uid)
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.entities.contains_key(uid)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Insert a full entity, replacing any existing one without notifying.
    pub fn insert(&mut self, entity: E) {
        self.entities.insert(entity.uid().to_string(), entity);
    }

    /// Merge `patch` into the entity with the same uid, creating it if needed.
    ///
    /// Changed fields are queued for [`Self::take_notifications`]. Returns
    /// `None` when the patch was discarded as stale.
    pub fn upsert(&mut self, patch: EntityPatch<E::Field>, origin: UpdateOrigin) -> Option<&E> {
        let EntityPatch { uid, version, values } = patch;
        let entity = self.entities.entry(uid.clone()).or_insert_with(|| E::new(&uid));

        if origin == UpdateOrigin::Broadcast {
            if let Some(version) = version {
                if version < entity.version() {
                    tracing::debug!(
                        "[Client] Ignoring stale {} {} (v{} < v{})",
                        E::KIND,
                        uid,
                        version,
                        entity.version()
                    );
                    return None;
                }
            }
        }

        for (field, value) in values {
            let key = (uid.clone(), field);
            if origin == UpdateOrigin::Broadcast && self.claims.contains(&key) {
                tracing::debug!("[Client] {} {}.{} is claimed, deferring broadcast", E::KIND, uid, field.name());
                let keep_held = match self.deferred.get(&key) {
                    Some(Deferred { version: Some(held), .. }) => version.is_some_and(|incoming| incoming < *held),
                    _ => false,
                };
                if !keep_held {
                    self.deferred.insert(key, Deferred { value, version });
                }
                continue;
            }

            let old = entity.field(field);
            if old == value {
                continue;
            }
            if let Err(e) = entity.set_field(field, value) {
                tracing::warn!("[Client] Rejected value for {} {}: {}", E::KIND, uid, e);
                continue;
            }
            self.pending.push(FieldChange {
                uid: uid.clone(),
                field,
                old,
                new: entity.field(field),
            });
        }

        if let Some(version) = version {
            if version > entity.version() {
                entity.set_version(version);
            }
        }

        self.entities.get(&uid)
    }

    /// Drain queued changes, pairing each with the listeners currently bound
    /// to its field.
    pub fn take_notifications(&mut self) -> PendingNotifications<E::Field> {
        let batch = std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|change| {
                let listeners: Vec<_> = self
                    .listeners
                    .get(&(change.uid.clone(), change.field))?
                    .iter()
                    .map(|(_, listener)| listener.clone())
                    .collect();
                Some((change, listeners))
            })
            .collect();
        PendingNotifications { batch }
    }

    /// Merge `patch` into a shared store and notify once the borrow is released.
    ///
    /// Returns false when the patch was stale or the store was busy.
    pub fn apply(store: &Rc<RefCell<Self>>, patch: EntityPatch<E::Field>, origin: UpdateOrigin) -> bool {
        let (merged, notifications) = match store.try_borrow_mut() {
            Ok(mut store) => {
                let merged = store.upsert(patch, origin).is_some();
                (merged, store.take_notifications())
            }
            Err(_) => {
                tracing::warn!("[Client] {} store busy, dropping patch for {}", E::KIND, patch.uid);
                return false;
            }
        };
        notifications.deliver();
        merged
    }

    /// Deliver whatever a shared store has queued.
    pub fn notify(store: &Rc<RefCell<Self>>) -> usize {
        let notifications = match store.try_borrow_mut() {
            Ok(mut store) => store.take_notifications(),
            Err(_) => return 0,
        };
        notifications.deliver()
    }

    /// Listen for changes of one field of one entity.
    pub fn subscribe_field<L>(&mut self, uid: &str, field: E::Field, listener: L) -> FieldSubscriptionId
    where
        L: FnMut(&FieldChange<E::Field>) + 'static,
    {
        self.next_id += 1;
        let id = FieldSubscriptionId(self.next_id);
        let key = (uid.to_string(), field);
        let listener: FieldListener<E::Field> = Rc::new(RefCell::new(listener));
        self.listeners.entry(key.clone()).or_default().push((id, listener));
        self.subscriptions.insert(id, key);
        id
    }

    /// Remove a field listener. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: FieldSubscriptionId) -> bool {
        let Some(key) = self.subscriptions.remove(&id) else {
            return false;
        };
        if let Some(listeners) = self.listeners.get_mut(&key) {
            listeners.retain(|(existing, _)| *existing != id);
            if listeners.is_empty() {
                self.listeners.remove(&key);
            }
        }
        true
    }

    /// Total registered field listeners.
    pub fn listener_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Evict an entity together with its listeners, claims and queued changes.
    pub fn delete(&mut self, uid: &str) -> Option<E> {
        let removed = self.entities.remove(uid);
        self.listeners.retain(|(owner, _), _| owner != uid);
        self.subscriptions.retain(|_, (owner, _)| owner != uid);
        self.claims.retain(|(owner, _)| owner != uid);
        self.deferred.retain(|(owner, _), _| owner != uid);
        self.pending.retain(|change| change.uid != uid);
        removed
    }

    pub fn is_claimed(&self, uid: &str, field: E::Field) -> bool {
        self.claims.contains(&(uid.to_string(), field))
    }

    /// Mark fields as owned by an in-flight mutation.
    pub fn claim(&mut self, uid: &str, fields: &[E::Field]) {
        for field in fields {
            self.claims.insert((uid.to_string(), *field));
        }
    }

    /// Release claimed fields and apply broadcasts held back meanwhile.
    ///
    /// `settled_version` is the version the owning write ended at, if the
    /// server reported one. A held value is dropped only when both it and
    /// `settled_version` are versioned and it is not newer.
    pub fn release(&mut self, uid: &str, fields: &[E::Field], settled_version: Option<u64>) {
        let mut values = Vec::new();
        for field in fields {
            let key = (uid.to_string(), *field);
            self.claims.remove(&key);
            let Some(held) = self.deferred.remove(&key) else {
                continue;
            };
            match (held.version, settled_version) {
                (Some(theirs), Some(ours)) if theirs <= ours => {
                    tracing::debug!("[Client] Dropping held {} {}.{} (v{} <= v{})", E::KIND, uid, field.name(), theirs, ours);
                }
                _ => values.push((*field, held.value)),
            }
        }

        if !values.is_empty() {
            tracing::debug!("[Client] Applying {} held broadcast value(s) to {} {}", values.len(), E::KIND, uid);
            self.upsert(
                EntityPatch {
                    uid: uid.to_string(),
                    version: None,
                    values,
                },
                UpdateOrigin::Local,
            );
        }
    }

    /// Current values of `fields`, or `None` if the entity is unknown.
    pub fn snapshot(&self, uid: &str, fields: &[E::Field]) -> Option<Vec<(E::Field, Value)>> {
        let entity = self.entities.get(uid)?;
        Some(fields.iter().map(|field| (*field, entity.field(*field))).collect())
    }
}
