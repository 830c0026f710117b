//! Per-feature subscriptions
//!
//! Each function instantiates the generic [`Subscription`] for one wire event
//! of the board UI, with a converter that turns the payload into a typed
//! patch. [`watch_card`] and [`watch_wiki`] join the entity's topic and keep
//! an [`EntityStore`] in sync until dropped.

use crate::client::entity::{Card, CardField, Entity, EntityPatch, Wiki};
use crate::client::error::ClientError;
use crate::client::socket::ClientSocket;
use crate::client::store::{EntityStore, UpdateOrigin};
use crate::client::subscription::{OffHandle, Subscription};
use crate::shared::event::{BoardEvent, CardEvent, TopicEvent, WikiEvent};
use crate::shared::template::event_params;
use crate::shared::topic::Topic;
use crate::shared::SharedError;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub type PatchSubscription<E> = Subscription<Value, EntityPatch<<E as Entity>::Field>>;

fn object(data: &Value) -> Result<&serde_json::Map<String, Value>, SharedError> {
    data.as_object()
        .ok_or_else(|| SharedError::serialization("payload is not a JSON object"))
}

fn patch_for<E: Entity>(socket: &ClientSocket, template: &str, uid: &str) -> PatchSubscription<E> {
    let owner = uid.to_string();
    Subscription::new(socket, template, &event_params([("uid", uid)]), move |data| {
        Ok(EntityPatch::for_uid(owner.clone(), object(data)?))
    })
}

fn deleted(socket: &ClientSocket, template: &str, uid: &str) -> Subscription<Value, String> {
    let owner = uid.to_string();
    Subscription::new(socket, template, &event_params([("uid", uid)]), move |_| Ok(owner.clone()))
}

/// `board:card:details-changed:{uid}`
pub fn card_details(socket: &ClientSocket, uid: &str) -> PatchSubscription<Card> {
    patch_for::<Card>(socket, CardEvent::TEMPLATES[0], uid)
}

/// `board:card:deleted:{uid}`
pub fn card_deleted(socket: &ClientSocket, uid: &str) -> Subscription<Value, String> {
    deleted(socket, CardEvent::TEMPLATES[1], uid)
}

/// `board:wiki:details-changed:{uid}`
pub fn wiki_details(socket: &ClientSocket, uid: &str) -> PatchSubscription<Wiki> {
    patch_for::<Wiki>(socket, WikiEvent::TEMPLATES[0], uid)
}

/// `board:wiki:deleted:{uid}`
pub fn wiki_deleted(socket: &ClientSocket, uid: &str) -> Subscription<Value, String> {
    deleted(socket, WikiEvent::TEMPLATES[1], uid)
}

/// `board:card:created:{column_uid}`; the payload carries the new card's uid.
pub fn board_card_created(socket: &ClientSocket, column_uid: &str) -> Subscription<Value, EntityPatch<CardField>> {
    Subscription::new(
        socket,
        BoardEvent::TEMPLATES[0],
        &event_params([("column_uid", column_uid)]),
        |data| EntityPatch::from_map(object(data)?),
    )
}

/// Merge every converted patch into `store` as a broadcast.
pub fn bind_patches<E: Entity>(
    subscription: &mut Subscription<Value, EntityPatch<E::Field>>,
    store: &Rc<RefCell<EntityStore<E>>>,
) -> OffHandle {
    let store = Rc::downgrade(store);
    subscription.on(move |patch| {
        let Some(store) = store.upgrade() else { return };
        EntityStore::apply(&store, patch, UpdateOrigin::Broadcast);
    })
}

/// Evict the entity from `store` when its delete event arrives.
pub fn bind_deletes<E: Entity>(
    subscription: &mut Subscription<Value, String>,
    store: &Rc<RefCell<EntityStore<E>>>,
) -> OffHandle {
    let store = Rc::downgrade(store);
    subscription.on(move |uid| {
        let Some(store) = store.upgrade() else { return };
        let notifications = match store.try_borrow_mut() {
            Ok(mut store) => {
                store.delete(&uid);
                store.take_notifications()
            }
            Err(_) => {
                tracing::warn!("[Client] {} store busy, dropping delete of {}", E::KIND, uid);
                return;
            }
        };
        notifications.deliver();
    })
}

/// Live view of one entity: topic membership plus detail and delete bindings.
///
/// Dropping it removes both listeners and leaves the topic.
pub struct EntityWatch<E: Entity> {
    socket: ClientSocket,
    topic: Topic,
    uid: String,
    _details: PatchSubscription<E>,
    _deleted: Subscription<Value, String>,
}

impl<E: Entity> EntityWatch<E> {
    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl<E: Entity> Drop for EntityWatch<E> {
    fn drop(&mut self) {
        if let Err(e) = self.socket.leave(self.topic, self.uid.as_str()) {
            tracing::debug!("[Client] Could not leave {}:{}: {}", self.topic, self.uid, e);
        }
    }
}

fn watch<E: Entity>(
    socket: &ClientSocket,
    store: &Rc<RefCell<EntityStore<E>>>,
    topic: Topic,
    uid: &str,
    mut details: PatchSubscription<E>,
    mut deleted: Subscription<Value, String>,
) -> Result<EntityWatch<E>, ClientError> {
    bind_patches(&mut details, store);
    bind_deletes(&mut deleted, store);
    socket.join(topic, uid)?;
    Ok(EntityWatch {
        socket: socket.clone(),
        topic,
        uid: uid.to_string(),
        _details: details,
        _deleted: deleted,
    })
}

pub fn watch_card(
    socket: &ClientSocket,
    store: &Rc<RefCell<EntityStore<Card>>>,
    uid: &str,
) -> Result<EntityWatch<Card>, ClientError> {
    watch(socket, store, Topic::BoardCard, uid, card_details(socket, uid), card_deleted(socket, uid))
}

pub fn watch_wiki(
    socket: &ClientSocket,
    store: &Rc<RefCell<EntityStore<Wiki>>>,
    uid: &str,
) -> Result<EntityWatch<Wiki>, ClientError> {
    watch(socket, store, Topic::BoardWiki, uid, wiki_details(socket, uid), wiki_deleted(socket, uid))
}
