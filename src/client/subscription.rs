//! Typed event subscriptions
//!
//! A [`Subscription`] binds one resolved event name on a [`ClientSocket`] to a
//! converter and at most one callback. `Req` is what [`Subscription::send`]
//! emits under the same name; `Res` is what the converter produces from each
//! inbound payload.

use crate::client::error::ClientError;
use crate::client::socket::{ClientSocket, ListenerId};
use crate::shared::template::{format_event_name, EventParams};
use crate::shared::SharedError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::Cell;
use std::marker::PhantomData;
use std::rc::Rc;

/// Pure conversion from a wire payload to the subscriber's type.
pub type Converter<Res> = Rc<dyn Fn(&Value) -> Result<Res, SharedError>>;

pub struct Subscription<Req, Res> {
    socket: ClientSocket,
    event: String,
    converter: Converter<Res>,
    current: Rc<Cell<Option<ListenerId>>>,
    _request: PhantomData<fn(&Req)>,
}

/// Removes the registration made by one [`Subscription::on`] call.
///
/// A handle whose registration was since replaced does nothing.
#[derive(Clone)]
pub struct OffHandle {
    socket: ClientSocket,
    event: String,
    id: ListenerId,
    current: Rc<Cell<Option<ListenerId>>>,
}

impl OffHandle {
    pub fn off(&self) {
        if self.current.get() == Some(self.id) {
            self.socket.off(&self.event, self.id);
            self.current.set(None);
        }
    }
}

impl<Req, Res: 'static> Subscription<Req, Res> {
    pub fn new<C>(socket: &ClientSocket, template: &str, params: &EventParams, converter: C) -> Self
    where
        C: Fn(&Value) -> Result<Res, SharedError> + 'static,
    {
        Self {
            socket: socket.clone(),
            event: format_event_name(template, params),
            converter: Rc::new(converter),
            current: Rc::new(Cell::new(None)),
            _request: PhantomData,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event
    }

    pub fn is_active(&self) -> bool {
        self.current.get().is_some()
    }

    /// Register `callback`, replacing any earlier registration.
    pub fn on<F>(&mut self, mut callback: F) -> OffHandle
    where
        F: FnMut(Res) + 'static,
    {
        self.off();

        let converter = self.converter.clone();
        let event = self.event.clone();
        let id = self.socket.on(&self.event, move |data| match converter(data) {
            Ok(value) => callback(value),
            Err(e) => tracing::warn!("[Client] Could not convert payload of '{}': {}", event, e),
        });
        self.current.set(Some(id));

        OffHandle {
            socket: self.socket.clone(),
            event: self.event.clone(),
            id,
            current: self.current.clone(),
        }
    }

    /// Remove the current registration, if any.
    pub fn off(&mut self) {
        if let Some(id) = self.current.take() {
            self.socket.off(&self.event, id);
        }
    }
}

impl<Req, Res: DeserializeOwned + 'static> Subscription<Req, Res> {
    /// Subscription whose converter deserializes the payload with serde.
    pub fn with_serde(socket: &ClientSocket, template: &str, params: &EventParams) -> Self {
        Self::new(socket, template, params, |data| {
            serde_json::from_value(data.clone()).map_err(SharedError::from)
        })
    }
}

impl<Req: Serialize, Res> Subscription<Req, Res> {
    /// Emit `request` under this subscription's event name.
    pub fn send(&self, request: &Req) -> Result<(), ClientError> {
        let data = serde_json::to_value(request).map_err(SharedError::from)?;
        self.socket.emit(&self.event, data)
    }
}

impl<Req, Res> Drop for Subscription<Req, Res> {
    fn drop(&mut self) {
        if let Some(id) = self.current.take() {
            self.socket.off(&self.event, id);
        }
    }
}
