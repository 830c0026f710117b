/**
 * Client Socket
 *
 * Client-side end of the realtime connection. Inbound server frames are fed
 * in with `handle_frame`/`handle_text` by whatever drives the transport, and
 * delivered to listeners keyed by the resolved event name. Outbound frames
 * are queued on an unbounded channel the transport drains.
 *
 * The client runs on one thread, so listeners are `Rc` closures and no state
 * is shared across threads.
 */

use crate::client::error::ClientError;
use crate::shared::protocol::{ClientFrame, ServerFrame};
use crate::shared::topic::{Topic, TopicId};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<RefCell<dyn FnMut(&Value)>>;

struct Inner {
    listeners: RefCell<HashMap<String, Vec<(ListenerId, Listener)>>>,
    next_id: Cell<u64>,
    outbox: mpsc::UnboundedSender<ClientFrame>,
}

/// Cheaply cloneable handle; clones share listeners and outbox.
#[derive(Clone)]
pub struct ClientSocket {
    inner: Rc<Inner>,
}

impl ClientSocket {
    /// New socket plus the receiver of frames to send to the server.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientFrame>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let socket = Self {
            inner: Rc::new(Inner {
                listeners: RefCell::new(HashMap::new()),
                next_id: Cell::new(0),
                outbox,
            }),
        };
        (socket, rx)
    }

    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: FnMut(&Value) + 'static,
    {
        let id = ListenerId(self.inner.next_id.get() + 1);
        self.inner.next_id.set(id.0);
        let listener: Listener = Rc::new(RefCell::new(listener));
        self.inner
            .listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let Some(bound) = listeners.get_mut(event) else {
            return false;
        };
        let before = bound.len();
        bound.retain(|(existing, _)| *existing != id);
        let removed = bound.len() != before;
        if bound.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.borrow().get(event).map(Vec::len).unwrap_or(0)
    }

    pub fn total_listeners(&self) -> usize {
        self.inner.listeners.borrow().values().map(Vec::len).sum()
    }

    /// Invoke every listener bound to `event`. Returns how many ran.
    ///
    /// Listeners may register or remove listeners while running. A listener
    /// that is already running (re-entrant dispatch) is skipped.
    pub fn dispatch(&self, event: &str, data: &Value) -> usize {
        let bound: Vec<Listener> = match self.inner.listeners.borrow().get(event) {
            Some(bound) => bound.iter().map(|(_, listener)| listener.clone()).collect(),
            None => return 0,
        };

        let mut ran = 0;
        for listener in bound {
            match listener.try_borrow_mut() {
                Ok(mut listener) => {
                    (&mut *listener)(data);
                    ran += 1;
                }
                Err(_) => tracing::debug!("[Client] Skipping re-entrant listener for '{}'", event),
            }
        }
        ran
    }

    pub fn handle_frame(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::Event(event) => {
                self.dispatch(&event.event, &event.data);
            }
            ServerFrame::Joined { topic, topic_id } => {
                tracing::debug!("[Client] Joined {}:{}", topic, topic_id)
            }
            ServerFrame::Left { topic, topic_id } => {
                tracing::debug!("[Client] Left {}:{}", topic, topic_id)
            }
            ServerFrame::Error { code, message } => {
                tracing::warn!("[Client] Server error {:?}: {}", code, message)
            }
            ServerFrame::Pong => {}
        }
    }

    /// Parse and handle one text frame from the server.
    pub fn handle_text(&self, text: &str) -> Result<(), ClientError> {
        let frame: ServerFrame = serde_json::from_str(text).map_err(crate::shared::SharedError::from)?;
        self.handle_frame(frame);
        Ok(())
    }

    pub fn send(&self, frame: ClientFrame) -> Result<(), ClientError> {
        self.inner
            .outbox
            .send(frame)
            .map_err(|_| ClientError::Transport("socket closed".into()))
    }

    pub fn join(&self, topic: Topic, topic_id: impl Into<TopicId>) -> Result<(), ClientError> {
        self.send(ClientFrame::Join {
            topic,
            topic_id: topic_id.into(),
        })
    }

    pub fn leave(&self, topic: Topic, topic_id: impl Into<TopicId>) -> Result<(), ClientError> {
        self.send(ClientFrame::Leave {
            topic,
            topic_id: topic_id.into(),
        })
    }

    /// Send a client-originated event.
    pub fn emit(&self, event: &str, data: Value) -> Result<(), ClientError> {
        self.send(ClientFrame::Event {
            event: event.to_string(),
            data,
        })
    }
}
