//! Real-time Sync Module
//!
//! Server side of live board synchronization: who is listening to what, how
//! a published event reaches them, and the in-process handlers that react to
//! the same events.
//!
//! # Architecture
//!
//! - **`registry`** - Topic membership per connection
//! - **`dispatch`** - Server-side handlers keyed by `(topic, event)`
//! - **`session`** - One connected client and its outbound channel
//! - **`publisher`** - Emit plus delivery for one `(topic, id, event)`
//! - **`consumer`** - Publish queue and the fan-out consumer task
//! - **`socket`** - WebSocket upgrade and frame handling
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── registry.rs     - TopicRegistry
//! ├── dispatch.rs     - EventDispatcher and EventHandler
//! ├── session.rs      - ConnectionSession and Principal
//! ├── publisher.rs    - Publisher
//! ├── consumer.rs     - Publish queue and FanoutConsumer
//! └── socket.rs       - /ws handler
//! ```
//!
//! # Event Flow
//!
//! ```text
//! business handler ──enqueue──▶ publish queue ──▶ FanoutConsumer
//!                                                    │ per target: project payload,
//!                                                    │ resolve event name
//!                                                    ▼
//!                                                Publisher
//!                                       ┌────────────┴────────────┐
//!                                EventDispatcher            TopicRegistry
//!                               (server handlers)      (sessions of the topic)
//! ```
//!
//! Delivery is best-effort. A slow or closed connection never blocks others.

/// Topic membership
pub mod registry;

/// Server-side event handlers
pub mod dispatch;

/// Connection session
pub mod session;

/// Topic publisher
pub mod publisher;

/// Publish queue and fan-out consumer
pub mod consumer;

/// WebSocket handler
pub mod socket;

pub use consumer::{publish_queue, FanoutConsumer, FanoutReport, PublishQueueHandle, QueueError};
pub use dispatch::{
    handler_fn, DispatchContext, DispatchReport, EventDispatcher, EventHandler, HandlerError, HandlerId,
};
pub use publisher::{PublishReport, Publisher};
pub use registry::TopicRegistry;
pub use session::{ConnectionId, ConnectionSession, Principal};
pub use socket::{process_frame, ws_handler};
