//! Client Module
//!
//! Client half of board synchronization. It receives server broadcasts,
//! merges them into local entities and runs optimistic writes with
//! server-issued revert keys.
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs           - Module exports and documentation
//! ├── error.rs         - ClientError
//! ├── socket.rs        - ClientSocket (listener table + outbox)
//! ├── subscription.rs  - Generic Subscription<Req, Res>
//! ├── features.rs      - Per-feature subscriptions and store bindings
//! ├── entity.rs        - Entity trait, EntityPatch, Card, Wiki
//! ├── store.rs         - EntityStore
//! ├── optimistic.rs    - MutationCoordinator
//! └── transport.rs     - MutationTransport and HttpTransport
//! ```
//!
//! # Threading
//!
//! Everything here is single-threaded. Shared state is `Rc<RefCell<_>>` and
//! no `RefCell` borrow is held across an `.await`.

pub mod entity;
pub mod error;
pub mod features;
pub mod optimistic;
pub mod socket;
pub mod store;
pub mod subscription;
pub mod transport;

pub use entity::{Card, CardField, Entity, EntityField, EntityPatch, Wiki, WikiField};
pub use error::ClientError;
pub use features::{watch_card, watch_wiki, EntityWatch};
pub use optimistic::{MutationCoordinator, MutationRequest, MutationState, PendingMutation, UndoAction};
pub use socket::{ClientSocket, ListenerId};
pub use store::{EntityStore, FieldChange, FieldSubscriptionId, PendingNotifications, UpdateOrigin};
pub use subscription::{OffHandle, Subscription};
pub use transport::{HttpTransport, MutationTransport};
