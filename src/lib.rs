// Increase recursion limit for complex async operations
#![recursion_limit = "256"]

//! Boardsync - Main Library
//!
//! Real-time synchronization core of a collaborative board application:
//! a topic broadcast engine on the server and a reactive entity store with
//! optimistic, undoable writes on the client.
//!
//! # Module Structure
//!
//! - **`shared`** - Types used on both sides of the wire
//!   - Topics, event name templates, typed topic events
//!   - Publish instructions, WebSocket frames, revert wire types
//!   - Configuration and shared errors
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Topic registry, dispatch engine, fan-out consumer
//!   - WebSocket sessions and join authorization
//!   - Revert key ledger and endpoint
//!
//! - **`client`** - Client-side sync
//!   - Socket listener table and typed subscriptions
//!   - Entity store with per-field listeners
//!   - Optimistic mutation coordinator and HTTP transport
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - Enables the backend modules and the server binary
//!
//! # Usage
//!
//! ## Server-Side
//!
//! ```rust,no_run
//! use boardsync::backend::server::{create_app, load_config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config()?;
//! let (app, tasks) = create_app(config);
//! // Serve `app` with axum, then `tasks.shutdown().await`
//! # Ok(())
//! # }
//! ```
//!
//! ## Publishing
//!
//! Business handlers never talk to sockets. They enqueue an instruction
//! naming the targets and which fields each target may see:
//!
//! ```rust
//! use boardsync::shared::{CardEvent, PublishInstruction, PublishModel};
//! use serde_json::json;
//!
//! let data = json!({"uid": "c1", "title": "Ship it", "secret": "x"});
//! let instruction = PublishInstruction::new(data.as_object().cloned().unwrap_or_default())
//!     .target(PublishModel::for_event("c1", &CardEvent::DetailsChanged { uid: "c1".into() }).data_keys(["title"]));
//! assert_eq!(instruction.targets().len(), 1);
//! ```
//!
//! # Thread Safety
//!
//! - **Server**: state is `Arc`-shared; maps are `DashMap`s
//! - **Client**: single-threaded, `Rc<RefCell<_>>`
//!
//! # Error Handling
//!
//! - `shared::error::SharedError` for wire and validation failures
//! - `backend::error::BackendError` for HTTP handlers
//! - `client::error::ClientError` for client operations

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;

/// Client-side sync
pub mod client;
