//! Backend Module
//!
//! Server-side half of board synchronization: a WebSocket endpoint that
//! clients join topics on, a publish queue that business handlers feed, and
//! the revert endpoint behind optimistic undo.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Application state, configuration loading, initialization
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`realtime`** - Topic registry, dispatch engine, fan-out consumer, sockets
//! - **`revert`** - Revert key ledger and endpoint
//! - **`auth`** - Bearer tokens and join authorization
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── realtime/       - Sync engine
//! ├── revert/         - Optimistic undo, server half
//! ├── auth/           - Authentication
//! └── error/          - Error types
//! ```
//!
//! # Thread Safety
//!
//! Shared maps are `DashMap`s behind `Arc`; the revert ledger uses a single
//! `Mutex` because issue and consume must see one consistent view. No lock is
//! held across an `.await`.

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Real-time sync engine
#[cfg(feature = "ssr")]
pub mod realtime;

/// Optimistic undo, server half
#[cfg(feature = "ssr")]
pub mod revert;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Authentication and join authorization
#[cfg(feature = "ssr")]
pub mod auth;

#[cfg(feature = "ssr")]
pub use error::BackendError;
#[cfg(feature = "ssr")]
pub use realtime::{EventDispatcher, FanoutConsumer, Publisher, TopicRegistry};
#[cfg(feature = "ssr")]
pub use server::{create_app, AppState};
