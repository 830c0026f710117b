//! Route Configuration Module
//!
//! # Routes
//!
//! - `GET /ws` - WebSocket upgrade (token in `?token=` or `Authorization`)
//! - `GET /health` - Liveness plus registry and ledger counters
//! - `POST /revert/{*path}` - Redeem a revert key
//! - `POST /internal/publish` - Enqueue a raw publish instruction
//!
//! `/internal/publish` is meant for trusted producers on the same network
//! and carries no authentication of its own.

/// Main router creation
pub mod router;

pub use router::create_router;
