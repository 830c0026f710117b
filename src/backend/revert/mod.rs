//! Revert Module
//!
//! Server half of optimistic undo: a ledger of single-use revert tokens, the
//! compensating-write seam and the `/revert/{*path}` endpoint.
//!
//! # Module Structure
//!
//! ```text
//! revert/
//! ├── mod.rs          - Module exports and documentation
//! ├── ledger.rs       - Token issue/consume/sweep
//! ├── compensator.rs  - Compensating write trait
//! └── handlers.rs     - HTTP endpoint
//! ```
//!
//! # Token Lifecycle
//!
//! 1. A mutation endpoint calls [`RevertLedger::issue`] with the pre-mutation
//!    state and returns the key in its `MutationResponse`.
//! 2. The client may post the key to `/revert/{path}` within the TTL.
//! 3. The key is consumed once; replays get 409, late calls 410.
//! 4. A background sweeper drops expired keys.

/// Revert token ledger
pub mod ledger;

/// Compensating write seam
pub mod compensator;

/// HTTP endpoint
pub mod handlers;

pub use compensator::{Compensator, Passthrough};
pub use handlers::handle_revert;
pub use ledger::{ConsumedRevert, RevertError, RevertLedger};
