//! Authentication Module
//!
//! Token issuance, passwords and sign-up live outside this crate. The server
//! only needs to know who owns a connection and whether they may join a topic.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── sessions.rs     - Bearer token decoding into a Principal
//! └── authorizer.rs   - JoinAuthorizer trait and built-in policies
//! ```

/// Bearer token decoding
pub mod sessions;

/// Topic join authorization
pub mod authorizer;

pub use authorizer::{AllowAll, JoinAuthorizer, UserChannelAuthorizer};
pub use sessions::{bearer_token, create_token, principal_from_token, verify_token, Claims};
