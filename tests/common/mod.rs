//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Application state and connection fixtures
//! - Token helpers
//! - Mock HTTP server helpers
//! - Frame assertion macros

pub mod assertions;
#[cfg(feature = "ssr")]
pub mod auth_helpers;
pub mod mock_server;

#[cfg(feature = "ssr")]
pub use auth_helpers::*;
pub use mock_server::*;
#[cfg(feature = "ssr")]
pub use state::*;
