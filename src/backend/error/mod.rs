//! Backend errors
//!
//! [`BackendError`] is what HTTP handlers return. It covers token failures,
//! revert ledger rejections and a full publish queue, and converts into a
//! JSON response of the form `{"error": ..., "status": ...}`.
//!
//! ```text
//! error/
//! ├── types.rs      - BackendError and its status mapping
//! └── conversion.rs - IntoResponse and From impls
//! ```

pub mod types;

pub mod conversion;

pub use types::BackendError;
