//! HTTP API integration tests
//!
//! Driven through `axum_test::TestServer` against the full router.

mod revert_test;
