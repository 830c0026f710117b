//! Client sync layer integration tests

mod optimistic_test;
mod socket_test;
mod transport_test;
#[cfg(feature = "ssr")]
mod undo_test;
