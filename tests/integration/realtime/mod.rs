//! Realtime engine integration tests

mod fanout_test;
mod registry_test;
