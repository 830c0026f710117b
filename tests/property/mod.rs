//! Property-based tests

mod publish_proptest;
mod store_proptest;
mod template_proptest;
