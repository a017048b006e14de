//! Integration test crate for teeclip.
//!
//! This crate has no library code. It only contains tests that exercise
//! the history store, key custody and schema migration together, against
//! real database files in temporary directories.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p teeclip-integration-tests
//! ```
