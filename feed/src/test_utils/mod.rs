//! Utilities for testing feed indexing.
//!
//! - [`database`]: a throwaway Postgres database holding the products tables
//! - [`metadata`]: the products feed used across tests
//! - [`table`]: source and feed row helpers
//! - [`store`]: a store wrapper injecting failures
//! - [`feed`]: an in-memory harness wiring store, producer and callback together

#[cfg(feature = "test-utils")]
pub mod database;
pub mod feed;
#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod metadata;
pub mod store;
pub mod table;
