//! Incremental feed indexing.
//!
//! A feed is a denormalized table materialized from a normalized source table. The
//! [`indexer::FeedIndexer`] keeps it in sync: a full rebuild walks the source with a
//! [`scanner::CursorScanner`], incremental calls reconcile only the changed identities, and feed
//! rows whose source row vanished are flagged as deleted instead of being removed.
//!
//! Record computation and change notification are left to implementations of
//! [`producer::RecordProducer`] and [`callback::FeedCallback`].

pub mod callback;
pub mod deletion;
pub mod error;
#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod fetcher;
pub mod indexer;
mod macros;
pub mod merge;
pub mod metadata;
pub mod metrics;
pub mod producer;
pub mod reconciler;
pub mod scanner;
pub mod serializer;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod writer;
