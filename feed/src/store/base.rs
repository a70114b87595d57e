use std::future::Future;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::types::{Identity, TableRow};

/// Storage holding the source table and the materialized feed table.
///
/// [`FeedStore`] implementations address tables and columns through the
/// [`FeedIndexMetadata`] passed to each call, so one store can serve several feeds.
///
/// The feed table is keyed by the identity column and the scope column. Every write that
/// changes a row stamps its modified-at column with the current time.
pub trait FeedStore {
    /// Returns up to `limit` source identities strictly greater than `after`, ascending.
    fn fetch_source_identities(
        &self,
        metadata: &FeedIndexMetadata,
        after: Identity,
        limit: usize,
    ) -> impl Future<Output = FeedResult<Vec<Identity>>> + Send;

    /// Removes every row of the feed table.
    fn truncate_feed(
        &self,
        metadata: &FeedIndexMetadata,
    ) -> impl Future<Output = FeedResult<()>> + Send;

    /// Flags as deleted the live feed rows among `ids` whose source row no longer exists.
    ///
    /// Returns the number of rows flagged. Rows already flagged are left untouched, so calling
    /// this twice with the same input flags nothing the second time.
    fn mark_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> impl Future<Output = FeedResult<u64>> + Send;

    /// Inserts `rows`, or updates the mutable columns of rows whose key already exists.
    ///
    /// Columns outside [`FeedIndexMetadata::feed_table_mutable_columns`] keep their stored value
    /// on conflict. A row whose mutable columns already hold the incoming values is left as is,
    /// modified-at column included, so writing the same rows twice changes nothing.
    ///
    /// Returns the number of rows inserted or changed. Rows are validated before anything is
    /// written: an invalid row fails the call without touching the table.
    fn upsert_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> impl Future<Output = FeedResult<u64>> + Send;

    /// Returns the feed rows not flagged as deleted whose identity is in `ids`.
    fn select_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> impl Future<Output = FeedResult<Vec<TableRow>>> + Send;
}
