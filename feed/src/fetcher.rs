use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, FeedResult};
use crate::metadata::FeedIndexMetadata;
use crate::serializer::FeedSerializer;
use crate::store::FeedStore;
use crate::types::{FeedKey, FeedRecord, Identity};

/// Records currently stored in a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedReadResult {
    pub feed: Vec<FeedRecord>,
}

/// Reads the stored records of a feed.
pub trait FeedReader {
    /// Returns the live records of `feed_name` whose identity is in `ids`.
    fn read_by_ids(
        &self,
        feed_name: &str,
        ids: &[Identity],
    ) -> impl Future<Output = FeedResult<FeedReadResult>> + Send;
}

/// [`FeedReader`] decoding rows selected from a [`FeedStore`].
///
/// Rows flagged as deleted are never returned, so a partial update of a deleted identity
/// starts from an empty record instead of resurrecting stale fields.
#[derive(Debug, Clone)]
pub struct StoreFeedReader<S, Z> {
    store: S,
    serializer: Z,
    metadata: Arc<FeedIndexMetadata>,
}

impl<S, Z> StoreFeedReader<S, Z> {
    pub fn new(store: S, serializer: Z, metadata: Arc<FeedIndexMetadata>) -> Self {
        Self {
            store,
            serializer,
            metadata,
        }
    }
}

impl<S, Z> FeedReader for StoreFeedReader<S, Z>
where
    S: FeedStore + Sync,
    Z: FeedSerializer + Sync,
{
    async fn read_by_ids(
        &self,
        feed_name: &str,
        ids: &[Identity],
    ) -> FeedResult<FeedReadResult> {
        if feed_name != self.metadata.feed_name() {
            bail!(
                ErrorKind::InvalidData,
                "Unknown feed",
                format!(
                    "Reader of feed '{}' cannot read feed '{feed_name}'",
                    self.metadata.feed_name()
                )
            );
        }

        let rows = self.store.select_feed_rows(&self.metadata, ids).await?;
        let feed = self.serializer.decode(&self.metadata, rows)?;

        Ok(FeedReadResult { feed })
    }
}

/// Loads the stored records that partial updates are merged into.
#[derive(Debug, Clone)]
pub struct ExistingDataFetcher<R> {
    reader: R,
    feed_name: String,
}

impl<R> ExistingDataFetcher<R>
where
    R: FeedReader,
{
    pub fn new(reader: R, feed_name: impl Into<String>) -> Self {
        Self {
            reader,
            feed_name: feed_name.into(),
        }
    }

    /// Returns the stored records of `ids` indexed by store view and identity.
    ///
    /// The reader is not called when `ids` is empty.
    pub async fn fetch(&self, ids: &[Identity]) -> FeedResult<HashMap<FeedKey, FeedRecord>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let result = self.reader.read_by_ids(&self.feed_name, ids).await?;
        debug!(
            requested = ids.len(),
            found = result.feed.len(),
            "fetched existing feed records"
        );

        Ok(result
            .feed
            .into_iter()
            .map(|record| (record.key(), record))
            .collect())
    }
}
