use metrics::counter;
use std::sync::Arc;
use tracing::info;

use crate::callback::FeedCallback;
use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::metrics::{FEED_IDENTITIES_DELETED_TOTAL, FEED_NAME_LABEL, FEED_ROWS_WRITTEN_TOTAL};
use crate::serializer::FeedSerializer;
use crate::store::FeedStore;
use crate::types::{CallbackEntry, FeedRecord, Identity};

/// Writes record chunks to the feed table and notifies the callback.
///
/// Every chunk is upserted on its own. A failure leaves the chunks written before it in place.
#[derive(Debug, Clone)]
pub struct FeedWriter<S, C, Z> {
    store: S,
    callback: C,
    serializer: Z,
    metadata: Arc<FeedIndexMetadata>,
}

impl<S, C, Z> FeedWriter<S, C, Z>
where
    S: FeedStore,
    C: FeedCallback,
    Z: FeedSerializer,
{
    pub fn new(store: S, callback: C, serializer: Z, metadata: Arc<FeedIndexMetadata>) -> Self {
        Self {
            store,
            callback,
            serializer,
            metadata,
        }
    }

    /// Encodes and upserts one chunk of records, returning the number of rows written.
    pub async fn write_chunk(&self, records: &[FeedRecord]) -> FeedResult<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let rows = self.serializer.encode(&self.metadata, records)?;
        let written = self.store.upsert_feed_rows(&self.metadata, rows).await?;

        info!(
            feed_name = self.metadata.feed_name(),
            written, "wrote feed chunk"
        );
        counter!(
            FEED_ROWS_WRITTEN_TOTAL,
            FEED_NAME_LABEL => self.metadata.feed_name().to_string(),
        )
        .increment(written);

        Ok(written)
    }

    /// Hands the written entries and the deleted identities to the callback.
    pub async fn dispatch(
        &self,
        entries: Vec<CallbackEntry>,
        deleted_ids: Vec<Identity>,
    ) -> FeedResult<()> {
        let deleted = deleted_ids.len() as u64;
        self.callback.notify(entries, deleted_ids).await?;

        counter!(
            FEED_IDENTITIES_DELETED_TOTAL,
            FEED_NAME_LABEL => self.metadata.feed_name().to_string(),
        )
        .increment(deleted);

        Ok(())
    }
}
