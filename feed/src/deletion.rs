use metrics::counter;
use std::sync::Arc;
use tracing::info;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::metrics::{FEED_NAME_LABEL, FEED_ROWS_MARKED_REMOVED_TOTAL};
use crate::store::FeedStore;
use crate::types::Identity;

/// Soft-deletes feed rows whose source row disappeared.
///
/// Rows are only flagged, never removed, so consumers reading the feed table see the deletion.
#[derive(Debug, Clone)]
pub struct DeletionMarker<S> {
    store: S,
    metadata: Arc<FeedIndexMetadata>,
}

impl<S> DeletionMarker<S>
where
    S: FeedStore,
{
    pub fn new(store: S, metadata: Arc<FeedIndexMetadata>) -> Self {
        Self { store, metadata }
    }

    /// Flags the feed rows of `ids` that have no source row, returning how many were flagged.
    ///
    /// The store is not queried when `ids` is empty.
    pub async fn mark_removed(&self, ids: &[Identity]) -> FeedResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let marked = self.store.mark_removed(&self.metadata, ids).await?;

        if marked > 0 {
            info!(
                feed_name = self.metadata.feed_name(),
                marked, "flagged feed rows of removed source rows"
            );
        }
        counter!(
            FEED_ROWS_MARKED_REMOVED_TOTAL,
            FEED_NAME_LABEL => self.metadata.feed_name().to_string(),
        )
        .increment(marked);

        Ok(marked)
    }
}
