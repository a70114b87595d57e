use futures::Stream;
use futures::stream;
use std::sync::Arc;
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, FeedResult};
use crate::metadata::FeedIndexMetadata;
use crate::store::FeedStore;
use crate::types::Identity;

/// Enumerates every source identity in ascending order, one page at a time.
///
/// Each page is requested with a keyset condition on the last identity seen, so memory stays
/// bounded by the batch size and rows inserted during the scan with a larger key are still
/// picked up.
#[derive(Debug, Clone)]
pub struct CursorScanner<S> {
    store: S,
    metadata: Arc<FeedIndexMetadata>,
}

impl<S> CursorScanner<S>
where
    S: FeedStore + Sync,
{
    pub fn new(store: S, metadata: Arc<FeedIndexMetadata>) -> Self {
        Self { store, metadata }
    }

    /// Returns a stream of identity batches.
    ///
    /// The stream ends on the first empty page. A query error is yielded once and ends the
    /// stream.
    pub fn scan(&self) -> impl Stream<Item = FeedResult<Vec<Identity>>> + Send + '_ {
        stream::try_unfold(Identity::default(), move |last_known_id| async move {
            let batch_size = self.metadata.batch_size();
            let batch = self
                .store
                .fetch_source_identities(&self.metadata, last_known_id, batch_size)
                .await?;

            let Some(&last) = batch.last() else {
                debug!(%last_known_id, "source scan exhausted");
                return Ok(None);
            };

            if last <= last_known_id {
                bail!(
                    ErrorKind::SourceQueryFailed,
                    "Source scan did not advance",
                    format!("Page after {last_known_id} ended at {last}")
                );
            }

            debug!(%last_known_id, %last, count = batch.len(), "advanced source cursor");

            Ok(Some((batch, last)))
        })
    }
}
