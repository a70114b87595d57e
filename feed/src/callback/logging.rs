use tracing::{debug, info};

use crate::callback::FeedCallback;
use crate::error::FeedResult;
use crate::types::{CallbackEntry, Identity};

/// Callback that only logs what it is told.
///
/// Stands in for a real consumer when the indexer runs without a downstream system.
#[derive(Debug, Clone)]
pub struct LoggingCallback {
    feed_name: String,
}

impl LoggingCallback {
    pub fn new(feed_name: impl Into<String>) -> Self {
        Self {
            feed_name: feed_name.into(),
        }
    }
}

impl FeedCallback for LoggingCallback {
    async fn notify(
        &self,
        entries: Vec<CallbackEntry>,
        deleted_ids: Vec<Identity>,
    ) -> FeedResult<()> {
        let partial = entries
            .iter()
            .filter(|entry| !entry.attributes.is_empty())
            .count();

        info!(
            feed_name = %self.feed_name,
            written = entries.len(),
            partial,
            deleted = deleted_ids.len(),
            "feed records changed"
        );

        for entry in &entries {
            debug!(
                identity = %entry.identity,
                store_view_code = %entry.store_view_code,
                attributes = ?entry.attributes,
                "feed record written"
            );
        }

        if !deleted_ids.is_empty() {
            debug!(?deleted_ids, "feed identities deleted");
        }

        Ok(())
    }
}
