use std::future::Future;

use crate::error::FeedResult;
use crate::types::{FeedRecord, IndexRequest};

/// Computes feed records for a batch of index requests.
///
/// Producers own the meaning of feed fields. For a partial request only the requested
/// attributes need to be returned, the reconciler merges them into the stored record.
///
/// A producer may return fewer records than requests: an identity with no produced record is
/// reported to the callback as deleted. Any failure aborts the whole batch.
pub trait RecordProducer {
    fn produce(
        &self,
        feed_name: &str,
        requests: &[IndexRequest],
    ) -> impl Future<Output = FeedResult<Vec<FeedRecord>>> + Send;
}
