use metrics::{counter, histogram};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::callback::FeedCallback;
use crate::error::FeedResult;
#[cfg(feature = "failpoints")]
use crate::failpoints::{RECONCILER_AFTER_CHUNK_WRITE, RECONCILER_BEFORE_CALLBACK, feed_fail_point};
use crate::fetcher::{ExistingDataFetcher, FeedReader};
use crate::merge::{changed_attributes, merge_record};
use crate::metadata::FeedIndexMetadata;
use crate::metrics::{FEED_NAME_LABEL, FEED_PROCESS_DURATION_SECONDS, FEED_RECORDS_MERGED_TOTAL};
use crate::producer::RecordProducer;
use crate::serializer::FeedSerializer;
use crate::store::FeedStore;
use crate::types::{CallbackEntry, FeedKey, FeedRecord, Identity, IndexRequest};
use crate::writer::FeedWriter;

/// Outcome of one [`FeedReconciler::process`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Number of requests received.
    pub requested: usize,
    /// Number of records written.
    pub written: usize,
    /// Number of written records merged into a stored record.
    pub merged: usize,
    /// Number of identities reported as deleted.
    pub deleted: usize,
}

/// Turns index requests into feed writes and a single callback notification.
///
/// For each batch of requests the reconciler asks the producer for records, merges partial
/// records into their stored version, upserts the result chunk by chunk and finally tells the
/// callback which records were written and which requested identities produced nothing.
#[derive(Debug, Clone)]
pub struct FeedReconciler<P, R, S, C, Z> {
    metadata: Arc<FeedIndexMetadata>,
    producer: P,
    fetcher: ExistingDataFetcher<R>,
    writer: FeedWriter<S, C, Z>,
}

impl<P, R, S, C, Z> FeedReconciler<P, R, S, C, Z>
where
    P: RecordProducer,
    R: FeedReader,
    S: FeedStore,
    C: FeedCallback,
    Z: FeedSerializer,
{
    pub fn new(
        metadata: Arc<FeedIndexMetadata>,
        producer: P,
        fetcher: ExistingDataFetcher<R>,
        writer: FeedWriter<S, C, Z>,
    ) -> Self {
        Self {
            metadata,
            producer,
            fetcher,
            writer,
        }
    }

    /// Reconciles `requests` with the feed table.
    ///
    /// Records are written in chunks of the configured batch size, each chunk committed on its
    /// own: when a later step fails, earlier chunks stay written and the callback is not
    /// invoked. The callback is invoked exactly once when every chunk succeeds, even if nothing
    /// was written.
    pub async fn process(&self, requests: Vec<IndexRequest>) -> FeedResult<ProcessSummary> {
        let started = Instant::now();
        let feed_name = self.metadata.feed_name();

        let records = dedupe_records(self.producer.produce(feed_name, &requests).await?);
        debug!(
            feed_name,
            requests = requests.len(),
            records = records.len(),
            "records produced"
        );

        let existing = self.fetcher.fetch(&partial_identities(&requests)).await?;

        let mut summary = ProcessSummary {
            requested: requests.len(),
            ..ProcessSummary::default()
        };
        let mut entries = Vec::with_capacity(records.len());
        let mut written_ids = HashSet::new();

        let batch_size = self.metadata.batch_size();
        let mut pending = records.into_iter();
        loop {
            let chunk: Vec<FeedRecord> = pending.by_ref().take(batch_size).collect();
            if chunk.is_empty() {
                break;
            }

            let (chunk, chunk_entries, merged) = self.reconcile_chunk(chunk, &existing);
            self.writer.write_chunk(&chunk).await?;

            summary.written += chunk.len();
            summary.merged += merged;
            written_ids.extend(chunk.iter().map(|record| record.identity));
            entries.extend(chunk_entries);

            #[cfg(feature = "failpoints")]
            feed_fail_point(RECONCILER_AFTER_CHUNK_WRITE)?;
        }

        let deleted_ids = unwritten_identities(&requests, &written_ids);
        summary.deleted = deleted_ids.len();

        #[cfg(feature = "failpoints")]
        feed_fail_point(RECONCILER_BEFORE_CALLBACK)?;

        self.writer.dispatch(entries, deleted_ids).await?;

        counter!(
            FEED_RECORDS_MERGED_TOTAL,
            FEED_NAME_LABEL => feed_name.to_string(),
        )
        .increment(summary.merged as u64);
        histogram!(
            FEED_PROCESS_DURATION_SECONDS,
            FEED_NAME_LABEL => feed_name.to_string(),
        )
        .record(started.elapsed().as_secs_f64());

        info!(
            feed_name,
            requested = summary.requested,
            written = summary.written,
            merged = summary.merged,
            deleted = summary.deleted,
            "processed index requests"
        );

        Ok(summary)
    }

    /// Merges the records of a chunk with their stored version and builds their callback
    /// entries. Returns the records to write, their entries and the number of merged records.
    fn reconcile_chunk(
        &self,
        chunk: Vec<FeedRecord>,
        existing: &HashMap<FeedKey, FeedRecord>,
    ) -> (Vec<FeedRecord>, Vec<CallbackEntry>, usize) {
        let skip = self.metadata.callback_skip_attributes();

        let mut records = Vec::with_capacity(chunk.len());
        let mut entries = Vec::with_capacity(chunk.len());
        let mut merged = 0;
        for record in chunk {
            let (record, attributes) = match existing.get(&record.key()) {
                Some(stored) => {
                    merged += 1;
                    let attributes = changed_attributes(&record, skip);
                    (merge_record(stored, record), attributes)
                }
                None => (record, vec![]),
            };

            entries.push(CallbackEntry {
                identity: record.identity,
                store_view_code: record.store_view_code.clone(),
                attributes,
            });
            records.push(record);
        }

        (records, entries, merged)
    }
}

/// Keeps one record per feed key: the last one produced, at the position of the first.
///
/// A chunk must never hold the same key twice, an upsert statement cannot update a row twice.
fn dedupe_records(records: Vec<FeedRecord>) -> Vec<FeedRecord> {
    let mut positions: HashMap<FeedKey, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<FeedRecord> = Vec::with_capacity(records.len());
    for record in records {
        match positions.entry(record.key()) {
            Entry::Occupied(entry) => unique[*entry.get()] = record,
            Entry::Vacant(entry) => {
                entry.insert(unique.len());
                unique.push(record);
            }
        }
    }

    unique
}

/// Identities of the partial requests, deduplicated in request order.
fn partial_identities(requests: &[IndexRequest]) -> Vec<Identity> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .filter(|request| request.is_partial())
        .map(IndexRequest::identity)
        .filter(|identity| seen.insert(*identity))
        .collect()
}

/// Requested identities for which nothing was written, deduplicated in request order.
fn unwritten_identities(
    requests: &[IndexRequest],
    written: &HashSet<Identity>,
) -> Vec<Identity> {
    let mut seen = HashSet::new();
    requests
        .iter()
        .map(IndexRequest::identity)
        .filter(|identity| !written.contains(identity) && seen.insert(*identity))
        .collect()
}
