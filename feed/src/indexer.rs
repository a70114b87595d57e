use futures::TryStreamExt;
use metrics::histogram;
use std::pin::pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::callback::FeedCallback;
use crate::deletion::DeletionMarker;
use crate::error::FeedResult;
use crate::fetcher::{ExistingDataFetcher, StoreFeedReader};
use crate::metadata::FeedIndexMetadata;
use crate::metrics::{FEED_EXECUTE_DURATION_SECONDS, FEED_NAME_LABEL, MODE_LABEL};
use crate::producer::RecordProducer;
use crate::reconciler::{FeedReconciler, ProcessSummary};
use crate::scanner::CursorScanner;
use crate::serializer::{FeedSerializer, JsonFeedSerializer};
use crate::store::FeedStore;
use crate::types::{Identity, IndexRequest, IndexTarget};
use crate::writer::FeedWriter;

/// Outcome of one indexing entry point call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Number of request batches reconciled.
    pub batches: usize,
    pub requested: usize,
    pub written: usize,
    pub merged: usize,
    /// Number of identities reported to the callback as deleted.
    pub deleted: usize,
    /// Number of feed rows flagged by the anti-join.
    pub marked_removed: u64,
}

impl IndexSummary {
    fn absorb(&mut self, process: ProcessSummary) {
        self.batches += 1;
        self.requested += process.requested;
        self.written += process.written;
        self.merged += process.merged;
        self.deleted += process.deleted;
    }

    fn add(&mut self, other: IndexSummary) {
        self.batches += other.batches;
        self.requested += other.requested;
        self.written += other.written;
        self.merged += other.merged;
        self.deleted += other.deleted;
        self.marked_removed += other.marked_removed;
    }
}

/// Entry point kind, used to label logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexMode {
    Full,
    List,
    Partial,
}

impl IndexMode {
    fn as_static_str(&self) -> &'static str {
        match self {
            IndexMode::Full => "full",
            IndexMode::List => "list",
            IndexMode::Partial => "partial",
        }
    }
}

/// Indexer of one feed.
///
/// [`FeedIndexer`] ties the scanner, the deletion marker and the reconciler together behind the
/// four indexing entry points. Every entry point first flags the feed rows of vanished source
/// rows and then reconciles the requested identities, so a deleted row is never rewritten.
///
/// Calls are not serialized: running two entry points concurrently on the same feed is left to
/// the caller to prevent.
#[derive(Debug)]
pub struct FeedIndexer<S, P, C, Z = JsonFeedSerializer> {
    metadata: Arc<FeedIndexMetadata>,
    store: S,
    deletion: DeletionMarker<S>,
    reconciler: FeedReconciler<P, StoreFeedReader<S, Z>, S, C, Z>,
}

impl<S, P, C> FeedIndexer<S, P, C, JsonFeedSerializer>
where
    S: FeedStore + Clone + Sync,
    P: RecordProducer,
    C: FeedCallback,
{
    /// Creates an indexer storing records as JSON documents.
    pub fn new(metadata: Arc<FeedIndexMetadata>, store: S, producer: P, callback: C) -> Self {
        Self::with_serializer(metadata, store, producer, callback, JsonFeedSerializer)
    }
}

impl<S, P, C, Z> FeedIndexer<S, P, C, Z>
where
    S: FeedStore + Clone + Sync,
    P: RecordProducer,
    C: FeedCallback,
    Z: FeedSerializer + Clone + Sync,
{
    pub fn with_serializer(
        metadata: Arc<FeedIndexMetadata>,
        store: S,
        producer: P,
        callback: C,
        serializer: Z,
    ) -> Self {
        let reader = StoreFeedReader::new(store.clone(), serializer.clone(), metadata.clone());
        let fetcher = ExistingDataFetcher::new(reader, metadata.feed_name());
        let writer = FeedWriter::new(store.clone(), callback, serializer, metadata.clone());
        let reconciler = FeedReconciler::new(metadata.clone(), producer, fetcher, writer);

        Self {
            deletion: DeletionMarker::new(store.clone(), metadata.clone()),
            metadata,
            store,
            reconciler,
        }
    }

    pub fn metadata(&self) -> &FeedIndexMetadata {
        &self.metadata
    }

    /// Rebuilds the whole feed.
    ///
    /// The feed table is truncated, then every source identity is reconciled one cursor batch
    /// at a time. Batches reconciled before a failure stay written.
    pub async fn execute_full(&self) -> FeedResult<IndexSummary> {
        let started = Instant::now();
        let result = self.full().await;

        self.finish(IndexMode::Full, started, result)
    }

    /// Recomputes every attribute of `ids`.
    pub async fn execute_list(&self, ids: &[Identity]) -> FeedResult<IndexSummary> {
        let started = Instant::now();
        let requests = ids.iter().copied().map(IndexRequest::full).collect();
        let result = self.reconcile(ids, requests).await;

        self.finish(IndexMode::List, started, result)
    }

    /// Recomputes every attribute of `id`.
    pub async fn execute_row(&self, id: Identity) -> FeedResult<IndexSummary> {
        self.execute_list(&[id]).await
    }

    /// Reconciles bare identities and change records.
    ///
    /// Every target is validated before anything is written: a change record without identity
    /// or with an empty attribute code fails the call up front, with one error per malformed
    /// target aggregated into the returned error. Targets are reconciled in
    /// input order, duplicates included.
    pub async fn execute(&self, targets: Vec<IndexTarget>) -> FeedResult<IndexSummary> {
        let started = Instant::now();
        let result = self.partial(targets).await;

        self.finish(IndexMode::Partial, started, result)
    }

    async fn full(&self) -> FeedResult<IndexSummary> {
        self.store.truncate_feed(&self.metadata).await?;

        let scanner = CursorScanner::new(self.store.clone(), self.metadata.clone());
        let mut batches = pin!(scanner.scan());

        let mut summary = IndexSummary::default();
        while let Some(batch) = batches.try_next().await? {
            let requests = batch.iter().copied().map(IndexRequest::full).collect();
            summary.add(self.reconcile(&batch, requests).await?);
        }

        Ok(summary)
    }

    async fn partial(&self, targets: Vec<IndexTarget>) -> FeedResult<IndexSummary> {
        let mut requests = Vec::with_capacity(targets.len());
        let mut errors = Vec::new();
        for target in targets {
            match IndexRequest::try_from(target) {
                Ok(request) => requests.push(request),
                Err(err) => errors.push(err),
            }
        }

        // Every malformed target is reported at once.
        if !errors.is_empty() {
            return Err(errors.into());
        }
        let ids: Vec<Identity> = requests.iter().map(IndexRequest::identity).collect();

        self.reconcile(&ids, requests).await
    }

    /// Flags the removed rows of `ids`, then reconciles `requests`.
    async fn reconcile(
        &self,
        ids: &[Identity],
        requests: Vec<IndexRequest>,
    ) -> FeedResult<IndexSummary> {
        let mut summary = IndexSummary {
            marked_removed: self.deletion.mark_removed(ids).await?,
            ..IndexSummary::default()
        };
        summary.absorb(self.reconciler.process(requests).await?);

        Ok(summary)
    }

    fn finish(
        &self,
        mode: IndexMode,
        started: Instant,
        result: FeedResult<IndexSummary>,
    ) -> FeedResult<IndexSummary> {
        let feed_name = self.metadata.feed_name();
        let mode = mode.as_static_str();

        histogram!(
            FEED_EXECUTE_DURATION_SECONDS,
            FEED_NAME_LABEL => feed_name.to_string(),
            MODE_LABEL => mode,
        )
        .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(summary) => info!(
                feed_name,
                mode,
                batches = summary.batches,
                written = summary.written,
                deleted = summary.deleted,
                marked_removed = summary.marked_removed,
                "indexing finished"
            ),
            Err(err) => error!(feed_name, mode, error = %err, "indexing failed"),
        }

        result
    }
}
