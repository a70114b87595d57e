use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bail;
use crate::error::{ErrorKind, FeedResult};
use crate::metadata::FeedIndexMetadata;
use crate::store::FeedStore;
use crate::types::{Identity, TableRow};

/// Operations of [`FeedStore`], as recorded by [`FaultInjectingStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FetchSourceIdentities,
    TruncateFeed,
    MarkRemoved,
    UpsertFeedRows,
    SelectFeedRows,
}

/// How an operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    /// Every call fails.
    Error,
    /// The first `n` calls succeed, every later call fails.
    ErrorAfter(usize),
}

/// Faults to inject, per operation.
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    pub fetch_source_identities: Option<FaultType>,
    pub truncate_feed: Option<FaultType>,
    pub mark_removed: Option<FaultType>,
    pub upsert_feed_rows: Option<FaultType>,
    pub select_feed_rows: Option<FaultType>,
}

impl FaultConfig {
    /// Makes every operation fail with `fault`.
    pub fn all(fault: FaultType) -> Self {
        Self {
            fetch_source_identities: Some(fault),
            truncate_feed: Some(fault),
            mark_removed: Some(fault),
            upsert_feed_rows: Some(fault),
            select_feed_rows: Some(fault),
        }
    }

    fn fault(&self, operation: StoreOperation) -> Option<FaultType> {
        match operation {
            StoreOperation::FetchSourceIdentities => self.fetch_source_identities,
            StoreOperation::TruncateFeed => self.truncate_feed,
            StoreOperation::MarkRemoved => self.mark_removed,
            StoreOperation::UpsertFeedRows => self.upsert_feed_rows,
            StoreOperation::SelectFeedRows => self.select_feed_rows,
        }
    }
}

/// Store wrapper recording every call and failing the ones selected by a [`FaultConfig`].
///
/// Failed calls never reach the wrapped store.
#[derive(Debug, Clone)]
pub struct FaultInjectingStore<S> {
    inner: S,
    config: Arc<FaultConfig>,
    calls: Arc<Mutex<Vec<StoreOperation>>>,
}

impl<S> FaultInjectingStore<S> {
    pub fn wrap(inner: S, config: FaultConfig) -> Self {
        Self {
            inner,
            config: Arc::new(config),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every operation attempted so far, failed ones included.
    pub async fn calls(&self) -> Vec<StoreOperation> {
        self.calls.lock().await.clone()
    }

    async fn check(&self, operation: StoreOperation) -> FeedResult<()> {
        let mut calls = self.calls.lock().await;
        let previous = calls.iter().filter(|call| **call == operation).count();
        calls.push(operation);

        let fails = match self.config.fault(operation) {
            None => false,
            Some(FaultType::Error) => true,
            Some(FaultType::ErrorAfter(successes)) => previous >= successes,
        };

        if fails {
            bail!(
                ErrorKind::FeedQueryFailed,
                "Injected store failure",
                format!("{operation:?} failed after {previous} calls")
            );
        }

        Ok(())
    }
}

impl<S> FeedStore for FaultInjectingStore<S>
where
    S: FeedStore + Sync,
{
    async fn fetch_source_identities(
        &self,
        metadata: &FeedIndexMetadata,
        after: Identity,
        limit: usize,
    ) -> FeedResult<Vec<Identity>> {
        self.check(StoreOperation::FetchSourceIdentities).await?;
        self.inner
            .fetch_source_identities(metadata, after, limit)
            .await
    }

    async fn truncate_feed(&self, metadata: &FeedIndexMetadata) -> FeedResult<()> {
        self.check(StoreOperation::TruncateFeed).await?;
        self.inner.truncate_feed(metadata).await
    }

    async fn mark_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<u64> {
        self.check(StoreOperation::MarkRemoved).await?;
        self.inner.mark_removed(metadata, ids).await
    }

    async fn upsert_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> FeedResult<u64> {
        self.check(StoreOperation::UpsertFeedRows).await?;
        self.inner.upsert_feed_rows(metadata, rows).await
    }

    async fn select_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<Vec<TableRow>> {
        self.check(StoreOperation::SelectFeedRows).await?;
        self.inner.select_feed_rows(metadata, ids).await
    }
}
