use config::shared::StoreConfig;

use crate::error::FeedResult;
use crate::metadata::FeedIndexMetadata;
use crate::store::FeedStore;
use crate::store::memory::MemoryStore;
use crate::store::postgres::PostgresStore;
use crate::types::{Identity, TableRow};

/// Store selected at runtime from a [`StoreConfig`].
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    Memory(MemoryStore),
    Postgres(PostgresStore),
}

impl ConfiguredStore {
    /// Builds the configured store. Postgres connections are opened lazily.
    pub fn from_config(config: &StoreConfig) -> FeedResult<Self> {
        config.validate()?;

        let store = match config {
            StoreConfig::Memory => ConfiguredStore::Memory(MemoryStore::new()),
            StoreConfig::Postgres(connection) => {
                ConfiguredStore::Postgres(PostgresStore::new(connection))
            }
        };

        Ok(store)
    }
}

impl FeedStore for ConfiguredStore {
    async fn fetch_source_identities(
        &self,
        metadata: &FeedIndexMetadata,
        after: Identity,
        limit: usize,
    ) -> FeedResult<Vec<Identity>> {
        match self {
            ConfiguredStore::Memory(store) => {
                store.fetch_source_identities(metadata, after, limit).await
            }
            ConfiguredStore::Postgres(store) => {
                store.fetch_source_identities(metadata, after, limit).await
            }
        }
    }

    async fn truncate_feed(&self, metadata: &FeedIndexMetadata) -> FeedResult<()> {
        match self {
            ConfiguredStore::Memory(store) => store.truncate_feed(metadata).await,
            ConfiguredStore::Postgres(store) => store.truncate_feed(metadata).await,
        }
    }

    async fn mark_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<u64> {
        match self {
            ConfiguredStore::Memory(store) => store.mark_removed(metadata, ids).await,
            ConfiguredStore::Postgres(store) => store.mark_removed(metadata, ids).await,
        }
    }

    async fn upsert_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> FeedResult<u64> {
        match self {
            ConfiguredStore::Memory(store) => store.upsert_feed_rows(metadata, rows).await,
            ConfiguredStore::Postgres(store) => store.upsert_feed_rows(metadata, rows).await,
        }
    }

    async fn select_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<Vec<TableRow>> {
        match self {
            ConfiguredStore::Memory(store) => store.select_feed_rows(metadata, ids).await,
            ConfiguredStore::Postgres(store) => store.select_feed_rows(metadata, ids).await,
        }
    }
}
