use serde_json::Value;
use std::sync::Arc;

use crate::callback::memory::MemoryCallback;
use crate::indexer::FeedIndexer;
use crate::metadata::FeedIndexMetadata;
use crate::producer::memory::MemoryProducer;
use crate::store::FeedStore;
use crate::store::memory::MemoryStore;
use crate::test_utils::metadata::{SOURCE_FIELD, SOURCE_TABLE, test_metadata};
use crate::test_utils::table::source_rows;
use crate::types::{FeedRecord, Identity};

/// In-memory products feed: a source table, a producer catalogue and a recording callback.
///
/// Products added through [`TestFeed::add_product`] exist both in the source table and in the
/// catalogue, like rows of a real catalogue the producer computes records from.
#[derive(Debug, Clone)]
pub struct TestFeed {
    pub metadata: Arc<FeedIndexMetadata>,
    pub store: MemoryStore,
    pub producer: MemoryProducer,
    pub callback: MemoryCallback,
}

impl TestFeed {
    pub fn new(batch_size: usize) -> Self {
        Self {
            metadata: Arc::new(test_metadata(batch_size)),
            store: MemoryStore::new(),
            producer: MemoryProducer::new(),
            callback: MemoryCallback::new(),
        }
    }

    /// Returns an indexer over the in-memory store.
    pub fn indexer(&self) -> FeedIndexer<MemoryStore, MemoryProducer, MemoryCallback> {
        self.indexer_with_store(self.store.clone())
    }

    /// Returns an indexer over `store`, typically a wrapper of [`TestFeed::store`].
    pub fn indexer_with_store<S>(
        &self,
        store: S,
    ) -> FeedIndexer<S, MemoryProducer, MemoryCallback>
    where
        S: FeedStore + Clone + Sync,
    {
        FeedIndexer::new(
            self.metadata.clone(),
            store,
            self.producer.clone(),
            self.callback.clone(),
        )
    }

    /// Adds a product to the source table and one record per store view to the catalogue.
    pub async fn add_product(&self, identity: i64, store_view_codes: &[&str], fields: Value) {
        self.store
            .insert_rows(SOURCE_TABLE, source_rows([identity]))
            .await;

        for store_view_code in store_view_codes {
            let mut record = FeedRecord::new(Identity(identity), *store_view_code);
            if let Value::Object(fields) = &fields {
                record.fields = fields.clone();
            }
            self.producer.upsert_record(record).await;
        }
    }

    /// Replaces the catalogue record of a product in one store view.
    pub async fn update_product(&self, identity: i64, store_view_code: &str, fields: Value) {
        let mut record = FeedRecord::new(Identity(identity), store_view_code);
        if let Value::Object(fields) = fields {
            record.fields = fields;
        }
        self.producer.upsert_record(record).await;
    }

    /// Removes a product from the source table and from the catalogue.
    pub async fn remove_product(&self, identity: i64) {
        self.store
            .delete_rows(SOURCE_TABLE, SOURCE_FIELD, &[Identity(identity)])
            .await;
        self.producer.remove_identity(Identity(identity)).await;
    }
}
