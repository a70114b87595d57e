use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::FeedResult;
use crate::producer::RecordProducer;
use crate::types::{FeedKey, FeedRecord, Identity, IndexRequest, ScopeId};

#[derive(Debug, Default)]
struct Inner {
    /// Full records, one per identity and store view.
    catalogue: BTreeMap<FeedKey, FeedRecord>,
    /// Store view code of each scope id.
    scopes: HashMap<ScopeId, String>,
    /// Every batch of requests received, in call order.
    requests: Vec<Vec<IndexRequest>>,
}

/// Record producer serving records from an in-memory catalogue.
///
/// A full request returns every record of the identity. A partial request returns only the
/// requested fields, restricted to the store view of the request scope when one is given.
/// Each feed row is produced at most once per call; the first request targeting it wins.
#[derive(Debug, Clone, Default)]
pub struct MemoryProducer {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `record` to the catalogue, replacing the record with the same key.
    pub async fn upsert_record(&self, record: FeedRecord) {
        let mut inner = self.inner.lock().await;
        inner.catalogue.insert(record.key(), record);
    }

    /// Removes every record of `identity`, as if its source row had vanished.
    pub async fn remove_identity(&self, identity: Identity) {
        let mut inner = self.inner.lock().await;
        inner.catalogue.retain(|key, _| key.identity != identity);
    }

    /// Maps `scope` to the store view code its partial requests are restricted to.
    pub async fn set_scope(&self, scope: ScopeId, store_view_code: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        inner.scopes.insert(scope, store_view_code.into());
    }

    /// Returns a copy of every batch of requests received so far.
    pub async fn requests(&self) -> Vec<Vec<IndexRequest>> {
        let inner = self.inner.lock().await;
        inner.requests.clone()
    }
}

impl Inner {
    fn produce(
        &self,
        request: &IndexRequest,
        produced: &mut HashSet<FeedKey>,
    ) -> Vec<FeedRecord> {
        let identity = request.identity();
        let store_view_code = request
            .scope()
            .map(|scope| self.scopes.get(&scope).map(String::as_str));

        let mut records = Vec::new();
        for (key, record) in &self.catalogue {
            if key.identity != identity {
                continue;
            }

            // An unknown scope matches no store view.
            if let Some(code) = store_view_code
                && code != Some(key.store_view_code.as_str())
            {
                continue;
            }

            if !produced.insert(key.clone()) {
                continue;
            }

            let record = match request.attribute_ids() {
                Some(attribute_ids) => {
                    let mut partial = FeedRecord::new(record.identity, &record.store_view_code);
                    for (name, value) in &record.fields {
                        if attribute_ids.contains(name) {
                            partial.fields.insert(name.clone(), value.clone());
                        }
                    }
                    partial
                }
                None => record.clone(),
            };
            records.push(record);
        }

        records
    }
}

impl RecordProducer for MemoryProducer {
    async fn produce(
        &self,
        feed_name: &str,
        requests: &[IndexRequest],
    ) -> FeedResult<Vec<FeedRecord>> {
        let mut inner = self.inner.lock().await;
        inner.requests.push(requests.to_vec());

        let mut produced = HashSet::new();
        let records: Vec<FeedRecord> = requests
            .iter()
            .flat_map(|request| inner.produce(request, &mut produced))
            .collect();

        debug!(
            feed_name,
            requests = requests.len(),
            records = records.len(),
            "produced feed records"
        );

        Ok(records)
    }
}
