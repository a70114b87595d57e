use std::collections::BTreeMap;

use serde_json::Value;

use crate::metadata::FeedIndexMetadata;
use crate::store::memory::MemoryStore;
use crate::test_utils::metadata::SOURCE_FIELD;
use crate::types::{FeedKey, Identity, TableRow};

/// Builds one source row per identity.
pub fn source_rows(ids: impl IntoIterator<Item = i64>) -> Vec<TableRow> {
    ids.into_iter()
        .map(|id| TableRow::new().with(SOURCE_FIELD, id))
        .collect()
}

/// Returns the feed rows of `store` by key, without the modified-at column.
///
/// Two snapshots taken after identical runs compare equal.
pub async fn feed_snapshot(
    store: &MemoryStore,
    metadata: &FeedIndexMetadata,
) -> BTreeMap<FeedKey, TableRow> {
    let modified_at = metadata.feed_table_modified_at_column();

    store
        .table_rows(metadata.feed_table_name())
        .await
        .into_iter()
        .filter_map(|row| {
            let identity = row.identity(metadata.feed_table_field())?;
            let store_view_code = row.text(metadata.feed_table_scope_column())?.to_string();
            let row: TableRow = row
                .columns()
                .filter(|(column, _)| column.as_str() != modified_at)
                .map(|(column, value)| (column.clone(), value.clone()))
                .collect();

            Some((FeedKey::new(store_view_code, identity), row))
        })
        .collect()
}

/// Returns the stored document of `identity` in `store_view_code`, if any.
pub async fn feed_document(
    store: &MemoryStore,
    metadata: &FeedIndexMetadata,
    store_view_code: &str,
    identity: Identity,
) -> Option<Value> {
    let snapshot = feed_snapshot(store, metadata).await;
    snapshot
        .get(&FeedKey::new(store_view_code, identity))
        .and_then(|row| row.get(metadata.feed_table_data_column()).cloned())
}

/// Returns whether the row of `identity` in `store_view_code` is flagged as deleted.
pub async fn is_flagged_deleted(
    store: &MemoryStore,
    metadata: &FeedIndexMetadata,
    store_view_code: &str,
    identity: Identity,
) -> bool {
    let snapshot = feed_snapshot(store, metadata).await;
    snapshot
        .get(&FeedKey::new(store_view_code, identity))
        .is_some_and(|row| row.flag(metadata.feed_table_deleted_column()))
}
