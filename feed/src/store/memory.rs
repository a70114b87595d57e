use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bail;
use crate::error::{ErrorKind, FeedResult};
use crate::metadata::FeedIndexMetadata;
use crate::store::FeedStore;
use crate::types::{Identity, TableRow};

/// Inner state of [`MemoryStore`].
#[derive(Debug, Default)]
struct Inner {
    /// Rows of every table, in insertion order, indexed by table name.
    tables: HashMap<String, Vec<TableRow>>,
}

/// In-memory storage for source and feed tables.
///
/// [`MemoryStore`] implements [`FeedStore`] over plain rows kept in memory, which makes it the
/// store of choice for tests and local development. Tables are created on first write.
/// Source tables are filled through [`MemoryStore::insert_rows`] and pruned through
/// [`MemoryStore::delete_rows`], standing in for the application that owns them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates a new store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rows` to `table`.
    pub async fn insert_rows(&self, table: &str, rows: Vec<TableRow>) {
        let mut inner = self.inner.lock().await;
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Deletes the rows of `table` whose `column` holds one of `ids`.
    ///
    /// Returns the number of rows deleted.
    pub async fn delete_rows(&self, table: &str, column: &str, ids: &[Identity]) -> usize {
        let mut inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get_mut(table) else {
            return 0;
        };

        let before = rows.len();
        rows.retain(|row| !row.identity(column).is_some_and(|id| ids.contains(&id)));

        before - rows.len()
    }

    /// Returns a copy of the rows of `table`.
    pub async fn table_rows(&self, table: &str) -> Vec<TableRow> {
        let inner = self.inner.lock().await;
        inner.tables.get(table).cloned().unwrap_or_default()
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339())
}

/// Reads the key of a feed row, failing when either key column is missing.
fn feed_key(metadata: &FeedIndexMetadata, row: &TableRow) -> FeedResult<(Identity, String)> {
    let identity = row.identity(metadata.feed_table_field());
    let scope = row.text(metadata.feed_table_scope_column());

    match (identity, scope) {
        (Some(identity), Some(scope)) => Ok((identity, scope.to_string())),
        _ => bail!(
            ErrorKind::InvalidData,
            "Feed row has no key",
            format!(
                "Columns '{}' and '{}' are required in table '{}'",
                metadata.feed_table_field(),
                metadata.feed_table_scope_column(),
                metadata.feed_table_name()
            )
        ),
    }
}

impl FeedStore for MemoryStore {
    async fn fetch_source_identities(
        &self,
        metadata: &FeedIndexMetadata,
        after: Identity,
        limit: usize,
    ) -> FeedResult<Vec<Identity>> {
        let inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get(metadata.source_table_name()) else {
            return Ok(vec![]);
        };

        let mut identities = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(identity) = row.identity(metadata.source_table_field()) else {
                bail!(
                    ErrorKind::SourceQueryFailed,
                    "Source row has no identity",
                    format!(
                        "Column '{}' is missing in table '{}'",
                        metadata.source_table_field(),
                        metadata.source_table_name()
                    )
                );
            };

            if identity > after {
                identities.push(identity);
            }
        }

        identities.sort_unstable();
        identities.dedup();
        identities.truncate(limit);

        Ok(identities)
    }

    async fn truncate_feed(&self, metadata: &FeedIndexMetadata) -> FeedResult<()> {
        let mut inner = self.inner.lock().await;

        info!("truncating feed table {}", metadata.feed_table_name());

        inner.tables.remove(metadata.feed_table_name());

        Ok(())
    }

    async fn mark_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<u64> {
        let mut inner = self.inner.lock().await;

        let requested: HashSet<Identity> = ids.iter().copied().collect();
        let present: HashSet<Identity> = inner
            .tables
            .get(metadata.source_table_name())
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| row.identity(metadata.source_table_field()))
                    .filter(|identity| requested.contains(identity))
                    .collect()
            })
            .unwrap_or_default();

        let Some(feed_rows) = inner.tables.get_mut(metadata.feed_table_name()) else {
            return Ok(0);
        };

        let deleted_column = metadata.feed_table_deleted_column();
        let mut marked = 0;
        for row in feed_rows.iter_mut() {
            let Some(identity) = row.identity(metadata.feed_table_field()) else {
                continue;
            };

            let orphaned = requested.contains(&identity) && !present.contains(&identity);
            if orphaned && !row.flag(deleted_column) {
                row.insert(deleted_column, true);
                row.insert(metadata.feed_table_modified_at_column(), now());
                marked += 1;
            }
        }

        debug!(marked, "flagged orphaned feed rows in memory");

        Ok(marked)
    }

    async fn upsert_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> FeedResult<u64> {
        let mut inner = self.inner.lock().await;
        let table = inner
            .tables
            .entry(metadata.feed_table_name().to_string())
            .or_default();

        // Keys are checked up front so a bad row leaves the table untouched.
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            keyed.push((feed_key(metadata, &row)?, row));
        }
        let mut positions = HashMap::with_capacity(table.len());
        for (index, stored) in table.iter().enumerate() {
            positions.insert(feed_key(metadata, stored)?, index);
        }

        let mut written = 0;
        for (key, mut row) in keyed {
            match positions.get(&key) {
                Some(&index) => {
                    let stored = &mut table[index];
                    let mut changed = false;
                    for column in metadata.feed_table_mutable_columns() {
                        if let Some(value) = row.get(column)
                            && stored.get(column) != Some(value)
                        {
                            stored.insert(column.as_str(), value.clone());
                            changed = true;
                        }
                    }

                    // Rewriting identical values is not a change.
                    if !changed {
                        continue;
                    }
                    stored.insert(metadata.feed_table_modified_at_column(), now());
                }
                None => {
                    row.insert(metadata.feed_table_modified_at_column(), now());
                    positions.insert(key, table.len());
                    table.push(row);
                }
            }

            written += 1;
        }

        Ok(written)
    }

    async fn select_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<Vec<TableRow>> {
        let inner = self.inner.lock().await;
        let Some(rows) = inner.tables.get(metadata.feed_table_name()) else {
            return Ok(vec![]);
        };

        let mut selected = Vec::new();
        for row in rows {
            if row.flag(metadata.feed_table_deleted_column()) {
                continue;
            }

            let key = feed_key(metadata, row)?;
            if ids.contains(&key.0) {
                selected.push((key, row.clone()));
            }
        }
        selected.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(selected.into_iter().map(|(_, row)| row).collect())
    }
}
