use config::shared::{BatchConfig, FeedConfig, IndexerConfig};
use std::num::NonZeroUsize;

use crate::bail;
use crate::error::{ErrorKind, FeedResult};

/// Static description of one feed, shared read-only by every indexing component.
///
/// Constructed once from validated configuration. The identity field named by
/// [`FeedIndexMetadata::feed_identity`] is present in every index request and feed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedIndexMetadata {
    feed_name: String,
    source_table_name: String,
    source_table_field: String,
    feed_table_name: String,
    feed_table_field: String,
    feed_table_mutable_columns: Vec<String>,
    feed_identity: String,
    scope_field: String,
    feed_table_scope_column: String,
    feed_table_data_column: String,
    feed_table_deleted_column: String,
    feed_table_modified_at_column: String,
    callback_skip_attributes: Vec<String>,
    batch_size: NonZeroUsize,
}

impl FeedIndexMetadata {
    /// Validates `feed` and `batch` and builds the metadata.
    ///
    /// Duplicate mutable columns are dropped keeping their first position.
    pub fn new(feed: FeedConfig, batch: &BatchConfig) -> FeedResult<Self> {
        feed.validate()?;
        batch.validate()?;

        let Some(batch_size) = NonZeroUsize::new(batch.size) else {
            bail!(ErrorKind::ConfigError, "Batch size must be positive");
        };

        let mut feed_table_mutable_columns: Vec<String> = Vec::new();
        for column in feed.feed_table_mutable_columns {
            if !feed_table_mutable_columns.contains(&column) {
                feed_table_mutable_columns.push(column);
            }
        }

        let callback_skip_attributes = if feed.callback_skip_attributes.is_empty() {
            vec![feed.feed_identity.clone(), feed.scope_field.clone()]
        } else {
            feed.callback_skip_attributes
        };

        Ok(Self {
            feed_name: feed.feed_name,
            source_table_name: feed.source_table_name,
            source_table_field: feed.source_table_field,
            feed_table_name: feed.feed_table_name,
            feed_table_field: feed.feed_table_field,
            feed_table_mutable_columns,
            feed_identity: feed.feed_identity,
            scope_field: feed.scope_field,
            feed_table_scope_column: feed.feed_table_scope_column,
            feed_table_data_column: feed.feed_table_data_column,
            feed_table_deleted_column: feed.feed_table_deleted_column,
            feed_table_modified_at_column: feed.feed_table_modified_at_column,
            callback_skip_attributes,
            batch_size,
        })
    }

    pub fn feed_name(&self) -> &str {
        &self.feed_name
    }

    pub fn source_table_name(&self) -> &str {
        &self.source_table_name
    }

    pub fn source_table_field(&self) -> &str {
        &self.source_table_field
    }

    pub fn feed_table_name(&self) -> &str {
        &self.feed_table_name
    }

    pub fn feed_table_field(&self) -> &str {
        &self.feed_table_field
    }

    /// Columns an upsert may overwrite when the row already exists.
    pub fn feed_table_mutable_columns(&self) -> &[String] {
        &self.feed_table_mutable_columns
    }

    pub fn feed_identity(&self) -> &str {
        &self.feed_identity
    }

    pub fn scope_field(&self) -> &str {
        &self.scope_field
    }

    pub fn feed_table_scope_column(&self) -> &str {
        &self.feed_table_scope_column
    }

    pub fn feed_table_data_column(&self) -> &str {
        &self.feed_table_data_column
    }

    pub fn feed_table_deleted_column(&self) -> &str {
        &self.feed_table_deleted_column
    }

    pub fn feed_table_modified_at_column(&self) -> &str {
        &self.feed_table_modified_at_column
    }

    /// Record fields never reported as changed attributes.
    pub fn callback_skip_attributes(&self) -> &[String] {
        &self.callback_skip_attributes
    }

    /// Cursor page size and upsert chunk size.
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Conflict target of feed upserts.
    pub fn feed_table_key_columns(&self) -> [&str; 2] {
        [
            self.feed_table_field.as_str(),
            self.feed_table_scope_column.as_str(),
        ]
    }
}

impl TryFrom<&IndexerConfig> for FeedIndexMetadata {
    type Error = crate::error::FeedError;

    fn try_from(config: &IndexerConfig) -> Result<Self, Self::Error> {
        FeedIndexMetadata::new(config.feed.clone(), &config.batch)
    }
}
