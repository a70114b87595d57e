use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Describes one feed: where its identities come from and where its rows are stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FeedConfig {
    /// Logical feed name, passed to the record producer and the feed reader.
    pub feed_name: String,
    /// Normalized table enumerated by the full scan.
    pub source_table_name: String,
    /// Monotonically increasing integer key column of the source table.
    pub source_table_field: String,
    /// Denormalized table materialized by the indexer.
    pub feed_table_name: String,
    /// Column of the feed table holding the identity.
    pub feed_table_field: String,
    /// Columns that an upsert is allowed to overwrite on conflict.
    pub feed_table_mutable_columns: Vec<String>,
    /// Field name carrying the identity inside index requests and feed records.
    pub feed_identity: String,
    /// Field name carrying the scope discriminator inside feed records.
    #[serde(default = "default_scope_field")]
    pub scope_field: String,
    #[serde(default = "default_feed_table_scope_column")]
    pub feed_table_scope_column: String,
    #[serde(default = "default_feed_table_data_column")]
    pub feed_table_data_column: String,
    #[serde(default = "default_feed_table_deleted_column")]
    pub feed_table_deleted_column: String,
    #[serde(default = "default_feed_table_modified_at_column")]
    pub feed_table_modified_at_column: String,
    /// Record fields never reported as changed attributes to the callback.
    ///
    /// When empty, the identity and scope field names are used.
    #[serde(default)]
    pub callback_skip_attributes: Vec<String>,
}

impl FeedConfig {
    pub const DEFAULT_SCOPE_FIELD: &'static str = "storeViewCode";
    pub const DEFAULT_SCOPE_COLUMN: &'static str = "store_view_code";
    pub const DEFAULT_DATA_COLUMN: &'static str = "feed_data";
    pub const DEFAULT_DELETED_COLUMN: &'static str = "is_deleted";
    pub const DEFAULT_MODIFIED_AT_COLUMN: &'static str = "modified_at";

    /// Checks that every name is set and that no key column is declared mutable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let names = [
            ("feed.feed_name", &self.feed_name),
            ("feed.source_table_name", &self.source_table_name),
            ("feed.source_table_field", &self.source_table_field),
            ("feed.feed_table_name", &self.feed_table_name),
            ("feed.feed_table_field", &self.feed_table_field),
            ("feed.feed_identity", &self.feed_identity),
            ("feed.scope_field", &self.scope_field),
            ("feed.feed_table_scope_column", &self.feed_table_scope_column),
            ("feed.feed_table_data_column", &self.feed_table_data_column),
            ("feed.feed_table_deleted_column", &self.feed_table_deleted_column),
            (
                "feed.feed_table_modified_at_column",
                &self.feed_table_modified_at_column,
            ),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidFieldValue {
                    field: field.to_string(),
                    constraint: "must not be empty".to_string(),
                });
            }
        }

        if self.feed_table_mutable_columns.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "feed.feed_table_mutable_columns".to_string(),
                constraint: "must list at least one column".to_string(),
            });
        }

        for column in &self.feed_table_mutable_columns {
            if *column == self.feed_table_field || *column == self.feed_table_scope_column {
                return Err(ValidationError::InvalidFieldValue {
                    field: "feed.feed_table_mutable_columns".to_string(),
                    constraint: format!("key column `{column}` cannot be mutable"),
                });
            }
        }

        Ok(())
    }
}

fn default_scope_field() -> String {
    FeedConfig::DEFAULT_SCOPE_FIELD.to_string()
}

fn default_feed_table_scope_column() -> String {
    FeedConfig::DEFAULT_SCOPE_COLUMN.to_string()
}

fn default_feed_table_data_column() -> String {
    FeedConfig::DEFAULT_DATA_COLUMN.to_string()
}

fn default_feed_table_deleted_column() -> String {
    FeedConfig::DEFAULT_DELETED_COLUMN.to_string()
}

fn default_feed_table_modified_at_column() -> String {
    FeedConfig::DEFAULT_MODIFIED_AT_COLUMN.to_string()
}
