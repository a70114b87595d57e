use config::shared::{BatchConfig, FeedConfig};

use crate::metadata::FeedIndexMetadata;

pub const FEED_NAME: &str = "products";
pub const SOURCE_TABLE: &str = "catalog_product_entity";
pub const SOURCE_FIELD: &str = "entity_id";
pub const FEED_TABLE: &str = "catalog_data_exporter_products";
pub const FEED_FIELD: &str = "id";
pub const FEED_IDENTITY: &str = "productId";

/// Configuration of the products feed with default column names.
pub fn test_feed_config() -> FeedConfig {
    FeedConfig {
        feed_name: FEED_NAME.to_string(),
        source_table_name: SOURCE_TABLE.to_string(),
        source_table_field: SOURCE_FIELD.to_string(),
        feed_table_name: FEED_TABLE.to_string(),
        feed_table_field: FEED_FIELD.to_string(),
        feed_table_mutable_columns: vec![
            FeedConfig::DEFAULT_DATA_COLUMN.to_string(),
            FeedConfig::DEFAULT_DELETED_COLUMN.to_string(),
        ],
        feed_identity: FEED_IDENTITY.to_string(),
        scope_field: FeedConfig::DEFAULT_SCOPE_FIELD.to_string(),
        feed_table_scope_column: FeedConfig::DEFAULT_SCOPE_COLUMN.to_string(),
        feed_table_data_column: FeedConfig::DEFAULT_DATA_COLUMN.to_string(),
        feed_table_deleted_column: FeedConfig::DEFAULT_DELETED_COLUMN.to_string(),
        feed_table_modified_at_column: FeedConfig::DEFAULT_MODIFIED_AT_COLUMN.to_string(),
        callback_skip_attributes: vec![],
    }
}

/// Metadata of the products feed with the given batch size.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
pub fn test_metadata(batch_size: usize) -> FeedIndexMetadata {
    FeedIndexMetadata::new(test_feed_config(), &BatchConfig { size: batch_size })
        .expect("test feed metadata must be valid")
}
