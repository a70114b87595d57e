use serde::Deserialize;
use thiserror::Error;

use crate::Config;
use crate::shared::{BatchConfig, FeedConfig, StoreConfig};

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field holds a value outside of its allowed range.
    #[error("Invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
    /// TLS is enabled but no trusted root certificates are provided.
    #[error("Invalid TLS config: `trusted_root_certs` must be set when `enabled` is true")]
    MissingTrustedRootCerts,
}

/// Complete configuration of a feed indexer process.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    pub feed: FeedConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.feed.validate()?;
        self.batch.validate()?;
        self.store.validate()
    }
}

impl Config for IndexerConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] = &[
        "feed.feed_table_mutable_columns",
        "feed.callback_skip_attributes",
    ];
}
