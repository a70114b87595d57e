use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Batch sizing for cursor pages and write chunks.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Number of source identities per cursor page and number of records per upsert chunk.
    #[serde(default = "default_batch_size")]
    pub size: usize,
}

impl BatchConfig {
    /// Default batch size used when none is configured.
    pub const DEFAULT_SIZE: usize = 5000;

    /// Ensures the batch size is non-zero.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.size == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "batch.size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
        }
    }
}

fn default_batch_size() -> usize {
    BatchConfig::DEFAULT_SIZE
}
