use serde::Deserialize;

use crate::shared::{PgConnectionConfig, ValidationError};

/// Selects the relational store the feed indexer reads from and writes to.
///
/// This intentionally does not implement `Serialize` since the Postgres variant carries a
/// password.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process tables, lost on restart.
    Memory,
    /// A Postgres database holding both the source and the feed table.
    Postgres(PgConnectionConfig),
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            StoreConfig::Memory => Ok(()),
            StoreConfig::Postgres(connection) => connection.tls.validate(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Memory
    }
}
