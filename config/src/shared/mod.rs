//! Shared configuration types for feed indexing.

mod batch;
mod connection;
mod feed;
mod indexer;
mod store;

pub use batch::BatchConfig;
pub use connection::{IntoConnectOptions, PgConnectionConfig, TlsConfig};
pub use feed::FeedConfig;
pub use indexer::{IndexerConfig, ValidationError};
pub use store::StoreConfig;
