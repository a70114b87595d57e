//! Configuration types and loading for the feed indexer.
//!
//! [`shared`] holds the serde-deserializable configuration structures, [`load_config`] merges
//! configuration files and `APP_`-prefixed environment variables into them.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
