mod base;
pub mod logging;
pub mod memory;

pub use base::FeedCallback;
