mod base;
pub mod configured;
pub mod memory;
pub mod postgres;

pub use base::FeedStore;
