//! Core data types shared by every indexing component.

mod identity;
mod record;
mod request;
mod row;

pub use identity::{Identity, ScopeId};
pub use record::{CallbackEntry, FeedKey, FeedRecord};
pub use request::{ChangeRecord, IndexRequest, IndexTarget};
pub use row::TableRow;
