use std::future::Future;

use crate::error::FeedResult;
use crate::types::{CallbackEntry, Identity};

/// Downstream consumer told about every processed batch.
///
/// [`FeedCallback::notify`] is invoked exactly once per reconciled batch, after every chunk has
/// been written. `entries` lists the written records in write order and `deleted_ids` the
/// requested identities for which nothing was written. Either list may be empty.
pub trait FeedCallback {
    fn notify(
        &self,
        entries: Vec<CallbackEntry>,
        deleted_ids: Vec<Identity>,
    ) -> impl Future<Output = FeedResult<()>> + Send;
}
