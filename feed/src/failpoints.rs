use fail::fail_point;

use crate::bail;
use crate::error::{ErrorKind, FeedResult};

/// Fires after each upserted chunk, before the next chunk is merged.
pub const RECONCILER_AFTER_CHUNK_WRITE: &str = "feed.reconciler.after_chunk_write";

/// Fires right before the callback is dispatched.
pub const RECONCILER_BEFORE_CALLBACK: &str = "feed.reconciler.before_callback";

/// Evaluates the failpoint `name`, returning an error when it is configured to `return`.
pub fn feed_fail_point(name: &str) -> FeedResult<()> {
    fail_point!(name, |_| {
        bail!(
            ErrorKind::WithNoRetry,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
