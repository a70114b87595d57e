//! Metric names and labels emitted while indexing.

/// Label carrying the feed name.
pub const FEED_NAME_LABEL: &str = "feed_name";

/// Label carrying the entry point (`full`, `list`, `partial`).
pub const MODE_LABEL: &str = "mode";

/// Counter of feed rows upserted.
pub const FEED_ROWS_WRITTEN_TOTAL: &str = "feed_rows_written_total";

/// Counter of feed rows flagged as deleted by the anti-join.
pub const FEED_ROWS_MARKED_REMOVED_TOTAL: &str = "feed_rows_marked_removed_total";

/// Counter of identities reported as deleted to the callback.
pub const FEED_IDENTITIES_DELETED_TOTAL: &str = "feed_identities_deleted_total";

/// Counter of records written through a partial attribute merge.
pub const FEED_RECORDS_MERGED_TOTAL: &str = "feed_records_merged_total";

/// Histogram of the seconds spent reconciling one batch of index requests.
pub const FEED_PROCESS_DURATION_SECONDS: &str = "feed_process_duration_seconds";

/// Histogram of the seconds spent by one entry point call.
pub const FEED_EXECUTE_DURATION_SECONDS: &str = "feed_execute_duration_seconds";
