//! Merging of partially recomputed records into their stored version.

use serde_json::{Map, Value};

use crate::types::FeedRecord;

/// Overlays `overlay` onto `target`.
///
/// Objects present on both sides are merged recursively. Any other value in `overlay`,
/// arrays included, replaces the value in `target`. Keys only present in `target` are kept.
pub fn deep_merge(target: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

/// Merges a freshly computed partial record into the stored record with the same key.
///
/// The stored record's identity and store view code are kept as is.
pub fn merge_record(existing: &FeedRecord, computed: FeedRecord) -> FeedRecord {
    let mut merged = existing.clone();
    deep_merge(&mut merged.fields, computed.fields);

    merged
}

/// Returns the attribute codes reported for a merged record: the computed record's field names
/// minus `skip`.
pub fn changed_attributes(computed: &FeedRecord, skip: &[String]) -> Vec<String> {
    computed
        .fields
        .keys()
        .filter(|name| !skip.contains(name))
        .cloned()
        .collect()
}
