use serde_json::Value;

use crate::bail;
use crate::error::{ErrorKind, FeedResult};
use crate::metadata::FeedIndexMetadata;
use crate::types::{FeedRecord, TableRow};

/// Converts feed records to feed table rows and back.
pub trait FeedSerializer {
    /// Encodes `records` into rows ready to be upserted, one row per record, in order.
    fn encode(
        &self,
        metadata: &FeedIndexMetadata,
        records: &[FeedRecord],
    ) -> FeedResult<Vec<TableRow>>;

    /// Decodes stored rows back into records.
    fn decode(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> FeedResult<Vec<FeedRecord>>;
}

/// Stores each record as a JSON document in the data column.
///
/// The document holds every field plus the identity and scope fields, so consumers reading the
/// data column alone see the full record. Encoded rows are always live: the deleted column is
/// written as `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFeedSerializer;

impl FeedSerializer for JsonFeedSerializer {
    fn encode(
        &self,
        metadata: &FeedIndexMetadata,
        records: &[FeedRecord],
    ) -> FeedResult<Vec<TableRow>> {
        let rows = records
            .iter()
            .map(|record| {
                TableRow::new()
                    .with(metadata.feed_table_field(), record.identity.0)
                    .with(
                        metadata.feed_table_scope_column(),
                        record.store_view_code.as_str(),
                    )
                    .with(
                        metadata.feed_table_data_column(),
                        record.to_document(metadata.feed_identity(), metadata.scope_field()),
                    )
                    .with(metadata.feed_table_deleted_column(), false)
            })
            .collect();

        Ok(rows)
    }

    fn decode(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> FeedResult<Vec<FeedRecord>> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let document = match row.get(metadata.feed_table_data_column()) {
                Some(Value::Object(fields)) => Value::Object(fields.clone()),
                // Text columns hold the document serialized.
                Some(Value::String(text)) => serde_json::from_str(text)?,
                _ => bail!(
                    ErrorKind::DeserializationError,
                    "Feed row has no document",
                    format!(
                        "Column '{}' of table '{}' is missing or not a JSON object",
                        metadata.feed_table_data_column(),
                        metadata.feed_table_name()
                    )
                ),
            };

            records.push(FeedRecord::from_document(
                document,
                metadata.feed_identity(),
                metadata.scope_field(),
            )?);
        }

        Ok(records)
    }
}
