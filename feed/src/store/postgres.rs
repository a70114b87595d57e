use config::shared::{IntoConnectOptions, PgConnectionConfig};
use pg_escape::quote_identifier;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::query_builder::Separated;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ErrorKind, FeedResult};
use crate::metadata::FeedIndexMetadata;
use crate::store::FeedStore;
use crate::types::{Identity, TableRow};
use crate::{bail, feed_error};

/// Maximum number of connections in the pool.
///
/// Indexing calls await every statement in sequence, so a second connection only serves
/// concurrent indexing calls sharing the store.
const MAX_POOL_CONNECTIONS: u32 = 4;

/// Duration after which idle connections are closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a lazily connected pool with automatic idle connection cleanup.
///
/// No connection is opened until the first statement runs, so building a store never fails
/// because the database is unreachable.
fn create_database_pool(config: &PgConnectionConfig) -> PgPool {
    let options = config.with_db();

    PgPoolOptions::new()
        .min_connections(0)
        .max_connections(MAX_POOL_CONNECTIONS)
        .idle_timeout(Some(IDLE_TIMEOUT))
        .connect_lazy_with(options)
}

/// Binds a row value with the Postgres type matching its JSON shape.
///
/// Objects and arrays are bound as `jsonb`.
fn push_column_value(
    separated: &mut Separated<'_, '_, Postgres, &'static str>,
    value: Option<&Value>,
) {
    match value {
        None | Some(Value::Null) => {
            separated.push_bind(Option::<String>::None);
        }
        Some(Value::Bool(flag)) => {
            separated.push_bind(*flag);
        }
        Some(Value::Number(number)) => match number.as_i64() {
            Some(integer) => {
                separated.push_bind(integer);
            }
            None => {
                separated.push_bind(number.as_f64());
            }
        },
        Some(Value::String(text)) => {
            separated.push_bind(text.clone());
        }
        Some(document @ (Value::Array(_) | Value::Object(_))) => {
            separated.push_bind(Json(document.clone()));
        }
    }
}

fn to_keys(ids: &[Identity]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

/// Postgres-backed storage for source and feed tables.
///
/// [`PostgresStore`] runs every [`FeedStore`] operation as a single statement on a lazily
/// connected pool. Table and column names come from [`FeedIndexMetadata`] and are quoted with
/// [`quote_identifier`]; values are always bound.
///
/// The feed table is expected to have a `bigint` identity column, a `text` scope column, a
/// `jsonb` data column, a `boolean` deleted column and a `timestamptz` modified-at column, with
/// a unique constraint on the identity and scope columns. A null deleted column reads as live.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store connecting lazily with `config`.
    pub fn new(config: &PgConnectionConfig) -> Self {
        Self {
            pool: create_database_pool(config),
        }
    }

    /// Creates a store on top of an existing pool.
    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl FeedStore for PostgresStore {
    async fn fetch_source_identities(
        &self,
        metadata: &FeedIndexMetadata,
        after: Identity,
        limit: usize,
    ) -> FeedResult<Vec<Identity>> {
        let column = quote_identifier(metadata.source_table_field());
        let query = format!(
            "select {column} from {} where {column} > $1 order by {column} limit $2",
            quote_identifier(metadata.source_table_name()),
        );

        let keys: Vec<i64> = sqlx::query_scalar(&query)
            .bind(after.0)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                feed_error!(
                    ErrorKind::SourceQueryFailed,
                    "Source identity query failed",
                    format!(
                        "Reading '{}' after {after} failed",
                        metadata.source_table_name()
                    ),
                    source: err
                )
            })?;

        debug!(count = keys.len(), %after, "fetched source identities");

        Ok(keys.into_iter().map(Identity).collect())
    }

    async fn truncate_feed(&self, metadata: &FeedIndexMetadata) -> FeedResult<()> {
        info!("truncating feed table {}", metadata.feed_table_name());

        let query = format!(
            "truncate table {}",
            quote_identifier(metadata.feed_table_name())
        );
        sqlx::query(&query).execute(&self.pool).await?;

        Ok(())
    }

    async fn mark_removed(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<u64> {
        let feed_field = quote_identifier(metadata.feed_table_field());
        let deleted = quote_identifier(metadata.feed_table_deleted_column());
        let query = format!(
            r#"
            update {feed_table} as f
            set {deleted} = true, {modified_at} = now()
            where f.{feed_field} = any($1)
                and f.{deleted} is not true
                and not exists (
                    select 1 from {source_table} as s where s.{source_field} = f.{feed_field}
                )
            "#,
            feed_table = quote_identifier(metadata.feed_table_name()),
            modified_at = quote_identifier(metadata.feed_table_modified_at_column()),
            source_table = quote_identifier(metadata.source_table_name()),
            source_field = quote_identifier(metadata.source_table_field()),
        );

        let result = sqlx::query(&query)
            .bind(to_keys(ids))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn upsert_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        rows: Vec<TableRow>,
    ) -> FeedResult<u64> {
        let Some(first) = rows.first() else {
            return Ok(0);
        };

        let modified_at = metadata.feed_table_modified_at_column();
        let columns: Vec<String> = first
            .column_names()
            .filter(|column| column.as_str() != modified_at)
            .cloned()
            .collect();

        for row in &rows {
            let row_columns = row.column_names().filter(|column| column.as_str() != modified_at);
            if !row_columns.eq(columns.iter()) {
                bail!(
                    ErrorKind::InvalidData,
                    "Feed rows have different columns",
                    format!("Every row of a chunk must have the columns {columns:?}")
                );
            }
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("insert into ");
        builder.push(quote_identifier(metadata.feed_table_name()));
        builder.push(" as f (");
        for column in &columns {
            builder.push(quote_identifier(column));
            builder.push(", ");
        }
        builder.push(quote_identifier(modified_at));
        builder.push(") ");

        builder.push_values(&rows, |mut separated, row| {
            for column in &columns {
                push_column_value(&mut separated, row.get(column));
            }
            separated.push("now()");
        });

        let [key_column, scope_column] = metadata.feed_table_key_columns();
        builder.push(" on conflict (");
        builder.push(quote_identifier(key_column));
        builder.push(", ");
        builder.push(quote_identifier(scope_column));
        builder.push(") ");

        let updated: Vec<_> = metadata
            .feed_table_mutable_columns()
            .iter()
            .filter(|column| column.as_str() != modified_at && columns.contains(column))
            .map(|column| quote_identifier(column))
            .collect();
        if updated.is_empty() {
            builder.push("do nothing");
        } else {
            builder.push("do update set ");
            for column in &updated {
                builder.push(format!("{column} = excluded.{column}, "));
            }
            builder.push(format!("{} = now()", quote_identifier(modified_at)));

            // Rows already holding the incoming values are skipped, modified-at included.
            let stored = updated
                .iter()
                .map(|column| format!("f.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            let incoming = updated
                .iter()
                .map(|column| format!("excluded.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            builder.push(format!(
                " where row({stored}) is distinct from row({incoming})"
            ));
        }

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    async fn select_feed_rows(
        &self,
        metadata: &FeedIndexMetadata,
        ids: &[Identity],
    ) -> FeedResult<Vec<TableRow>> {
        let feed_field = quote_identifier(metadata.feed_table_field());
        let scope = quote_identifier(metadata.feed_table_scope_column());
        let deleted = quote_identifier(metadata.feed_table_deleted_column());
        let query = format!(
            r#"
            select {feed_field}, {scope}, {data}, {deleted}
            from {feed_table}
            where {feed_field} = any($1) and {deleted} is not true
            order by {feed_field}, {scope}
            "#,
            data = quote_identifier(metadata.feed_table_data_column()),
            feed_table = quote_identifier(metadata.feed_table_name()),
        );

        let pg_rows = sqlx::query(&query)
            .bind(to_keys(ids))
            .fetch_all(&self.pool)
            .await?;

        let mut rows = Vec::with_capacity(pg_rows.len());
        for pg_row in pg_rows {
            let identity: i64 = pg_row.try_get(0)?;
            let store_view_code: String = pg_row.try_get(1)?;
            let Json(data): Json<Value> = pg_row.try_get(2)?;
            let is_deleted: Option<bool> = pg_row.try_get(3)?;

            rows.push(
                TableRow::new()
                    .with(metadata.feed_table_field(), identity)
                    .with(metadata.feed_table_scope_column(), store_view_code)
                    .with(metadata.feed_table_data_column(), data)
                    .with(
                        metadata.feed_table_deleted_column(),
                        is_deleted.unwrap_or(false),
                    ),
            );
        }

        Ok(rows)
    }
}
