use config::shared::{IntoConnectOptions, PgConnectionConfig, TlsConfig};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use crate::test_utils::metadata::{FEED_TABLE, SOURCE_TABLE};
use crate::types::TableRow;

type FeedRowColumns = (
    i64,
    String,
    serde_json::Value,
    Option<bool>,
    Option<String>,
    Option<String>,
);

/// Generates the connection configuration of a fresh, uniquely named test database.
///
/// Configuration is read from environment variables:
/// - `TESTS_DATABASE_HOST`: Postgres server hostname (required)
/// - `TESTS_DATABASE_PORT`: Postgres server port (required)
/// - `TESTS_DATABASE_USERNAME`: Database user (required)
/// - `TESTS_DATABASE_PASSWORD`: Database password (optional)
fn local_pg_connection_config() -> PgConnectionConfig {
    PgConnectionConfig {
        host: std::env::var("TESTS_DATABASE_HOST").expect("TESTS_DATABASE_HOST must be set"),
        port: std::env::var("TESTS_DATABASE_PORT")
            .expect("TESTS_DATABASE_PORT must be set")
            .parse()
            .expect("TESTS_DATABASE_PORT must be a valid port number"),
        name: Uuid::new_v4().to_string(),
        username: std::env::var("TESTS_DATABASE_USERNAME")
            .expect("TESTS_DATABASE_USERNAME must be set"),
        password: std::env::var("TESTS_DATABASE_PASSWORD")
            .ok()
            .map(Into::into),
        tls: TlsConfig {
            trusted_root_certs: String::new(),
            enabled: false,
        },
    }
}

/// A database created for one test, holding the products source and feed tables.
#[derive(Debug)]
pub struct TestDatabase {
    pub config: PgConnectionConfig,
    pub pool: PgPool,
}

/// Creates a uniquely named database with the products source and feed tables.
///
/// The deleted column of the feed table is nullable so tests can store rows predating it.
///
/// # Panics
///
/// Panics if the server is unreachable or the database cannot be created.
pub async fn spawn_database() -> TestDatabase {
    let config = local_pg_connection_config();

    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"create database "{}";"#, config.name))
        .await
        .expect("Failed to create database");

    let pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to the test database");
    pool.execute(&*format!(
        r#"
        create table {SOURCE_TABLE} (entity_id bigint primary key);
        create table {FEED_TABLE} (
            id bigint not null,
            store_view_code text not null,
            feed_data jsonb not null,
            is_deleted boolean,
            modified_at timestamptz,
            origin text,
            primary key (id, store_view_code)
        );
        "#
    ))
    .await
    .expect("Failed to create the feed tables");

    TestDatabase { config, pool }
}

impl TestDatabase {
    /// Inserts one source row per identity.
    pub async fn insert_source_ids(&self, ids: &[i64]) {
        sqlx::query(&format!(
            "insert into {SOURCE_TABLE} (entity_id) select * from unnest($1::bigint[])"
        ))
        .bind(ids)
        .execute(&self.pool)
        .await
        .expect("Failed to insert source rows");
    }

    pub async fn delete_source_ids(&self, ids: &[i64]) {
        sqlx::query(&format!(
            "delete from {SOURCE_TABLE} where entity_id = any($1)"
        ))
        .bind(ids)
        .execute(&self.pool)
        .await
        .expect("Failed to delete source rows");
    }

    /// Returns every feed row ordered by key, with the modified-at column rendered as text.
    pub async fn feed_rows(&self) -> Vec<TableRow> {
        let rows: Vec<FeedRowColumns> = sqlx::query_as(&format!(
            r#"
            select id, store_view_code, feed_data, is_deleted, modified_at::text, origin
            from {FEED_TABLE}
            order by id, store_view_code
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .expect("Failed to read feed rows");

        rows.into_iter()
            .map(|(id, store_view_code, data, deleted, modified_at, origin)| {
                TableRow::new()
                    .with("id", id)
                    .with("store_view_code", store_view_code)
                    .with("feed_data", data)
                    .with("is_deleted", deleted)
                    .with("modified_at", modified_at)
                    .with("origin", origin)
            })
            .collect()
    }

    /// Closes the pool, then terminates remaining connections and drops the database.
    ///
    /// Cleanup failures are only reported, they never fail the test.
    pub async fn drop_database(self) {
        self.pool.close().await;

        let mut connection = match PgConnection::connect_with(&self.config.without_db()).await {
            Ok(connection) => connection,
            Err(err) => {
                eprintln!("warning: failed to connect to Postgres for cleanup: {err}");
                return;
            }
        };

        if let Err(err) = connection
            .execute(&*format!(
                r#"
                select pg_terminate_backend(pg_stat_activity.pid)
                from pg_stat_activity
                where pg_stat_activity.datname = '{}'
                and pid <> pg_backend_pid();"#,
                self.config.name
            ))
            .await
        {
            eprintln!(
                "warning: failed to terminate connections for database {}: {err}",
                self.config.name
            );
        }

        if let Err(err) = connection
            .execute(&*format!(
                r#"drop database if exists "{}";"#,
                self.config.name
            ))
            .await
        {
            eprintln!("warning: failed to drop database {}: {err}", self.config.name);
        }
    }
}
