use feed::callback::memory::MemoryCallback;
use feed::indexer::FeedIndexer;
use feed::producer::memory::MemoryProducer;
use feed::serializer::{FeedSerializer, JsonFeedSerializer};
use feed::store::FeedStore;
use feed::store::postgres::PostgresStore;
use feed::test_utils::database::spawn_database;
use feed::test_utils::metadata::{FEED_TABLE, test_metadata};
use feed::types::{FeedRecord, Identity, TableRow};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_test_tracing;

fn feed_row(id: i64, store: &str, data: &str) -> TableRow {
    TableRow::new()
        .with("id", id)
        .with("store_view_code", store)
        .with("feed_data", json!({"v": data}))
        .with("is_deleted", false)
        .with("origin", data)
}

#[ignore = "needs a Postgres server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn source_identities_are_paged_in_ascending_order() {
    init_test_tracing();
    let database = spawn_database().await;
    database.insert_source_ids(&[5, 1, 3, 9]).await;
    let store = PostgresStore::with_pool(database.pool.clone());
    let metadata = test_metadata(2);

    let first = store
        .fetch_source_identities(&metadata, Identity(0), 2)
        .await
        .unwrap();
    let second = store
        .fetch_source_identities(&metadata, Identity(3), 2)
        .await
        .unwrap();
    let end = store
        .fetch_source_identities(&metadata, Identity(9), 2)
        .await
        .unwrap();

    assert_eq!(first, vec![Identity(1), Identity(3)]);
    assert_eq!(second, vec![Identity(5), Identity(9)]);
    assert!(end.is_empty());

    database.drop_database().await;
}

#[ignore = "needs a Postgres server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn upsert_only_overwrites_mutable_columns() {
    init_test_tracing();
    let database = spawn_database().await;
    let store = PostgresStore::with_pool(database.pool.clone());
    let metadata = test_metadata(2);

    store
        .upsert_feed_rows(&metadata, vec![feed_row(1, "default", "first")])
        .await
        .unwrap();
    store
        .upsert_feed_rows(&metadata, vec![feed_row(1, "default", "second")])
        .await
        .unwrap();

    let rows = database.feed_rows().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("feed_data"), Some(&json!({"v": "second"})));
    assert_eq!(rows[0].text("origin"), Some("first"));
    assert!(rows[0].text("modified_at").is_some());

    database.drop_database().await;
}

#[ignore = "needs a Postgres server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn unchanged_rows_keep_their_modified_at() {
    init_test_tracing();
    let database = spawn_database().await;
    let store = PostgresStore::with_pool(database.pool.clone());
    let metadata = test_metadata(2);

    let first = store
        .upsert_feed_rows(&metadata, vec![feed_row(1, "default", "same")])
        .await
        .unwrap();
    let before = database.feed_rows().await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = store
        .upsert_feed_rows(&metadata, vec![feed_row(1, "default", "same")])
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 0);
    assert_eq!(database.feed_rows().await, before);

    database.drop_database().await;
}

#[ignore = "needs a Postgres server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn orphaned_rows_are_flagged_once_and_hidden() {
    init_test_tracing();
    let database = spawn_database().await;
    database.insert_source_ids(&[1]).await;
    let store = PostgresStore::with_pool(database.pool.clone());
    let metadata = test_metadata(2);
    store
        .upsert_feed_rows(
            &metadata,
            vec![
                feed_row(1, "default", "a"),
                feed_row(2, "default", "b"),
                feed_row(3, "default", "d"),
            ],
        )
        .await
        .unwrap();
    // A row stored before the deleted column was filled in.
    sqlx::query(&format!(
        "insert into {FEED_TABLE} (id, store_view_code, feed_data) values (2, 'fr', '{{}}')"
    ))
    .execute(&database.pool)
    .await
    .unwrap();

    let ids = [Identity(1), Identity(2)];
    assert_eq!(store.mark_removed(&metadata, &ids).await.unwrap(), 2);
    assert_eq!(store.mark_removed(&metadata, &ids).await.unwrap(), 0);

    let live = store
        .select_feed_rows(&metadata, &[Identity(1), Identity(2), Identity(3)])
        .await
        .unwrap();
    let live_ids: Vec<_> = live.iter().filter_map(|row| row.identity("id")).collect();
    assert_eq!(live_ids, vec![Identity(1), Identity(3)]);

    database.drop_database().await;
}

#[ignore = "needs a Postgres server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn selected_rows_decode_into_the_written_records() {
    init_test_tracing();
    let database = spawn_database().await;
    let store = PostgresStore::with_pool(database.pool.clone());
    let metadata = test_metadata(2);
    let records = vec![
        FeedRecord::new(Identity(4), "default")
            .with_field("sku", "SKU-4")
            .with_field("prices", json!({"regular": 10.5, "tiers": [1, 2]})),
        FeedRecord::new(Identity(4), "fr").with_field("sku", "SKU-4"),
    ];

    let rows = JsonFeedSerializer.encode(&metadata, &records).unwrap();
    store.upsert_feed_rows(&metadata, rows).await.unwrap();
    let selected = store
        .select_feed_rows(&metadata, &[Identity(4)])
        .await
        .unwrap();

    assert_eq!(JsonFeedSerializer.decode(&metadata, selected).unwrap(), records);

    database.drop_database().await;
}

#[ignore = "needs a Postgres server configured through TESTS_DATABASE_*"]
#[tokio::test(flavor = "multi_thread")]
async fn indexer_keeps_a_postgres_feed_in_sync() {
    init_test_tracing();
    let database = spawn_database().await;
    database.insert_source_ids(&[1, 2, 3]).await;
    let producer = MemoryProducer::new();
    for id in 1..=3 {
        producer
            .upsert_record(
                FeedRecord::new(Identity(id), "default").with_field("sku", format!("SKU-{id}")),
            )
            .await;
    }
    let indexer = FeedIndexer::new(
        Arc::new(test_metadata(2)),
        PostgresStore::with_pool(database.pool.clone()),
        producer.clone(),
        MemoryCallback::new(),
    );

    let summary = indexer.execute_full().await.unwrap();
    assert_eq!(summary.written, 3);
    assert_eq!(summary.batches, 2);

    database.delete_source_ids(&[2]).await;
    producer.remove_identity(Identity(2)).await;
    let before = database.feed_rows().await;
    let summary = indexer
        .execute_list(&[Identity(1), Identity(2)])
        .await
        .unwrap();

    assert_eq!(summary.marked_removed, 1);
    assert_eq!(summary.deleted, 1);
    let after = database.feed_rows().await;
    assert_eq!(after[1].get("is_deleted"), Some(&Value::Bool(true)));
    // The untouched product keeps its row as is.
    assert_eq!(after[0], before[0]);

    database.drop_database().await;
}
