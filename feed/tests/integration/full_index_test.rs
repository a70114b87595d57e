use feed::test_utils::feed::TestFeed;
use feed::test_utils::metadata::SOURCE_TABLE;
use feed::test_utils::table::{feed_document, feed_snapshot, source_rows};
use feed::types::Identity;
use serde_json::json;
use std::collections::BTreeSet;
use telemetry::init_test_tracing;

async fn catalogue(feed: &TestFeed) {
    feed.add_product(1, &["default", "fr"], json!({"sku": "SKU-1", "name": "Chair"}))
        .await;
    feed.add_product(2, &["default"], json!({"sku": "SKU-2", "name": "Table"}))
        .await;
    feed.add_product(3, &["default", "fr"], json!({"sku": "SKU-3", "name": "Lamp"}))
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn full_rebuild_writes_every_source_row() {
    init_test_tracing();
    let feed = TestFeed::new(2);
    catalogue(&feed).await;

    let summary = feed.indexer().execute_full().await.unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(summary.requested, 3);
    assert_eq!(summary.written, 5);
    assert_eq!(summary.merged, 0);
    assert_eq!(summary.deleted, 0);
    assert_eq!(
        feed_document(&feed.store, &feed.metadata, "fr", Identity(1)).await,
        Some(json!({
            "productId": 1,
            "storeViewCode": "fr",
            "sku": "SKU-1",
            "name": "Chair"
        }))
    );

    // One notification per cursor batch.
    let notifications = feed.callback.notifications().await;
    assert_eq!(notifications.len(), 2);
    assert!(
        notifications
            .iter()
            .flat_map(|notification| &notification.entries)
            .all(|entry| entry.attributes.is_empty())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn full_rebuild_is_deterministic() {
    init_test_tracing();
    let feed = TestFeed::new(2);
    catalogue(&feed).await;
    let indexer = feed.indexer();

    let first = indexer.execute_full().await.unwrap();
    let first_snapshot = feed_snapshot(&feed.store, &feed.metadata).await;
    let second = indexer.execute_full().await.unwrap();
    let second_snapshot = feed_snapshot(&feed.store, &feed.metadata).await;

    assert_eq!(first, second);
    assert_eq!(first_snapshot, second_snapshot);
    assert_eq!(first_snapshot.len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn cursor_reaches_every_identity_for_any_batch_size() {
    init_test_tracing();
    let ids = [3, 7, 8, 15, 42];

    for batch_size in 1..=6 {
        let feed = TestFeed::new(batch_size);
        for id in ids {
            feed.add_product(id, &["default"], json!({"sku": format!("SKU-{id}")}))
                .await;
        }

        let summary = feed.indexer().execute_full().await.unwrap();

        assert_eq!(summary.batches, ids.len().div_ceil(batch_size));
        let requested: Vec<Identity> = feed
            .producer
            .requests()
            .await
            .into_iter()
            .flatten()
            .map(|request| request.identity())
            .collect();
        assert_eq!(requested, ids.map(Identity).to_vec());

        let indexed: BTreeSet<Identity> = feed_snapshot(&feed.store, &feed.metadata)
            .await
            .into_keys()
            .map(|key| key.identity)
            .collect();
        assert_eq!(indexed, ids.map(Identity).into_iter().collect());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn full_rebuild_drops_rows_of_removed_products() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    catalogue(&feed).await;
    let indexer = feed.indexer();
    indexer.execute_full().await.unwrap();

    feed.remove_product(3).await;
    let summary = indexer.execute_full().await.unwrap();

    assert_eq!(summary.written, 3);
    let snapshot = feed_snapshot(&feed.store, &feed.metadata).await;
    assert!(snapshot.keys().all(|key| key.identity != Identity(3)));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_source_still_truncates_the_feed() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    feed.add_product(1, &["default"], json!({"sku": "SKU-1"})).await;
    let indexer = feed.indexer();
    indexer.execute_full().await.unwrap();

    feed.remove_product(1).await;
    let summary = indexer.execute_full().await.unwrap();

    assert_eq!(summary.batches, 0);
    assert!(feed_snapshot(&feed.store, &feed.metadata).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn source_rows_without_records_are_reported_deleted() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    feed.add_product(1, &["default"], json!({"sku": "SKU-1"})).await;
    feed.store.insert_rows(SOURCE_TABLE, source_rows([2])).await;

    let summary = feed.indexer().execute_full().await.unwrap();

    assert_eq!(summary.written, 1);
    assert_eq!(summary.deleted, 1);
    let notification = feed.callback.last().await.unwrap();
    assert_eq!(notification.deleted_ids, vec![Identity(2)]);
}
