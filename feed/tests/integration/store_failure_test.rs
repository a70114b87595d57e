use feed::error::ErrorKind;
use feed::store::configured::ConfiguredStore;
use feed::test_utils::feed::TestFeed;
use feed::test_utils::store::{FaultConfig, FaultInjectingStore, FaultType, StoreOperation};
use feed::test_utils::table::feed_snapshot;
use feed::types::Identity;
use serde_json::json;
use telemetry::init_test_tracing;

async fn products(feed: &TestFeed, count: i64) {
    for id in 1..=count {
        feed.add_product(id, &["default"], json!({"sku": format!("SKU-{id}")}))
            .await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_chunk_keeps_earlier_chunks_and_skips_the_callback() {
    init_test_tracing();
    let feed = TestFeed::new(1);
    products(&feed, 3).await;

    let fault_config = FaultConfig {
        upsert_feed_rows: Some(FaultType::ErrorAfter(1)),
        ..Default::default()
    };
    let store = FaultInjectingStore::wrap(feed.store.clone(), fault_config);

    let err = feed
        .indexer_with_store(store)
        .execute_list(&[Identity(1), Identity(2), Identity(3)])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FeedQueryFailed);
    let indexed: Vec<Identity> = feed_snapshot(&feed.store, &feed.metadata)
        .await
        .into_keys()
        .map(|key| key.identity)
        .collect();
    assert_eq!(indexed, vec![Identity(1)]);
    assert!(feed.callback.notifications().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_anti_join_stops_before_producing() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    products(&feed, 2).await;

    let fault_config = FaultConfig {
        mark_removed: Some(FaultType::Error),
        ..Default::default()
    };
    let store = FaultInjectingStore::wrap(feed.store.clone(), fault_config);

    let err = feed
        .indexer_with_store(store.clone())
        .execute_row(Identity(1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FeedQueryFailed);
    assert_eq!(store.calls().await, vec![StoreOperation::MarkRemoved]);
    assert!(feed.producer.requests().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_scan_ends_the_full_rebuild() {
    init_test_tracing();
    let feed = TestFeed::new(2);
    products(&feed, 5).await;

    let fault_config = FaultConfig {
        fetch_source_identities: Some(FaultType::ErrorAfter(1)),
        ..Default::default()
    };
    let store = FaultInjectingStore::wrap(feed.store.clone(), fault_config);

    let err = feed
        .indexer_with_store(store)
        .execute_full()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::FeedQueryFailed);
    // The first cursor batch was reconciled before the scan failed.
    assert_eq!(feed_snapshot(&feed.store, &feed.metadata).await.len(), 2);
    assert_eq!(feed.callback.notifications().await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn configured_memory_store_indexes_like_the_wrapped_store() {
    init_test_tracing();
    let feed = TestFeed::new(2);
    products(&feed, 3).await;

    let summary = feed
        .indexer_with_store(ConfiguredStore::Memory(feed.store.clone()))
        .execute_full()
        .await
        .unwrap();

    assert_eq!(summary.written, 3);
    assert_eq!(feed_snapshot(&feed.store, &feed.metadata).await.len(), 3);
}
