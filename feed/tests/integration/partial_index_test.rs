use feed::error::ErrorKind;
use feed::test_utils::feed::TestFeed;
use feed::test_utils::metadata::{FEED_FIELD, FEED_TABLE};
use feed::test_utils::table::{feed_document, feed_snapshot};
use feed::types::{CallbackEntry, ChangeRecord, Identity, IndexTarget, ScopeId, TableRow};
use serde_json::json;
use std::time::Duration;
use telemetry::init_test_tracing;

fn change(identity: i64, attribute_ids: &str, store_id: Option<i64>) -> IndexTarget {
    ChangeRecord {
        entity_id: Some(Identity(identity)),
        attribute_ids: Some(attribute_ids.to_string()),
        store_id: store_id.map(ScopeId),
    }
    .into()
}

async fn indexed_chair(feed: &TestFeed) {
    feed.add_product(
        1,
        &["default", "fr"],
        json!({
            "sku": "SKU-1",
            "name": "Chair",
            "prices": {"regular": 10, "special": 8}
        }),
    )
    .await;
    feed.indexer().execute_full().await.unwrap();
    feed.callback.clear().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn partial_change_merges_into_the_stored_record() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_chair(&feed).await;

    feed.update_product(
        1,
        "default",
        json!({"sku": "SKU-1", "name": "Armchair", "prices": {"regular": 12}}),
    )
    .await;
    let summary = feed
        .indexer()
        .execute(vec![change(1, "prices", None)])
        .await
        .unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(summary.merged, 2);
    // The name was not requested, so the stored one is kept.
    assert_eq!(
        feed_document(&feed.store, &feed.metadata, "default", Identity(1)).await,
        Some(json!({
            "productId": 1,
            "storeViewCode": "default",
            "sku": "SKU-1",
            "name": "Chair",
            "prices": {"regular": 12, "special": 8}
        }))
    );

    let notification = feed.callback.last().await.unwrap();
    assert_eq!(
        notification.entries,
        vec![
            CallbackEntry {
                identity: Identity(1),
                store_view_code: "default".to_string(),
                attributes: vec!["prices".to_string()],
            },
            CallbackEntry {
                identity: Identity(1),
                store_view_code: "fr".to_string(),
                attributes: vec!["prices".to_string()],
            },
        ]
    );
    assert!(notification.deleted_ids.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn scoped_change_only_touches_its_store_view() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_chair(&feed).await;
    feed.producer.set_scope(ScopeId(2), "fr").await;

    feed.update_product(1, "default", json!({"name": "Stuhl"})).await;
    feed.update_product(1, "fr", json!({"name": "Chaise"})).await;
    let summary = feed
        .indexer()
        .execute(vec![change(1, "name", Some(2))])
        .await
        .unwrap();

    assert_eq!(summary.written, 1);
    let default = feed_document(&feed.store, &feed.metadata, "default", Identity(1))
        .await
        .unwrap();
    let fr = feed_document(&feed.store, &feed.metadata, "fr", Identity(1))
        .await
        .unwrap();
    assert_eq!(default["name"], json!("Chair"));
    assert_eq!(fr["name"], json!("Chaise"));
    assert_eq!(fr["sku"], json!("SKU-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn bare_identities_recompute_every_attribute() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_chair(&feed).await;

    feed.update_product(1, "default", json!({"sku": "SKU-1B"})).await;
    let summary = feed
        .indexer()
        .execute(vec![Identity(1).into()])
        .await
        .unwrap();

    assert_eq!(summary.merged, 0);
    assert_eq!(
        feed_document(&feed.store, &feed.metadata, "default", Identity(1)).await,
        Some(json!({"productId": 1, "storeViewCode": "default", "sku": "SKU-1B"}))
    );

    let notification = feed.callback.last().await.unwrap();
    assert!(
        notification
            .entries
            .iter()
            .all(|entry| entry.attributes.is_empty())
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn reindexing_the_same_list_is_idempotent() {
    init_test_tracing();
    let feed = TestFeed::new(2);
    for id in 1..=5 {
        feed.add_product(id, &["default"], json!({"sku": format!("SKU-{id}")}))
            .await;
    }
    let indexer = feed.indexer();
    let ids: Vec<Identity> = (1..=5).map(Identity).collect();

    indexer.execute_list(&ids).await.unwrap();
    let first = feed.store.table_rows(FEED_TABLE).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    indexer.execute_list(&ids).await.unwrap();
    let second = feed.store.table_rows(FEED_TABLE).await;

    // Modified-at columns included.
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn repeating_a_partial_change_is_idempotent() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_chair(&feed).await;
    feed.update_product(1, "default", json!({"prices": {"regular": 12}}))
        .await;
    let indexer = feed.indexer();

    indexer
        .execute(vec![change(1, "prices", None)])
        .await
        .unwrap();
    let first = feed.store.table_rows(FEED_TABLE).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    indexer
        .execute(vec![change(1, "prices", None)])
        .await
        .unwrap();

    assert_eq!(feed.store.table_rows(FEED_TABLE).await, first);
}

#[tokio::test(flavor = "multi_thread")]
async fn callback_fires_once_per_call_across_chunks() {
    init_test_tracing();
    let feed = TestFeed::new(2);
    for id in 1..=5 {
        feed.add_product(id, &["default"], json!({"sku": format!("SKU-{id}")}))
            .await;
    }
    let ids: Vec<Identity> = (1..=5).map(Identity).collect();

    let summary = feed.indexer().execute_list(&ids).await.unwrap();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.written, 5);
    let notifications = feed.callback.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].entries.len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_list_still_notifies_the_callback() {
    init_test_tracing();
    let feed = TestFeed::new(10);

    let summary = feed.indexer().execute_list(&[]).await.unwrap();

    assert_eq!(summary.written, 0);
    let notifications = feed.callback.notifications().await;
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].entries.is_empty());
    assert!(notifications[0].deleted_ids.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_targets_are_written_once() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    feed.add_product(1, &["default"], json!({"sku": "SKU-1"})).await;

    let summary = feed
        .indexer()
        .execute(vec![Identity(1).into(), Identity(1).into()])
        .await
        .unwrap();

    assert_eq!(summary.requested, 2);
    assert_eq!(summary.written, 1);
    assert!(feed.callback.last().await.unwrap().deleted_ids.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_change_fails_before_anything_is_written() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    feed.add_product(1, &["default"], json!({"sku": "SKU-1"})).await;

    let targets: Vec<IndexTarget> = vec![
        Identity(1).into(),
        ChangeRecord {
            entity_id: None,
            attribute_ids: Some("sku".to_string()),
            store_id: None,
        }
        .into(),
    ];
    let err = feed.indexer().execute(targets).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert!(feed.producer.requests().await.is_empty());
    assert!(feed.callback.notifications().await.is_empty());
    assert!(feed_snapshot(&feed.store, &feed.metadata).await.is_empty());

    let err = feed
        .indexer()
        .execute(vec![change(1, "sku,,name", None)])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidData);
}

#[tokio::test(flavor = "multi_thread")]
async fn every_malformed_change_is_reported() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    feed.add_product(1, &["default"], json!({"sku": "SKU-1"})).await;

    let targets: Vec<IndexTarget> = vec![
        change(1, "sku,,name", None),
        Identity(1).into(),
        ChangeRecord::default().into(),
    ];
    let err = feed.indexer().execute(targets).await.unwrap_err();

    assert_eq!(err.kinds(), vec![ErrorKind::InvalidData, ErrorKind::InvalidData]);
    assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    assert!(feed.producer.requests().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn columns_outside_the_mutable_list_survive_reindexing() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    feed.add_product(1, &["default"], json!({"sku": "SKU-1"})).await;
    let metadata = &feed.metadata;
    feed.store
        .insert_rows(
            FEED_TABLE,
            vec![
                TableRow::new()
                    .with(FEED_FIELD, 1)
                    .with(metadata.feed_table_scope_column(), "default")
                    .with(metadata.feed_table_data_column(), json!({}))
                    .with(metadata.feed_table_deleted_column(), false)
                    .with("legacy_hash", "a1b2"),
            ],
        )
        .await;

    feed.indexer().execute_row(Identity(1)).await.unwrap();

    let row = feed_snapshot(&feed.store, metadata)
        .await
        .into_values()
        .next()
        .unwrap();
    assert_eq!(row.get("legacy_hash"), Some(&json!("a1b2")));
    assert_eq!(
        row.get(metadata.feed_table_data_column()),
        Some(&json!({"productId": 1, "storeViewCode": "default", "sku": "SKU-1"}))
    );
}
