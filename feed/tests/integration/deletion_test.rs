use feed::test_utils::feed::TestFeed;
use feed::test_utils::table::{feed_document, is_flagged_deleted};
use feed::types::{ChangeRecord, Identity};
use serde_json::json;
use telemetry::init_test_tracing;

async fn indexed_products(feed: &TestFeed) {
    feed.add_product(1, &["default", "fr"], json!({"sku": "SKU-1"}))
        .await;
    feed.add_product(2, &["default", "fr"], json!({"sku": "SKU-2"}))
        .await;
    feed.indexer().execute_full().await.unwrap();
    feed.callback.clear().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn removed_source_rows_are_flagged_not_deleted() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_products(&feed).await;

    feed.remove_product(2).await;
    let summary = feed
        .indexer()
        .execute_list(&[Identity(1), Identity(2)])
        .await
        .unwrap();

    assert_eq!(summary.marked_removed, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.deleted, 1);
    for store_view_code in ["default", "fr"] {
        assert!(
            is_flagged_deleted(&feed.store, &feed.metadata, store_view_code, Identity(2)).await
        );
        assert!(
            !is_flagged_deleted(&feed.store, &feed.metadata, store_view_code, Identity(1)).await
        );
    }
    // The last document stays readable for consumers.
    assert_eq!(
        feed_document(&feed.store, &feed.metadata, "fr", Identity(2)).await,
        Some(json!({"productId": 2, "storeViewCode": "fr", "sku": "SKU-2"}))
    );

    let notification = feed.callback.last().await.unwrap();
    assert_eq!(notification.deleted_ids, vec![Identity(2)]);
    assert_eq!(notification.entries.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn flagged_rows_are_not_flagged_again_or_resurrected() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_products(&feed).await;
    let indexer = feed.indexer();

    feed.remove_product(2).await;
    indexer.execute_row(Identity(2)).await.unwrap();
    let summary = indexer.execute_row(Identity(2)).await.unwrap();

    assert_eq!(summary.marked_removed, 0);
    assert_eq!(summary.written, 0);
    assert_eq!(summary.deleted, 1);
    assert!(
        is_flagged_deleted(&feed.store, &feed.metadata, "default", Identity(2)).await
    );
    assert_eq!(feed.callback.notifications().await.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn change_records_of_removed_rows_flag_them() {
    init_test_tracing();
    let feed = TestFeed::new(10);
    indexed_products(&feed).await;

    feed.remove_product(1).await;
    let change = ChangeRecord {
        entity_id: Some(Identity(1)),
        attribute_ids: Some("sku".to_string()),
        store_id: None,
    };
    let summary = feed.indexer().execute(vec![change.into()]).await.unwrap();

    assert_eq!(summary.marked_removed, 2);
    assert_eq!(summary.merged, 0);
    assert!(is_flagged_deleted(&feed.store, &feed.metadata, "fr", Identity(1)).await);
    assert_eq!(
        feed.callback.last().await.unwrap().deleted_ids,
        vec![Identity(1)]
    );
}
