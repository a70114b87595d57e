use feed::error::ErrorKind;
use feed::failpoints::{RECONCILER_AFTER_CHUNK_WRITE, RECONCILER_BEFORE_CALLBACK};
use feed::test_utils::failpoints::CustomFailScenario;
use feed::test_utils::feed::TestFeed;
use feed::test_utils::table::feed_snapshot;
use feed::types::Identity;
use serde_json::json;
use telemetry::init_test_tracing;

async fn products(feed: &TestFeed, count: i64) -> Vec<Identity> {
    for id in 1..=count {
        feed.add_product(id, &["default"], json!({"sku": format!("SKU-{id}")}))
            .await;
    }

    (1..=count).map(Identity).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn chunks_written_before_a_failure_stay_written() {
    init_test_tracing();
    let _scenario =
        CustomFailScenario::setup(&[(RECONCILER_AFTER_CHUNK_WRITE, "1*off->return")]);

    let feed = TestFeed::new(1);
    let ids = products(&feed, 3).await;

    let err = feed.indexer().execute_list(&ids).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::WithNoRetry);
    let indexed: Vec<Identity> = feed_snapshot(&feed.store, &feed.metadata)
        .await
        .into_keys()
        .map(|key| key.identity)
        .collect();
    assert_eq!(indexed, vec![Identity(1), Identity(2)]);
    assert!(feed.callback.notifications().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_before_the_callback_keeps_every_chunk() {
    init_test_tracing();
    let scenario = CustomFailScenario::setup(&[(RECONCILER_BEFORE_CALLBACK, "return")]);

    let feed = TestFeed::new(2);
    let ids = products(&feed, 3).await;

    let err = feed.indexer().execute_list(&ids).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::WithNoRetry);
    assert_eq!(feed_snapshot(&feed.store, &feed.metadata).await.len(), 3);
    assert!(feed.callback.notifications().await.is_empty());

    // Once the failpoint is gone the same call goes through and notifies once.
    drop(scenario);
    feed.indexer().execute_list(&ids).await.unwrap();
    assert_eq!(feed.callback.notifications().await.len(), 1);
}
