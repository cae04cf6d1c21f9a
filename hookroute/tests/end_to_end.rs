//! The routing core wired to in-memory storage, broker and work queue

use std::sync::Arc;
use std::time::Duration;

use hookroute::source_ingest::{ProviderMessage, ProviderSettings, PubSubConfig, QueuePollSettings};
use hookroute::{
    InMemoryQueueBroker, InMemorySourceStore, InMemorySubscriptionStore, InMemoryWorkQueue,
    ProjectId, RouterConfig, RoutingCore, Source, SourceId, Subscription, SubscriptionId,
};

async fn wait_until<F>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

fn sqs_source(uid: &str, project: &str, queue: &str, workers: u32) -> Source {
    Source::new(
        uid,
        project,
        PubSubConfig::new(
            workers,
            ProviderSettings::Sqs {
                queue_name: queue.to_string(),
                region: "us-east-1".to_string(),
                access_key_id: "AKIAEXAMPLE".to_string(),
                secret_key: "example-secret".to_string(),
            },
        ),
    )
}

struct Fixture {
    subscriptions: Arc<InMemorySubscriptionStore>,
    sources: Arc<InMemorySourceStore>,
    broker: InMemoryQueueBroker,
    queue: Arc<InMemoryWorkQueue>,
    core: RoutingCore,
}

fn fixture() -> Fixture {
    let subscriptions = Arc::new(InMemorySubscriptionStore::new());
    let sources = Arc::new(InMemorySourceStore::new());
    let broker = InMemoryQueueBroker::new();
    let queue = Arc::new(InMemoryWorkQueue::new());

    // Both loaders list projects from the same repository
    subscriptions.add_project("p1");
    subscriptions.add_project("p2");

    let core = RoutingCore::builder()
        .projects(subscriptions.clone())
        .subscriptions(subscriptions.clone())
        .sources(sources.clone())
        .work_queue(queue.clone())
        .adapters(broker.adapter_factory(QueuePollSettings::fast()))
        .config(RouterConfig::fast_polling().with_batch_size(2).with_debug(true))
        .build()
        .unwrap();

    Fixture {
        subscriptions,
        sources,
        broker,
        queue,
        core,
    }
}

fn uids(subscriptions: Vec<Subscription>) -> Vec<String> {
    let mut uids: Vec<String> = subscriptions.into_iter().map(|s| s.uid.0).collect();
    uids.sort();
    uids
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscription_index_follows_storage() {
    let mut f = fixture();
    f.subscriptions
        .upsert_subscription(Subscription::new("s1", "p1", ["user.created", "user.deleted"]));
    f.subscriptions
        .upsert_subscription(Subscription::new("s2", "p1", ["user.created"]));
    f.subscriptions
        .upsert_subscription(Subscription::new("s3", "p2", ["user.created"]));
    f.subscriptions
        .upsert_subscription(Subscription::new("s4", "p1", ["*"]));

    f.core.start().unwrap();

    let p1 = ProjectId::new("p1");
    let table = Arc::clone(f.core.subscription_table());
    let core = &f.core;
    wait_until(Duration::from_secs(5), || {
        table.len() == 3 && core.subscriptions_for(&p1, "user.created").len() == 2
    })
    .await;
    assert_eq!(uids(f.core.subscriptions_for(&p1, "user.created")), vec!["s1", "s2"]);
    assert_eq!(uids(f.core.subscriptions_for(&ProjectId::new("p2"), "user.created")), vec!["s3"]);
    assert!(f.core.subscriptions_for(&p1, "order.paid").is_empty());

    // s1 moves off user.deleted; s2 disappears
    f.subscriptions
        .update_event_types(&SubscriptionId::new("s1"), ["order.paid"]);
    f.subscriptions.soft_delete(&SubscriptionId::new("s2"));

    wait_until(Duration::from_secs(5), || {
        core.subscriptions_for(&p1, "user.created").is_empty()
            && core.subscriptions_for(&p1, "user.deleted").is_empty()
            && core.subscriptions_for(&p1, "order.paid").len() == 1
    })
    .await;

    f.core.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sources_are_consumed_until_shutdown() {
    let mut f = fixture();
    f.sources.upsert_source(sqs_source("src-1", "p1", "orders", 2));

    f.core.start().unwrap();

    let pool = Arc::clone(f.core.pool());
    let id = SourceId::new("src-1");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while pool.running_workers(&id).await != Some(2) {
        assert!(tokio::time::Instant::now() < deadline, "source never started");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    f.broker.publish(
        "orders",
        ProviderMessage::new(
            "m1",
            br#"{"endpoint_id":"ep-1","event_type":"user.created","data":{"id":7},"idempotency_key":"idem-1"}"#.to_vec(),
        ),
    );

    let queue = Arc::clone(&f.queue);
    wait_until(Duration::from_secs(5), || queue.len() == 1).await;
    assert_eq!(f.queue.jobs()[0].job.id, "idem-1");
    let broker = f.broker.clone();
    wait_until(Duration::from_secs(5), || broker.acknowledged("orders") == vec!["m1".to_string()]).await;

    // A config change restarts the consumer once
    let connects = f.broker.connect_count();
    f.sources.update_config(
        &id,
        PubSubConfig::new(
            1,
            ProviderSettings::Sqs {
                queue_name: "orders".to_string(),
                region: "us-east-1".to_string(),
                access_key_id: "AKIAEXAMPLE".to_string(),
                secret_key: "example-secret".to_string(),
            },
        ),
    );
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while pool.running_workers(&id).await != Some(1) {
        assert!(tokio::time::Instant::now() < deadline, "source never restarted");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(f.broker.connect_count(), connects + 1);

    f.core.shutdown().await;
    assert!(pool.is_empty().await);
    assert!(!f.core.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removed_source_is_stopped() {
    let mut f = fixture();
    f.sources.upsert_source(sqs_source("a", "p1", "qa", 1));
    f.sources.upsert_source(sqs_source("b", "p2", "qb", 1));
    f.core.start().unwrap();

    let pool = Arc::clone(f.core.pool());
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while pool.len().await != 2 {
        assert!(tokio::time::Instant::now() < deadline, "sources never started");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    f.sources.remove_source(&SourceId::new("a"));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while pool.live_keys().await != vec![SourceId::new("b")] {
        assert!(tokio::time::Instant::now() < deadline, "source a never stopped");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    f.core.shutdown().await;
}
