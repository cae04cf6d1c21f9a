//! Shared helpers for source-ingest integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use source_ingest::{
    AdapterBuilder, AdapterError, ConsumerAdapter, MessageHandler, ProviderError, ProviderSettings,
    PubSubConfig, Source, SourceId,
};
use tokio_util::sync::CancellationToken;

/// Start/stop counters shared by every adapter a [`CountingBuilder`] builds
#[derive(Debug, Default)]
pub struct Counters {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub fail_starts: AtomicBool,
}

impl Counters {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Adapter that only counts lifecycle calls
pub struct CountingAdapter {
    source_id: SourceId,
    workers: usize,
    running: bool,
    counters: Arc<Counters>,
}

#[async_trait]
impl ConsumerAdapter for CountingAdapter {
    fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    async fn start(&mut self, _cancel: CancellationToken) -> Result<(), AdapterError> {
        if self.counters.fail_starts.load(Ordering::SeqCst) {
            return Err(AdapterError::Connect(ProviderError::Network(
                "injected start failure".to_string(),
            )));
        }
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) {
        if self.running {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            self.running = false;
        }
    }

    fn running_workers(&self) -> usize {
        if self.running {
            self.workers
        } else {
            0
        }
    }
}

/// Builder producing [`CountingAdapter`]s
#[derive(Default)]
pub struct CountingBuilder {
    pub counters: Arc<Counters>,
}

impl AdapterBuilder for CountingBuilder {
    fn build(
        &self,
        source: &Source,
        _handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn ConsumerAdapter>, AdapterError> {
        Ok(Box::new(CountingAdapter {
            source_id: source.uid.clone(),
            workers: source.workers(),
            running: false,
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// An SQS source reading `queue`
pub fn sqs_source(uid: &str, project: &str, queue: &str, workers: u32) -> Source {
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

/// A Kafka source reading `topic`
pub fn kafka_source(uid: &str, project: &str, topic: &str, workers: u32) -> Source {
    Source::new(
        uid,
        project,
        PubSubConfig::new(
            workers,
            ProviderSettings::Kafka {
                brokers: vec!["localhost:9092".to_string()],
                topic: topic.to_string(),
                consumer_group_id: "hookroute".to_string(),
                auth: None,
            },
        ),
    )
}

/// Poll `condition` every millisecond, panicking after `timeout`
pub async fn wait_until<F>(timeout: Duration, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not met within {timeout:?}");
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
