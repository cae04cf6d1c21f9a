//! In-memory message provider
//!
//! Serves both adapter styles from named in-process queues: received
//! messages stay in flight until acknowledged, and in-flight messages can be
//! pushed back for redelivery, which is how a real provider behaves once a
//! visibility timeout expires.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::factory::AdapterFactory;
use super::push::{Ack, PushAdapterBuilder, PushCallback, PushConnector, PushSubscription};
use super::queue::{QueueAdapterBuilder, QueueClient, QueueConnector};
use crate::config::QueuePollSettings;
use crate::error::ProviderError;
use crate::message::ProviderMessage;
use crate::types::{ProviderSettings, Source, SourceType};

/// The queue name a source reads from
pub fn queue_address(source: &Source) -> String {
    match &source.config.provider {
        ProviderSettings::Sqs { queue_name, .. } => queue_name.clone(),
        ProviderSettings::Google { subscription_id, .. } => subscription_id.clone(),
        ProviderSettings::Kafka { topic, .. } => topic.clone(),
        ProviderSettings::Amqp { queue, .. } => queue.clone(),
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<ProviderMessage>,
    in_flight: HashMap<String, ProviderMessage>,
    acknowledged: Vec<String>,
}

#[derive(Debug, Default)]
struct BrokerState {
    queues: Mutex<HashMap<String, QueueState>>,
    connects: AtomicUsize,
    failing_receives: AtomicUsize,
    reject_connects: AtomicBool,
}

impl BrokerState {
    fn receive(&self, queue: &str, max_messages: usize) -> Result<Vec<ProviderMessage>, ProviderError> {
        let failed = self
            .failing_receives
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ProviderError::Network("injected receive failure".to_string()));
        }

        let mut queues = self.queues.lock();
        let state = queues.entry(queue.to_string()).or_default();
        let take = max_messages.min(state.ready.len());
        let batch: Vec<ProviderMessage> = state.ready.drain(..take).collect();
        for message in &batch {
            state.in_flight.insert(message.id.clone(), message.clone());
        }
        Ok(batch)
    }

    fn acknowledge(&self, queue: &str, message_id: &str) -> Result<(), ProviderError> {
        let mut queues = self.queues.lock();
        let state = queues.entry(queue.to_string()).or_default();
        match state.in_flight.remove(message_id) {
            Some(_) => {
                state.acknowledged.push(message_id.to_string());
                Ok(())
            }
            None => Err(ProviderError::Protocol(format!(
                "message {message_id} is not in flight"
            ))),
        }
    }

    fn connect(&self, source: &Source) -> Result<String, ProviderError> {
        if self.reject_connects.load(Ordering::SeqCst) {
            return Err(ProviderError::Auth(format!(
                "credentials rejected for source {}",
                source.uid
            )));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(queue_address(source))
    }
}

/// In-process provider implementing [`QueueConnector`] and [`PushConnector`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueueBroker {
    state: Arc<BrokerState>,
}

impl InMemoryQueueBroker {
    /// Create a broker with no queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory wiring queue-style types (SQS, AMQP) to [`QueueConsumer`](super::queue::QueueConsumer)
    /// and push-style types (Google, Kafka) to [`PushConsumer`](super::push::PushConsumer)
    pub fn adapter_factory(&self, settings: QueuePollSettings) -> AdapterFactory {
        let queue = Arc::new(QueueAdapterBuilder::new(Arc::new(self.clone()), settings.clone()));
        let push = Arc::new(PushAdapterBuilder::new(Arc::new(self.clone()), settings.error_backoff));

        AdapterFactory::new()
            .with_builder(SourceType::Sqs, queue.clone())
            .with_builder(SourceType::Amqp, queue)
            .with_builder(SourceType::Google, push.clone())
            .with_builder(SourceType::Kafka, push)
    }

    /// Append a message to `queue`
    pub fn publish(&self, queue: &str, message: ProviderMessage) {
        self.state
            .queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .ready
            .push_back(message);
    }

    /// Ids acknowledged on `queue`, in order
    pub fn acknowledged(&self, queue: &str) -> Vec<String> {
        self.state
            .queues
            .lock()
            .get(queue)
            .map(|state| state.acknowledged.clone())
            .unwrap_or_default()
    }

    /// Messages received from `queue` but not acknowledged
    pub fn in_flight(&self, queue: &str) -> usize {
        self.state.queues.lock().get(queue).map_or(0, |state| state.in_flight.len())
    }

    /// Messages waiting on `queue`
    pub fn ready(&self, queue: &str) -> usize {
        self.state.queues.lock().get(queue).map_or(0, |state| state.ready.len())
    }

    /// Return every in-flight message of `queue` to the front of the queue
    pub fn redeliver_unacknowledged(&self, queue: &str) -> usize {
        let mut queues = self.state.queues.lock();
        let Some(state) = queues.get_mut(queue) else {
            return 0;
        };
        let mut returned: Vec<ProviderMessage> = state.in_flight.drain().map(|(_, m)| m).collect();
        returned.sort_by(|a, b| a.id.cmp(&b.id));
        let count = returned.len();
        for message in returned.into_iter().rev() {
            state.ready.push_front(message);
        }
        count
    }

    /// Number of successful connects or subscribes
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Fail the next `count` receives with a network error
    pub fn fail_next_receives(&self, count: usize) {
        self.state.failing_receives.store(count, Ordering::SeqCst);
    }

    /// Reject every connect with an auth error until switched back
    pub fn set_reject_connects(&self, reject: bool) {
        self.state.reject_connects.store(reject, Ordering::SeqCst);
    }
}

/// [`QueueClient`] bound to one in-memory queue
#[derive(Debug)]
struct InMemoryQueueClient {
    state: Arc<BrokerState>,
    queue: String,
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<ProviderMessage>, ProviderError> {
        let batch = self.state.receive(&self.queue, max_messages)?;
        if batch.is_empty() {
            // Long-poll: an empty answer only comes back after the wait
            tokio::time::sleep(wait_time).await;
        }
        Ok(batch)
    }

    async fn acknowledge(&self, message: &ProviderMessage) -> Result<(), ProviderError> {
        self.state.acknowledge(&self.queue, &message.id)
    }
}

#[async_trait]
impl QueueConnector for InMemoryQueueBroker {
    async fn connect(&self, source: &Source) -> Result<Arc<dyn QueueClient>, ProviderError> {
        let queue = self.state.connect(source)?;
        Ok(Arc::new(InMemoryQueueClient {
            state: Arc::clone(&self.state),
            queue,
        }))
    }
}

/// [`PushSubscription`] pumping one in-memory queue into the callback
#[derive(Debug)]
struct InMemoryPushSubscription {
    client: InMemoryQueueClient,
}

const PUSH_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[async_trait]
impl PushSubscription for InMemoryPushSubscription {
    async fn receive(&self, cancel: CancellationToken, callback: PushCallback) -> Result<(), ProviderError> {
        loop {
            let batch = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                batch = self.client.receive(10, PUSH_POLL_INTERVAL) => batch?,
            };

            for message in batch {
                let id = message.id.clone();
                if callback(message).await == Ack::Ack {
                    self.client.state.acknowledge(&self.client.queue, &id)?;
                }
            }
        }
    }
}

#[async_trait]
impl PushConnector for InMemoryQueueBroker {
    async fn subscribe(&self, source: &Source) -> Result<Arc<dyn PushSubscription>, ProviderError> {
        let queue = self.state.connect(source)?;
        Ok(Arc::new(InMemoryPushSubscription {
            client: InMemoryQueueClient {
                state: Arc::clone(&self.state),
                queue,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PubSubConfig;

    fn amqp_source() -> Source {
        Source::new(
            "src-a",
            "p1",
            PubSubConfig::new(
                1,
                ProviderSettings::Amqp {
                    host: "localhost".to_string(),
                    port: 5672,
                    queue: "orders".to_string(),
                    auth: None,
                },
            ),
        )
    }

    #[tokio::test]
    async fn test_receive_ack_and_redeliver() {
        let broker = InMemoryQueueBroker::new();
        broker.publish("orders", ProviderMessage::new("m1", b"1".to_vec()));
        broker.publish("orders", ProviderMessage::new("m2", b"2".to_vec()));

        let client = QueueConnector::connect(&broker, &amqp_source()).await.unwrap();
        let batch = client.receive(10, Duration::from_millis(1)).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(broker.in_flight("orders"), 2);

        client.acknowledge(&batch[0]).await.unwrap();
        assert!(client.acknowledge(&batch[0]).await.is_err());
        assert_eq!(broker.acknowledged("orders"), vec!["m1".to_string()]);

        assert_eq!(broker.redeliver_unacknowledged("orders"), 1);
        assert_eq!(broker.ready("orders"), 1);
        let again = client.receive(10, Duration::from_millis(1)).await.unwrap();
        assert_eq!(again[0].id, "m2");
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let broker = InMemoryQueueBroker::new();
        broker.set_reject_connects(true);
        assert!(matches!(
            QueueConnector::connect(&broker, &amqp_source()).await,
            Err(ProviderError::Auth(_))
        ));
        assert_eq!(broker.connect_count(), 0);

        broker.set_reject_connects(false);
        let client = QueueConnector::connect(&broker, &amqp_source()).await.unwrap();
        broker.fail_next_receives(1);
        assert!(client.receive(1, Duration::from_millis(1)).await.is_err());
        assert!(client.receive(1, Duration::from_millis(1)).await.is_ok());
    }
}
