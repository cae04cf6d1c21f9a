//! Queue-poll adapter (SQS, AMQP style providers)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AdapterBuilder, ConsumerAdapter, WorkerSet};
use crate::config::QueuePollSettings;
use crate::error::{AdapterError, ProviderError};
use crate::handler::MessageHandler;
use crate::message::ProviderMessage;
use crate::types::{Source, SourceId};

/// Connection to one provider queue, shared by an adapter's workers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Receive up to `max_messages`, waiting at most `wait_time` for the first
    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<ProviderMessage>, ProviderError>;

    /// Delete `message` at the provider
    async fn acknowledge(&self, message: &ProviderMessage) -> Result<(), ProviderError>;
}

/// Opens a [`QueueClient`] from a source's provider settings
#[async_trait]
pub trait QueueConnector: Send + Sync {
    async fn connect(&self, source: &Source) -> Result<Arc<dyn QueueClient>, ProviderError>;
}

/// Adapter whose workers poll a queue
pub struct QueueConsumer {
    source: Arc<Source>,
    connector: Arc<dyn QueueConnector>,
    handler: Arc<dyn MessageHandler>,
    settings: QueuePollSettings,
    workers: Option<WorkerSet>,
}

impl QueueConsumer {
    /// Create an unstarted consumer for `source`
    pub fn new(
        source: Source,
        connector: Arc<dyn QueueConnector>,
        handler: Arc<dyn MessageHandler>,
        settings: QueuePollSettings,
    ) -> Self {
        Self {
            source: Arc::new(source),
            connector,
            handler,
            settings,
            workers: None,
        }
    }
}

#[async_trait]
impl ConsumerAdapter for QueueConsumer {
    fn source_id(&self) -> &SourceId {
        &self.source.uid
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<(), AdapterError> {
        if self.workers.is_some() {
            return Err(AdapterError::AlreadyStarted(self.source.uid.clone()));
        }

        let client = self.connector.connect(&self.source).await?;
        let count = self.source.workers();

        let workers = WorkerSet::spawn(&cancel, count, |index, token| {
            poll_loop(
                index,
                Arc::clone(&self.source),
                Arc::clone(&client),
                Arc::clone(&self.handler),
                self.settings.clone(),
                token,
            )
        });
        self.workers = Some(workers);

        info!(source_id = %self.source.uid, source_type = %self.source.source_type(), workers = count, "queue consumer started");
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(workers) = self.workers.take() {
            workers.shutdown(&self.source.uid).await;
            info!(source_id = %self.source.uid, "queue consumer stopped");
        }
    }

    fn running_workers(&self) -> usize {
        self.workers.as_ref().map_or(0, WorkerSet::running)
    }
}

async fn poll_loop(
    worker: usize,
    source: Arc<Source>,
    client: Arc<dyn QueueClient>,
    handler: Arc<dyn MessageHandler>,
    settings: QueuePollSettings,
    cancel: CancellationToken,
) {
    debug!(source_id = %source.uid, worker, "queue worker running");

    loop {
        let polled_at = tokio::time::Instant::now();
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            received = client.receive(settings.max_messages, settings.wait_time) => received,
        };

        match received {
            // An empty batch never comes back sooner than one wait_time
            Ok(messages) if messages.is_empty() => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep_until(polled_at + settings.wait_time) => {}
                }
            }
            Ok(messages) => {
                for message in messages {
                    process(&source, client.as_ref(), handler.as_ref(), message).await;
                }
            }
            Err(e) => {
                warn!(source_id = %source.uid, worker, error = %e, "receive failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(settings.error_backoff) => {}
                }
            }
        }
    }

    debug!(source_id = %source.uid, worker, "queue worker exited");
}

async fn process(
    source: &Source,
    client: &dyn QueueClient,
    handler: &dyn MessageHandler,
    message: ProviderMessage,
) {
    match handler.handle(source, &message).await {
        Ok(()) => {
            if let Err(e) = client.acknowledge(&message).await {
                warn!(source_id = %source.uid, message_id = %message.id, error = %e, "acknowledge failed, message will be redelivered");
            }
        }
        Err(e) => {
            warn!(source_id = %source.uid, message_id = %message.id, error = %e, "message left unacknowledged");
        }
    }
}

/// [`AdapterBuilder`] producing [`QueueConsumer`]s
pub struct QueueAdapterBuilder {
    connector: Arc<dyn QueueConnector>,
    settings: QueuePollSettings,
}

impl QueueAdapterBuilder {
    pub fn new(connector: Arc<dyn QueueConnector>, settings: QueuePollSettings) -> Self {
        Self { connector, settings }
    }
}

impl AdapterBuilder for QueueAdapterBuilder {
    fn build(
        &self,
        source: &Source,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn ConsumerAdapter>, AdapterError> {
        source.config.validate()?;
        Ok(Box::new(QueueConsumer::new(
            source.clone(),
            Arc::clone(&self.connector),
            handler,
            self.settings.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::types::{ProviderSettings, PubSubConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticConnector(Arc<MockQueueClient>);

    #[async_trait]
    impl QueueConnector for StaticConnector {
        async fn connect(&self, _source: &Source) -> Result<Arc<dyn QueueClient>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    /// Accepts bodies equal to "ok"
    #[derive(Default)]
    struct PickyHandler {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl MessageHandler for PickyHandler {
        async fn handle(&self, _source: &Source, message: &ProviderMessage) -> Result<(), HandlerError> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if message.body == b"ok" {
                Ok(())
            } else {
                Err(HandlerError::Malformed("not ok".to_string()))
            }
        }
    }

    fn source(workers: u32) -> Source {
        Source::new(
            "src-1",
            "p1",
            PubSubConfig::new(
                workers,
                ProviderSettings::Sqs {
                    queue_name: "q".to_string(),
                    region: "r".to_string(),
                    access_key_id: "a".to_string(),
                    secret_key: "s".to_string(),
                },
            ),
        )
    }

    #[tokio::test]
    async fn test_acks_only_handled_messages() {
        let mut client = MockQueueClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.expect_receive().returning(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(vec![
                    ProviderMessage::new("good", b"ok".to_vec()),
                    ProviderMessage::new("bad", b"nope".to_vec()),
                ])
            } else {
                Ok(Vec::new())
            }
        });
        client
            .expect_acknowledge()
            .withf(|message| message.id == "good")
            .times(1)
            .returning(|_| Ok(()));

        let handler = Arc::new(PickyHandler::default());
        let mut consumer = QueueConsumer::new(
            source(1),
            Arc::new(StaticConnector(Arc::new(client))),
            handler.clone(),
            QueuePollSettings::fast(),
        );

        consumer.start(CancellationToken::new()).await.unwrap();
        while handler.seen.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        consumer.stop().await;

        assert_eq!(consumer.running_workers(), 0);
    }

    #[tokio::test]
    async fn test_receive_errors_do_not_kill_worker() {
        let mut client = MockQueueClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.expect_receive().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Network("reset".to_string()))
        });

        let mut consumer = QueueConsumer::new(
            source(1),
            Arc::new(StaticConnector(Arc::new(client))),
            Arc::new(PickyHandler::default()),
            QueuePollSettings::fast(),
        );

        consumer.start(CancellationToken::new()).await.unwrap();
        while calls.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(consumer.running_workers(), 1);
        consumer.stop().await;
    }

    #[tokio::test]
    async fn test_empty_batches_are_paced_by_wait_time() {
        let mut client = MockQueueClient::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.expect_receive().returning(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        });

        let settings = QueuePollSettings {
            wait_time: Duration::from_millis(20),
            ..QueuePollSettings::fast()
        };
        let mut consumer = QueueConsumer::new(
            source(1),
            Arc::new(StaticConnector(Arc::new(client))),
            Arc::new(PickyHandler::default()),
            settings,
        );

        consumer.start(CancellationToken::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        consumer.stop().await;

        let calls = calls.load(Ordering::SeqCst);
        assert!((1..=10).contains(&calls), "{calls} receives in 100ms");
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let mut client = MockQueueClient::new();
        client.expect_receive().returning(|_, _| Ok(Vec::new()));

        let mut consumer = QueueConsumer::new(
            source(2),
            Arc::new(StaticConnector(Arc::new(client))),
            Arc::new(PickyHandler::default()),
            QueuePollSettings::fast(),
        );

        consumer.start(CancellationToken::new()).await.unwrap();
        assert!(matches!(
            consumer.start(CancellationToken::new()).await,
            Err(AdapterError::AlreadyStarted(_))
        ));
        consumer.stop().await;
    }

    #[test]
    fn test_builder_validates_config() {
        let mut client = MockQueueClient::new();
        client.expect_receive().never();
        let builder = QueueAdapterBuilder::new(
            Arc::new(StaticConnector(Arc::new(client))),
            QueuePollSettings::default(),
        );

        let result = builder.build(&source(0), Arc::new(PickyHandler::default()));
        assert!(matches!(result, Err(AdapterError::Config(_))));
    }
}
