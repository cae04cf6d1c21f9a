//! Push-subscription adapter (Google Pub/Sub, Kafka style providers)
//!
//! The provider drives delivery: each worker opens a streaming receive and
//! answers every message with [`Ack::Ack`] or [`Ack::Nack`]. A stream that
//! fails or closes is reopened after a backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{AdapterBuilder, ConsumerAdapter, WorkerSet};
use crate::error::{AdapterError, ProviderError};
use crate::handler::MessageHandler;
use crate::message::ProviderMessage;
use crate::types::{Source, SourceId};

/// Verdict returned to the provider for one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Processed; the provider may discard the message
    Ack,
    /// Not processed; the provider should redeliver
    Nack,
}

/// Per-message callback handed to [`PushSubscription::receive`]
pub type PushCallback = Arc<dyn Fn(ProviderMessage) -> BoxFuture<'static, Ack> + Send + Sync>;

/// A streaming subscription at the provider
#[async_trait]
pub trait PushSubscription: Send + Sync {
    /// Deliver messages to `callback` until `cancel` fires or the provider
    /// closes the stream (`Ok`), or the stream breaks (`Err`)
    async fn receive(&self, cancel: CancellationToken, callback: PushCallback) -> Result<(), ProviderError>;
}

/// Opens a [`PushSubscription`] from a source's provider settings
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn subscribe(&self, source: &Source) -> Result<Arc<dyn PushSubscription>, ProviderError>;
}

/// Adapter whose workers hold streaming receives
pub struct PushConsumer {
    source: Arc<Source>,
    connector: Arc<dyn PushConnector>,
    handler: Arc<dyn MessageHandler>,
    error_backoff: Duration,
    workers: Option<WorkerSet>,
}

impl PushConsumer {
    /// Create an unstarted consumer for `source`
    pub fn new(
        source: Source,
        connector: Arc<dyn PushConnector>,
        handler: Arc<dyn MessageHandler>,
        error_backoff: Duration,
    ) -> Self {
        Self {
            source: Arc::new(source),
            connector,
            handler,
            error_backoff,
            workers: None,
        }
    }
}

#[async_trait]
impl ConsumerAdapter for PushConsumer {
    fn source_id(&self) -> &SourceId {
        &self.source.uid
    }

    async fn start(&mut self, cancel: CancellationToken) -> Result<(), AdapterError> {
        if self.workers.is_some() {
            return Err(AdapterError::AlreadyStarted(self.source.uid.clone()));
        }

        let subscription = self.connector.subscribe(&self.source).await?;
        let callback = handler_callback(Arc::clone(&self.source), Arc::clone(&self.handler));
        let count = self.source.workers();

        let workers = WorkerSet::spawn(&cancel, count, |index, token| {
            stream_loop(
                index,
                Arc::clone(&self.source),
                Arc::clone(&subscription),
                Arc::clone(&callback),
                self.error_backoff,
                token,
            )
        });
        self.workers = Some(workers);

        info!(source_id = %self.source.uid, source_type = %self.source.source_type(), workers = count, "push consumer started");
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(workers) = self.workers.take() {
            workers.shutdown(&self.source.uid).await;
            info!(source_id = %self.source.uid, "push consumer stopped");
        }
    }

    fn running_workers(&self) -> usize {
        self.workers.as_ref().map_or(0, WorkerSet::running)
    }
}

/// Callback acking what `handler` accepts
fn handler_callback(source: Arc<Source>, handler: Arc<dyn MessageHandler>) -> PushCallback {
    Arc::new(move |message: ProviderMessage| -> BoxFuture<'static, Ack> {
        let source = Arc::clone(&source);
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            match handler.handle(&source, &message).await {
                Ok(()) => Ack::Ack,
                Err(e) => {
                    warn!(source_id = %source.uid, message_id = %message.id, error = %e, "message nacked");
                    Ack::Nack
                }
            }
        })
    })
}

async fn stream_loop(
    worker: usize,
    source: Arc<Source>,
    subscription: Arc<dyn PushSubscription>,
    callback: PushCallback,
    error_backoff: Duration,
    cancel: CancellationToken,
) {
    debug!(source_id = %source.uid, worker, "push worker running");

    while !cancel.is_cancelled() {
        let outcome = subscription.receive(cancel.clone(), Arc::clone(&callback)).await;
        if cancel.is_cancelled() {
            break;
        }

        // A stream that ends on its own is reopened on the same schedule as a failed one
        match outcome {
            Ok(()) => debug!(source_id = %source.uid, worker, "stream closed, reopening after backoff"),
            Err(e) => warn!(source_id = %source.uid, worker, error = %e, "stream failed, reopening"),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(error_backoff) => {}
        }
    }

    debug!(source_id = %source.uid, worker, "push worker exited");
}

/// [`AdapterBuilder`] producing [`PushConsumer`]s
pub struct PushAdapterBuilder {
    connector: Arc<dyn PushConnector>,
    error_backoff: Duration,
}

impl PushAdapterBuilder {
    pub fn new(connector: Arc<dyn PushConnector>, error_backoff: Duration) -> Self {
        Self {
            connector,
            error_backoff,
        }
    }
}

impl AdapterBuilder for PushAdapterBuilder {
    fn build(
        &self,
        source: &Source,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn ConsumerAdapter>, AdapterError> {
        source.config.validate()?;
        Ok(Box::new(PushConsumer::new(
            source.clone(),
            Arc::clone(&self.connector),
            handler,
            self.error_backoff,
        )))
    }
}
