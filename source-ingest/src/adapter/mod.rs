//! Protocol adapter contract
//!
//! An adapter owns the consumers of one source. `start` connects to the
//! provider and spawns one worker per configured worker count; `stop`
//! cancels the workers and waits for them to exit. Every worker hands
//! messages to the shared [`MessageHandler`] and acknowledges only what the
//! handler accepted, leaving the rest to the provider's redelivery.
//!
//! Two reference adapters are provided:
//! - [`QueueConsumer`](queue::QueueConsumer): workers poll a [`QueueClient`](queue::QueueClient)
//! - [`PushConsumer`](push::PushConsumer): workers hold a streaming [`PushSubscription`](push::PushSubscription)

pub mod factory;
pub mod memory;
pub mod push;
pub mod queue;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::AdapterError;
use crate::handler::MessageHandler;
use crate::types::{Source, SourceId};

/// Uniform start/stop contract implemented by every provider adapter
#[async_trait]
pub trait ConsumerAdapter: Send + Sync {
    /// Source this adapter consumes
    fn source_id(&self) -> &SourceId;

    /// Connect and spawn the workers
    ///
    /// Workers exit when `cancel` or any of its parents is cancelled.
    async fn start(&mut self, cancel: CancellationToken) -> Result<(), AdapterError>;

    /// Signal every worker to exit and wait for them
    async fn stop(&mut self);

    /// Number of workers currently running
    fn running_workers(&self) -> usize;
}

/// Builds the adapter for one provider family
pub trait AdapterBuilder: Send + Sync {
    /// Build an unstarted adapter for `source`
    fn build(
        &self,
        source: &Source,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn ConsumerAdapter>, AdapterError>;
}

/// The spawned workers of a started adapter
pub(crate) struct WorkerSet {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerSet {
    /// Spawn `count` workers under a child of `parent`
    pub(crate) fn spawn<F, Fut>(parent: &CancellationToken, count: usize, mut make_worker: F) -> Self
    where
        F: FnMut(usize, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = parent.child_token();
        let handles = (0..count)
            .map(|index| tokio::spawn(make_worker(index, cancel.clone())))
            .collect();

        Self { cancel, handles }
    }

    pub(crate) fn running(&self) -> usize {
        self.handles.iter().filter(|handle| !handle.is_finished()).count()
    }

    /// Cancel and join every worker
    pub(crate) async fn shutdown(self, source_id: &SourceId) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(source_id = %source_id, error = %e, "adapter worker ended abnormally");
            }
        }
    }
}
