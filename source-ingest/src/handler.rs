//! Shared inbound message handler
//!
//! Every adapter worker funnels decoded messages through one handler, which
//! turns them into create-event jobs on the outbound work queue.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HandlerError, QueueError};
use crate::message::{CreateEventRequest, ProviderMessage};
use crate::queue::{Job, WorkQueue, CREATE_EVENT_PROCESSOR, CREATE_EVENT_QUEUE};
use crate::types::{Source, SourceId};

/// Processes one inbound message on behalf of an adapter
///
/// `Ok` means the message may be acknowledged at the provider.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, source: &Source, message: &ProviderMessage) -> Result<(), HandlerError>;
}

/// Payload of a create-event job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEventJob {
    /// Job id: the idempotency key when present
    pub id: String,
    /// Project the source belongs to
    pub project_id: String,
    /// Source the message arrived on
    pub source_id: SourceId,
    /// Provider message id
    pub message_id: String,
    /// The decoded request
    pub request: CreateEventRequest,
    /// When the message was handled
    pub received_at: DateTime<Utc>,
}

/// [`MessageHandler`] that enqueues a [`CreateEventJob`] per message
pub struct EventIngestHandler {
    queue: Arc<dyn WorkQueue>,
}

impl EventIngestHandler {
    /// Create a handler writing to `queue`
    pub fn new(queue: Arc<dyn WorkQueue>) -> Self {
        Self { queue }
    }

    fn job_for(source: &Source, message: &ProviderMessage, request: CreateEventRequest) -> CreateEventJob {
        let id = match request.idempotency_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        CreateEventJob {
            id,
            project_id: source.project_id.to_string(),
            source_id: source.uid.clone(),
            message_id: message.id.clone(),
            request,
            received_at: Utc::now(),
        }
    }
}

#[async_trait]
impl MessageHandler for EventIngestHandler {
    async fn handle(&self, source: &Source, message: &ProviderMessage) -> Result<(), HandlerError> {
        let request = CreateEventRequest::from_message(message)?;
        let job = Self::job_for(source, message, request);

        let payload = serde_json::to_vec(&job).map_err(|e| QueueError::Encode(e.to_string()))?;
        let job_id = job.id;

        self.queue
            .write(
                CREATE_EVENT_PROCESSOR,
                CREATE_EVENT_QUEUE,
                Job {
                    id: job_id.clone(),
                    payload,
                },
            )
            .await?;

        debug!(source_id = %source.uid, message_id = %message.id, job_id = %job_id, "queued create-event job");
        Ok(())
    }
}
