//! Outbound work queue seam
//!
//! The create-event processor that consumes these jobs lives outside this
//! crate; from here a write is fire-and-forget with at-least-once delivery.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::QueueError;

/// Task type of create-event jobs
pub const CREATE_EVENT_PROCESSOR: &str = "CreateEventProcessor";

/// Queue create-event jobs are written to
pub const CREATE_EVENT_QUEUE: &str = "CreateEventQueue";

/// A serialized unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Job id; the queue may drop a job whose id it has already seen
    pub id: String,
    /// JSON payload
    pub payload: Vec<u8>,
}

/// Outbound work queue
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue `job` for `task_type` on `queue_name`
    async fn write(&self, task_type: &str, queue_name: &str, job: Job) -> Result<(), QueueError>;
}

/// A job recorded by [`InMemoryWorkQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub task_type: String,
    pub queue_name: String,
    pub job: Job,
}

/// [`WorkQueue`] that records jobs in memory
#[derive(Debug, Default)]
pub struct InMemoryWorkQueue {
    jobs: Mutex<Vec<QueuedJob>>,
    failing: AtomicBool,
}

impl InMemoryWorkQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every job written so far
    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.jobs.lock().clone()
    }

    /// Number of jobs written so far
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn write(&self, task_type: &str, queue_name: &str, job: Job) -> Result<(), QueueError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(QueueError::Write("in-memory queue switched off".to_string()));
        }

        self.jobs.lock().push(QueuedJob {
            task_type: task_type.to_string(),
            queue_name: queue_name.to_string(),
            job,
        });
        Ok(())
    }
}
