//! Live consumer pool
//!
//! The pool is the only owner of adapter handles. Each entry is tagged with
//! the content hash of the config it was started from; re-inserting a source
//! with the same hash is a no-op, a different hash forces a full stop and
//! start.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapter::factory::AdapterFactory;
use crate::adapter::ConsumerAdapter;
use crate::error::{PoolError, PoolResult};
use crate::handler::MessageHandler;
use crate::types::{Source, SourceId};

/// What [`SourcePool::insert`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No adapter was running; one was started
    Started,
    /// The config hash changed; the old adapter was stopped and a new one started
    Restarted,
    /// Same hash as the running adapter; nothing was done
    Unchanged,
}

struct PoolEntry {
    hash: String,
    adapter: Box<dyn ConsumerAdapter>,
}

/// Live adapters keyed by source id
pub struct SourcePool {
    entries: Mutex<HashMap<SourceId, PoolEntry>>,
    factory: AdapterFactory,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
}

impl SourcePool {
    /// Create an empty pool
    ///
    /// Every adapter is started with a child of `cancel`, so cancelling it
    /// stops all workers the pool ever started.
    pub fn new(factory: AdapterFactory, handler: Arc<dyn MessageHandler>, cancel: CancellationToken) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            factory,
            handler,
            cancel,
        }
    }

    /// Start, restart, or keep the adapter for `source` depending on its hash
    ///
    /// # Errors
    /// `PoolError::Start` if the adapter cannot be built or started. The
    /// source is then not live, so the next reconcile retries it.
    pub async fn insert(&self, source: &Source) -> PoolResult<InsertOutcome> {
        if self.cancel.is_cancelled() {
            return Err(PoolError::ShutDown);
        }

        let hash = source.content_hash();
        let mut entries = self.entries.lock().await;

        let outcome = match entries.get(&source.uid) {
            Some(entry) if entry.hash == hash => return Ok(InsertOutcome::Unchanged),
            Some(_) => InsertOutcome::Restarted,
            None => InsertOutcome::Started,
        };

        if let Some(mut old) = entries.remove(&source.uid) {
            old.adapter.stop().await;
        }

        let start_error = |error| PoolError::Start {
            source_id: source.uid.clone(),
            error,
        };
        let mut adapter = self
            .factory
            .build(source, Arc::clone(&self.handler))
            .map_err(start_error)?;
        adapter
            .start(self.cancel.child_token())
            .await
            .map_err(start_error)?;

        entries.insert(source.uid.clone(), PoolEntry { hash, adapter });
        info!(
            source_id = %source.uid,
            source_type = %source.source_type(),
            workers = source.workers(),
            outcome = ?outcome,
            "source consumer live"
        );
        Ok(outcome)
    }

    /// Stop and forget the adapter for `uid`, returning whether one was live
    pub async fn remove(&self, uid: &SourceId) -> bool {
        let removed = self.entries.lock().await.remove(uid);
        match removed {
            Some(mut entry) => {
                entry.adapter.stop().await;
                info!(source_id = %uid, "source consumer removed");
                true
            }
            None => false,
        }
    }

    /// Whether an adapter is live for `uid`
    pub async fn contains(&self, uid: &SourceId) -> bool {
        self.entries.lock().await.contains_key(uid)
    }

    /// Ids of every live source
    pub async fn live_keys(&self) -> Vec<SourceId> {
        let mut keys: Vec<SourceId> = self.entries.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Config hash the live adapter for `uid` was started from
    pub async fn live_hash(&self, uid: &SourceId) -> Option<String> {
        self.entries.lock().await.get(uid).map(|entry| entry.hash.clone())
    }

    /// Running worker count of the live adapter for `uid`
    pub async fn running_workers(&self, uid: &SourceId) -> Option<usize> {
        self.entries
            .lock()
            .await
            .get(uid)
            .map(|entry| entry.adapter.running_workers())
    }

    /// Number of live sources
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no source is live
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Stop every adapter, returning how many were live
    pub async fn stop_all(&self) -> usize {
        let drained: Vec<(SourceId, PoolEntry)> = self.entries.lock().await.drain().collect();
        let count = drained.len();
        for (_, mut entry) in drained {
            entry.adapter.stop().await;
        }
        if count > 0 {
            info!(stopped = count, "all source consumers stopped");
        }
        count
    }

    /// The token every adapter's workers derive from
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
