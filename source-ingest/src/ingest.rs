//! Ingest reconciliation loop
//!
//! Each tick diffs the desired sources (the source table) against the live
//! set (the pool) and applies the minimal starts and stops. Failures affect
//! only the source they belong to and are retried on the next tick.

use std::collections::HashMap;
use std::sync::Arc;

use route_table::Table;
use subscription_sync::ConfigError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::pool::{InsertOutcome, SourcePool};
use crate::types::{Source, SourceId};

/// Actions taken by one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub started: usize,
    pub restarted: usize,
    pub stopped: usize,
    pub failed: usize,
}

impl ReconcileReport {
    /// Whether the pass changed nothing and nothing failed
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Converges a [`SourcePool`] with the source table
pub struct Ingest {
    sources: Arc<Table>,
    pool: Arc<SourcePool>,
    config: IngestConfig,
}

impl Ingest {
    /// Create the loop over `sources` and `pool`
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` does not validate.
    pub fn new(
        sources: Arc<Table>,
        pool: Arc<SourcePool>,
        config: IngestConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            sources,
            pool,
            config,
        })
    }

    /// The pool this loop drives
    pub fn pool(&self) -> &Arc<SourcePool> {
        &self.pool
    }

    /// Desired sources by id; rows of another type are skipped
    ///
    /// Pool entries are keyed by source id alone, so when two rows carry the
    /// same id the row with the lowest key wins.
    fn desired_sources(&self) -> HashMap<SourceId, Source> {
        let mut rows = self.sources.get_items();
        rows.sort_by(|a, b| a.key().cmp(b.key()));

        let mut desired: HashMap<SourceId, Source> = HashMap::new();
        for row in rows {
            match row.value::<Source>() {
                Some(source) => match desired.get(&source.uid) {
                    Some(kept) => {
                        warn!(
                            source_id = %source.uid,
                            kept_project = %kept.project_id,
                            skipped_key = %row.key(),
                            "source id appears under more than one key, skipping duplicate"
                        );
                    }
                    None => {
                        desired.insert(source.uid.clone(), source.clone());
                    }
                },
                None => {
                    warn!(key = %row.key(), "source row holds an unexpected value type, skipping");
                }
            }
        }
        desired
    }

    /// Run one reconciliation pass
    pub async fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let desired = self.desired_sources();

        for uid in self.pool.live_keys().await {
            if !desired.contains_key(&uid) && self.pool.remove(&uid).await {
                report.stopped += 1;
            }
        }

        for (uid, source) in &desired {
            let live = self.pool.live_hash(uid).await;
            if live.as_deref() == Some(source.content_hash().as_str()) {
                continue;
            }

            match self.pool.insert(source).await {
                Ok(InsertOutcome::Started) => report.started += 1,
                Ok(InsertOutcome::Restarted) => report.restarted += 1,
                Ok(InsertOutcome::Unchanged) => {}
                Err(e) => {
                    warn!(source_id = %uid, error = %e, "failed to start source consumer");
                    report.failed += 1;
                }
            }
        }

        if !report.is_noop() {
            info!(
                started = report.started,
                restarted = report.restarted,
                stopped = report.stopped,
                failed = report.failed,
                "ingest reconciled"
            );
        }
        report
    }

    /// Reconcile every `interval` until `cancel` fires, then stop every adapter
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval = ?self.config.interval, "ingest loop running");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.reconcile().await;
                }
            }
        }

        let stopped = self.pool.stop_all().await;
        info!(stopped, "ingest loop stopped");
    }
}
