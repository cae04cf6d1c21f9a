//! Subscription loader state machine
//!
//! The loader owns convergence of the routing table. Its first successful
//! sync is a full load; every later sync asks storage only for what changed
//! relative to the baseline kept in its [`SubscriptionCollection`].
//!
//! `sync_changes` takes `&mut self`, so a single scheduler drives each loader
//! and the collection and state are never touched concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use route_table::{SyncError, Syncer, Table};
use tracing::{debug, info, warn};

use crate::collection::SubscriptionCollection;
use crate::config::LoaderConfig;
use crate::error::{ConfigError, FetchError};
use crate::fetcher::{RepositoryFetcher, SubscriptionFetcher};
use crate::repository::{ProjectRepository, SubscriptionRepository};
use crate::table_manager::{row_members, EventTypeIndexer, SubscriptionTableManager};

/// Name the loader reports to the sync runner.
pub const SUBSCRIPTION_LOADER_NAME: &str = "subscriptions";

/// Loader lifecycle. The transition to `Loaded` happens once and is never undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    /// No sync has succeeded yet; the next sync performs a full load
    Uninitialized,
    /// The table mirrors storage as of the baseline; syncs are incremental
    Loaded,
}

/// Result of one sync pass, used for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Subscriptions added or re-indexed
    pub upserted: usize,
    /// Subscriptions removed from the index
    pub removed: usize,
}

/// Keeps the routing table converged with subscription storage
pub struct SubscriptionLoader {
    fetcher: Box<dyn SubscriptionFetcher>,
    manager: Box<dyn SubscriptionTableManager>,
    collection: SubscriptionCollection,
    state: LoaderState,
    enable_debug: bool,
}

impl SubscriptionLoader {
    /// Create a loader from its collaborators
    pub fn new(
        fetcher: Box<dyn SubscriptionFetcher>,
        manager: Box<dyn SubscriptionTableManager>,
        enable_debug: bool,
    ) -> Self {
        Self {
            fetcher,
            manager,
            collection: SubscriptionCollection::new(),
            state: LoaderState::Uninitialized,
            enable_debug,
        }
    }

    /// Create a loader paging through the given repositories with the default indexer
    ///
    /// # Errors
    /// Returns `ConfigError` if `config` does not validate.
    pub fn from_repositories(
        projects: Arc<dyn ProjectRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        config: LoaderConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let fetcher = RepositoryFetcher::new(projects, subscriptions, config.batch_size)?;

        Ok(Self::new(
            Box::new(fetcher),
            Box::new(EventTypeIndexer::new()),
            config.enable_debug,
        ))
    }

    /// Current lifecycle state
    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// The baseline as of the last sync
    pub fn collection(&self) -> &SubscriptionCollection {
        &self.collection
    }

    /// Run one sync pass, full or incremental depending on state
    pub async fn sync(&mut self, table: &Table) -> Result<SyncReport, FetchError> {
        let report = match self.state {
            LoaderState::Uninitialized => self.perform_initial_load(table).await?,
            LoaderState::Loaded => self.perform_incremental_sync(table).await?,
        };

        if self.enable_debug {
            self.dump_table(table);
        }
        Ok(report)
    }

    async fn perform_initial_load(&mut self, table: &Table) -> Result<SyncReport, FetchError> {
        let subscriptions = self.fetcher.fetch_all_subscriptions().await?;

        for subscription in &subscriptions {
            self.collection.add_or_update(subscription);
            self.manager.add_subscription(subscription, table);
        }

        self.state = LoaderState::Loaded;
        info!(
            subscriptions = subscriptions.len(),
            keys = table.len(),
            "initial subscription load complete"
        );

        Ok(SyncReport {
            upserted: subscriptions.len(),
            removed: 0,
        })
    }

    async fn perform_incremental_sync(&mut self, table: &Table) -> Result<SyncReport, FetchError> {
        let mut report = SyncReport::default();

        let updated = self
            .fetcher
            .fetch_updated_subscriptions(self.collection.get_all())
            .await?;

        for subscription in &updated {
            // Old rows cannot be derived from the new event types
            self.manager
                .remove_subscription_from_all_event_types(subscription, table);
            self.collection.add_or_update(subscription);
            self.manager.add_subscription(subscription, table);
        }
        report.upserted = updated.len();

        // Updates stay applied if this fails; the next tick retries deletes
        let deleted = match self
            .fetcher
            .fetch_deleted_subscriptions(self.collection.get_all())
            .await
        {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(updated = report.upserted, error = %e, "delete phase failed after updates were applied");
                return Err(e);
            }
        };

        for subscription in &deleted {
            self.manager
                .remove_subscription_from_all_event_types(subscription, table);
            self.collection.remove(&subscription.uid);
        }
        report.removed = deleted.len();

        if report != SyncReport::default() {
            info!(
                updated = report.upserted,
                deleted = report.removed,
                keys = table.len(),
                "incremental subscription sync applied"
            );
        }
        Ok(report)
    }

    fn dump_table(&self, table: &Table) {
        let mut rows = table.get_items();
        rows.sort_by(|a, b| a.key().cmp(b.key()));

        debug!(
            keys = rows.len(),
            tracked = self.collection.len(),
            "subscription table contents"
        );
        for row in rows {
            let uids: Vec<String> = row_members(&row)
                .into_iter()
                .map(|subscription| subscription.uid.0)
                .collect();
            debug!(key = %row.key(), members = uids.len(), subscriptions = ?uids, "subscription row");
        }
    }
}

#[async_trait]
impl Syncer for SubscriptionLoader {
    fn name(&self) -> &str {
        SUBSCRIPTION_LOADER_NAME
    }

    async fn sync_changes(&mut self, table: &Table) -> Result<(), SyncError> {
        self.sync(table).await.map(|_| ()).map_err(SyncError::fetch)
    }
}
