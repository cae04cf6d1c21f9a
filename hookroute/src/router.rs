//! RoutingCore - wires the loaders, tables and Ingest loop together

use std::sync::Arc;

use route_table::{Table, TableRegistry};
use source_ingest::{
    AdapterFactory, EventIngestHandler, Ingest, SourceLoader, SourcePool, SourceRepository,
    WorkQueue, SOURCE_LOADER_NAME,
};
use subscription_sync::{
    find_subscriptions, ProjectId, ProjectRepository, Subscription, SubscriptionLoader,
    SubscriptionRepository, SUBSCRIPTION_LOADER_NAME,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::RouterConfig;
use crate::error::{Result, RouterError};
use crate::sync_runner::spawn_sync_runner;

/// The routing core of the webhook platform
///
/// Owns the `subscriptions` and `sources` tables, the loaders that keep them
/// in step with storage, and the Ingest loop that keeps one consumer per
/// source running. Every spawned task hangs off a single root
/// [`CancellationToken`].
///
/// # Example
///
/// ```rust,ignore
/// let mut core = RoutingCore::builder()
///     .projects(store.clone())
///     .subscriptions(store.clone())
///     .sources(source_store.clone())
///     .work_queue(queue)
///     .adapters(factory)
///     .config(RouterConfig::from_env()?)
///     .build()?;
///
/// core.start()?;
/// let targets = core.subscriptions_for(&ProjectId::new("p1"), "user.created");
/// core.shutdown().await;
/// ```
pub struct RoutingCore {
    config: RouterConfig,
    registry: TableRegistry,
    subscriptions: Arc<Table>,
    sources: Arc<Table>,
    pending: Option<Loaders>,
    ingest: Arc<Ingest>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

struct Loaders {
    subscriptions: SubscriptionLoader,
    sources: SourceLoader,
}

impl RoutingCore {
    pub fn builder() -> RoutingCoreBuilder {
        RoutingCoreBuilder::default()
    }

    /// Spawn both sync runners and the Ingest loop
    ///
    /// # Errors
    /// `RouterError::AlreadyStarted` on a second call, `RouterError::ShutDown`
    /// after [`shutdown`](Self::shutdown) has cancelled the root token.
    pub fn start(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RouterError::ShutDown);
        }
        let loaders = self.pending.take().ok_or(RouterError::AlreadyStarted)?;

        self.tasks.push(spawn_sync_runner(
            Box::new(loaders.subscriptions),
            Arc::clone(&self.subscriptions),
            self.config.sync_interval,
            self.cancel.child_token(),
        ));
        self.tasks.push(spawn_sync_runner(
            Box::new(loaders.sources),
            Arc::clone(&self.sources),
            self.config.sync_interval,
            self.cancel.child_token(),
        ));

        let ingest = Arc::clone(&self.ingest);
        let cancel = self.cancel.child_token();
        self.tasks
            .push(tokio::spawn(async move { ingest.run(cancel).await }));

        info!(
            sync_interval = ?self.config.sync_interval,
            ingest_interval = ?self.config.ingest_interval,
            "routing core started"
        );
        Ok(())
    }

    /// Whether [`start`](Self::start) has run and shutdown has not
    pub fn is_running(&self) -> bool {
        self.pending.is_none() && !self.cancel.is_cancelled()
    }

    /// Subscriptions routed for `event_type` in `project_id`
    pub fn subscriptions_for(&self, project_id: &ProjectId, event_type: &str) -> Vec<Subscription> {
        find_subscriptions(&self.subscriptions, project_id, event_type)
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn subscription_table(&self) -> &Arc<Table> {
        &self.subscriptions
    }

    pub fn source_table(&self) -> &Arc<Table> {
        &self.sources
    }

    pub fn pool(&self) -> &Arc<SourcePool> {
        self.ingest.pool()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Root token; cancelling it has the same effect as [`shutdown`](Self::shutdown)
    /// without waiting for the tasks
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every task and wait for them to finish
    ///
    /// The Ingest loop stops every live consumer before its task returns.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "routing core task ended abnormally");
            }
        }
        // Covers a core that was built but never started
        self.ingest.pool().stop_all().await;
        info!("routing core shut down");
    }
}

/// Builder for [`RoutingCore`]
#[derive(Default)]
pub struct RoutingCoreBuilder {
    projects: Option<Arc<dyn ProjectRepository>>,
    subscriptions: Option<Arc<dyn SubscriptionRepository>>,
    sources: Option<Arc<dyn SourceRepository>>,
    work_queue: Option<Arc<dyn WorkQueue>>,
    adapters: Option<AdapterFactory>,
    config: RouterConfig,
}

impl RoutingCoreBuilder {
    pub fn projects(mut self, projects: Arc<dyn ProjectRepository>) -> Self {
        self.projects = Some(projects);
        self
    }

    pub fn subscriptions(mut self, subscriptions: Arc<dyn SubscriptionRepository>) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    pub fn sources(mut self, sources: Arc<dyn SourceRepository>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn work_queue(mut self, work_queue: Arc<dyn WorkQueue>) -> Self {
        self.work_queue = Some(work_queue);
        self
    }

    pub fn adapters(mut self, adapters: AdapterFactory) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and construct every component
    ///
    /// Nothing is spawned until [`RoutingCore::start`].
    ///
    /// # Errors
    /// `RouterError::Config` for invalid settings and
    /// `RouterError::MissingComponent` when a collaborator was not supplied.
    pub fn build(self) -> Result<RoutingCore> {
        self.config.validate()?;

        let projects = self.projects.ok_or(RouterError::MissingComponent("projects"))?;
        let subscription_repo = self
            .subscriptions
            .ok_or(RouterError::MissingComponent("subscriptions"))?;
        let source_repo = self.sources.ok_or(RouterError::MissingComponent("sources"))?;
        let work_queue = self
            .work_queue
            .ok_or(RouterError::MissingComponent("work_queue"))?;
        let adapters = self.adapters.ok_or(RouterError::MissingComponent("adapters"))?;

        let subscriptions = Arc::new(Table::new());
        let sources = Arc::new(Table::new());
        let registry = TableRegistry::new();
        registry.register(SUBSCRIPTION_LOADER_NAME, Arc::clone(&subscriptions))?;
        registry.register(SOURCE_LOADER_NAME, Arc::clone(&sources))?;

        let loaders = Loaders {
            subscriptions: SubscriptionLoader::from_repositories(
                Arc::clone(&projects),
                subscription_repo,
                self.config.loader_config(),
            )?,
            sources: SourceLoader::new(
                projects,
                source_repo,
                self.config.batch_size,
                self.config.enable_debug,
            )?,
        };

        let cancel = CancellationToken::new();
        let pool = Arc::new(SourcePool::new(
            adapters,
            Arc::new(EventIngestHandler::new(work_queue)),
            cancel.child_token(),
        ));
        let ingest = Arc::new(Ingest::new(
            Arc::clone(&sources),
            pool,
            self.config.ingest_config(),
        )?);

        Ok(RoutingCore {
            config: self.config,
            registry,
            subscriptions,
            sources,
            pending: Some(loaders),
            ingest,
            cancel,
            tasks: Vec::new(),
        })
    }
}
