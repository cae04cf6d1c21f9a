//! Batched subscription fetching
//!
//! The fetcher turns the paged repository API into complete result sets.
//! Any repository failure aborts the whole fetch; a partial result is never
//! returned.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LoaderConfig;
use crate::error::{ConfigError, FetchError, RepositoryError};
use crate::repository::{ProjectRepository, SubscriptionRepository};
use crate::types::{Page, PageRequest, ProjectId, Subscription, SubscriptionUpdate};

/// Pulls full, updated, and deleted subscription sets from storage
#[async_trait]
pub trait SubscriptionFetcher: Send + Sync {
    /// Every live subscription across every project. Used for the first sync.
    async fn fetch_all_subscriptions(&self) -> Result<Vec<Subscription>, FetchError>;

    /// Subscriptions newer than their `baseline` entry, plus ones not in it.
    async fn fetch_updated_subscriptions(
        &self,
        baseline: &[SubscriptionUpdate],
    ) -> Result<Vec<Subscription>, FetchError>;

    /// Subscriptions in `baseline` that are gone or soft-deleted in storage.
    async fn fetch_deleted_subscriptions(
        &self,
        baseline: &[SubscriptionUpdate],
    ) -> Result<Vec<Subscription>, FetchError>;
}

/// [`SubscriptionFetcher`] backed by injected repositories
pub struct RepositoryFetcher {
    projects: Arc<dyn ProjectRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    batch_size: usize,
}

impl RepositoryFetcher {
    /// Create a fetcher paging through the repositories `batch_size` rows at a time
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidBatchSize` for a zero batch size.
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        batch_size: usize,
    ) -> Result<Self, ConfigError> {
        LoaderConfig::new().with_batch_size(batch_size).validate()?;
        Ok(Self {
            projects,
            subscriptions,
            batch_size,
        })
    }

    /// The configured page size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn project_ids(&self) -> Result<Vec<ProjectId>, FetchError> {
        self.projects
            .load_projects()
            .await
            .map_err(|source| FetchError::Repository {
                operation: "load_projects",
                source,
            })
    }
}

#[async_trait]
impl SubscriptionFetcher for RepositoryFetcher {
    async fn fetch_all_subscriptions(&self) -> Result<Vec<Subscription>, FetchError> {
        let project_ids = self.project_ids().await?;
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let repo = &self.subscriptions;
        let ids = &project_ids;
        let subscriptions = drain_pages("load_all_subscription_config", self.batch_size, move |page| {
            repo.load_all_subscription_config(ids, page)
        })
        .await?;

        tracing::debug!(
            projects = project_ids.len(),
            subscriptions = subscriptions.len(),
            "fetched all subscriptions"
        );
        Ok(subscriptions)
    }

    async fn fetch_updated_subscriptions(
        &self,
        baseline: &[SubscriptionUpdate],
    ) -> Result<Vec<Subscription>, FetchError> {
        let project_ids = self.project_ids().await?;
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let repo = &self.subscriptions;
        let ids = &project_ids;
        let updated = drain_pages("fetch_updated_subscriptions", self.batch_size, move |page| {
            repo.fetch_updated_subscriptions(ids, baseline, page)
        })
        .await?;

        tracing::debug!(
            baseline = baseline.len(),
            updated = updated.len(),
            "fetched updated subscriptions"
        );
        Ok(updated)
    }

    async fn fetch_deleted_subscriptions(
        &self,
        baseline: &[SubscriptionUpdate],
    ) -> Result<Vec<Subscription>, FetchError> {
        if baseline.is_empty() {
            return Ok(Vec::new());
        }

        let project_ids = self.project_ids().await?;
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let repo = &self.subscriptions;
        let ids = &project_ids;
        let deleted = drain_pages("fetch_deleted_subscriptions", self.batch_size, move |page| {
            repo.fetch_deleted_subscriptions(ids, baseline, page)
        })
        .await?;

        tracing::debug!(
            baseline = baseline.len(),
            deleted = deleted.len(),
            "fetched deleted subscriptions"
        );
        Ok(deleted)
    }
}

/// Follow `next_cursor` until the repository reports the last page
async fn drain_pages<F, Fut>(
    operation: &'static str,
    batch_size: usize,
    mut fetch_page: F,
) -> Result<Vec<Subscription>, FetchError>
where
    F: FnMut(PageRequest) -> Fut + Send,
    Fut: Future<Output = Result<Page<Subscription>, RepositoryError>> + Send,
{
    let mut collected = Vec::new();
    let mut request = PageRequest::first(batch_size);

    loop {
        let page = fetch_page(request)
            .await
            .map_err(|source| FetchError::Repository { operation, source })?;

        let received = page.items.len();
        collected.extend(page.items);

        match page.next_cursor {
            // An empty page with a cursor would loop forever
            Some(cursor) if received > 0 => request = PageRequest::after(batch_size, cursor),
            _ => break,
        }
    }

    Ok(collected)
}
