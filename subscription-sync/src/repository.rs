//! Persistent-storage seams consumed by the fetcher.
//!
//! Every call is project-scoped and paged. Implementations return the last
//! stored row for soft-deleted subscriptions so callers still know which
//! project the subscription belonged to.

use async_trait::async_trait;

use crate::error::RepositoryError;
use crate::types::{Page, PageRequest, ProjectId, Subscription, SubscriptionUpdate};

/// Lists the projects whose subscriptions should be mirrored.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Ids of every active project.
    async fn load_projects(&self) -> Result<Vec<ProjectId>, RepositoryError>;
}

/// Subscription storage as seen by the routing core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Every live subscription in the given projects.
    async fn load_all_subscription_config(
        &self,
        project_ids: &[ProjectId],
        page: PageRequest,
    ) -> Result<Page<Subscription>, RepositoryError>;

    /// Live subscriptions that are newer than `known`, or missing from it.
    async fn fetch_updated_subscriptions(
        &self,
        project_ids: &[ProjectId],
        known: &[SubscriptionUpdate],
        page: PageRequest,
    ) -> Result<Page<Subscription>, RepositoryError>;

    /// Subscriptions in `known` that have since been deleted.
    async fn fetch_deleted_subscriptions(
        &self,
        project_ids: &[ProjectId],
        known: &[SubscriptionUpdate],
        page: PageRequest,
    ) -> Result<Page<Subscription>, RepositoryError>;
}
