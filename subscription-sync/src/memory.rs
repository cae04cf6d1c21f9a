//! In-memory subscription storage
//!
//! Implements both repository traits over process-local maps. Used by tests
//! and by embedders that keep subscriptions outside a database. Deletes are
//! soft so deleted rows can still be reported with their project.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use crate::error::RepositoryError;
use crate::repository::{ProjectRepository, SubscriptionRepository};
use crate::types::{Page, PageRequest, ProjectId, Subscription, SubscriptionId, SubscriptionUpdate};

#[derive(Debug, Clone)]
struct StoredSubscription {
    subscription: Subscription,
    deleted_at: Option<DateTime<Utc>>,
}

/// Process-local [`ProjectRepository`] and [`SubscriptionRepository`]
#[derive(Debug, Default)]
pub struct InMemorySubscriptionStore {
    projects: RwLock<BTreeSet<ProjectId>>,
    rows: RwLock<BTreeMap<SubscriptionId, StoredSubscription>>,
    unavailable: AtomicBool,
}

impl InMemorySubscriptionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project
    pub fn add_project(&self, project_id: impl Into<ProjectId>) {
        self.projects.write().insert(project_id.into());
    }

    /// Insert or replace a subscription, registering its project
    pub fn upsert_subscription(&self, subscription: Subscription) {
        self.projects.write().insert(subscription.project_id.clone());
        self.rows.write().insert(
            subscription.uid.clone(),
            StoredSubscription {
                subscription,
                deleted_at: None,
            },
        );
    }

    /// Replace a live subscription's event types, bumping `updated_at`
    ///
    /// Returns false if the subscription is unknown or deleted.
    pub fn update_event_types<I, S>(&self, uid: &SubscriptionId, event_types: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rows = self.rows.write();
        let Some(stored) = rows.get_mut(uid) else {
            return false;
        };
        if stored.deleted_at.is_some() {
            return false;
        }

        stored.subscription.event_types = event_types.into_iter().map(Into::into).collect();
        stored.subscription.updated_at = next_timestamp(stored.subscription.updated_at);
        true
    }

    /// Mark a subscription deleted, returning whether it was live
    pub fn soft_delete(&self, uid: &SubscriptionId) -> bool {
        let mut rows = self.rows.write();
        match rows.get_mut(uid) {
            Some(stored) if stored.deleted_at.is_none() => {
                stored.deleted_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Make every call fail with `RepositoryError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stored copy of a subscription, deleted or not
    pub fn get(&self, uid: &SubscriptionId) -> Option<Subscription> {
        self.rows.read().get(uid).map(|stored| stored.subscription.clone())
    }

    /// Number of live subscriptions
    pub fn live_count(&self) -> usize {
        self.rows
            .read()
            .values()
            .filter(|stored| stored.deleted_at.is_none())
            .count()
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory subscription store switched off".to_string(),
            ));
        }
        Ok(())
    }

    /// Page through rows of `project_ids` accepted by `filter`, in uid order
    fn page_where<F>(
        &self,
        project_ids: &[ProjectId],
        page: &PageRequest,
        filter: F,
    ) -> Result<Page<Subscription>, RepositoryError>
    where
        F: Fn(&StoredSubscription) -> bool,
    {
        self.check_available()?;

        let rows = self.rows.read();
        let mut matching = rows
            .values()
            .filter(|stored| project_ids.contains(&stored.subscription.project_id))
            .filter(|stored| match page.cursor.as_deref() {
                Some(cursor) => stored.subscription.uid.as_str() > cursor,
                None => true,
            })
            .filter(|stored| filter(stored))
            .map(|stored| stored.subscription.clone());

        let items: Vec<Subscription> = matching.by_ref().take(page.per_page).collect();
        let has_more = matching.next().is_some();

        let next_cursor = if has_more {
            items.last().map(|last| last.uid.0.clone())
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }
}

/// A timestamp strictly after `previous`, even when the clock has not advanced
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

#[async_trait]
impl ProjectRepository for InMemorySubscriptionStore {
    async fn load_projects(&self) -> Result<Vec<ProjectId>, RepositoryError> {
        self.check_available()?;
        Ok(self.projects.read().iter().cloned().collect())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionStore {
    async fn load_all_subscription_config(
        &self,
        project_ids: &[ProjectId],
        page: PageRequest,
    ) -> Result<Page<Subscription>, RepositoryError> {
        self.page_where(project_ids, &page, |stored| stored.deleted_at.is_none())
    }

    async fn fetch_updated_subscriptions(
        &self,
        project_ids: &[ProjectId],
        known: &[SubscriptionUpdate],
        page: PageRequest,
    ) -> Result<Page<Subscription>, RepositoryError> {
        let known: BTreeMap<&SubscriptionId, DateTime<Utc>> =
            known.iter().map(|update| (&update.uid, update.updated_at)).collect();

        self.page_where(project_ids, &page, |stored| {
            if stored.deleted_at.is_some() {
                return false;
            }
            match known.get(&stored.subscription.uid) {
                Some(seen) => stored.subscription.updated_at > *seen,
                None => true,
            }
        })
    }

    async fn fetch_deleted_subscriptions(
        &self,
        project_ids: &[ProjectId],
        known: &[SubscriptionUpdate],
        page: PageRequest,
    ) -> Result<Page<Subscription>, RepositoryError> {
        let known: BTreeSet<&SubscriptionId> = known.iter().map(|update| &update.uid).collect();

        self.page_where(project_ids, &page, |stored| {
            stored.deleted_at.is_some() && known.contains(&stored.subscription.uid)
        })
    }
}
