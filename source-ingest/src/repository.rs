//! Source storage seam and its in-memory implementation

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use subscription_sync::{Page, PageRequest, ProjectId, ProjectRepository, RepositoryError};

use crate::types::{PubSubConfig, Source, SourceId};

/// Source storage as seen by the source loader
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Pub/sub sources of the given projects, in stable uid order
    async fn load_pub_sub_sources_by_project_ids(
        &self,
        project_ids: &[ProjectId],
        page: PageRequest,
    ) -> Result<Page<Source>, RepositoryError>;
}

/// Process-local [`SourceRepository`]
///
/// Also answers [`ProjectRepository`] with every project that has been
/// registered or owns a source, so it can drive a source loader on its own.
#[derive(Debug, Default)]
pub struct InMemorySourceStore {
    projects: RwLock<BTreeSet<ProjectId>>,
    sources: RwLock<BTreeMap<SourceId, Source>>,
    unavailable: AtomicBool,
}

impl InMemorySourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project with no sources
    pub fn add_project(&self, project_id: impl Into<ProjectId>) {
        self.projects.write().insert(project_id.into());
    }

    /// Insert or replace a source, registering its project
    pub fn upsert_source(&self, source: Source) {
        self.projects.write().insert(source.project_id.clone());
        self.sources.write().insert(source.uid.clone(), source);
    }

    /// Replace a source's consumer configuration
    pub fn update_config(&self, uid: &SourceId, config: PubSubConfig) -> bool {
        match self.sources.write().get_mut(uid) {
            Some(source) => {
                source.config = config;
                source.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Delete a source, returning whether it existed
    pub fn remove_source(&self, uid: &SourceId) -> bool {
        self.sources.write().remove(uid).is_some()
    }

    /// Make every call fail with `RepositoryError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "in-memory source store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for InMemorySourceStore {
    async fn load_projects(&self) -> Result<Vec<ProjectId>, RepositoryError> {
        self.check_available()?;
        Ok(self.projects.read().iter().cloned().collect())
    }
}

#[async_trait]
impl SourceRepository for InMemorySourceStore {
    async fn load_pub_sub_sources_by_project_ids(
        &self,
        project_ids: &[ProjectId],
        page: PageRequest,
    ) -> Result<Page<Source>, RepositoryError> {
        self.check_available()?;

        let sources = self.sources.read();
        let mut matching = sources
            .values()
            .filter(|source| project_ids.contains(&source.project_id))
            .filter(|source| match page.cursor.as_deref() {
                Some(cursor) => source.uid.as_str() > cursor,
                None => true,
            })
            .cloned();

        let items: Vec<Source> = matching.by_ref().take(page.per_page).collect();
        let next_cursor = if matching.next().is_some() {
            items.last().map(|last| last.uid.0.clone())
        } else {
            None
        };
        Ok(Page { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderSettings;

    fn source(uid: &str, project: &str) -> Source {
        Source::new(
            uid,
            project,
            PubSubConfig::new(
                1,
                ProviderSettings::Amqp {
                    host: "localhost".to_string(),
                    port: 5672,
                    queue: uid.to_string(),
                    auth: None,
                },
            ),
        )
    }

    #[tokio::test]
    async fn test_project_scoped_paging() {
        let store = InMemorySourceStore::new();
        store.upsert_source(source("a", "p1"));
        store.upsert_source(source("b", "p2"));
        store.upsert_source(source("c", "p1"));

        let projects = vec![ProjectId::new("p1")];
        let first = store
            .load_pub_sub_sources_by_project_ids(&projects, PageRequest::first(1))
            .await
            .unwrap();
        assert_eq!(first.items[0].uid, SourceId::new("a"));
        assert_eq!(first.next_cursor.as_deref(), Some("a"));

        let second = store
            .load_pub_sub_sources_by_project_ids(&projects, PageRequest::after(1, "a"))
            .await
            .unwrap();
        assert_eq!(second.items[0].uid, SourceId::new("c"));
        assert!(!second.has_more());

        assert_eq!(store.load_projects().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemorySourceStore::new();
        store.set_unavailable(true);
        assert!(store.load_projects().await.is_err());
        assert!(store
            .load_pub_sub_sources_by_project_ids(&[], PageRequest::first(10))
            .await
            .is_err());
    }
}
