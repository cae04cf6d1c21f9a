//! Source table loader
//!
//! Mirrors every pub/sub source of every project into a table keyed
//! `(project id, source id)`. Sources are few, so each sync is a full load
//! diffed against the table rather than an incremental fetch.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use route_table::{Key, SyncError, Syncer, Table};
use subscription_sync::{ConfigError, FetchError, PageRequest, ProjectRepository};
use tracing::{debug, info};

use crate::repository::SourceRepository;
use crate::types::Source;

/// Name the loader reports to the sync runner.
pub const SOURCE_LOADER_NAME: &str = "sources";

/// Table key of a source row
pub fn source_key(source: &Source) -> Key {
    Key::new(source.project_id.as_str(), source.uid.as_str())
}

/// Keeps the source table converged with source storage
pub struct SourceLoader {
    projects: Arc<dyn ProjectRepository>,
    sources: Arc<dyn SourceRepository>,
    batch_size: usize,
    enable_debug: bool,
}

impl SourceLoader {
    /// Create a loader paging `batch_size` sources at a time
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidBatchSize` for a zero batch size.
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        sources: Arc<dyn SourceRepository>,
        batch_size: usize,
        enable_debug: bool,
    ) -> Result<Self, ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            projects,
            sources,
            batch_size,
            enable_debug,
        })
    }

    /// Every pub/sub source across every project
    pub async fn fetch_sources(&self) -> Result<Vec<Source>, FetchError> {
        let project_ids = self
            .projects
            .load_projects()
            .await
            .map_err(|source| FetchError::Repository {
                operation: "load_projects",
                source,
            })?;
        if project_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut collected = Vec::new();
        let mut request = PageRequest::first(self.batch_size);
        loop {
            let page = self
                .sources
                .load_pub_sub_sources_by_project_ids(&project_ids, request)
                .await
                .map_err(|source| FetchError::Repository {
                    operation: "load_pub_sub_sources_by_project_ids",
                    source,
                })?;

            let received = page.items.len();
            collected.extend(page.items);
            match page.next_cursor {
                Some(cursor) if received > 0 => request = PageRequest::after(self.batch_size, cursor),
                _ => break,
            }
        }
        Ok(collected)
    }

    /// Apply `desired` to `table`, returning (upserted, removed)
    fn apply(&self, desired: Vec<Source>, table: &Table) -> (usize, usize) {
        let desired: HashMap<Key, Source> = desired
            .into_iter()
            .map(|source| (source_key(&source), source))
            .collect();

        let mut removed = 0;
        for key in table.get_keys() {
            if !desired.contains_key(&key) && table.delete(&key) {
                removed += 1;
            }
        }

        let mut upserted = 0;
        for (key, source) in desired {
            let unchanged = table
                .get(&key)
                .is_some_and(|row| row.value::<Source>() == Some(&source));
            if !unchanged {
                table.upsert(key, source);
                upserted += 1;
            }
        }

        (upserted, removed)
    }

    fn dump_table(&self, table: &Table) {
        let mut rows = table.get_items();
        rows.sort_by(|a, b| a.key().cmp(b.key()));

        debug!(keys = rows.len(), "source table contents");
        for row in rows {
            match row.value::<Source>() {
                Some(source) => debug!(
                    key = %row.key(),
                    source_type = %source.source_type(),
                    workers = source.config.workers,
                    "source row"
                ),
                None => debug!(key = %row.key(), "source row with unexpected value type"),
            }
        }
    }
}

#[async_trait]
impl Syncer for SourceLoader {
    fn name(&self) -> &str {
        SOURCE_LOADER_NAME
    }

    async fn sync_changes(&mut self, table: &Table) -> Result<(), SyncError> {
        let desired = self.fetch_sources().await.map_err(SyncError::fetch)?;
        let total = desired.len();

        let (upserted, removed) = self.apply(desired, table);
        if upserted > 0 || removed > 0 {
            info!(sources = total, upserted, removed, "source table updated");
        }

        if self.enable_debug {
            self.dump_table(table);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemorySourceStore, MockSourceRepository};
    use crate::types::{ProviderSettings, PubSubConfig, SourceId};
    use subscription_sync::{Page, RepositoryError};

    fn source(uid: &str, project: &str, workers: u32) -> Source {
        Source::new(
            uid,
            project,
            PubSubConfig::new(
                workers,
                ProviderSettings::Sqs {
                    queue_name: uid.to_string(),
                    region: "us-east-1".to_string(),
                    access_key_id: "id".to_string(),
                    secret_key: "key".to_string(),
                },
            ),
        )
    }

    fn loader(store: &Arc<InMemorySourceStore>, batch_size: usize) -> SourceLoader {
        SourceLoader::new(store.clone(), store.clone(), batch_size, true).unwrap()
    }

    #[tokio::test]
    async fn test_sync_adds_updates_and_deletes() {
        let store = Arc::new(InMemorySourceStore::new());
        store.upsert_source(source("a", "p1", 1));
        store.upsert_source(source("b", "p2", 1));
        let mut loader = loader(&store, 1);
        let table = Table::new();

        loader.sync_changes(&table).await.unwrap();
        assert_eq!(table.len(), 2);

        store.update_config(&SourceId::new("a"), source("a", "p1", 4).config);
        store.remove_source(&SourceId::new("b"));
        loader.sync_changes(&table).await.unwrap();

        assert_eq!(table.len(), 1);
        let row = table.get(&Key::new("p1", "a")).unwrap();
        assert_eq!(row.value::<Source>().unwrap().config.workers, 4);
        assert!(table.get(&Key::new("p2", "b")).is_none());
    }

    #[tokio::test]
    async fn test_mistyped_row_is_replaced() {
        let store = Arc::new(InMemorySourceStore::new());
        store.upsert_source(source("a", "p1", 1));
        let table = Table::new();
        table.upsert(Key::new("p1", "a"), "garbage".to_string());

        loader(&store, 10).sync_changes(&table).await.unwrap();
        assert!(table.get(&Key::new("p1", "a")).unwrap().holds::<Source>());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_table_untouched() {
        let mut sources = MockSourceRepository::new();
        sources
            .expect_load_pub_sub_sources_by_project_ids()
            .returning(|_, page| match page.cursor {
                None => Ok(Page::with_next(vec![source("a", "p1", 1)], "a")),
                Some(_) => Err(RepositoryError::Timeout("page 2".to_string())),
            });
        let projects = Arc::new(InMemorySourceStore::new());
        projects.add_project("p1");

        let table = Table::new();
        table.upsert(Key::new("p1", "old"), source("old", "p1", 1));

        let mut loader = SourceLoader::new(projects, Arc::new(sources), 1, false).unwrap();
        assert!(loader.sync_changes(&table).await.is_err());

        assert_eq!(table.len(), 1);
        assert!(table.get(&Key::new("p1", "old")).is_some());
    }

    #[test]
    fn test_zero_batch_size() {
        let store = Arc::new(InMemorySourceStore::new());
        assert!(matches!(
            SourceLoader::new(store.clone(), store, 0, false),
            Err(ConfigError::InvalidBatchSize(0))
        ));
    }
}
