//! Named table registration with duplicate protection
//!
//! The registry is constructed explicitly and handed to whoever needs it;
//! there is no process-wide default instance.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::TableError;
use crate::table::Table;

/// Registry of tables addressed by unique name
#[derive(Default)]
pub struct TableRegistry {
    tables: DashMap<String, Arc<Table>>,
}

impl TableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
        }
    }

    /// Register a table under `name`
    ///
    /// # Returns
    /// * `Ok(())` - The table is now addressable by `name`
    /// * `Err(TableError::AlreadyRegistered)` - Another table already uses `name`
    pub fn register(&self, name: impl Into<String>, table: Arc<Table>) -> Result<(), TableError> {
        let name = name.into();
        match self.tables.entry(name) {
            Entry::Occupied(entry) => Err(TableError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(table = %entry.key(), "registered table");
                entry.insert(table);
                Ok(())
            }
        }
    }

    /// Remove a table from the registry, returning it
    pub fn unregister(&self, name: &str) -> Result<Arc<Table>, TableError> {
        self.tables
            .remove(name)
            .map(|(_, table)| table)
            .ok_or_else(|| TableError::NotRegistered(name.to_string()))
    }

    /// Look up a table by name
    pub fn get(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether a table is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Names of every registered table
    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are registered
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRegistry")
            .field("tables", &self.names())
            .finish()
    }
}
