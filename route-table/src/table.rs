//! Concurrent keyed row storage
//!
//! `Table` guards its rows with a reader/writer lock: lookups from the
//! dispatch path run concurrently, while loader mutations are serialized.
//! Absence is always `None`, never an error.

use std::any::Any;
use std::collections::HashMap;

use parking_lot::RwLock;

use crate::key::Key;
use crate::row::Row;

/// Keyed row store shared between one writer (a loader) and many readers.
///
/// # Example
///
/// ```rust
/// use route_table::{Key, Table};
///
/// let table = Table::new();
/// table.upsert(Key::new("p1", "a"), 1u8);
/// table.upsert(Key::new("p1", "a"), 2u8); // replaces
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get(&Key::new("p1", "a")).unwrap().value::<u8>(), Some(&2));
/// ```
#[derive(Default)]
pub struct Table {
    rows: RwLock<HashMap<Key, Row>>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a row by key
    pub fn get(&self, key: &Key) -> Option<Row> {
        self.rows.read().get(key).cloned()
    }

    /// Insert a row, replacing any existing row under the same key
    pub fn upsert<V>(&self, key: Key, value: V)
    where
        V: Any + Send + Sync,
    {
        let row = Row::new(key.clone(), value);
        self.rows.write().insert(key, row);
    }

    /// Remove a row, returning whether it existed
    pub fn delete(&self, key: &Key) -> bool {
        self.rows.write().remove(key).is_some()
    }

    /// Snapshot of all keys
    pub fn get_keys(&self) -> Vec<Key> {
        self.rows.read().keys().cloned().collect()
    }

    /// Snapshot of all rows
    pub fn get_items(&self) -> Vec<Row> {
        self.rows.read().values().cloned().collect()
    }

    /// Snapshot of the keys belonging to one project
    pub fn keys_for_project(&self, project_id: &str) -> Vec<Key> {
        self.rows
            .read()
            .keys()
            .filter(|key| key.has_project(project_id))
            .cloned()
            .collect()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Drop every row
    pub fn clear(&self) {
        self.rows.write().clear();
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("row_count", &self.len()).finish()
    }
}
