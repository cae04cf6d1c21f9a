//! Concurrent Row Store for Routing Indexes
//!
//! A small keyed row store that the hookroute loaders keep converged with
//! persistent storage. Rows are addressed by a composite [`Key`] of project id
//! and discriminator (an event type for subscription rows, a source id for
//! source rows) and carry a type-erased value.
//!
//! # Quick Start
//!
//! ```rust
//! use route_table::{Key, Table};
//!
//! let table = Table::new();
//! let key = Key::new("project-1", "user.created");
//!
//! table.upsert(key.clone(), vec!["sub-1".to_string()]);
//!
//! let row = table.get(&key).expect("row exists");
//! assert_eq!(row.value::<Vec<String>>(), Some(&vec!["sub-1".to_string()]));
//!
//! // Reading with the wrong type is not an error, just an absent value
//! assert!(row.value::<u64>().is_none());
//!
//! table.delete(&key);
//! assert!(table.get(&key).is_none());
//! ```
//!
//! # Architecture
//!
//! ```text
//! TableRegistry
//!     │
//!     └── tables: DashMap<name, Arc<Table>>
//!             │
//!             └── Table
//!                   └── rows: RwLock<HashMap<Key, Row>>
//!                             │
//!                             └── Row { key, value: Arc<dyn Any + Send + Sync> }
//! ```
//!
//! Loaders implement [`Syncer`] and are the only writers of a table; readers
//! on the dispatch path only ever call [`Table::get`].

pub mod error;
pub mod key;
pub mod registry;
pub mod row;
pub mod syncer;
pub mod table;

pub use error::{SyncError, TableError};
pub use key::Key;
pub use registry::TableRegistry;
pub use row::Row;
pub use syncer::Syncer;
pub use table::Table;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{SyncError, TableError};
    pub use crate::key::Key;
    pub use crate::registry::TableRegistry;
    pub use crate::row::Row;
    pub use crate::syncer::Syncer;
    pub use crate::table::Table;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_full_workflow() {
        let registry = TableRegistry::new();
        let table = Arc::new(Table::new());
        registry.register("routes", Arc::clone(&table)).unwrap();

        let key = Key::new("project-1", "order.created");
        table.upsert(key.clone(), 7u32);

        let shared = registry.get("routes").unwrap();
        assert_eq!(shared.get(&key).unwrap().value::<u32>(), Some(&7));
    }

    #[test]
    fn test_rows_from_multiple_projects() {
        let table = Table::new();

        table.upsert(Key::new("p1", "a"), 1u8);
        table.upsert(Key::new("p1", "b"), 2u8);
        table.upsert(Key::new("p2", "a"), 3u8);

        assert_eq!(table.len(), 3);
        assert_eq!(table.keys_for_project("p1").len(), 2);
        assert_eq!(table.keys_for_project("p2").len(), 1);
        assert!(table.keys_for_project("p3").is_empty());
    }
}
