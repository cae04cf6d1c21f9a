//! # subscription-sync
//!
//! Mirrors webhook subscriptions from persistent storage into a routing
//! [`Table`](route_table::Table) keyed by `(project id, event type)`.
//!
//! The first sync loads everything; later syncs ask storage only for
//! subscriptions that changed or disappeared since the last baseline, then
//! apply the minimal table mutations.
//!
//! ```text
//! SubscriptionLoader (Syncer)
//!     ├── SubscriptionFetcher ── ProjectRepository, SubscriptionRepository
//!     ├── SubscriptionTableManager ── Table rows: Vec<Subscription>
//!     └── SubscriptionCollection ── baseline of (uid, updated_at)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use route_table::{Syncer, Table};
//! use subscription_sync::{
//!     find_subscriptions, InMemorySubscriptionStore, LoaderConfig, ProjectId, Subscription,
//!     SubscriptionLoader,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(InMemorySubscriptionStore::new());
//! store.upsert_subscription(Subscription::new("sub-1", "project-1", ["user.created"]));
//!
//! let mut loader = SubscriptionLoader::from_repositories(
//!     store.clone(),
//!     store.clone(),
//!     LoaderConfig::default(),
//! )?;
//!
//! let table = Table::new();
//! loader.sync_changes(&table).await?;
//!
//! let matches = find_subscriptions(&table, &ProjectId::new("project-1"), "user.created");
//! assert_eq!(matches.len(), 1);
//! # Ok(())
//! # }
//! ```

mod collection;
mod config;
mod error;
mod fetcher;
mod loader;
mod lookup;
mod memory;
mod repository;
mod table_manager;
mod types;

pub use collection::*;
pub use config::*;
pub use error::*;
pub use fetcher::*;
pub use loader::*;
pub use lookup::*;
pub use memory::*;
pub use repository::*;
pub use table_manager::{EventTypeIndexer, SubscriptionTableManager};
pub use types::*;
