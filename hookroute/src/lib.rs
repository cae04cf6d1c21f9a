//! # hookroute
//!
//! The routing core of a webhook platform. It answers "which subscriptions
//! receive event type E in project P" from an in-memory index kept in step
//! with storage, and keeps one consumer running per configured inbound
//! source, turning provider messages into create-event jobs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────── RoutingCore ────────────────────────────┐
//! │                                                                      │
//! │  sync runner ─ SubscriptionLoader ─▶ "subscriptions" Table           │
//! │                  (initial load, then updated/deleted diffs)          │
//! │                                                                      │
//! │  sync runner ─ SourceLoader ───────▶ "sources" Table                 │
//! │                                          │                           │
//! │  Ingest loop ─ diff table vs SourcePool ─┘                           │
//! │                  │ start / restart (hash changed) / stop             │
//! │                  ▼                                                   │
//! │             ConsumerAdapter × N workers ─▶ WorkQueue                 │
//! │                                                                      │
//! │  root CancellationToken ── child per runner, per adapter             │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Crates
//!
//! - [`route_table`]: keyed row store, table registry, `Syncer` contract
//! - [`subscription_sync`]: subscription model, repositories, loader
//! - [`source_ingest`]: source model, pool, Ingest loop, adapters
//!
//! ## Logging
//!
//! Library code only emits `tracing` events. Call
//! [`logging::init_logging_from_env`] once at startup to install a subscriber
//! chosen by `HOOKROUTE_LOG_MODE` (`silent`, `development`, `debug`, `json`).

pub mod logging;

mod config;
mod error;
mod router;
mod sync_runner;

pub use config::*;
pub use error::{Result, RouterError};
pub use router::{RoutingCore, RoutingCoreBuilder};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use sync_runner::spawn_sync_runner;

pub use route_table;
pub use source_ingest;
pub use subscription_sync;

// Types most embedders need without reaching into the member crates
pub use route_table::{Key, Syncer, Table, TableRegistry};
pub use source_ingest::{
    AdapterFactory, InMemoryQueueBroker, InMemorySourceStore, InMemoryWorkQueue, Source, SourceId,
    WorkQueue,
};
pub use subscription_sync::{InMemorySubscriptionStore, ProjectId, Subscription, SubscriptionId};
