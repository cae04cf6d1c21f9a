//! # source-ingest
//!
//! Keeps a pool of queue and pub/sub consumers converged with the configured
//! webhook sources, and turns every inbound provider message into a
//! create-event job on the outbound work queue.
//!
//! ```text
//! SourceLoader (Syncer) ── SourceRepository ──▶ source Table
//!                                                   │
//! Ingest::run ── every interval: diff table vs pool ─┤
//!                                                   ▼
//!                 SourcePool ── AdapterFactory[SourceType] ──▶ ConsumerAdapter
//!                                                                 │ N workers
//!                                                                 ▼
//!                                 MessageHandler ──▶ WorkQueue("CreateEventQueue")
//! ```
//!
//! A source whose config hash is unchanged is left alone; a changed hash
//! restarts its adapter; a source gone from the table is stopped. Messages the
//! handler rejects are never acknowledged, so the provider redelivers them.

pub mod adapter;
mod config;
mod error;
mod handler;
mod ingest;
mod message;
mod pool;
mod queue;
mod repository;
mod source_loader;
mod types;

pub use adapter::factory::AdapterFactory;
pub use adapter::memory::{queue_address, InMemoryQueueBroker};
pub use adapter::push::{Ack, PushAdapterBuilder, PushCallback, PushConnector, PushConsumer, PushSubscription};
pub use adapter::queue::{QueueAdapterBuilder, QueueClient, QueueConnector, QueueConsumer};
pub use adapter::{AdapterBuilder, ConsumerAdapter};
pub use config::*;
pub use error::*;
pub use handler::*;
pub use ingest::*;
pub use message::*;
pub use pool::*;
pub use queue::*;
pub use repository::*;
pub use source_loader::*;
pub use types::*;
