//! Shared helpers for subscription-sync integration tests

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use route_table::Table;
use subscription_sync::{InMemorySubscriptionStore, LoaderConfig, Subscription, SubscriptionLoader};

/// A loader wired to `store`, paging `batch_size` rows at a time
pub fn loader_for(store: &Arc<InMemorySubscriptionStore>, batch_size: usize) -> SubscriptionLoader {
    SubscriptionLoader::from_repositories(
        store.clone(),
        store.clone(),
        LoaderConfig::new().with_batch_size(batch_size),
    )
    .unwrap()
}

/// The five subscriptions of the two-project routing scenario
pub fn seed_subscriptions() -> Vec<Subscription> {
    vec![
        Subscription::new("sub-1", "project-a", ["user.created"]).with_endpoint_id("ep-1"),
        Subscription::new("sub-2", "project-a", ["user.created", "user.updated"]).with_endpoint_id("ep-2"),
        Subscription::new("sub-3", "project-a", ["user.deleted"]).with_endpoint_id("ep-3"),
        Subscription::new("sub-4", "project-b", ["order.created"]).with_endpoint_id("ep-4"),
        Subscription::new("sub-5", "project-b", ["order.created"]).with_endpoint_id("ep-5"),
    ]
}

/// A store holding `subscriptions`
pub fn store_with(subscriptions: Vec<Subscription>) -> Arc<InMemorySubscriptionStore> {
    let store = Arc::new(InMemorySubscriptionStore::new());
    for subscription in subscriptions {
        store.upsert_subscription(subscription);
    }
    store
}

/// Subscription uids stored under every row, one entry per (row, member)
pub fn indexed_references(table: &Table) -> Vec<(String, String)> {
    let mut refs = Vec::new();
    for row in table.get_items() {
        let members = row.value::<Vec<Subscription>>().cloned().unwrap_or_default();
        for member in members {
            refs.push((row.key().to_string(), member.uid.0));
        }
    }
    refs.sort();
    refs
}

/// Distinct event types across the table's keys
pub fn discriminators(table: &Table) -> BTreeSet<String> {
    table
        .get_keys()
        .into_iter()
        .map(|key| key.discriminator().to_string())
        .collect()
}
