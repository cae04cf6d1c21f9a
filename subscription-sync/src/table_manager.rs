//! Event-type index maintenance
//!
//! Rows are keyed `(project id, event type)` and hold every subscription of
//! that project listening to that event type.
//!
//! Adding is narrow: a subscription is written only under its current event
//! types. Removal comes in two widths. [`remove_subscription`] touches only
//! the current event types, while [`remove_subscription_from_all_event_types`]
//! scans every row of the project. The broad form is what the loader uses
//! before re-adding an updated subscription, because the rows it was indexed
//! under before the update cannot be derived from its new event types.
//!
//! [`remove_subscription`]: SubscriptionTableManager::remove_subscription
//! [`remove_subscription_from_all_event_types`]: SubscriptionTableManager::remove_subscription_from_all_event_types

use route_table::{Key, Row, Table};

use crate::types::{Subscription, SubscriptionId};

/// Mutates routing table rows to keep the event-type index current.
///
/// Implementations assume a single writer per table.
pub trait SubscriptionTableManager: Send + Sync {
    /// Index `subscription` under each of its event types, replacing any
    /// existing entry with the same uid. No-op for non-indexable subscriptions.
    fn add_subscription(&self, subscription: &Subscription, table: &Table);

    /// Remove `subscription` from the rows of its current event types.
    fn remove_subscription(&self, subscription: &Subscription, table: &Table);

    /// Remove `subscription` from every row of its project.
    fn remove_subscription_from_all_event_types(&self, subscription: &Subscription, table: &Table);
}

/// Default [`SubscriptionTableManager`] storing `Vec<Subscription>` rows
#[derive(Debug, Default, Clone, Copy)]
pub struct EventTypeIndexer;

impl EventTypeIndexer {
    /// Create the indexer
    pub fn new() -> Self {
        Self
    }

    /// Drop `uid` from the row under `key`, deleting the row if it empties.
    fn purge(&self, table: &Table, key: &Key, uid: &SubscriptionId) {
        let Some(row) = table.get(key) else {
            return;
        };

        let mut members = row_members(&row);
        let before = members.len();
        members.retain(|member| &member.uid != uid);

        if members.len() == before && row.holds::<Vec<Subscription>>() {
            return;
        }

        if members.is_empty() {
            table.delete(key);
        } else {
            table.upsert(key.clone(), members);
        }
    }
}

impl SubscriptionTableManager for EventTypeIndexer {
    fn add_subscription(&self, subscription: &Subscription, table: &Table) {
        if !subscription.is_indexable() {
            return;
        }

        for event_type in &subscription.event_types {
            let key = Key::new(subscription.project_id.as_str(), event_type.as_str());

            let mut members = table.get(&key).map(|row| row_members(&row)).unwrap_or_default();
            members.retain(|member| member.uid != subscription.uid);
            members.push(subscription.clone());

            table.upsert(key, members);
        }
    }

    fn remove_subscription(&self, subscription: &Subscription, table: &Table) {
        for event_type in &subscription.event_types {
            let key = Key::new(subscription.project_id.as_str(), event_type.as_str());
            self.purge(table, &key, &subscription.uid);
        }
    }

    fn remove_subscription_from_all_event_types(&self, subscription: &Subscription, table: &Table) {
        for key in table.keys_for_project(subscription.project_id.as_str()) {
            self.purge(table, &key, &subscription.uid);
        }
    }
}

/// Copy of a row's members; a mistyped row reads as empty.
pub(crate) fn row_members(row: &Row) -> Vec<Subscription> {
    match row.value::<Vec<Subscription>>() {
        Some(members) => members.clone(),
        None => {
            tracing::warn!(key = %row.key(), "routing row holds an unexpected value type, treating as empty");
            Vec::new()
        }
    }
}
