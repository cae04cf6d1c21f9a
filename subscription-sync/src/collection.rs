//! Last-synced baseline of subscription versions
//!
//! The collection, not the table, is the authoritative record of what was
//! applied as of the last sync. It holds only `(uid, updated_at)` tuples so
//! the loader can ask storage for differences without keeping payloads.

use std::collections::HashMap;

use crate::types::{Subscription, SubscriptionId, SubscriptionUpdate};

/// Ordered set of [`SubscriptionUpdate`] tuples keyed by subscription id
#[derive(Debug, Default, Clone)]
pub struct SubscriptionCollection {
    updates: Vec<SubscriptionUpdate>,
    positions: HashMap<SubscriptionId, usize>,
}

impl SubscriptionCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `subscription`'s version
    ///
    /// Updates `updated_at` in place if the uid is already tracked, otherwise
    /// appends a new tuple.
    pub fn add_or_update(&mut self, subscription: &Subscription) {
        match self.positions.get(&subscription.uid) {
            Some(&index) => self.updates[index].updated_at = subscription.updated_at,
            None => {
                self.positions
                    .insert(subscription.uid.clone(), self.updates.len());
                self.updates.push(subscription.to_update());
            }
        }
    }

    /// Stop tracking `uid`, returning whether it was tracked
    pub fn remove(&mut self, uid: &SubscriptionId) -> bool {
        let Some(index) = self.positions.remove(uid) else {
            return false;
        };

        self.updates.swap_remove(index);
        if let Some(moved) = self.updates.get(index) {
            self.positions.insert(moved.uid.clone(), index);
        }
        true
    }

    /// The full tracked baseline
    pub fn get_all(&self) -> &[SubscriptionUpdate] {
        &self.updates
    }

    /// The tracked tuple for `uid`
    pub fn get(&self, uid: &SubscriptionId) -> Option<&SubscriptionUpdate> {
        self.positions.get(uid).map(|&index| &self.updates[index])
    }

    /// Whether `uid` is tracked
    pub fn contains(&self, uid: &SubscriptionId) -> bool {
        self.positions.contains_key(uid)
    }

    /// Number of tracked subscriptions
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}
