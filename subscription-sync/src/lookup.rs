//! Dispatch-path read contract

use route_table::{Key, Table};

use crate::table_manager::row_members;
use crate::types::{ProjectId, Subscription};

/// Subscriptions of `project_id` listening to `event_type`
///
/// Returns an empty list when no row exists. A row holding an unexpected
/// value type is logged and also reads as empty, so a corrupt row can only
/// cause a missed match, never a failure on the dispatch path.
pub fn find_subscriptions(table: &Table, project_id: &ProjectId, event_type: &str) -> Vec<Subscription> {
    table
        .get(&Key::new(project_id.as_str(), event_type))
        .map(|row| row_members(&row))
        .unwrap_or_default()
}
