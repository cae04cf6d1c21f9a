//! Core types for the subscription-sync crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type that matches every event. Subscriptions listening only to it
/// are resolved outside the type-keyed index.
pub const WILDCARD_EVENT_TYPE: &str = "*";

/// Unique identifier for a project.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectId(pub String);

impl ProjectId {
    /// Create a new project ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the project ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    /// Create a new subscription ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the subscription ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outbound subscription as mirrored from storage.
///
/// Only the fields routing needs are carried; the endpoint and source are
/// opaque references resolved by the delivery path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier
    pub uid: SubscriptionId,
    /// Owning project
    pub project_id: ProjectId,
    /// Human-readable name
    pub name: String,
    /// Event types this subscription listens to, in stored order
    pub event_types: Vec<String>,
    /// Endpoint events are delivered to
    pub endpoint_id: Option<String>,
    /// Source this subscription is bound to, for source-scoped subscriptions
    pub source_id: Option<String>,
    /// Last modification time in storage
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Create a subscription listening to `event_types`.
    pub fn new<I, S>(
        uid: impl Into<SubscriptionId>,
        project_id: impl Into<ProjectId>,
        event_types: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            uid: uid.into(),
            project_id: project_id.into(),
            name: String::new(),
            event_types: event_types.into_iter().map(Into::into).collect(),
            endpoint_id: None,
            source_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Set the subscription name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the endpoint reference.
    pub fn with_endpoint_id(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = Some(endpoint_id.into());
        self
    }

    /// Set the source reference.
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Set the modification time.
    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Whether this subscription belongs in the type-keyed index.
    ///
    /// Subscriptions with no event types, or listening only to the wildcard,
    /// are excluded.
    pub fn is_indexable(&self) -> bool {
        match self.event_types.as_slice() {
            [] => false,
            [only] => only != WILDCARD_EVENT_TYPE,
            _ => true,
        }
    }

    /// The tracking tuple for this subscription.
    pub fn to_update(&self) -> SubscriptionUpdate {
        SubscriptionUpdate {
            uid: self.uid.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Minimal `(uid, updated_at)` tuple the loader keeps as its sync baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    /// Subscription identifier
    pub uid: SubscriptionId,
    /// Modification time as of the last sync
    pub updated_at: DateTime<Utc>,
}

/// Cursor-based page request passed to repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to return
    pub per_page: usize,
    /// Opaque cursor returned by the previous page, `None` for the first page
    pub cursor: Option<String>,
}

impl PageRequest {
    /// Request the first page.
    pub fn first(per_page: usize) -> Self {
        Self {
            per_page,
            cursor: None,
        }
    }

    /// Request the page following `cursor`.
    pub fn after(per_page: usize, cursor: impl Into<String>) -> Self {
        Self {
            per_page,
            cursor: Some(cursor.into()),
        }
    }
}

/// One page of repository results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Cursor for the next page, `None` when this is the last page
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// A final page holding `items`.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// A page followed by more results.
    pub fn with_next(items: Vec<T>, next_cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: Some(next_cursor.into()),
        }
    }

    /// Whether another page follows.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}
