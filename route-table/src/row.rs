//! Type-erased table rows.

use std::any::Any;
use std::sync::Arc;

use crate::key::Key;

/// A single table row: its key plus an opaque value.
///
/// The value is stored type-erased so one table implementation serves both
/// subscription rows (`Vec<Subscription>`) and source rows (`Source`).
/// Cloning a row is cheap; the value is shared.
#[derive(Clone)]
pub struct Row {
    key: Key,
    value: Arc<dyn Any + Send + Sync>,
}

impl Row {
    /// Create a row holding `value`.
    pub fn new<V>(key: Key, value: V) -> Self
    where
        V: Any + Send + Sync,
    {
        Self {
            key,
            value: Arc::new(value),
        }
    }

    /// The row's key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Borrow the value as `V`.
    ///
    /// Returns `None` if the stored value is of a different type. Callers on
    /// the dispatch path treat that as an empty result, not a failure.
    pub fn value<V: Any>(&self) -> Option<&V> {
        self.value.downcast_ref::<V>()
    }

    /// Whether the stored value is a `V`.
    pub fn holds<V: Any>(&self) -> bool {
        self.value.is::<V>()
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row").field("key", &self.key).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_value_downcast() {
        let row = Row::new(Key::new("p1", "a"), vec![1u32, 2, 3]);

        assert!(row.holds::<Vec<u32>>());
        assert_eq!(row.value::<Vec<u32>>(), Some(&vec![1, 2, 3]));
        assert!(row.value::<String>().is_none());
    }

    #[test]
    fn test_row_clone_shares_value() {
        let row = Row::new(Key::new("p1", "a"), "payload".to_string());
        let cloned = row.clone();

        let a = row.value::<String>().unwrap() as *const String;
        let b = cloned.value::<String>().unwrap() as *const String;
        assert_eq!(a, b);
    }
}
