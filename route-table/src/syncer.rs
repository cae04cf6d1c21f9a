//! Contract between loaders and the periodic sync runner.

use async_trait::async_trait;

use crate::error::SyncError;
use crate::table::Table;

/// A loader that converges a [`Table`] with some persistent source of truth.
///
/// `sync_changes` is driven serially by a single runner: implementations keep
/// internal state between calls (a baseline, a loaded flag) and are not
/// required to tolerate concurrent invocation, which `&mut self` enforces.
///
/// A failed sync must not leave the table with a partially applied fetch; it
/// is retried on the next tick.
#[async_trait]
pub trait Syncer: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Pull the desired state and apply the minimal changes to `table`.
    async fn sync_changes(&mut self, table: &Table) -> Result<(), SyncError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    struct CountingSyncer {
        calls: u32,
    }

    #[async_trait]
    impl Syncer for CountingSyncer {
        fn name(&self) -> &str {
            "counting"
        }

        async fn sync_changes(&mut self, table: &Table) -> Result<(), SyncError> {
            self.calls += 1;
            table.upsert(Key::new("p1", "calls"), self.calls);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_syncer_through_trait_object() {
        let table = Table::new();
        let mut syncer: Box<dyn Syncer> = Box::new(CountingSyncer { calls: 0 });

        syncer.sync_changes(&table).await.unwrap();
        syncer.sync_changes(&table).await.unwrap();

        assert_eq!(syncer.name(), "counting");
        assert_eq!(
            table.get(&Key::new("p1", "calls")).unwrap().value::<u32>(),
            Some(&2)
        );
    }
}
