//! Periodic driver for [`Syncer`] implementations
//!
//! Each loader gets one task. The task owns the loader, so syncs of the same
//! table never overlap.

use std::sync::Arc;
use std::time::Duration;

use route_table::{Syncer, Table};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run `syncer` against `table` now and then every `interval` until `cancel`
///
/// A failed sync is logged and retried on the next tick. A tick that comes
/// due while a sync is still running is delayed, not queued.
pub fn spawn_sync_runner(
    mut syncer: Box<dyn Syncer>,
    table: Arc<Table>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = syncer.name().to_string();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(syncer = %name, ?interval, "sync runner started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    match syncer.sync_changes(&table).await {
                        Ok(()) => debug!(syncer = %name, rows = table.len(), "sync complete"),
                        Err(e) => warn!(syncer = %name, error = %e, "sync failed, retrying next tick"),
                    }
                }
            }
        }

        info!(syncer = %name, "sync runner stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use route_table::{Key, SyncError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakySyncer {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Syncer for FlakySyncer {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn sync_changes(&mut self, table: &Table) -> std::result::Result<(), SyncError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call % 2 == 1 {
                return Err(SyncError::Aborted(format!("call {call}")));
            }
            table.upsert(Key::new("p", call.to_string()), call);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_do_not_stop_the_runner() {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = Arc::new(Table::new());
        let cancel = CancellationToken::new();

        let handle = spawn_sync_runner(
            Box::new(FlakySyncer { calls: Arc::clone(&calls) }),
            Arc::clone(&table),
            Duration::from_secs(10),
            cancel.clone(),
        );

        // First tick fires immediately, then one per interval
        tokio::time::sleep(Duration::from_secs(35)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_before_first_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        cancel.cancel();

        spawn_sync_runner(
            Box::new(FlakySyncer { calls: Arc::clone(&calls) }),
            Arc::new(Table::new()),
            Duration::from_secs(1),
            cancel,
        )
        .await
        .unwrap();

        // select! may still pick the ready first tick
        assert!(calls.load(Ordering::SeqCst) <= 1);
    }
}
