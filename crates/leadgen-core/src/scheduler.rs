use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::sync::{SheetSync, SyncReporter};
use crate::traits::SheetSink;

/// Default period between timed sync cycles.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(300);

/// Why a cycle was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Interval,
    FileAdded,
}

/// Runs [`SheetSync`] on a fixed period and whenever a file-added signal arrives.
///
/// All cycles run on the task that calls [`run`](Self::run), one at a
/// time. Ticks that come due while a cycle is running are skipped, and
/// file signals received meanwhile collapse into a single follow-up cycle.
pub struct SyncScheduler<S: SheetSink> {
    sync: Arc<SheetSync<S>>,
    interval: Duration,
}

impl<S: SheetSink> SyncScheduler<S> {
    pub fn new(sync: Arc<SheetSync<S>>, interval: Duration) -> Self {
        Self { sync, interval }
    }

    /// Run until `cancel_token` fires. The first timed cycle happens one
    /// full interval after start.
    pub async fn run<R: SyncReporter>(
        &self,
        mut triggers: mpsc::Receiver<String>,
        cancel_token: CancellationToken,
        reporter: &R,
    ) {
        let Some(first_tick) = Instant::now().checked_add(self.interval) else {
            tracing::error!(interval = ?self.interval, "Sync interval out of range, scheduler not started");
            return;
        };
        let mut ticker = tokio::time::interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut triggers_open = true;

        tracing::info!(interval_secs = self.interval.as_secs(), "Sync scheduler started");

        loop {
            let trigger = tokio::select! {
                () = cancel_token.cancelled() => break,
                _ = ticker.tick() => SyncTrigger::Interval,
                received = triggers.recv(), if triggers_open => match received {
                    Some(file) => {
                        tracing::info!(%file, "New file detected");
                        SyncTrigger::FileAdded
                    }
                    None => {
                        triggers_open = false;
                        continue;
                    }
                },
            };

            // Coalesce any signals that piled up behind this one.
            while triggers.try_recv().is_ok() {}

            self.run_once(trigger, reporter).await;
        }

        tracing::info!("Sync scheduler stopped");
    }

    async fn run_once<R: SyncReporter>(&self, trigger: SyncTrigger, reporter: &R) {
        tracing::debug!(?trigger, "Running scheduled sync");
        if let Err(e) = self.sync.run_cycle(reporter).await {
            tracing::error!(error = %e, ?trigger, "Sync cycle failed");
        }
    }
}
