//! Polling watcher that reports files appearing in the data directory.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::store::ResultStore;

/// Emits the name of every new, non-hidden file in a [`ResultStore`]'s directory.
///
/// Files already present when the watcher starts are reported on the first
/// scan. Signals are sent with `try_send`: if the channel is full a sync is
/// already queued and the extra signal would add nothing.
pub struct DirWatcher {
    store: ResultStore,
    poll_interval: Duration,
    seen: HashSet<String>,
}

impl DirWatcher {
    pub fn new(store: ResultStore, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
            seen: HashSet::new(),
        }
    }

    /// Poll until cancelled or the receiving side goes away.
    pub async fn run(mut self, tx: mpsc::Sender<String>, cancel_token: CancellationToken) {
        tracing::info!(
            dir = %self.store.data_dir().display(),
            poll_ms = self.poll_interval.as_millis() as u64,
            "Watching data directory"
        );

        loop {
            for file in self.scan().await {
                match tx.try_send(file) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!("Watcher receiver dropped");
                        return;
                    }
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.poll_interval) => {}
                () = cancel_token.cancelled() => break,
            }
        }
    }

    /// Names that were not present on any earlier scan.
    async fn scan(&mut self) -> Vec<String> {
        let names = match self.store.list_all().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to scan data directory");
                return Vec::new();
            }
        };

        names
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .filter(|name| self.seen.insert(name.clone()))
            .collect()
    }
}
