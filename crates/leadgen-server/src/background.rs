use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use leadgen_client::AppsScriptSink;
use leadgen_core::{
    AppError, DirWatcher, ProcessedTracker, ResultStore, ScraperConfig, SheetSync, SyncScheduler,
    TracingSyncReporter,
};

/// Capacity of the watcher → scheduler channel. One queued signal is
/// enough to guarantee a follow-up cycle; the rest only add slack.
const TRIGGER_CAPACITY: usize = 16;

/// Start the sheet-sync scheduler and, if enabled, the data-directory watcher.
///
/// Returns no tasks when `GOOGLE_SCRIPT_URL` is not configured.
pub fn spawn_sync_tasks(
    config: &ScraperConfig,
    cancel_token: CancellationToken,
) -> Result<Vec<JoinHandle<()>>, AppError> {
    let Some(url) = config.google_script_url.clone() else {
        tracing::warn!("GOOGLE_SCRIPT_URL not set, sheet sync disabled");
        return Ok(Vec::new());
    };

    let store = ResultStore::new(&config.data_dir);
    let tracker = Arc::new(ProcessedTracker::new(&config.processed_file));
    let sync = Arc::new(SheetSync::new(
        store.clone(),
        tracker,
        AppsScriptSink::new(url)?,
    ));
    let scheduler = SyncScheduler::new(sync, config.sync_interval);

    let (tx, rx) = mpsc::channel(TRIGGER_CAPACITY);
    let mut handles = Vec::new();

    if config.watch_data_dir {
        let watcher = DirWatcher::new(store, config.watch_poll_interval);
        handles.push(tokio::spawn(watcher.run(tx, cancel_token.clone())));
    } else {
        drop(tx);
    }

    handles.push(tokio::spawn(async move {
        scheduler.run(rx, cancel_token, &TracingSyncReporter).await;
    }));

    Ok(handles)
}
