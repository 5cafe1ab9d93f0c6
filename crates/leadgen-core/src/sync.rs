use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::SyncReport;
use crate::store::{ResultStore, sheet_name};
use crate::tracker::ProcessedTracker;
use crate::traits::SheetSink;

/// Events emitted during a sync cycle for monitoring/logging.
#[derive(Debug, Clone)]
pub enum SyncEvent<'a> {
    CycleStarted {
        pending: usize,
    },
    FileSkipped {
        file: &'a str,
    },
    FileUnparsable {
        file: &'a str,
        error: &'a str,
    },
    FileForwarding {
        file: &'a str,
    },
    FileForwarded {
        file: &'a str,
    },
    FileFailed {
        file: &'a str,
        error: &'a str,
        transport: bool,
    },
    CycleFinished {
        report: SyncReport,
    },
}

/// Trait for receiving sync events (decoupled logging).
pub trait SyncReporter: Send + Sync {
    fn report(&self, event: SyncEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSyncReporter;

impl SyncReporter for TracingSyncReporter {
    fn report(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::CycleStarted { pending } => {
                tracing::info!(%pending, "Sync cycle started");
            }
            SyncEvent::FileSkipped { file } => {
                tracing::debug!(%file, "Skipping already processed file");
            }
            SyncEvent::FileUnparsable { file, error } => {
                tracing::error!(%file, %error, "Failed to parse result file");
            }
            SyncEvent::FileForwarding { file } => {
                tracing::info!(%file, "Sending file to sheet");
            }
            SyncEvent::FileForwarded { file } => {
                tracing::info!(%file, "File forwarded");
            }
            SyncEvent::FileFailed {
                file,
                error,
                transport,
            } => {
                if transport {
                    tracing::warn!(%file, %error, "Sheet endpoint unreachable, will retry next cycle");
                } else {
                    tracing::error!(%file, %error, "Sheet endpoint rejected file, will retry next cycle");
                }
            }
            SyncEvent::CycleFinished { report } => {
                tracing::info!(
                    forwarded = report.forwarded,
                    already_processed = report.already_processed,
                    unparsable = report.unparsable,
                    failed = report.failed,
                    "Sync cycle finished"
                );
            }
        }
    }
}

/// Forwards every not-yet-processed result file to the sheet endpoint.
///
/// A file is marked processed only after the sink confirms it. Anything
/// that fails stays unmarked and is picked up again by the next cycle;
/// there is no per-file retry or backoff.
pub struct SheetSync<S: SheetSink> {
    store: ResultStore,
    tracker: Arc<ProcessedTracker>,
    sink: S,
    /// Serializes cycles so tracker read-modify-writes never interleave.
    running: Mutex<()>,
}

impl<S: SheetSink> SheetSync<S> {
    pub fn new(store: ResultStore, tracker: Arc<ProcessedTracker>, sink: S) -> Self {
        Self {
            store,
            tracker,
            sink,
            running: Mutex::new(()),
        }
    }

    pub fn tracker(&self) -> &ProcessedTracker {
        &self.tracker
    }

    /// Run one scan-and-forward pass over the data directory.
    ///
    /// Waits for any cycle already in progress. Only a failure to list the
    /// data directory is returned as an error; per-file problems are
    /// reported and counted.
    pub async fn run_cycle<R: SyncReporter>(&self, reporter: &R) -> Result<SyncReport, AppError> {
        let _guard = self.running.lock().await;

        let mut files = self.store.list_all().await?;
        if let Some(own) = self.tracker_file_name().await {
            files.retain(|f| *f != own);
        }
        let processed = self.tracker.load().await;
        let mut report = SyncReport::default();

        let pending = files.iter().filter(|f| !processed.contains(f)).count();
        reporter.report(SyncEvent::CycleStarted { pending });

        for file in &files {
            if processed.contains(file) {
                report.already_processed += 1;
                reporter.report(SyncEvent::FileSkipped { file });
                continue;
            }

            let data = match self.read_json(file).await {
                Ok(data) => data,
                Err(e) => {
                    report.unparsable += 1;
                    let error = e.to_string();
                    reporter.report(SyncEvent::FileUnparsable {
                        file,
                        error: &error,
                    });
                    continue;
                }
            };

            reporter.report(SyncEvent::FileForwarding { file });
            match self.sink.forward(&sheet_name(file), &data).await {
                Ok(()) => {
                    if let Err(e) = self.tracker.mark_processed(file).await {
                        // Forwarded but not recorded: it will be sent again next cycle.
                        report.failed += 1;
                        let error = e.to_string();
                        reporter.report(SyncEvent::FileFailed {
                            file,
                            error: &error,
                            transport: false,
                        });
                        continue;
                    }
                    report.forwarded += 1;
                    reporter.report(SyncEvent::FileForwarded { file });
                }
                Err(e) => {
                    report.failed += 1;
                    let error = e.to_string();
                    reporter.report(SyncEvent::FileFailed {
                        file,
                        error: &error,
                        transport: e.is_transport(),
                    });
                }
            }
        }

        reporter.report(SyncEvent::CycleFinished { report });
        Ok(report)
    }

    /// Name of the processed-set document when it lives in the data directory.
    async fn tracker_file_name(&self) -> Option<String> {
        let path = self.tracker.path();
        let name = path.file_name()?.to_str()?.to_string();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let parent = tokio::fs::canonicalize(parent).await.ok()?;
        let data_dir = tokio::fs::canonicalize(self.store.data_dir()).await.ok()?;
        (parent == data_dir).then_some(name)
    }

    async fn read_json(&self, file: &str) -> Result<serde_json::Value, AppError> {
        let raw = self.store.read(file).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}
