//! Durable record of which result files have already been forwarded.
//!
//! The backing store is one JSON document (`{"sentFiles": [...]}`). Every
//! read-modify-write happens under an async mutex, and every mark persists
//! the full set before returning, so a crash right after a successful
//! forward loses nothing. Unparsable content is discarded and treated as
//! an empty set; callers never see a parse error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::ProcessedSet;

#[derive(Debug)]
pub struct ProcessedTracker {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProcessedTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents of the processed set.
    pub async fn load(&self) -> ProcessedSet {
        let _guard = self.lock.lock().await;
        self.read_document().await
    }

    pub async fn is_processed(&self, file_name: &str) -> bool {
        self.load().await.contains(file_name)
    }

    /// Record `file_name` as forwarded. Idempotent: returns `Ok(false)` and
    /// leaves the document untouched when the name is already present.
    pub async fn mark_processed(&self, file_name: &str) -> Result<bool, AppError> {
        let _guard = self.lock.lock().await;
        let mut set = self.read_document().await;
        if !set.insert(file_name) {
            return Ok(false);
        }
        self.write_document(&set).await?;
        tracing::info!(file = %file_name, total = set.len(), "Marked file as processed");
        Ok(true)
    }

    /// Read the document, recovering from absence and corruption. Must be
    /// called with the lock held.
    async fn read_document(&self) -> ProcessedSet {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return ProcessedSet::default(),
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read processed set, treating as empty"
                );
                return ProcessedSet::default();
            }
        };

        if raw.trim().is_empty() {
            return ProcessedSet::default();
        }

        match serde_json::from_str::<ProcessedSet>(&raw) {
            Ok(mut set) => {
                set.dedup();
                set
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Processed set is corrupted, resetting it"
                );
                let empty = ProcessedSet::default();
                if let Err(e) = self.write_document(&empty).await {
                    tracing::error!(error = %e, "Failed to reset processed set");
                }
                empty
            }
        }
    }

    /// Write via a sibling temp file and rename, so readers never see a torn document.
    async fn write_document(&self, set: &ProcessedSet) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(set)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Hidden sibling used for the write-then-rename.
    fn temp_path(&self) -> PathBuf {
        let mut name = std::ffi::OsString::from(".");
        name.push(
            self.path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("processed.json")),
        );
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
