//! Flat-file persistence for fan-out results.
//!
//! Every search writes one JSON array to `{data_dir}/{sanitizedQuery}_{epochMillis}.json`.
//! Files are created once and never rewritten or deleted here.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;
use crate::models::ResultRecord;

// Distinguishes concurrent temp files within one process.
static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Replace every character that is not ASCII alphanumeric with `_`.
pub fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Name of the result file for `query` written at `epoch_millis`.
pub fn result_file_name(query: &str, epoch_millis: i64) -> String {
    format!("{}_{}.json", sanitize_query(query), epoch_millis)
}

/// Sheet name for a stored file: the filename without its extension.
pub fn sheet_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

/// Reject names that could resolve outside the data directory.
pub fn validate_file_name(file_name: &str) -> Result<(), AppError> {
    if file_name.is_empty()
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(AppError::InvalidFilename(file_name.to_string()));
    }
    Ok(())
}

fn is_json_name(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Result files under one data directory.
#[derive(Debug, Clone)]
pub struct ResultStore {
    data_dir: PathBuf,
}

impl ResultStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Persist one fan-out's records, creating the data directory if needed.
    ///
    /// Returns the path of the new file. The body is written to a hidden
    /// temp file first and hard-linked into place, so a result file is
    /// never visible half-written. An existing file is never overwritten:
    /// on a same-millisecond collision the timestamp is advanced.
    pub async fn save(&self, query: &str, records: &[ResultRecord]) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let body = serde_json::to_vec_pretty(records)?;

        let tmp = self.write_temp(&body).await?;
        let published = self.publish(query, &tmp).await;
        if let Err(e) = tokio::fs::remove_file(&tmp).await {
            tracing::warn!(path = %tmp.display(), error = %e, "Failed to remove temp result file");
        }
        published
    }

    async fn write_temp(&self, body: &[u8]) -> Result<PathBuf, AppError> {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = self
            .data_dir
            .join(format!(".{}-{seq}.tmp", std::process::id()));

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await?;
        let written = async {
            file.write_all(body).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(tmp)
    }

    async fn publish(&self, query: &str, tmp: &Path) -> Result<PathBuf, AppError> {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let path = self.data_dir.join(result_file_name(query, stamp));
            match tokio::fs::hard_link(tmp, &path).await {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => stamp += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// All visible regular-file names in the data directory, sorted.
    /// Dotfiles are skipped and a missing directory lists as empty.
    pub async fn list_all(&self) -> Result<Vec<String>, AppError> {
        let mut entries = match tokio::fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// `.json` file names in the data directory, creating the directory if absent.
    pub async fn list_json(&self) -> Result<Vec<String>, AppError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let names = self.list_all().await?;
        Ok(names.into_iter().filter(|n| is_json_name(n)).collect())
    }

    /// Raw content of one stored file.
    pub async fn read(&self, file_name: &str) -> Result<String, AppError> {
        validate_file_name(file_name)?;
        let path = self.data_dir.join(file_name);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            tracing::debug!(path = %path.display(), error = %e, "Result file unreadable");
            AppError::NotFound(file_name.to_string())
        })
    }
}
