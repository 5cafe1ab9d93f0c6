//! Streaming zip of every stored result file.

use std::io::{self, Write};
use std::path::Path;

use axum::body::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use leadgen_core::error::AppError;
use leadgen_core::store::ResultStore;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

pub const ARCHIVE_NAME: &str = "all_scraper_data.zip";

/// Chunks buffered between the archive writer and the response body.
const CHUNK_QUEUE: usize = 8;

/// Stream a deflate zip containing every `.json` file of `store`.
///
/// The listing happens up front so a missing or unreadable directory is
/// still reported as an error response. The archive itself is produced on
/// a blocking thread and handed over chunk by chunk; memory stays bounded
/// by the chunk queue whatever the size of the data directory. A failure
/// after the first chunk ends the body early.
pub async fn stream_json_files(
    store: &ResultStore,
) -> Result<impl Stream<Item = io::Result<Bytes>> + Send + 'static, AppError> {
    let names = store.list_json().await?;
    let dir = store.data_dir().to_path_buf();
    let (tx, rx) = mpsc::channel(CHUNK_QUEUE);

    tokio::task::spawn_blocking(move || {
        let errors = tx.clone();
        match write_archive(&dir, &names, ChannelWriter { tx }) {
            Ok(()) => tracing::info!(files = names.len(), "Streamed result archive"),
            Err(e) => {
                tracing::warn!(error = %e, "Result archive aborted");
                let _ = errors.blocking_send(Err(io::Error::other(e.to_string())));
            }
        }
    });

    Ok(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

fn write_archive<W: Write>(dir: &Path, names: &[String], out: W) -> Result<(), AppError> {
    let mut zip = ZipWriter::new_stream(out);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    for name in names {
        let mut file = std::fs::File::open(dir.join(name))?;
        zip.start_file(name.as_str(), options).map_err(zip_error)?;
        io::copy(&mut file, &mut zip)?;
    }

    zip.finish().map_err(zip_error)?;
    Ok(())
}

/// `Write` sink that hands each chunk to the response body.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn zip_error(e: zip::result::ZipError) -> AppError {
    AppError::Generic(format!("Zip error: {e}"))
}
