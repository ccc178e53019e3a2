//! HTTP transfer of a single job.
//!
//! Bytes land in `<destination>.part` and are renamed over the destination
//! only once the body has been fully written. An existing `.part` file is
//! resumed with a `Range` request.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use url::Url;

use bgdl_core::download::{BackendError, PROGRESS_UNKNOWN};

/// Byte counts for a running transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl TransferProgress {
    /// Completed fraction, or `PROGRESS_UNKNOWN` without a known length.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn fraction(self) -> f32 {
        match self.total {
            Some(total) if total > 0 => (self.downloaded as f64 / total as f64).min(1.0) as f32,
            _ => PROGRESS_UNKNOWN,
        }
    }
}

/// Value type describing one transfer.
#[derive(Debug, Clone)]
pub struct TransferJob {
    pub id: u64,
    pub url: Url,
    pub destination: PathBuf,
    pub headers: Vec<(String, String)>,
}

/// Temporary path bytes are streamed into.
pub fn part_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// Remove a file, treating absence as success.
pub async fn remove_if_exists(path: &Path) -> Result<(), BackendError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BackendError::from_io_error(&e)),
    }
}

fn io_err(e: &std::io::Error) -> BackendError {
    BackendError::from_io_error(e)
}

/// Download `job.url` to `job.destination`.
///
/// Not cancellation-aware by itself: the caller drops the future to cancel.
pub async fn run_transfer(
    client: &Client,
    job: &TransferJob,
    progress: &watch::Sender<TransferProgress>,
) -> Result<(), BackendError> {
    let part = part_path(&job.destination);
    let resume_from = fs::metadata(&part).await.map_or(0, |m| m.len());

    let mut request = client.get(job.url.clone());
    for (name, value) in &job.headers {
        request = request.header(name, value);
    }
    if resume_from > 0 {
        request = request.header(RANGE, format!("bytes={resume_from}-"));
    }

    let response = request
        .send()
        .await
        .map_err(|e| BackendError::network(e.to_string()))?;
    let status = response.status();

    let (mut file, mut downloaded) = if resume_from > 0 && status == StatusCode::PARTIAL_CONTENT {
        tracing::debug!(
            target: "bgdl.backend",
            id = job.id,
            resume_from,
            "Resuming partial transfer"
        );
        let file = OpenOptions::new()
            .append(true)
            .open(&part)
            .await
            .map_err(|e| io_err(&e))?;
        (file, resume_from)
    } else if resume_from > 0 && status == StatusCode::RANGE_NOT_SATISFIABLE {
        // The partial file already holds the whole body
        progress.send_replace(TransferProgress {
            downloaded: resume_from,
            total: Some(resume_from),
        });
        return finalize(&part, &job.destination).await;
    } else if status.is_success() {
        (File::create(&part).await.map_err(|e| io_err(&e))?, 0)
    } else {
        return Err(BackendError::network(format!("HTTP {status}")));
    };

    let total = response.content_length().map(|len| len + downloaded);
    progress.send_replace(TransferProgress { downloaded, total });

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BackendError::network(e.to_string()))?;
        file.write_all(&chunk).await.map_err(|e| io_err(&e))?;
        downloaded += chunk.len() as u64;
        progress.send_modify(|p| p.downloaded = downloaded);
    }

    file.flush().await.map_err(|e| io_err(&e))?;
    file.sync_all().await.map_err(|e| io_err(&e))?;
    drop(file);

    finalize(&part, &job.destination).await
}

/// Move the finished `.part` file over the destination.
async fn finalize(part: &Path, destination: &Path) -> Result<(), BackendError> {
    remove_if_exists(destination).await?;
    fs::rename(part, destination).await.map_err(|e| io_err(&e))
}
