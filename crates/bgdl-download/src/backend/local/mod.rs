//! In-process background transfer manager.
//!
//! Each job is persisted as a JSON record before its task is spawned, so a
//! restarted process can find every transfer its predecessor started and
//! pick unfinished ones up again from their `.part` files.
//!
//! Jobs loaded from disk stay idle until their status or progress is first
//! queried. Enumerating or recreating transfers never touches the network.
//!
//! # Concurrency Model
//!
//! - One task per running job, writing only to its progress `watch` channel
//! - The job table sits behind a `tokio::sync::Mutex` and is loaded from
//!   disk on first use, so construction does not need a runtime
//! - Task completion updates the record under the table lock, which keeps it
//!   ordered with `remove`
//! - Cancellation drops the transfer future via `tokio::select!`

mod job;
mod transfer;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio_util::sync::CancellationToken;

use bgdl_core::config::resolve_destination;
use bgdl_core::download::{
    BackendError, DownloadConfig, PROGRESS_UNKNOWN, ResumeToken, TransferInfo, TransferStatus,
};
use bgdl_core::ports::DownloadBackend;

use job::{JobRecord, JobState, JobStore};
use transfer::{TransferJob, TransferProgress, part_path, remove_if_exists, run_transfer};

struct JobEntry {
    record: JobRecord,
    cancel: CancellationToken,
    progress: watch::Receiver<TransferProgress>,
    /// Progress sender of a job whose task has not been spawned yet.
    idle: Option<watch::Sender<TransferProgress>>,
}

#[derive(Default)]
struct JobTable {
    loaded: bool,
    entries: HashMap<u64, JobEntry>,
}

struct LocalInner {
    storage_root: PathBuf,
    store: JobStore,
    client: Client,
    jobs: Mutex<JobTable>,
    next_id: AtomicU64,
}

/// Background downloads executed by this process over HTTP.
///
/// Tokens are numeric job ids. The network policy is recorded with each job
/// but not enforced: connection cost is not observable from here.
#[derive(Clone)]
pub struct LocalTransferBackend {
    inner: Arc<LocalInner>,
}

impl std::fmt::Debug for LocalTransferBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransferBackend")
            .field("storage_root", &self.inner.storage_root)
            .finish_non_exhaustive()
    }
}

impl LocalTransferBackend {
    /// Create a backend rooted at `storage_root` with a default HTTP client.
    pub fn new(storage_root: &Path) -> Result<Self, BackendError> {
        Self::with_client(storage_root, Client::new())
    }

    /// Create a backend with a preconfigured HTTP client.
    pub fn with_client(storage_root: &Path, client: Client) -> Result<Self, BackendError> {
        let store = JobStore::open(storage_root)?;
        let next_id = store.max_id()?.map_or(1, |id| id + 1);
        Ok(Self {
            inner: Arc::new(LocalInner {
                storage_root: storage_root.to_path_buf(),
                store,
                client,
                jobs: Mutex::new(JobTable::default()),
                next_id: AtomicU64::new(next_id),
            }),
        })
    }
}

impl JobEntry {
    fn idle(record: JobRecord) -> Self {
        let (progress_tx, progress) = watch::channel(TransferProgress::default());
        Self {
            record,
            cancel: CancellationToken::new(),
            progress,
            idle: Some(progress_tx),
        }
    }
}

fn job_id(token: &ResumeToken) -> Result<u64, BackendError> {
    token
        .as_u64()
        .ok_or_else(|| BackendError::unknown_token(token))
}

impl LocalInner {
    /// Lock the job table, loading records from disk on first use.
    async fn table(self: &Arc<Self>) -> MutexGuard<'_, JobTable> {
        let mut table = self.jobs.lock().await;
        if !table.loaded {
            table.loaded = true;
            match self.store.load_all() {
                Ok(records) => {
                    for record in records {
                        table.entries.insert(record.id, JobEntry::idle(record));
                    }
                    tracing::debug!(
                        target: "bgdl.backend",
                        jobs = table.entries.len(),
                        "Loaded job records"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "bgdl.backend",
                        error = %e,
                        "Failed to load job records"
                    );
                }
            }
        }
        table
    }

    /// Spawn the transfer task of an unfinished job that is not running yet.
    fn resume(self: &Arc<Self>, entry: &mut JobEntry) {
        if entry.record.state != JobState::InProgress {
            return;
        }
        let Some(progress_tx) = entry.idle.take() else {
            return;
        };

        let job = TransferJob {
            id: entry.record.id,
            url: entry.record.url.clone(),
            destination: resolve_destination(&self.storage_root, &entry.record.file_path),
            headers: entry.record.header_pairs(),
        };
        let inner = Arc::clone(self);
        let cancel = entry.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!(target: "bgdl.backend", id = job.id, "Transfer cancelled");
                }

                result = run_transfer(&inner.client, &job, &progress_tx) => {
                    inner.finish(job.id, result).await;
                }
            }
        });
    }

    /// Record the outcome of a transfer task.
    async fn finish(&self, id: u64, result: Result<(), BackendError>) {
        let state = match result {
            Ok(()) => {
                tracing::info!(target: "bgdl.backend", id, "Transfer complete");
                JobState::Done
            }
            Err(e) => {
                tracing::warn!(target: "bgdl.backend", id, error = %e, "Transfer failed");
                JobState::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let mut table = self.jobs.lock().await;
        let Some(entry) = table.entries.get_mut(&id) else {
            // Removed while finishing
            return;
        };
        entry.record.state = state;
        if let Err(e) = self.store.write(&entry.record) {
            tracing::warn!(target: "bgdl.backend", id, error = %e, "Failed to save job record");
        }
    }
}

#[async_trait]
impl DownloadBackend for LocalTransferBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn create(&self, config: &DownloadConfig) -> Result<ResumeToken, BackendError> {
        let destination = resolve_destination(&self.inner.storage_root, &config.file_path);
        remove_if_exists(&destination).await?;
        remove_if_exists(&part_path(&destination)).await?;
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BackendError::from_io_error(&e))?;
        }

        if !config.policy.allows_roaming() {
            tracing::debug!(
                target: "bgdl.backend",
                policy = ?config.policy,
                "Connection cost is not detectable; transferring on any network"
            );
        }

        let mut table = self.inner.table().await;
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let record = JobRecord::new(id, config);
        self.inner.store.write(&record)?;
        let mut entry = JobEntry::idle(record);
        self.inner.resume(&mut entry);
        table.entries.insert(id, entry);

        tracing::debug!(
            target: "bgdl.backend",
            id,
            url = %config.url,
            destination = %destination.display(),
            "Created transfer"
        );
        Ok(ResumeToken::from(id))
    }

    async fn query_status(&self, token: &ResumeToken) -> Result<TransferStatus, BackendError> {
        let id = job_id(token)?;
        let mut table = self.inner.table().await;
        let entry = table
            .entries
            .get_mut(&id)
            .ok_or_else(|| BackendError::unknown_token(token))?;
        self.inner.resume(entry);
        Ok(entry.record.status())
    }

    async fn query_progress(&self, token: &ResumeToken) -> Result<f32, BackendError> {
        let id = job_id(token)?;
        let mut table = self.inner.table().await;
        let entry = table
            .entries
            .get_mut(&id)
            .ok_or_else(|| BackendError::unknown_token(token))?;
        self.inner.resume(entry);
        Ok(match entry.record.state {
            JobState::Done => 1.0,
            JobState::Failed { .. } => PROGRESS_UNKNOWN,
            JobState::InProgress => entry.progress.borrow().fraction(),
        })
    }

    async fn remove(&self, token: &ResumeToken) -> Result<(), BackendError> {
        let id = job_id(token)?;
        let mut table = self.inner.table().await;
        let entry = table
            .entries
            .remove(&id)
            .ok_or_else(|| BackendError::unknown_token(token))?;
        entry.cancel.cancel();
        self.inner.store.delete(id)?;
        drop(table);

        if entry.record.state != JobState::Done {
            let destination = resolve_destination(&self.inner.storage_root, &entry.record.file_path);
            remove_if_exists(&part_path(&destination)).await?;
        }

        tracing::debug!(target: "bgdl.backend", id, "Removed transfer");
        Ok(())
    }

    async fn enumerate(&self) -> Result<Vec<TransferInfo>, BackendError> {
        let table = self.inner.table().await;
        let mut infos: Vec<TransferInfo> = table
            .entries
            .values()
            .map(|entry| entry.record.info())
            .collect();
        infos.sort_by_key(|info| info.token.as_u64());
        Ok(infos)
    }

    async fn recreate(&self, token: &ResumeToken) -> Result<Option<TransferInfo>, BackendError> {
        let Some(id) = token.as_u64() else {
            return Ok(None);
        };
        let table = self.inner.table().await;
        Ok(table.entries.get(&id).map(|entry| entry.record.info()))
    }
}
