//! Persisted job records for the local backend.
//!
//! One JSON file per job under `<storage_root>/.bgdl-jobs/<id>.json`. Records
//! are what lets a transfer outlive the process that started it: after a
//! restart the backend rebuilds its job table from this directory.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use bgdl_core::download::{
    BackendError, DownloadConfig, DownloadPolicy, RequestHeaders, ResumeToken, TransferInfo,
    TransferStatus,
};

/// Directory holding job records, relative to the storage root.
pub const JOBS_DIR: &str = ".bgdl-jobs";

/// Lifecycle state stored in a job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    InProgress,
    Done,
    Failed { reason: String },
}

/// Everything needed to resume or report a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: u64,
    pub url: Url,
    pub file_path: String,
    #[serde(default)]
    pub policy: DownloadPolicy,
    #[serde(default)]
    pub request_headers: RequestHeaders,
    pub state: JobState,
}

impl JobRecord {
    pub fn new(id: u64, config: &DownloadConfig) -> Self {
        Self {
            id,
            url: config.url.clone(),
            file_path: config.file_path.clone(),
            policy: config.policy,
            request_headers: config.request_headers.clone(),
            state: JobState::InProgress,
        }
    }

    pub fn token(&self) -> ResumeToken {
        ResumeToken::from(self.id)
    }

    pub fn status(&self) -> TransferStatus {
        match &self.state {
            JobState::InProgress => TransferStatus::InProgress,
            JobState::Done => TransferStatus::Done,
            JobState::Failed { reason } => TransferStatus::Failed(reason.clone()),
        }
    }

    pub fn info(&self) -> TransferInfo {
        TransferInfo::new(
            self.token(),
            self.url.clone(),
            self.file_path.clone(),
            self.status(),
        )
    }

    /// Headers as `(name, value)` pairs, repeated names kept in order.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.request_headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.clone(), v.clone())))
            .collect()
    }
}

/// Directory of job records.
#[derive(Debug, Clone)]
pub struct JobStore {
    dir: PathBuf,
}

impl JobStore {
    /// Open (and create) the record directory under `storage_root`.
    pub fn open(storage_root: &Path) -> Result<Self, BackendError> {
        let dir = storage_root.join(JOBS_DIR);
        fs::create_dir_all(&dir).map_err(|e| BackendError::from_io_error(&e))?;
        Ok(Self { dir })
    }

    fn path(&self, id: u64) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Atomically write a record, replacing any previous version.
    pub fn write(&self, record: &JobRecord) -> Result<(), BackendError> {
        let json = serde_json::to_vec_pretty(record).map_err(|e| BackendError::other(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| BackendError::from_io_error(&e))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| BackendError::from_io_error(&e))?;
        tmp.persist(self.path(record.id))
            .map_err(|e| BackendError::from_io_error(&e.error))?;
        Ok(())
    }

    /// Delete a record. A missing record is not an error.
    pub fn delete(&self, id: u64) -> Result<(), BackendError> {
        match fs::remove_file(self.path(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::from_io_error(&e)),
        }
    }

    /// Every readable record, ordered by id.
    ///
    /// Unreadable or foreign files are skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<JobRecord>, BackendError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| BackendError::from_io_error(&e))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<JobRecord>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(record) => records.push(record),
                Err(error) => {
                    tracing::warn!(
                        target: "bgdl.backend",
                        path = %path.display(),
                        %error,
                        "Skipping unreadable job record"
                    );
                }
            }
        }
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    /// Highest id on disk, or `None` for an empty store.
    pub fn max_id(&self) -> Result<Option<u64>, BackendError> {
        Ok(self.load_all()?.iter().map(|r| r.id).max())
    }
}
