//! Scripted in-memory backend shared by the registry tests.
//!
//! `FakeBackend` keeps its transfers in a `FakeSystem` that outlives any one
//! backend value, standing in for an OS transfer service that keeps running
//! while the application restarts.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use bgdl_download::{
    BackendError, DownloadBackend, DownloadConfig, DownloadRegistry, RegistryConfig, ResumeToken,
    TransferInfo, TransferStatus,
};

/// Body written to destinations the fake completes.
pub const BODY: &[u8] = b"fake transfer body";

/// How `enumerate` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enumeration {
    Supported,
    Unsupported,
    Broken,
}

#[derive(Debug, Clone)]
pub struct FakeTransfer {
    pub url: Url,
    pub file_path: String,
    pub status: TransferStatus,
    pub polls_left: Option<u32>,
    pub progress: f32,
    pub config: Option<DownloadConfig>,
}

#[derive(Debug)]
struct SystemState {
    next_id: u64,
    transfers: BTreeMap<u64, FakeTransfer>,
    polls_to_finish: Option<u32>,
    enumeration: Enumeration,
    broken_recreate: HashSet<u64>,
    create_calls: usize,
    status_calls: usize,
    remove_calls: usize,
    /// Whether a destination existed at the moment of any poll before Done.
    saw_early_file: bool,
}

/// Transfer state that survives backend re-instantiation.
#[derive(Debug, Clone)]
pub struct FakeSystem {
    root: PathBuf,
    state: Arc<Mutex<SystemState>>,
}

impl FakeSystem {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            state: Arc::new(Mutex::new(SystemState {
                next_id: 1,
                transfers: BTreeMap::new(),
                polls_to_finish: None,
                enumeration: Enumeration::Supported,
                broken_recreate: HashSet::new(),
                create_calls: 0,
                status_calls: 0,
                remove_calls: 0,
                saw_early_file: false,
            })),
        }
    }

    /// A fresh backend attached to this system.
    pub fn backend(&self) -> Arc<FakeBackend> {
        Arc::new(FakeBackend {
            system: self.clone(),
        })
    }

    /// A registry over a fresh backend, as an application start would build.
    pub fn registry(&self) -> DownloadRegistry {
        DownloadRegistry::new(
            self.backend(),
            RegistryConfig::new(self.root.clone()).with_poll_interval(Duration::from_millis(5)),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// New transfers complete after this many status queries.
    pub fn complete_after(&self, polls: u32) {
        self.state.lock().unwrap().polls_to_finish = Some(polls);
    }

    pub fn set_enumeration(&self, mode: Enumeration) {
        self.state.lock().unwrap().enumeration = mode;
    }

    /// Make `recreate` return an error for this token.
    pub fn break_recreate(&self, token: &ResumeToken) {
        let id = token.as_u64().unwrap();
        self.state.lock().unwrap().broken_recreate.insert(id);
    }

    /// Register a transfer the application never recorded.
    pub fn inject(&self, url: &str, file_path: &str) -> ResumeToken {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.transfers.insert(
            id,
            FakeTransfer {
                url: Url::parse(url).unwrap(),
                file_path: file_path.to_string(),
                status: TransferStatus::InProgress,
                polls_left: None,
                progress: 0.0,
                config: None,
            },
        );
        ResumeToken::from(id)
    }

    /// Drop a transfer as if the OS had expired it.
    pub fn forget(&self, token: &ResumeToken) {
        let id = token.as_u64().unwrap();
        self.state.lock().unwrap().transfers.remove(&id);
    }

    /// Finish a transfer successfully, writing its destination.
    pub fn complete(&self, token: &ResumeToken) {
        let mut state = self.state.lock().unwrap();
        let id = token.as_u64().unwrap();
        let transfer = state.transfers.get_mut(&id).unwrap();
        write_destination(&self.root, &transfer.file_path);
        transfer.status = TransferStatus::Done;
        transfer.progress = 1.0;
    }

    pub fn fail(&self, token: &ResumeToken, reason: &str) {
        let id = token.as_u64().unwrap();
        let mut state = self.state.lock().unwrap();
        state.transfers.get_mut(&id).unwrap().status = TransferStatus::Failed(reason.to_string());
    }

    pub fn set_progress(&self, token: &ResumeToken, progress: f32) {
        let id = token.as_u64().unwrap();
        let mut state = self.state.lock().unwrap();
        state.transfers.get_mut(&id).unwrap().progress = progress;
    }

    pub fn transfer(&self, token: &ResumeToken) -> Option<FakeTransfer> {
        let id = token.as_u64()?;
        self.state.lock().unwrap().transfers.get(&id).cloned()
    }

    pub fn create_calls(&self) -> usize {
        self.state.lock().unwrap().create_calls
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().unwrap().status_calls
    }

    pub fn remove_calls(&self) -> usize {
        self.state.lock().unwrap().remove_calls
    }

    pub fn saw_early_file(&self) -> bool {
        self.state.lock().unwrap().saw_early_file
    }
}

fn write_destination(root: &Path, file_path: &str) {
    let destination = root.join(file_path);
    let mut part = destination.clone().into_os_string();
    part.push(".part");
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&part, BODY).unwrap();
    std::fs::rename(&part, &destination).unwrap();
}

fn unknown(token: &ResumeToken) -> BackendError {
    BackendError::unknown_token(token)
}

/// Backend view over a `FakeSystem`.
#[derive(Debug)]
pub struct FakeBackend {
    system: FakeSystem,
}

#[async_trait]
impl DownloadBackend for FakeBackend {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create(&self, config: &DownloadConfig) -> Result<ResumeToken, BackendError> {
        let mut state = self.system.state.lock().unwrap();
        state.create_calls += 1;
        let id = state.next_id;
        state.next_id += 1;
        let polls_left = state.polls_to_finish;
        state.transfers.insert(
            id,
            FakeTransfer {
                url: config.url.clone(),
                file_path: config.file_path.clone(),
                status: TransferStatus::InProgress,
                polls_left,
                progress: 0.0,
                config: Some(config.clone()),
            },
        );
        Ok(ResumeToken::from(id))
    }

    async fn query_status(&self, token: &ResumeToken) -> Result<TransferStatus, BackendError> {
        let root = self.system.root.clone();
        let mut state = self.system.state.lock().unwrap();
        state.status_calls += 1;
        let id = token.as_u64().ok_or_else(|| unknown(token))?;
        let transfer = state.transfers.get_mut(&id).ok_or_else(|| unknown(token))?;

        if transfer.status == TransferStatus::InProgress {
            let early = root.join(&transfer.file_path).exists();
            match transfer.polls_left {
                Some(n) if n <= 1 => {
                    write_destination(&root, &transfer.file_path);
                    transfer.status = TransferStatus::Done;
                    transfer.progress = 1.0;
                }
                Some(n) => transfer.polls_left = Some(n - 1),
                None => {}
            }
            let status = transfer.status.clone();
            if early {
                state.saw_early_file = true;
            }
            return Ok(status);
        }
        Ok(transfer.status.clone())
    }

    async fn query_progress(&self, token: &ResumeToken) -> Result<f32, BackendError> {
        let state = self.system.state.lock().unwrap();
        let id = token.as_u64().ok_or_else(|| unknown(token))?;
        state
            .transfers
            .get(&id)
            .map(|t| t.progress)
            .ok_or_else(|| unknown(token))
    }

    async fn remove(&self, token: &ResumeToken) -> Result<(), BackendError> {
        let mut state = self.system.state.lock().unwrap();
        state.remove_calls += 1;
        let id = token.as_u64().ok_or_else(|| unknown(token))?;
        state
            .transfers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| unknown(token))
    }

    async fn enumerate(&self) -> Result<Vec<TransferInfo>, BackendError> {
        let state = self.system.state.lock().unwrap();
        match state.enumeration {
            Enumeration::Supported => Ok(state
                .transfers
                .iter()
                .map(|(id, t)| {
                    TransferInfo::new(
                        ResumeToken::from(*id),
                        t.url.clone(),
                        t.file_path.clone(),
                        t.status.clone(),
                    )
                })
                .collect()),
            Enumeration::Unsupported => Err(BackendError::unsupported("fake")),
            Enumeration::Broken => Err(BackendError::other("transfer service unavailable")),
        }
    }

    async fn recreate(&self, token: &ResumeToken) -> Result<Option<TransferInfo>, BackendError> {
        let state = self.system.state.lock().unwrap();
        let Some(id) = token.as_u64() else {
            return Ok(None);
        };
        if state.broken_recreate.contains(&id) {
            return Err(BackendError::other("corrupt transfer record"));
        }
        Ok(state.transfers.get(&id).map(|t| {
            TransferInfo::new(token.clone(), t.url.clone(), t.file_path.clone(), t.status.clone())
        }))
    }
}
