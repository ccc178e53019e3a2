//! Per-download state machine.
//!
//! A handle moves from `Downloading` to either `Done` or `Failed` exactly
//! once. Status is pulled from the backend on demand and memoized once
//! terminal, so frequent `status()` calls on a finished download never reach
//! the backend. Push refreshes go through the same transition, which makes
//! redundant refreshes harmless.
//!
//! # Concurrency
//!
//! The memoized state lives in a `watch` channel: readers see it without
//! locking the registry, and `wait()` wakes on transitions as well as on its
//! poll timer.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use url::Url;

use bgdl_core::config::resolve_destination;
use bgdl_core::download::{
    DownloadConfig, DownloadStatus, PROGRESS_UNKNOWN, ResumeToken, TransferInfo, TransferStatus,
};
use bgdl_core::ports::DownloadBackend;

/// Error recorded on a download that was disposed while still running.
pub const ABORTED_ERROR: &str = "Aborted";

/// Memoized status of a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadState {
    /// Current status.
    pub status: DownloadStatus,
    /// Failure reason, set only when `status` is `Failed`.
    pub error: Option<String>,
}

impl DownloadState {
    const fn downloading() -> Self {
        Self {
            status: DownloadStatus::Downloading,
            error: None,
        }
    }

    fn from_transfer(status: TransferStatus) -> Self {
        let mut state = Self::downloading();
        state.apply(status);
        state
    }

    /// Apply a backend status. Returns whether anything changed.
    fn apply(&mut self, status: TransferStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        match status {
            TransferStatus::InProgress => false,
            TransferStatus::Done => {
                self.status = DownloadStatus::Done;
                true
            }
            TransferStatus::Failed(reason) => {
                self.status = DownloadStatus::Failed;
                self.error = Some(reason);
                true
            }
        }
    }
}

struct HandleInner {
    config: DownloadConfig,
    token: ResumeToken,
    destination: PathBuf,
    backend: Arc<dyn DownloadBackend>,
    poll_interval: Duration,
    state: watch::Sender<DownloadState>,
}

/// A tracked background download.
///
/// Cloning a handle is cheap; all clones observe the same state. Handles are
/// created by the registry and must be disposed through it once the caller
/// is done with them.
#[derive(Clone)]
pub struct DownloadHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("file_path", &self.inner.config.file_path)
            .field("token", &self.inner.token)
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl DownloadHandle {
    fn build(
        config: DownloadConfig,
        token: ResumeToken,
        initial: DownloadState,
        backend: Arc<dyn DownloadBackend>,
        storage_root: &Path,
        poll_interval: Duration,
    ) -> Self {
        let destination = resolve_destination(storage_root, &config.file_path);
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(HandleInner {
                config,
                token,
                destination,
                backend,
                poll_interval,
                state,
            }),
        }
    }

    /// Handle for a transfer this process just created.
    pub(crate) fn started(
        config: DownloadConfig,
        token: ResumeToken,
        backend: Arc<dyn DownloadBackend>,
        storage_root: &Path,
        poll_interval: Duration,
    ) -> Self {
        Self::build(
            config,
            token,
            DownloadState::downloading(),
            backend,
            storage_root,
            poll_interval,
        )
    }

    /// Handle re-attached to a transfer found during reconciliation.
    ///
    /// Policy and headers are not recoverable, so the config carries the
    /// normalized default policy and no headers.
    pub(crate) fn attached(
        info: TransferInfo,
        backend: Arc<dyn DownloadBackend>,
        storage_root: &Path,
        poll_interval: Duration,
    ) -> Self {
        let config = DownloadConfig::new(info.url, info.file_path).normalized();
        Self::build(
            config,
            info.token,
            DownloadState::from_transfer(info.status),
            backend,
            storage_root,
            poll_interval,
        )
    }

    /// The configuration this download was started with.
    pub fn config(&self) -> &DownloadConfig {
        &self.inner.config
    }

    /// Relative destination path; the key of this download.
    pub fn file_path(&self) -> &str {
        &self.inner.config.file_path
    }

    /// Source URL.
    pub fn url(&self) -> &Url {
        &self.inner.config.url
    }

    /// Absolute destination under the storage root.
    ///
    /// Do not read or write this file before the download is `Done`.
    pub fn destination(&self) -> &Path {
        &self.inner.destination
    }

    /// Backend token of the underlying transfer.
    pub fn token(&self) -> &ResumeToken {
        &self.inner.token
    }

    /// Memoized status, without asking the backend.
    pub fn current_status(&self) -> DownloadStatus {
        self.inner.state.borrow().status
    }

    /// Memoized state (status and error), without asking the backend.
    pub fn state(&self) -> DownloadState {
        self.inner.state.borrow().clone()
    }

    /// Failure reason, if the download failed.
    pub fn error(&self) -> Option<String> {
        self.inner.state.borrow().error.clone()
    }

    /// Current status, refreshed from the backend while still running.
    pub async fn status(&self) -> DownloadStatus {
        self.refresh().await
    }

    /// Whether a caller waiting on this download should keep waiting.
    pub async fn keep_waiting(&self) -> bool {
        self.status().await == DownloadStatus::Downloading
    }

    /// Progress in `[0, 1]`, or a negative value when the backend cannot tell.
    ///
    /// Querying progress can be expensive on some backends; there is no need
    /// to call this on every frame.
    pub async fn progress(&self) -> f32 {
        if self.current_status() == DownloadStatus::Done {
            return 1.0;
        }
        match self.inner.backend.query_progress(&self.inner.token).await {
            Ok(p) if p.is_nan() => PROGRESS_UNKNOWN,
            Ok(p) => p.min(1.0),
            Err(e) => {
                tracing::debug!(
                    target: "bgdl.registry",
                    file_path = %self.file_path(),
                    error = %e,
                    "Progress query failed"
                );
                PROGRESS_UNKNOWN
            }
        }
    }

    /// Wait until the download leaves `Downloading`.
    ///
    /// Polls the backend at the registry's poll interval and also wakes as
    /// soon as another task observes a transition.
    pub async fn wait(&self) -> DownloadStatus {
        let mut changes = self.inner.state.subscribe();
        let mut ticker = tokio::time::interval(self.inner.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let status = self.status().await;
            if status.is_terminal() {
                return status;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                _ = changes.changed() => {}
            }
        }
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<DownloadState> {
        self.inner.state.subscribe()
    }

    /// Pull the backend status unless already terminal.
    pub(crate) async fn refresh(&self) -> DownloadStatus {
        let current = self.current_status();
        if current.is_terminal() {
            return current;
        }

        match self.inner.backend.query_status(&self.inner.token).await {
            Ok(status) => self.apply(status),
            Err(e) if e.is_unknown_token() => {
                self.apply(TransferStatus::Failed(e.to_string()));
            }
            Err(e) => {
                tracing::warn!(
                    target: "bgdl.registry",
                    file_path = %self.file_path(),
                    error = %e,
                    "Status query failed; still downloading"
                );
            }
        }
        self.current_status()
    }

    /// Apply a backend status to the memoized state.
    pub(crate) fn apply(&self, status: TransferStatus) {
        let changed = self.inner.state.send_if_modified(|state| state.apply(status));
        if changed {
            let state = self.state();
            tracing::info!(
                target: "bgdl.registry",
                file_path = %self.file_path(),
                status = %state.status,
                error = state.error.as_deref().unwrap_or(""),
                "Download finished"
            );
        }
    }

    /// Force `Failed("Aborted")` if still running. Returns whether it was.
    pub(crate) fn abort(&self) -> bool {
        self.inner.state.send_if_modified(|state| {
            state.apply(TransferStatus::Failed(ABORTED_ERROR.to_string()))
        })
    }

    /// Whether two handles refer to the same registry entry.
    pub fn same_download(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
