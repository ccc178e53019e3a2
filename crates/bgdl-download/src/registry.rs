//! The download registry.
//!
//! Single authority over active background downloads. It owns the backend,
//! the persistent index and the map of handles keyed by destination path.
//!
//! # Concurrency Model
//!
//! - One `tokio::sync::Mutex` guards load, add and remove
//! - The map is `None` until the first `start` or `list` reconciles it
//! - Status and progress queries go straight to the backend through the
//!   handles and never take the registry lock
//! - Backend removal during `dispose` happens after the lock is released

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use url::Url;

use bgdl_core::RegistryConfig;
use bgdl_core::download::{DownloadConfig, DownloadError, DownloadResult, canonical_file_path};
use bgdl_core::ports::DownloadBackend;

use crate::handle::DownloadHandle;
use crate::index::IndexFile;
use crate::reconcile::reconcile;

type DownloadMap = HashMap<String, DownloadHandle>;

/// Registry of background downloads that persist across restarts.
///
/// Construct one per application and share it behind an `Arc`.
pub struct DownloadRegistry {
    backend: Arc<dyn DownloadBackend>,
    config: RegistryConfig,
    index: IndexFile,
    downloads: Mutex<Option<DownloadMap>>,
}

impl std::fmt::Debug for DownloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadRegistry")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DownloadRegistry {
    /// Create a registry. Nothing is loaded until first use.
    pub fn new(backend: Arc<dyn DownloadBackend>, config: RegistryConfig) -> Self {
        let index = IndexFile::new(config.index_path());
        Self {
            backend,
            config,
            index,
            downloads: Mutex::new(None),
        }
    }

    /// Set the poll interval used by handles created after this call.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.config.poll_interval = poll_interval;
        self
    }

    /// Poll interval handed to new handles.
    pub const fn poll_interval(&self) -> Duration {
        self.config.poll_interval
    }

    /// Storage root every destination is resolved against.
    pub fn storage_root(&self) -> &Path {
        &self.config.storage_root
    }

    /// The persistent index this registry maintains.
    pub const fn index(&self) -> &IndexFile {
        &self.index
    }

    /// The backend in use.
    pub fn backend(&self) -> &Arc<dyn DownloadBackend> {
        &self.backend
    }

    /// Start a background download.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if the destination is not a relative path inside
    ///   the storage root
    /// - `DuplicateDestination` if a download to the same path is tracked
    /// - `Backend` if the backend cannot create the transfer
    /// - `Io` if the index cannot be written
    pub async fn start(&self, config: DownloadConfig) -> DownloadResult<DownloadHandle> {
        config.validate()?;
        let config = config.normalized();

        let mut guard = self.loaded().await;
        let downloads = guard.get_or_insert_with(DownloadMap::new);

        if downloads.contains_key(&config.file_path) {
            return Err(DownloadError::duplicate(&config.file_path));
        }

        let token = self.backend.create(&config).await?;
        let handle = DownloadHandle::started(
            config,
            token,
            Arc::clone(&self.backend),
            &self.config.storage_root,
            self.config.poll_interval,
        );
        downloads.insert(handle.file_path().to_string(), handle.clone());

        if let Err(e) = self.persist(downloads).await {
            downloads.remove(handle.file_path());
            drop(guard);
            if let Err(remove_err) = self.backend.remove(handle.token()).await {
                tracing::warn!(
                    target: "bgdl.registry",
                    file_path = %handle.file_path(),
                    error = %remove_err,
                    "Failed to release transfer after index write failure"
                );
            }
            return Err(e);
        }

        tracing::info!(
            target: "bgdl.registry",
            file_path = %handle.file_path(),
            url = %handle.url(),
            token = %handle.token(),
            policy = ?handle.config().policy,
            "Started background download"
        );
        Ok(handle)
    }

    /// Start a download with the default policy and no custom headers.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub async fn start_url(
        &self,
        url: Url,
        file_path: impl Into<String>,
    ) -> DownloadResult<DownloadHandle> {
        self.start(DownloadConfig::new(url, file_path)).await
    }

    /// Every tracked download, loading the registry first if needed.
    ///
    /// # Errors
    ///
    /// Currently infallible; loading problems are logged and skipped.
    pub async fn list(&self) -> DownloadResult<Vec<DownloadHandle>> {
        let guard = self.loaded().await;
        Ok(guard
            .as_ref()
            .map(|downloads| downloads.values().cloned().collect())
            .unwrap_or_default())
    }

    /// Look up a tracked download by destination path, in any spelling that
    /// names the same file.
    pub async fn get(&self, file_path: &str) -> Option<DownloadHandle> {
        let key = canonical_file_path(file_path);
        let guard = self.loaded().await;
        guard
            .as_ref()
            .and_then(|downloads| downloads.get(&key).cloned())
    }

    /// Stop tracking a download and release its backend resources.
    ///
    /// A download that is still running is aborted and its handle reports
    /// `Failed("Aborted")`. What remains at the destination after aborting is
    /// up to the backend. A finished download keeps its status and its file.
    ///
    /// Returns `false` if the handle was already disposed.
    ///
    /// # Errors
    ///
    /// Currently infallible; index and backend failures are logged.
    pub async fn dispose(&self, handle: &DownloadHandle) -> DownloadResult<bool> {
        let aborted = {
            let mut guard = self.downloads.lock().await;
            let Some(downloads) = guard.as_mut() else {
                return Ok(false);
            };
            let owned = downloads
                .get(handle.file_path())
                .is_some_and(|tracked| tracked.same_download(handle));
            if !owned {
                tracing::debug!(
                    target: "bgdl.registry",
                    file_path = %handle.file_path(),
                    "Download already disposed"
                );
                return Ok(false);
            }

            downloads.remove(handle.file_path());
            if let Err(e) = self.persist(downloads).await {
                tracing::warn!(
                    target: "bgdl.registry",
                    file_path = %handle.file_path(),
                    error = %e,
                    "Failed to update download index on dispose"
                );
            }
            handle.abort()
        };

        if let Err(e) = self.backend.remove(handle.token()).await {
            tracing::warn!(
                target: "bgdl.registry",
                file_path = %handle.file_path(),
                token = %handle.token(),
                error = %e,
                "Failed to release transfer"
            );
        }

        tracing::info!(
            target: "bgdl.registry",
            file_path = %handle.file_path(),
            aborted,
            "Disposed background download"
        );
        Ok(true)
    }

    /// Refresh every tracked download from the backend.
    ///
    /// For backends that broadcast completion instead of being polled.
    /// Redundant calls are harmless.
    pub async fn notify_transfer_completed(&self) {
        let handles: Vec<DownloadHandle> = {
            let guard = self.downloads.lock().await;
            guard
                .as_ref()
                .map(|downloads| downloads.values().cloned().collect())
                .unwrap_or_default()
        };
        for handle in handles {
            handle.refresh().await;
        }
    }

    /// Take the lock, reconciling with the backend on first use.
    async fn loaded(&self) -> MutexGuard<'_, Option<DownloadMap>> {
        let mut guard = self.downloads.lock().await;
        if guard.is_none() {
            let outcome = reconcile(self.backend.as_ref(), &self.index).await;
            let downloads = outcome
                .transfers
                .into_values()
                .map(|info| {
                    let handle = DownloadHandle::attached(
                        info,
                        Arc::clone(&self.backend),
                        &self.config.storage_root,
                        self.config.poll_interval,
                    );
                    (handle.file_path().to_string(), handle)
                })
                .collect();
            *guard = Some(downloads);
        }
        guard
    }

    /// Rewrite the index from the tracked downloads.
    async fn persist(&self, downloads: &DownloadMap) -> DownloadResult<()> {
        let mut handles: Vec<&DownloadHandle> = downloads.values().collect();
        handles.sort_by(|a, b| a.file_path().cmp(b.file_path()));
        let tokens = handles
            .into_iter()
            .map(|handle| handle.token().clone())
            .collect();
        self.index.persist(tokens).await
    }
}
