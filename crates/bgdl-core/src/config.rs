//! Registry configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the persistent download index inside the storage root.
pub const INDEX_FILE_NAME: &str = "bgdl_background_downloads.dl";

/// How often a waiting handle polls its backend by default.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Configuration for creating a download registry.
///
/// Contains the storage root every destination path is resolved against,
/// and the polling cadence used by handles that wait for completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Application-private directory holding downloads and the index.
    pub storage_root: PathBuf,
    /// Name of the index file inside `storage_root`.
    pub index_file_name: String,
    /// Poll interval used by `wait`.
    pub poll_interval: Duration,
}

impl RegistryConfig {
    /// Create a new config for the given storage root.
    #[must_use]
    pub fn new(storage_root: PathBuf) -> Self {
        Self {
            storage_root,
            index_file_name: INDEX_FILE_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the index file name.
    #[must_use]
    pub fn with_index_file_name(mut self, name: impl Into<String>) -> Self {
        self.index_file_name = name.into();
        self
    }

    /// Full path of the index file.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.storage_root.join(&self.index_file_name)
    }

    /// Absolute destination for a relative download path.
    #[must_use]
    pub fn resolve(&self, file_path: &str) -> PathBuf {
        resolve_destination(&self.storage_root, file_path)
    }
}

/// Join a relative destination onto a storage root.
#[must_use]
pub fn resolve_destination(storage_root: &Path, file_path: &str) -> PathBuf {
    storage_root.join(file_path)
}
