//! CLI bootstrap - the composition root.
//!
//! The only place where the storage root, the backend and the registry are
//! wired together. Handlers receive the composed `CliContext`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bgdl_core::{DEFAULT_POLL_INTERVAL, RegistryConfig, storage_root};
use bgdl_download::{DownloadBackend, DownloadRegistry, default_backend};

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Explicit storage root (flag or env), if any.
    pub data_dir: Option<String>,
    /// Poll interval for waiting on downloads.
    pub poll_interval: Duration,
}

impl CliConfig {
    /// Create config with default paths.
    pub const fn with_defaults() -> Self {
        Self {
            data_dir: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the storage root.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: Option<String>) -> Self {
        self.data_dir = data_dir;
        self
    }

    /// Override the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Fully composed context for CLI commands.
pub struct CliContext {
    /// The download registry.
    pub registry: Arc<DownloadRegistry>,
    /// Resolved storage root.
    pub storage_root: PathBuf,
}

impl CliContext {
    /// Compose a context from an already-built backend.
    pub fn new(
        backend: Arc<dyn DownloadBackend>,
        storage_root: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        let config = RegistryConfig::new(storage_root.clone()).with_poll_interval(poll_interval);
        Self {
            registry: Arc::new(DownloadRegistry::new(backend, config)),
            storage_root,
        }
    }

    /// Access the registry.
    pub fn registry(&self) -> &DownloadRegistry {
        &self.registry
    }

    /// Access the storage root.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

/// Bootstrap the CLI application.
///
/// 1. Resolves (and creates) the storage root
/// 2. Builds the backend selected for this build
/// 3. Wraps both in a registry
pub fn bootstrap(config: &CliConfig) -> Result<CliContext, CliError> {
    let root = storage_root(config.data_dir.as_deref())?;
    let backend = default_backend(&root).map_err(|e| CliError::Config(e.to_string()))?;

    tracing::debug!(
        storage_root = %root.display(),
        backend = backend.name(),
        "Bootstrapped download registry"
    );

    Ok(CliContext::new(backend, root, config.poll_interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builders() {
        let config = CliConfig::with_defaults()
            .with_data_dir(Some("/tmp/x".into()))
            .with_poll_interval(Duration::from_millis(5));
        assert_eq!(config.data_dir.as_deref(), Some("/tmp/x"));
        assert_eq!(config.poll_interval, Duration::from_millis(5));
    }
}
