//! Concrete `DownloadBackend` implementations.
//!
//! Exactly one backend is active per build. `default_backend` picks it from
//! the enabled features; tests and embedders may construct any backend
//! directly and hand it to the registry.

use std::path::Path;
use std::sync::Arc;

use bgdl_core::download::BackendError;
use bgdl_core::ports::DownloadBackend;

#[cfg(feature = "local")]
mod local;
mod unsupported;

#[cfg(feature = "local")]
pub use local::LocalTransferBackend;
pub use unsupported::{UNSUPPORTED_MESSAGE, UnsupportedBackend};

/// Build the backend for this build configuration.
///
/// With the `local` feature (default) this is the in-process transfer
/// manager rooted at `storage_root`; otherwise every download fails as
/// unsupported.
#[cfg(feature = "local")]
pub fn default_backend(storage_root: &Path) -> Result<Arc<dyn DownloadBackend>, BackendError> {
    Ok(Arc::new(LocalTransferBackend::new(storage_root)?))
}

/// Build the backend for this build configuration.
#[cfg(not(feature = "local"))]
pub fn default_backend(storage_root: &Path) -> Result<Arc<dyn DownloadBackend>, BackendError> {
    tracing::debug!(
        target: "bgdl.backend",
        storage_root = %storage_root.display(),
        "No transfer backend compiled in"
    );
    Ok(Arc::new(UnsupportedBackend::new()))
}
