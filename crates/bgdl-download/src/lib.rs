//! Persistent background download registry for bgdl.
//!
//! - `registry` - `DownloadRegistry`, the single authority over active downloads
//! - `handle` - `DownloadHandle`, the per-download state machine
//! - `index` - the line-per-token persistent index
//! - `reconcile` - startup re-attachment to outstanding transfers
//! - `backend` - concrete `DownloadBackend` implementations and selection

// Re-export core types for convenience
pub use bgdl_core::download::{
    BackendError, DownloadConfig, DownloadError, DownloadPolicy, DownloadResult, DownloadStatus,
    PROGRESS_UNKNOWN, ResumeToken, TransferInfo, TransferStatus,
};
pub use bgdl_core::ports::DownloadBackend;
pub use bgdl_core::{INDEX_FILE_NAME, RegistryConfig};

pub mod backend;
mod handle;
mod index;
mod reconcile;
mod registry;

pub use backend::{UNSUPPORTED_MESSAGE, UnsupportedBackend, default_backend};
#[cfg(feature = "local")]
pub use backend::LocalTransferBackend;
pub use handle::{ABORTED_ERROR, DownloadHandle, DownloadState};
pub use index::IndexFile;
pub use reconcile::{ReconcileOutcome, reconcile};
pub use registry::DownloadRegistry;
