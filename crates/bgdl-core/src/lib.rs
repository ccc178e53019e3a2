//! Core domain types and port definitions for bgdl.
//!
//! This crate holds everything the download registry and the backends agree
//! on, with no I/O beyond storage-root resolution:
//!
//! - [`download`] - `DownloadConfig`, statuses, resume tokens and errors
//! - [`ports`] - the `DownloadBackend` capability trait
//! - [`paths`] - application-private storage root resolution
//! - [`config`] - registry configuration
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod download;
pub mod paths;
pub mod ports;

pub use config::{DEFAULT_POLL_INTERVAL, INDEX_FILE_NAME, RegistryConfig};
pub use download::{
    BackendError, DownloadConfig, DownloadError, DownloadPolicy, DownloadResult, DownloadStatus,
    PROGRESS_UNKNOWN, RequestHeaders, ResumeToken, TransferInfo, TransferStatus,
    canonical_file_path,
};
pub use paths::{PathError, ResolvedStorage, StorageSource, ensure_directory, storage_root};
pub use ports::DownloadBackend;

// Dev-dependencies exercised only from unit tests
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tempfile as _;
