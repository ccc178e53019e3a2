//! Download domain types and errors.
//!
//! This module contains pure data types for the download system. No I/O,
//! networking, or runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - Configuration, statuses and the opaque `ResumeToken`
//! - `errors` - Error types for registry and backend operations

pub mod errors;
pub mod types;

pub use errors::{BackendError, DownloadError, DownloadResult};
pub use types::{
    DownloadConfig, DownloadPolicy, DownloadStatus, PROGRESS_UNKNOWN, RequestHeaders,
    ResumeToken, TransferInfo, TransferStatus, canonical_file_path,
};
