//! CLI-specific error types and mappings.
//!
//! Maps registry and path errors to exit codes and user-facing messages.

use bgdl_core::{DownloadError, PathError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The registry rejected or failed an operation.
    #[error("{0}")]
    Download(String),

    /// Argument error detected after parsing.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// No tracked download for this destination.
    #[error("No tracked download for '{0}'")]
    NotFound(String),

    /// The download finished in the `Failed` state.
    #[error("Download of '{file_path}' failed: {reason}")]
    Failed {
        /// Destination path.
        file_path: String,
        /// Failure reason reported by the backend.
        reason: String,
    },

    /// IO error while accessing registry state.
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error (storage root, backend setup).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow sysexits.h where one fits.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Download(_) | Self::Failed { .. } => 1,
            Self::Arguments(_) => 2, // EX_USAGE
            Self::NotFound(_) => 66, // EX_NOINPUT
            Self::Io(_) => 74,       // EX_IOERR
            Self::Config(_) => 78,   // EX_CONFIG
        }
    }
}

impl From<DownloadError> for CliError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::InvalidConfig { message } => Self::Arguments(message),
            DownloadError::Io { message, .. } => Self::Io(message),
            other => Self::Download(other.to_string()),
        }
    }
}

impl From<PathError> for CliError {
    fn from(err: PathError) -> Self {
        Self::Config(err.to_string())
    }
}
