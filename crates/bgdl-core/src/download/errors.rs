//! Download error types.
//!
//! These errors are designed to be serializable and not depend on external
//! error types like `std::io::Error`. For I/O errors, we capture the kind
//! and message as strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for registry operations.
///
/// A failed transfer is not an error value: it is the terminal `Failed`
/// state of a download handle, with the backend's reason as its message.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum DownloadError {
    /// A download to the same destination is already registered.
    #[error("Download of '{file_path}' is already present")]
    DuplicateDestination {
        /// The destination path that is already in use.
        file_path: String,
    },

    /// The download configuration was rejected.
    #[error("Invalid download configuration: {message}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        message: String,
    },

    /// A resume token could not be represented in the index.
    #[error("Invalid resume token: {value:?}")]
    InvalidToken {
        /// The offending token text.
        value: String,
    },

    /// The backend could not create or manage the transfer.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// I/O error while reading or writing registry state.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "not found", "permission denied").
        kind: String,
        /// Detailed error message.
        message: String,
    },
}

impl DownloadError {
    /// Create a duplicate destination error.
    pub fn duplicate(file_path: impl Into<String>) -> Self {
        Self::DuplicateDestination {
            file_path: file_path.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Whether this error was caused by the caller rather than the system.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateDestination { .. } | Self::InvalidConfig { .. }
        )
    }
}

/// Convenience result type for registry operations.
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Errors reported by a download backend.
#[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendError {
    /// The backend does not know this token (expired, removed, or foreign).
    #[error("Unknown transfer: {token}")]
    UnknownToken {
        /// The token that was not recognized.
        token: String,
    },

    /// The backend cannot perform this operation at all.
    #[error("Operation not supported by the {backend} backend")]
    Unsupported {
        /// Name of the backend.
        backend: String,
    },

    /// File system failure inside the backend.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error.
        kind: String,
        /// Detailed error message.
        message: String,
    },

    /// Transport failure inside the backend.
    #[error("Network error: {message}")]
    Network {
        /// Detailed error message.
        message: String,
    },

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl BackendError {
    /// Create an unknown token error.
    pub fn unknown_token(token: impl ToString) -> Self {
        Self::UnknownToken {
            token: token.to_string(),
        }
    }

    /// Create an unsupported operation error.
    pub fn unsupported(backend: impl Into<String>) -> Self {
        Self::Unsupported {
            backend: backend.into(),
        }
    }

    /// Create an I/O error from a `std::io::Error`.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error) -> Self {
        let kind = err.kind();
        Self::Io {
            kind: format!("{kind:?}"),
            message: err.to_string(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if the backend reported an unknown token.
    #[must_use]
    pub const fn is_unknown_token(&self) -> bool {
        matches!(self, Self::UnknownToken { .. })
    }

    /// Check if the operation is unsupported.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}
