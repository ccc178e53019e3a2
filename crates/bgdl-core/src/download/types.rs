//! Core domain types for downloads.
//!
//! Pure data types with no I/O dependencies.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::DownloadError;

/// Progress value reported when a backend cannot tell how far a transfer is.
pub const PROGRESS_UNKNOWN: f32 = -1.0;

/// Custom request headers: header name to every value sent under that name.
///
/// Insertion order is preserved, and repeated values become repeated headers.
pub type RequestHeaders = IndexMap<String, Vec<String>>;

/// Which network connections a download may use.
///
/// Backends that cannot distinguish connection types treat every policy as
/// allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DownloadPolicy {
    /// Whatever the platform recommends; normalized to `AllowMetered`.
    #[default]
    Default,
    /// Only unmetered connections such as Wi-Fi.
    UnrestrictedOnly,
    /// Metered (mobile) connections are allowed.
    AllowMetered,
    /// Any connection, including roaming.
    AlwaysAllow,
}

impl DownloadPolicy {
    /// Resolve `Default` to the concrete policy used for new downloads.
    #[must_use]
    pub const fn normalized(self) -> Self {
        match self {
            Self::Default => Self::AllowMetered,
            other => other,
        }
    }

    /// Whether metered connections are allowed.
    #[must_use]
    pub const fn allows_metered(self) -> bool {
        matches!(
            self.normalized(),
            Self::AllowMetered | Self::AlwaysAllow
        )
    }

    /// Whether roaming connections are allowed.
    #[must_use]
    pub const fn allows_roaming(self) -> bool {
        matches!(self, Self::AlwaysAllow)
    }
}

impl FromStr for DownloadPolicy {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "default" => Ok(Self::Default),
            "unrestrictedonly" | "unmetered" => Ok(Self::UnrestrictedOnly),
            "allowmetered" | "metered" => Ok(Self::AllowMetered),
            "alwaysallow" | "always" => Ok(Self::AlwaysAllow),
            _ => Err(DownloadError::invalid_config(format!(
                "unknown download policy '{s}'"
            ))),
        }
    }
}

/// Everything needed to start a download.
///
/// `file_path` is relative and is resolved against the application-private
/// storage root; it is also the key that identifies the download. The
/// destination file is overwritten if it exists. `policy` and
/// `request_headers` are not guaranteed to survive an application restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Resource to download.
    pub url: Url,
    /// Relative destination path inside the storage root.
    pub file_path: String,
    /// Network-cost policy.
    #[serde(default)]
    pub policy: DownloadPolicy,
    /// Extra HTTP headers to send.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub request_headers: RequestHeaders,
}

impl DownloadConfig {
    /// Create a config with the default policy and no custom headers.
    pub fn new(url: Url, file_path: impl Into<String>) -> Self {
        Self {
            url,
            file_path: file_path.into(),
            policy: DownloadPolicy::Default,
            request_headers: RequestHeaders::new(),
        }
    }

    /// Set the network policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: DownloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add a header value, keeping any values already present for `name`.
    pub fn add_request_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DownloadError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DownloadError::invalid_config("header name cannot be empty"));
        }
        self.request_headers
            .entry(name)
            .or_default()
            .push(value.into());
        Ok(())
    }

    /// Iterate over headers as `(name, value)` pairs, one per value.
    pub fn header_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.request_headers.iter().flat_map(|(name, values)| {
            values.iter().map(move |v| (name.as_str(), v.as_str()))
        })
    }

    /// Check that the destination stays inside the storage root.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if canonical_file_path(&self.file_path).trim().is_empty() {
            return Err(DownloadError::invalid_config(
                "destination path cannot be empty",
            ));
        }
        let path = Path::new(&self.file_path);
        if path.is_absolute() || path.has_root() {
            return Err(DownloadError::invalid_config(format!(
                "destination path '{}' must be relative",
                self.file_path
            )));
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(DownloadError::invalid_config(format!(
                "destination path '{}' escapes the storage root",
                self.file_path
            )));
        }
        Ok(())
    }

    /// Copy of this config with the policy normalized and the destination
    /// in canonical form (see [`canonical_file_path`]).
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        config.policy = config.policy.normalized();
        config.file_path = canonical_file_path(&config.file_path);
        config
    }
}

/// Canonical spelling of a relative destination path.
///
/// `a.bin`, `./a.bin`, `a.bin/` and `dir//a.bin` name the files `a.bin` and
/// `dir/a.bin`; they must map to one key. `.` components, repeated and
/// trailing separators are dropped and the rest is joined with `/`. Purely
/// lexical: the filesystem is never consulted.
pub fn canonical_file_path(file_path: &str) -> String {
    let mut canonical = String::with_capacity(file_path.len());
    for component in Path::new(file_path).components() {
        match component {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::Normal(part) => {
                if !canonical.is_empty() {
                    canonical.push('/');
                }
                canonical.push_str(&part.to_string_lossy());
            }
            Component::ParentDir => {
                if !canonical.is_empty() {
                    canonical.push('/');
                }
                canonical.push_str("..");
            }
        }
    }
    canonical
}

/// Status of a download as seen by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadStatus {
    /// The transfer is still running.
    Downloading,
    /// The transfer finished and the destination file is complete.
    Done,
    /// The transfer ended with an error.
    Failed,
}

impl DownloadStatus {
    /// True for `Done` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Downloading)
    }

    /// Lowercase name used in logs and the CLI.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a transfer as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Still running (or waiting for a suitable network).
    InProgress,
    /// Finished; the destination file is in place.
    Done,
    /// Finished with a backend-supplied reason.
    Failed(String),
}

impl TransferStatus {
    /// True once the transfer can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

/// Opaque, backend-specific identifier of a transfer.
///
/// Tokens are what the persistent index stores, one per line, so they can
/// never be empty or contain line breaks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResumeToken(String);

impl ResumeToken {
    /// Create a token, rejecting values the index cannot store.
    pub fn new(value: impl Into<String>) -> Result<Self, DownloadError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.contains(['\n', '\r']) {
            return Err(DownloadError::InvalidToken { value });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the token as a numeric job id, if it is one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl From<u64> for ResumeToken {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<String> for ResumeToken {
    type Error = DownloadError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResumeToken> for String {
    fn from(token: ResumeToken) -> Self {
        token.0
    }
}

impl FromStr for ResumeToken {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a backend knows about one of its transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    /// Token identifying the transfer.
    pub token: ResumeToken,
    /// Source URL.
    pub url: Url,
    /// Relative destination path (the registry key).
    pub file_path: String,
    /// Status at the time of the query.
    pub status: TransferStatus,
}

impl TransferInfo {
    /// Create a transfer description.
    pub fn new(
        token: ResumeToken,
        url: Url,
        file_path: impl Into<String>,
        status: TransferStatus,
    ) -> Self {
        Self {
            token,
            url,
            file_path: file_path.into(),
            status,
        }
    }
}
