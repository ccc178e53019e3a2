//! Download backend port definition.
//!
//! A backend is whatever actually moves the bytes: an OS download manager
//! bridge, or the in-process local transfer manager. The registry depends on
//! it only through this trait.
//!
//! # Contract
//!
//! - `create` must never expose a partially written destination file: the
//!   transfer writes elsewhere and moves the result into place on success
//! - `recreate` signals an unknown token with `Ok(None)`, never an error
//! - status and progress queries may be slow; callers treat them as opaque
//! - `remove` on a finished transfer only drops bookkeeping, it never deletes
//!   or rewrites a completed destination file

use async_trait::async_trait;

use crate::download::{BackendError, DownloadConfig, ResumeToken, TransferInfo, TransferStatus};

/// Port for a platform download service.
///
/// # Usage
///
/// ```ignore
/// let backend: Arc<dyn DownloadBackend> = /* ... */;
/// let token = backend.create(&config).await?;
/// while backend.query_status(&token).await? == TransferStatus::InProgress {
///     tokio::time::sleep(poll).await;
/// }
/// backend.remove(&token).await?;
/// ```
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Begin a new transfer and return the token that identifies it.
    ///
    /// The config's policy has already been normalized by the caller.
    async fn create(&self, config: &DownloadConfig) -> Result<ResumeToken, BackendError>;

    /// Current status of a transfer.
    async fn query_status(&self, token: &ResumeToken) -> Result<TransferStatus, BackendError>;

    /// Progress fraction in `[0, 1]`, or a negative value when unknown.
    ///
    /// This may be expensive on some platforms.
    async fn query_progress(&self, token: &ResumeToken) -> Result<f32, BackendError>;

    /// Cancel a running transfer, or drop the record of a finished one.
    async fn remove(&self, token: &ResumeToken) -> Result<(), BackendError>;

    /// Every transfer the backend currently tracks for this application.
    ///
    /// Returns `BackendError::Unsupported` when the platform offers no way
    /// to list transfers.
    async fn enumerate(&self) -> Result<Vec<TransferInfo>, BackendError>;

    /// Re-attach to a previously created transfer.
    ///
    /// Returns `Ok(None)` when the token is unknown or expired.
    async fn recreate(&self, token: &ResumeToken) -> Result<Option<TransferInfo>, BackendError>;
}
