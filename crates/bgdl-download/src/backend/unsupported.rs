//! Backend for platforms without a background transfer service.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use bgdl_core::download::{
    BackendError, DownloadConfig, ResumeToken, TransferInfo, TransferStatus,
};
use bgdl_core::ports::DownloadBackend;

/// Failure reason of every download started on this backend.
pub const UNSUPPORTED_MESSAGE: &str = "Background downloads are not supported on this platform";

/// A backend that accepts downloads and fails them immediately.
///
/// Nothing survives a restart, so the registry always starts empty.
#[derive(Debug, Default)]
pub struct UnsupportedBackend {
    next_id: AtomicU64,
}

impl UnsupportedBackend {
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl DownloadBackend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    async fn create(&self, config: &DownloadConfig) -> Result<ResumeToken, BackendError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            target: "bgdl.backend",
            file_path = %config.file_path,
            "{UNSUPPORTED_MESSAGE}"
        );
        ResumeToken::new(format!("unsupported-{id}"))
            .map_err(|e| BackendError::other(e.to_string()))
    }

    async fn query_status(&self, _token: &ResumeToken) -> Result<TransferStatus, BackendError> {
        Ok(TransferStatus::Failed(UNSUPPORTED_MESSAGE.to_string()))
    }

    async fn query_progress(&self, _token: &ResumeToken) -> Result<f32, BackendError> {
        Ok(1.0)
    }

    async fn remove(&self, _token: &ResumeToken) -> Result<(), BackendError> {
        Ok(())
    }

    async fn enumerate(&self) -> Result<Vec<TransferInfo>, BackendError> {
        Ok(Vec::new())
    }

    async fn recreate(&self, _token: &ResumeToken) -> Result<Option<TransferInfo>, BackendError> {
        Ok(None)
    }
}
