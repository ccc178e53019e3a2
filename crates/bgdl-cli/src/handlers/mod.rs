//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<_, CliError>`
//! - Thin wrappers that validate CLI input, call the registry and format
//!   output for the terminal

pub mod cancel;
pub mod list;
pub mod start;
pub mod wait;

use bgdl_download::{DownloadHandle, DownloadStatus};

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Look up a tracked download or fail with `NotFound`.
pub(crate) async fn find(ctx: &CliContext, file_path: &str) -> Result<DownloadHandle, CliError> {
    ctx.registry()
        .get(file_path)
        .await
        .ok_or_else(|| CliError::NotFound(file_path.to_string()))
}

/// Progress as a percentage label, or `?` when unknown.
pub(crate) fn format_progress(status: DownloadStatus, progress: f32) -> String {
    if status == DownloadStatus::Done {
        "100%".to_string()
    } else if progress < 0.0 {
        "?".to_string()
    } else {
        format!("{:.0}%", progress * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_progress() {
        assert_eq!(format_progress(DownloadStatus::Done, 0.2), "100%");
        assert_eq!(format_progress(DownloadStatus::Downloading, -1.0), "?");
        assert_eq!(format_progress(DownloadStatus::Downloading, 0.426), "43%");
    }
}
