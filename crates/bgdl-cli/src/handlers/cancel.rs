//! `bgdl cancel`

use bgdl_download::DownloadStatus;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Dispose a tracked download, aborting it if it is still running.
///
/// Returns the status the download ended with.
pub async fn execute(ctx: &CliContext, file_path: &str) -> Result<DownloadStatus, CliError> {
    let handle = super::find(ctx, file_path).await?;
    ctx.registry().dispose(&handle).await?;

    let status = handle.current_status();
    match status {
        DownloadStatus::Done => println!("Stopped tracking {file_path} (already complete)"),
        _ => println!("Cancelled {file_path}"),
    }
    Ok(status)
}
