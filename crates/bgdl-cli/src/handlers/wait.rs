//! `bgdl wait`

use indicatif::{ProgressBar, ProgressStyle};

use bgdl_download::{DownloadHandle, DownloadStatus};

use crate::bootstrap::CliContext;
use crate::error::CliError;

const BAR_SCALE: u64 = 1000;

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(BAR_SCALE);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb
}

/// Follow a download to completion, then stop tracking it.
pub async fn execute(ctx: &CliContext, file_path: &str) -> Result<DownloadStatus, CliError> {
    let handle = super::find(ctx, file_path).await?;
    follow(ctx, &handle).await
}

/// Show progress until `handle` finishes, then dispose it.
pub(crate) async fn follow(
    ctx: &CliContext,
    handle: &DownloadHandle,
) -> Result<DownloadStatus, CliError> {
    let pb = progress_bar();
    pb.set_message(handle.file_path().to_string());

    let mut ticker = tokio::time::interval(ctx.registry().poll_interval());
    while handle.keep_waiting().await {
        let progress = handle.progress().await;
        if progress >= 0.0 {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let position = (f64::from(progress) * BAR_SCALE as f64) as u64;
            pb.set_position(position);
        }
        ticker.tick().await;
    }

    let status = handle.current_status();
    let error = handle.error();
    if status == DownloadStatus::Done {
        pb.finish_with_message(format!("{} done", handle.file_path()));
    } else {
        pb.abandon_with_message(format!("{} failed", handle.file_path()));
    }

    ctx.registry().dispose(handle).await?;

    match status {
        DownloadStatus::Done => {
            println!("Saved {}", handle.destination().display());
            Ok(status)
        }
        _ => Err(CliError::Failed {
            file_path: handle.file_path().to_string(),
            reason: error.unwrap_or_else(|| "unknown error".to_string()),
        }),
    }
}
