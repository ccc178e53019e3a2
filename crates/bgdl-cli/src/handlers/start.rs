//! `bgdl start`

use url::Url;

use bgdl_core::{DownloadConfig, DownloadPolicy, DownloadStatus};

use crate::bootstrap::CliContext;
use crate::commands::HeaderArg;
use crate::error::CliError;

/// Arguments for `start`.
#[derive(Debug, Clone)]
pub struct StartArgs {
    pub url: Url,
    pub file_path: String,
    pub policy: DownloadPolicy,
    pub headers: Vec<HeaderArg>,
    pub wait: bool,
}

/// Start a download, optionally staying attached until it finishes.
///
/// Returns the status the download had when this command returned.
pub async fn execute(ctx: &CliContext, args: StartArgs) -> Result<DownloadStatus, CliError> {
    let mut config = DownloadConfig::new(args.url, args.file_path).with_policy(args.policy);
    for header in args.headers {
        config.add_request_header(header.name, header.value)?;
    }

    let handle = ctx.registry().start(config).await?;
    println!(
        "Started {} -> {}",
        handle.url(),
        handle.destination().display()
    );

    if args.wait {
        return super::wait::follow(ctx, &handle).await;
    }

    println!(
        "Run `bgdl wait {}` to follow it to completion.",
        handle.file_path()
    );
    Ok(handle.current_status())
}
