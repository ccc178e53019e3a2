//! `bgdl list`

use bgdl_download::DownloadStatus;

use super::format_progress;
use crate::bootstrap::CliContext;
use crate::error::CliError;

/// One row of `list` output.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub file_path: String,
    pub url: String,
    pub status: DownloadStatus,
    pub progress: f32,
    pub error: Option<String>,
}

/// Print every tracked download and return the rows.
///
/// Each row queries the backend, which resumes unfinished local transfers
/// for as long as this process lives.
pub async fn execute(ctx: &CliContext) -> Result<Vec<ListRow>, CliError> {
    let mut handles = ctx.registry().list().await?;
    handles.sort_by(|a, b| a.file_path().cmp(b.file_path()));

    let mut rows = Vec::with_capacity(handles.len());
    for handle in handles {
        let status = handle.status().await;
        rows.push(ListRow {
            file_path: handle.file_path().to_string(),
            url: handle.url().to_string(),
            status,
            progress: handle.progress().await,
            error: handle.error(),
        });
    }

    if rows.is_empty() {
        println!("No tracked downloads.");
        return Ok(rows);
    }

    println!("{:<12} {:>6}  {:<40} URL", "STATUS", "DONE", "PATH");
    for row in &rows {
        println!(
            "{:<12} {:>6}  {:<40} {}",
            row.status,
            format_progress(row.status, row.progress),
            row.file_path,
            row.url
        );
        if let Some(error) = &row.error {
            println!("{:<12} {:>6}  error: {error}", "", "");
        }
    }
    Ok(rows)
}
