//! Persistent download index.
//!
//! Plain text, one resume token per line, no header and no versioning. The
//! file is always rewritten in full: an interrupted rewrite leaves the old
//! (outdated but consistent) file in place instead of a corrupt one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use bgdl_core::INDEX_FILE_NAME;
use bgdl_core::download::{DownloadError, DownloadResult, ResumeToken};

/// The on-disk list of tokens for downloads that may still exist.
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    /// Index stored at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Index stored under its fixed name inside `storage_root`.
    pub fn in_dir(storage_root: &Path) -> Self {
        Self::new(storage_root.join(INDEX_FILE_NAME))
    }

    /// Location of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every token in the index.
    ///
    /// A missing file means there are no active downloads. Blank lines are
    /// skipped and lines that are not valid tokens are dropped with a warning.
    pub fn read_tokens(&self) -> DownloadResult<Vec<ResumeToken>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(DownloadError::from_io_error(&e)),
        };

        let tokens = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match ResumeToken::new(line) {
                Ok(token) => Some(token),
                Err(e) => {
                    tracing::warn!(
                        target: "bgdl.index",
                        path = %self.path.display(),
                        error = %e,
                        "Skipping malformed index line"
                    );
                    None
                }
            })
            .collect();
        Ok(tokens)
    }

    /// Replace the index with exactly these tokens.
    ///
    /// An empty set deletes the file.
    pub fn save<'a, I>(&self, tokens: I) -> DownloadResult<()>
    where
        I: IntoIterator<Item = &'a ResumeToken>,
    {
        let mut content = String::new();
        for token in tokens {
            content.push_str(token.as_str());
            content.push('\n');
        }

        if content.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => {
                    tracing::debug!(target: "bgdl.index", "Removed empty download index");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(DownloadError::from_io_error(&e)),
            };
        }

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| DownloadError::from_io_error(&e))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| DownloadError::from_io_error(&e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| DownloadError::from_io_error(&e))?;
        tmp.persist(&self.path)
            .map_err(|e| DownloadError::from_io_error(&e.error))?;

        tracing::debug!(
            target: "bgdl.index",
            path = %self.path.display(),
            "Rewrote download index"
        );
        Ok(())
    }

    /// [`save`](Self::save) on the blocking thread pool.
    ///
    /// The rewrite ends in an `fsync`, which must not stall a runtime worker.
    pub async fn persist(&self, tokens: Vec<ResumeToken>) -> DownloadResult<()> {
        let index = self.clone();
        tokio::task::spawn_blocking(move || index.save(&tokens))
            .await
            .map_err(|e| DownloadError::io("Other", format!("index write task failed: {e}")))?
    }
}
