//! Storage root resolution.

use std::env;
use std::path::PathBuf;

use super::ensure::ensure_directory;
use super::error::PathError;

/// Environment variable that overrides the storage root.
pub const DATA_DIR_ENV: &str = "BGDL_DATA_DIR";

/// Directory name used under the system data directory.
const APP_DIR_NAME: &str = "bgdl";

/// How the storage root was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageSource {
    /// The caller passed an explicit path (e.g., CLI flag).
    Explicit,
    /// The path came from `BGDL_DATA_DIR`.
    EnvVar,
    /// Fallback default under the system data directory.
    Default,
}

/// Result of storage root resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStorage {
    /// The resolved storage root.
    pub path: PathBuf,
    /// How the path was determined.
    pub source: StorageSource,
}

impl ResolvedStorage {
    /// Resolve without touching the process environment or the file system.
    ///
    /// Resolution order:
    /// 1. Explicit path provided by caller (highest priority)
    /// 2. `env_value` (the content of `BGDL_DATA_DIR`), if non-blank
    /// 3. System data directory (e.g., `~/.local/share/bgdl`)
    pub fn resolve_from(
        explicit: Option<&str>,
        env_value: Option<&str>,
    ) -> Result<Self, PathError> {
        if let Some(path) = explicit {
            return Ok(Self {
                path: normalize_user_path(path)?,
                source: StorageSource::Explicit,
            });
        }

        if let Some(path) = env_value.filter(|v| !v.trim().is_empty()) {
            return Ok(Self {
                path: normalize_user_path(path)?,
                source: StorageSource::EnvVar,
            });
        }

        let data_dir = dirs::data_local_dir().ok_or(PathError::NoDataDir)?;
        Ok(Self {
            path: data_dir.join(APP_DIR_NAME),
            source: StorageSource::Default,
        })
    }
}

/// Resolve the storage root and make sure it exists.
pub fn storage_root(explicit: Option<&str>) -> Result<PathBuf, PathError> {
    let env_value = env::var(DATA_DIR_ENV).ok();
    let resolved = ResolvedStorage::resolve_from(explicit, env_value.as_deref())?;
    ensure_directory(&resolved.path)?;
    tracing::debug!(
        path = %resolved.path.display(),
        source = ?resolved.source,
        "Resolved storage root"
    );
    Ok(resolved.path)
}

/// Normalize a user-provided path, expanding `~` and making it absolute.
fn normalize_user_path(raw: &str) -> Result<PathBuf, PathError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptyPath);
    }

    let expanded = if trimmed.starts_with("~/") || trimmed == "~" {
        let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
        if trimmed == "~" {
            home
        } else {
            home.join(trimmed.trim_start_matches("~/"))
        }
    } else {
        PathBuf::from(trimmed)
    };

    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(expanded))
            .map_err(|e| PathError::CurrentDirError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_over_env() {
        let resolved =
            ResolvedStorage::resolve_from(Some("/tmp/explicit"), Some("/tmp/from-env")).unwrap();
        assert_eq!(resolved.source, StorageSource::Explicit);
        assert_eq!(resolved.path, PathBuf::from("/tmp/explicit"));
    }

    #[test]
    fn env_value_used_when_no_explicit_path() {
        let resolved = ResolvedStorage::resolve_from(None, Some("/tmp/from-env")).unwrap();
        assert_eq!(resolved.source, StorageSource::EnvVar);
        assert!(resolved.path.ends_with("from-env"));
    }

    #[test]
    fn blank_env_value_falls_through() {
        if let Ok(resolved) = ResolvedStorage::resolve_from(None, Some("  ")) {
            assert_eq!(resolved.source, StorageSource::Default);
            assert!(resolved.path.ends_with(APP_DIR_NAME));
        }
    }

    #[test]
    fn relative_paths_become_absolute() {
        let resolved = ResolvedStorage::resolve_from(Some("relative/dir"), None).unwrap();
        assert!(resolved.path.is_absolute());
        assert!(resolved.path.ends_with("relative/dir"));
    }

    #[test]
    fn empty_explicit_path_is_rejected() {
        assert!(matches!(
            ResolvedStorage::resolve_from(Some(""), None),
            Err(PathError::EmptyPath)
        ));
    }

    #[test]
    fn storage_root_creates_explicit_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("store");
        let resolved = storage_root(Some(root.to_str().unwrap())).unwrap();
        assert_eq!(resolved, root);
        assert!(root.is_dir());
    }
}
