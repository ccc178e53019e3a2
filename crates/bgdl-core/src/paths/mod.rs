//! Path utilities for the application-private storage root.
//!
//! Every destination path and the persistent index live under one storage
//! root, because directories an application may write to are not guaranteed
//! to be the same across runs on every platform.
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - Pure resolution (`ResolvedStorage::resolve_from`) is separate from the
//!   environment-reading and directory-creating entry point

mod ensure;
mod error;
mod storage;

pub use ensure::ensure_directory;
pub use error::PathError;
pub use storage::{DATA_DIR_ENV, ResolvedStorage, StorageSource, storage_root};
