//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! StorageConfig
//!     → Storage (work dir, per-user root)
//!     → user_path()  (name → checked path inside the user root)
//!     → listing.rs   (directory entries for the /list page)
//! ```
//!
//! # Design Decisions
//! - Every client-supplied name is resolved relative to the user root and may not
//!   escape it
//! - Missing files are a value (`None` / `0`), not an error
//! - File handles are scoped to the operation that opens them

pub mod listing;

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::StorageConfig;

pub use listing::{Entry, EntryKind};

/// Error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("empty file name")]
    EmptyName,

    #[error("path {0:?} escapes the user directory")]
    Escapes(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk layout for the single served user.
#[derive(Debug, Clone)]
pub struct Storage {
    work_dir: PathBuf,
    user_root: PathBuf,
    favicon: PathBuf,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        let user_root = config.work_dir.join(&config.user_dir).join(&config.user);
        Self {
            favicon: config.work_dir.join(&config.favicon),
            work_dir: config.work_dir.clone(),
            user_root,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn user_root(&self) -> &Path {
        &self.user_root
    }

    pub fn favicon_path(&self) -> &Path {
        &self.favicon
    }

    /// Create the user directory if it is missing.
    pub async fn ensure_layout(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.user_root).await
    }

    /// Resolve a relative name inside the user root.
    ///
    /// Absolute paths and `..` components are rejected.
    pub fn user_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(name);
        let mut resolved = self.user_root.clone();
        let mut pushed = false;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StorageError::Escapes(name.to_string()));
                }
            }
        }

        if pushed {
            Ok(resolved)
        } else {
            Err(StorageError::EmptyName)
        }
    }

    /// Directory entries of the user root; empty if it does not exist.
    pub async fn list_user_entries(&self) -> std::io::Result<Vec<Entry>> {
        if !exists(&self.user_root).await {
            tracing::warn!(path = ?self.user_root, "User directory does not exist");
            return Ok(Vec::new());
        }
        listing::list_entries(&self.user_root).await
    }
}

/// Undo the `%2F` escaping browsers apply to slashes in form values.
pub fn decode_form_path(value: &str) -> String {
    value.replace("%2F", "/").replace("%2f", "/")
}

/// Final path component of a client-supplied file name.
pub fn base_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name)
}

pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Size in bytes; a missing file has size 0.
pub async fn size(path: &Path) -> std::io::Result<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(err) => Err(err),
    }
}

/// Whole-file read; `None` if the file does not exist.
pub async fn read(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
