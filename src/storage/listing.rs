//! Directory listing for the `/list` page.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Local};

/// What a directory entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Dir,
    File,
    Unknown,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Dir => "DIR",
            EntryKind::File => "FILE",
            EntryKind::Unknown => "UNKNOWN",
        }
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    pub size_bytes: u64,
    pub created_at: String,
    pub modified_at: String,
}

impl Entry {
    /// Size in KiB with two decimals, e.g. `"1.50"`.
    pub fn size_kb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1024.0)
    }
}

/// `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// List `dir`, directories first, each group sorted by name.
///
/// Entries that vanish or cannot be stat'ed mid-listing are skipped.
pub async fn list_entries(dir: &Path) -> std::io::Result<Vec<Entry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(dir_entry) = reader.next_entry().await? {
        let meta = match tokio::fs::metadata(dir_entry.path()).await {
            Ok(meta) => meta,
            Err(err) => {
                tracing::debug!(path = ?dir_entry.path(), error = %err, "Skipping entry");
                continue;
            }
        };

        let kind = if meta.is_dir() {
            EntryKind::Dir
        } else if meta.is_file() {
            EntryKind::File
        } else {
            EntryKind::Unknown
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let created = meta.created().unwrap_or(modified);

        entries.push(Entry {
            name: dir_entry.file_name().to_string_lossy().into_owned(),
            kind,
            size_bytes: meta.len(),
            created_at: format_timestamp(created),
            modified_at: format_timestamp(modified),
        });
    }

    entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}
