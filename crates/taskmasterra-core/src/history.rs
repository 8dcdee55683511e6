//! Journal/archive files that sit next to a task document.
//!
//! Both files are newest-first logs: every run prepends its batch above the
//! existing content and rewrites the whole file.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::Settings;

/// Files above this size are refused rather than loaded into memory.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const DEFAULT_FILE_MODE: u32 = 0o644;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("File path cannot be empty")]
    EmptyPath,
    #[error("File '{path}' is too large ({size} bytes, max {max} bytes)", max = MAX_FILE_SIZE)]
    TooLarge { path: PathBuf, size: u64 },
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whole-file text storage used by record keeping.
pub trait DocumentStore {
    /// Read a file as text. `Ok(None)` means the file does not exist.
    fn read_text(&self, path: &Path) -> Result<Option<String>, HistoryError>;

    /// Replace the file's content, creating parent directories as needed.
    fn write_text(&self, path: &Path, text: &str) -> Result<(), HistoryError>;
}

#[derive(Debug, Clone, Copy)]
pub struct FsStore {
    file_mode: u32,
}

impl FsStore {
    pub fn new(file_mode: u32) -> Self {
        Self { file_mode }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.default_file_permissions)
    }
}

impl Default for FsStore {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_MODE)
    }
}

impl DocumentStore for FsStore {
    fn read_text(&self, path: &Path) -> Result<Option<String>, HistoryError> {
        if path.as_os_str().is_empty() {
            return Err(HistoryError::EmptyPath);
        }
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if metadata.len() > MAX_FILE_SIZE {
            return Err(HistoryError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
            });
        }
        fs::read_to_string(path)
            .map(Some)
            .map_err(|source| HistoryError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    fn write_text(&self, path: &Path, text: &str) -> Result<(), HistoryError> {
        if path.as_os_str().is_empty() {
            return Err(HistoryError::EmptyPath);
        }
        let write_err = |source| HistoryError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let existed = path.exists();
        fs::write(path, text).map_err(write_err)?;
        if !existed {
            apply_file_mode(path, self.file_mode).map_err(write_err)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn apply_file_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_file_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPaths {
    pub journal: PathBuf,
    pub archive: PathBuf,
}

impl HistoryPaths {
    /// `notes/todo.md` becomes `notes/todo<journal_suffix>` and `notes/todo<archive_suffix>`.
    pub fn derive(document: &Path, journal_suffix: &str, archive_suffix: &str) -> Self {
        let stem = document
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = document.parent().unwrap_or_else(|| Path::new(""));
        Self {
            journal: dir.join(format!("{stem}{journal_suffix}")),
            archive: dir.join(format!("{stem}{archive_suffix}")),
        }
    }
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("[%Y-%m-%d %H:%M:%S UTC]").to_string()
}

/// Put `entries` above whatever `path` already holds.
///
/// An empty batch does no I/O at all, so a missing file stays missing.
/// Returns whether the file was written.
pub fn prepend_entries<S: DocumentStore + ?Sized>(
    store: &S,
    path: &Path,
    entries: &[String],
) -> Result<bool, HistoryError> {
    if entries.is_empty() {
        return Ok(false);
    }
    let existing = store.read_text(path)?.unwrap_or_default();
    let mut content = entries.join("\n");
    content.push('\n');
    content.push_str(&existing);
    store.write_text(path, &content)?;
    info!(path = %path.display(), entries = entries.len(), "history updated");
    Ok(true)
}
