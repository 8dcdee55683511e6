use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::history::DEFAULT_FILE_MODE;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{field} {detail}")]
    Invalid { field: &'static str, detail: String },
    #[error("Path cannot be empty")]
    EmptyPath,
    #[error("Home directory not found, cannot expand path: {0}")]
    NoHomeDirectory(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Hour of day (0-23) used for reminders due today.
    pub default_due_hour: i32,
    pub default_due_minute: i32,
    /// Reminders list that mirrors active tasks.
    pub reminder_list_name: String,
    pub journal_suffix: String,
    pub archive_suffix: String,
    /// Unix mode applied to files the tool creates.
    pub default_file_permissions: u32,
    pub active_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_due_hour: 16,
            default_due_minute: 0,
            reminder_list_name: "Taskmasterra".to_string(),
            journal_suffix: ".xjournal.md".to_string(),
            archive_suffix: ".xarchive.md".to_string(),
            default_file_permissions: DEFAULT_FILE_MODE,
            active_marker: crate::grammar::ACTIVE_MARKER.to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=23).contains(&self.default_due_hour) {
            return Err(ConfigError::Invalid {
                field: "default_due_hour",
                detail: format!("must be between 0 and 23 (got {})", self.default_due_hour),
            });
        }
        if !(0..=59).contains(&self.default_due_minute) {
            return Err(ConfigError::Invalid {
                field: "default_due_minute",
                detail: format!("must be between 0 and 59 (got {})", self.default_due_minute),
            });
        }
        let required = [
            ("reminder_list_name", &self.reminder_list_name),
            ("journal_suffix", &self.journal_suffix),
            ("archive_suffix", &self.archive_suffix),
            ("active_marker", &self.active_marker),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    detail: "cannot be empty".to_string(),
                });
            }
        }
        let suffixes = [
            ("journal_suffix", &self.journal_suffix),
            ("archive_suffix", &self.archive_suffix),
        ];
        for (field, suffix) in suffixes {
            if !is_history_suffix(suffix) {
                return Err(ConfigError::Invalid {
                    field,
                    detail: format!("must look like '.name.ext' (got '{suffix}')"),
                });
            }
        }
        if self.journal_suffix == self.archive_suffix {
            return Err(ConfigError::Invalid {
                field: "archive_suffix",
                detail: format!("must differ from journal_suffix (both '{}')", self.archive_suffix),
            });
        }
        Ok(())
    }
}

/// `.xjournal.md` qualifies; a bare extension such as `.md` would name the
/// task document itself.
fn is_history_suffix(suffix: &str) -> bool {
    let Some(rest) = suffix.strip_prefix('.') else {
        return false;
    };
    match rest.split_once('.') {
        Some((name, ext)) => !name.is_empty() && !ext.is_empty(),
        None => false,
    }
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_taskmasterra_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("TASKMASTERRA_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".taskmasterra"))
}

pub fn default_config_path() -> Option<PathBuf> {
    resolve_taskmasterra_home_dir().map(|home| home.join("config.json"))
}

/// Load settings from `path`, or from the default location when `None`.
///
/// A missing file is bootstrapped with the defaults. Without a resolvable
/// home directory the defaults are returned and nothing is written.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(Settings::default()),
        },
    };
    if !path.exists() {
        let settings = Settings::default();
        save_config(&path, &settings)?;
        info!(path = %path.display(), "created default config");
        return Ok(settings);
    }
    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let settings = serde_json::from_str::<Settings>(&text)
        .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
    debug!(path = %path.display(), "loaded config");
    Ok(settings)
}

pub fn save_config(path: &Path, settings: &Settings) -> Result<PathBuf, ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_string_pretty(settings)?;
    fs::write(path, body).map_err(io_err)?;
    Ok(path.to_path_buf())
}

/// Expand a leading `~` or `$HOME` in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::EmptyPath);
    }
    if let Some(rest) = raw.strip_prefix("$HOME") {
        let home = std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .ok_or_else(|| ConfigError::NoHomeDirectory(raw.to_string()))?;
        return Ok(join_home(PathBuf::from(home), rest));
    }
    if let Some(rest) = raw.strip_prefix('~') {
        let home =
            resolve_user_home_dir().ok_or_else(|| ConfigError::NoHomeDirectory(raw.to_string()))?;
        return Ok(join_home(home, rest));
    }
    Ok(PathBuf::from(raw))
}

fn join_home(home: PathBuf, rest: &str) -> PathBuf {
    let rest = rest.trim_start_matches(['/', '\\']);
    if rest.is_empty() {
        home
    } else {
        home.join(rest)
    }
}
