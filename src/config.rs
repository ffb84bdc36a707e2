use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;

pub const CONFIG_ENV: &str = "COMMIT_PANE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Executable used for every git invocation.
    pub git_binary: String,
    /// Total pane width in columns.
    pub width: usize,
    /// Columns taken by borders and gutters.
    pub padding: usize,
    /// Show `+added -deleted` beside section headers.
    pub show_totals: bool,
    /// Directory inside the worktree's git dir that holds draft files.
    pub draft_dir: String,
    pub watch_index: bool,
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            width: 50,
            padding: 2,
            show_totals: true,
            draft_dir: "commit-pane".to_string(),
            watch_index: true,
            debounce_ms: 300,
        }
    }
}

impl Config {
    /// Width available to row text, never less than one column.
    pub fn content_width(&self) -> usize {
        self.width.saturating_sub(self.padding).max(1)
    }

    /// Loads from `path`, else from `$COMMIT_PANE_CONFIG`, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV).map(PathBuf::from),
        };
        match path {
            Some(p) => Self::from_file(&p),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file missing, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_width_clamps_to_one_column() {
        let config = Config {
            width: 2,
            padding: 5,
            ..Config::default()
        };
        assert_eq!(config.content_width(), 1);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "width": 80, "show_totals": false }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.width, 80);
        assert!(!config.show_totals);
        assert_eq!(config.git_binary, "git");
        assert_eq!(config.draft_dir, "commit-pane");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_file(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ width: ").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
