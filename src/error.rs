use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("git error: {0}")]
    Git(String),

    #[error("{action} failed: {detail}")]
    CommandFailed { action: String, detail: String },

    #[error("{0}")]
    Validation(String),

    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("HEAD is detached; check out a branch before pushing")]
    DetachedHead,

    #[error("config error: {0}")]
    Config(String),

    #[error("watcher error: {0}")]
    Watcher(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn command_failed(action: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::CommandFailed {
            action: action.into(),
            detail: detail.into(),
        }
    }
}
