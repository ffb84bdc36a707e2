use std::fmt;

use serde::Serialize;

/// Single-letter change code from the porcelain listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatusCode {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unmerged,
    Untracked,
    Other(char),
}

impl StatusCode {
    pub fn from_char(c: char) -> Self {
        match c {
            'A' => StatusCode::Added,
            'M' => StatusCode::Modified,
            'D' => StatusCode::Deleted,
            'R' => StatusCode::Renamed,
            'C' => StatusCode::Copied,
            'T' => StatusCode::TypeChanged,
            'U' => StatusCode::Unmerged,
            '?' => StatusCode::Untracked,
            other => StatusCode::Other(other),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            StatusCode::Added => 'A',
            StatusCode::Modified => 'M',
            StatusCode::Deleted => 'D',
            StatusCode::Renamed => 'R',
            StatusCode::Copied => 'C',
            StatusCode::TypeChanged => 'T',
            StatusCode::Unmerged => 'U',
            StatusCode::Untracked => '?',
            StatusCode::Other(c) => c,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Section {
    Staged,
    Unstaged,
}

impl Section {
    /// The section a file moves into when its stage state is toggled.
    pub fn toggled(self) -> Self {
        match self {
            Section::Staged => Section::Unstaged,
            Section::Unstaged => Section::Staged,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Section::Staged => "Staged",
            Section::Unstaged => "Unstaged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChangeRecord {
    pub status: StatusCode,
    /// Repo-relative, slash separated.
    pub path: String,
    /// Staged and worktree modifications exist at the same time.
    pub partial: bool,
}

impl FileChangeRecord {
    /// Status letter plus `*` for partially staged files.
    pub fn mark(&self) -> String {
        if self.partial {
            format!("{}*", self.status)
        } else {
            self.status.to_string()
        }
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineChangeTotals {
    pub added: u64,
    pub deleted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStatus {
    pub staged: Vec<FileChangeRecord>,
    pub unstaged: Vec<FileChangeRecord>,
}

impl ParsedStatus {
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.unstaged.is_empty()
    }
}
