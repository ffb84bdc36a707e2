pub mod parse;
pub mod runner;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;
use runner::{argv, GitRunner};

pub const REMOTE: &str = "origin";

/// Shown on the branch row when neither branch nor hash can be read.
pub const UNKNOWN_BRANCH: &str = "(unknown)";

static COMMIT_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(?:[^\]\n]*\s)?([0-9a-fA-F]{4,40})\]").expect("valid regex"));

pub fn status_args() -> Vec<String> {
    argv(["status", "--porcelain", "--untracked-files=all"])
}

pub fn staged_numstat_args() -> Vec<String> {
    argv(["diff", "--cached", "--numstat"])
}

pub fn unstaged_numstat_args() -> Vec<String> {
    argv(["diff", "--numstat"])
}

pub fn stage_args(path: &str) -> Vec<String> {
    argv(["add", "--", path])
}

pub fn unstage_args(path: &str) -> Vec<String> {
    argv(["restore", "--staged", "--", path])
}

/// For git releases without `restore`.
pub fn unstage_fallback_args(path: &str) -> Vec<String> {
    argv(["reset", "-q", "HEAD", "--", path])
}

/// One `-m` per message segment so git keeps them as separate paragraphs.
pub fn commit_args(title: &str, description: Option<&str>, footer: Option<&str>, amend: bool) -> Vec<String> {
    let mut args = argv(["commit", "-m", title]);
    for segment in [description, footer].into_iter().flatten() {
        args.push("-m".to_string());
        args.push(segment.to_string());
    }
    if amend {
        args.push("--amend".to_string());
    }
    args
}

/// Pushes an explicit commit, not a branch name, so a later HEAD move cannot leak in.
pub fn push_args(branch: &str, full_hash: &str, force_with_lease: bool) -> Vec<String> {
    let mut args = argv(["push"]);
    if force_with_lease {
        args.push("--force-with-lease".to_string());
    }
    args.push(REMOTE.to_string());
    args.push(format!("{}:refs/heads/{}", full_hash, branch));
    args
}

pub fn show_current_branch_args() -> Vec<String> {
    argv(["branch", "--show-current"])
}

pub fn abbrev_ref_args() -> Vec<String> {
    argv(["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn short_head_args() -> Vec<String> {
    argv(["rev-parse", "--short", "HEAD"])
}

pub fn full_head_args() -> Vec<String> {
    argv(["rev-parse", "HEAD"])
}

pub fn head_message_args() -> Vec<String> {
    argv(["log", "-1", "--format=%B"])
}

/// Pulls the short hash out of git's `[branch 1a2b3c4] subject` summary line.
pub fn extract_commit_hash(output: &str) -> Option<String> {
    COMMIT_SUMMARY
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Label for the branch row: branch name, `detached@<short>`, or `(unknown)`.
pub async fn branch_label(runner: &dyn GitRunner, root: &Path) -> String {
    let out = runner
        .run_async(show_current_branch_args(), root.to_path_buf())
        .await;
    let name = out.stdout.trim();
    if out.success() && !name.is_empty() {
        return name.to_string();
    }

    // Older git has no --show-current.
    let out = runner.run_async(abbrev_ref_args(), root.to_path_buf()).await;
    let name = out.stdout.trim();
    if out.success() && !name.is_empty() && name != "HEAD" {
        return name.to_string();
    }

    let out = runner.run_async(short_head_args(), root.to_path_buf()).await;
    let hash = out.stdout.trim();
    if out.success() && !hash.is_empty() {
        return format!("detached@{}", hash);
    }

    UNKNOWN_BRANCH.to_string()
}

/// Current branch name, `None` when HEAD is detached.
pub async fn current_branch(runner: &dyn GitRunner, root: &Path) -> Option<String> {
    let label = branch_label(runner, root).await;
    if label == UNKNOWN_BRANCH || label.starts_with("detached@") {
        None
    } else {
        Some(label)
    }
}

pub async fn short_head(runner: &dyn GitRunner, root: &Path) -> Option<String> {
    let out = runner.run_async(short_head_args(), root.to_path_buf()).await;
    let hash = out.stdout.trim();
    (out.success() && !hash.is_empty()).then(|| hash.to_string())
}

pub async fn full_head(runner: &dyn GitRunner, root: &Path) -> Result<String, AppError> {
    let out = runner.run_async(full_head_args(), root.to_path_buf()).await;
    let hash = out.stdout.trim();
    if !out.success() || hash.is_empty() {
        return Err(AppError::Git(format!("cannot resolve HEAD: {}", out.excerpt())));
    }
    Ok(hash.to_string())
}

/// Worktree root and its private git dir, read synchronously.
pub fn resolve_repo(runner: &dyn GitRunner, cwd: &Path) -> Result<(PathBuf, PathBuf), AppError> {
    let out = runner.run(
        &argv(["rev-parse", "--show-toplevel", "--absolute-git-dir"]),
        cwd,
    );
    if !out.success() {
        return Err(AppError::NotARepository(cwd.to_path_buf()));
    }
    let mut lines = out.stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(root), Some(git_dir)) => Ok((PathBuf::from(root), PathBuf::from(git_dir))),
        _ => Err(AppError::NotARepository(cwd.to_path_buf())),
    }
}
