use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;
use crate::git::{self, runner::CommandOutput, runner::GitRunner, types::Section};
use crate::status::types::StatusSnapshot;

pub const NO_ACTIONABLE_FILE: &str = "No actionable file on this line";

/// The file under a row and the section it is shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTarget {
    pub path: String,
    pub section: Section,
}

pub fn toggle_target(snapshot: &StatusSnapshot, row: usize) -> Result<ToggleTarget, AppError> {
    snapshot
        .record_at(row)
        .map(|(record, section)| ToggleTarget {
            path: record.path.clone(),
            section,
        })
        .ok_or_else(|| AppError::Validation(NO_ACTIONABLE_FILE.to_string()))
}

pub async fn stage(runner: &dyn GitRunner, root: &Path, path: &str) -> Result<(), AppError> {
    let out = runner
        .run_async(git::stage_args(path), root.to_path_buf())
        .await;
    check(out, "stage", path)
}

/// Tries `restore --staged`, then `reset` for git releases without `restore`.
/// The fallback's result is the one reported.
pub async fn unstage(runner: &dyn GitRunner, root: &Path, path: &str) -> Result<(), AppError> {
    let out = runner
        .run_async(git::unstage_args(path), root.to_path_buf())
        .await;
    if out.success() {
        return Ok(());
    }
    warn!(path, err = %out.excerpt(), "restore --staged failed, falling back to reset");
    let out = runner
        .run_async(git::unstage_fallback_args(path), root.to_path_buf())
        .await;
    check(out, "unstage", path)
}

/// Stages an unstaged row, unstages a staged one.
pub async fn toggle(runner: &dyn GitRunner, root: &Path, target: &ToggleTarget) -> Result<(), AppError> {
    match target.section {
        Section::Staged => unstage(runner, root, &target.path).await,
        Section::Unstaged => stage(runner, root, &target.path).await,
    }
}

fn check(out: CommandOutput, action: &str, path: &str) -> Result<(), AppError> {
    if out.success() {
        info!(action, path, "Done");
        Ok(())
    } else {
        warn!(action, path, exit_code = out.exit_code, "git failed");
        Err(AppError::command_failed(
            format!("{} {}", action, path),
            out.excerpt(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub short_hash: Option<String>,
    pub output: CommandOutput,
}

/// Commits with the title, description and footer as separate message segments.
///
/// An empty title is rejected before git runs.
pub async fn commit(
    runner: &dyn GitRunner,
    root: &Path,
    title: &str,
    description: &[String],
    footer: &[String],
    is_amend: bool,
) -> Result<CommitOutcome, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Commit title is empty".to_string()));
    }
    let description = joined(description);
    let footer = joined(footer);

    let args = git::commit_args(title, description.as_deref(), footer.as_deref(), is_amend);
    let out = runner.run_async(args, root.to_path_buf()).await;
    if !out.success() {
        warn!(exit_code = out.exit_code, is_amend, "Commit failed");
        return Err(AppError::command_failed("commit", out.excerpt()));
    }

    let short_hash = match git::extract_commit_hash(&out.combined()) {
        Some(hash) => Some(hash),
        None => git::short_head(runner, root).await,
    };
    info!(hash = ?short_hash, is_amend, "Committed");
    Ok(CommitOutcome {
        short_hash,
        output: out,
    })
}

fn joined(lines: &[String]) -> Option<String> {
    let text = lines.join("\n");
    (!text.trim().is_empty()).then_some(text)
}

/// Publishes exactly `full_hash` to `origin` as `branch`.
pub async fn push(
    runner: &dyn GitRunner,
    root: &Path,
    branch: &str,
    full_hash: &str,
    force_with_lease: bool,
) -> Result<CommandOutput, AppError> {
    let args = git::push_args(branch, full_hash, force_with_lease);
    let out = runner.run_async(args, root.to_path_buf()).await;
    if !out.success() {
        warn!(branch, exit_code = out.exit_code, "Push failed");
        return Err(AppError::command_failed("push", out.excerpt()));
    }
    info!(branch, hash = full_hash, force_with_lease, "Pushed");
    Ok(out)
}
