//! Per-worktree draft files for the commit title, body and footer.
//!
//! Drafts live in a directory inside the worktree's own git dir, so linked
//! worktrees never share them. Normal and amend mode use separate files
//! (`draft.*` and `amend.*`).

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info};

use crate::error::AppError;
use crate::git::{self, runner::GitRunner};

static TRAILER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*: \S").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPaths {
    pub root: PathBuf,
    pub title_path: PathBuf,
    pub body_path: PathBuf,
    pub footer_path: PathBuf,
}

impl DraftPaths {
    pub fn new(root: PathBuf, draft_dir: &Path, is_amend: bool) -> Self {
        let prefix = if is_amend { "amend" } else { "draft" };
        Self {
            root,
            title_path: draft_dir.join(format!("{}.title", prefix)),
            body_path: draft_dir.join(format!("{}.body", prefix)),
            footer_path: draft_dir.join(format!("{}.footer", prefix)),
        }
    }

    fn all(&self) -> [&Path; 3] {
        [&self.title_path, &self.body_path, &self.footer_path]
    }
}

/// Memoizes [`DraftPaths`] per (working directory, amend) for the resolver's lifetime.
///
/// Entries are never invalidated: a worktree's git dir does not move while
/// the process runs.
pub struct DraftResolver {
    dir_name: String,
    cache: Mutex<HashMap<(PathBuf, bool), DraftPaths>>,
}

impl DraftResolver {
    pub fn new(dir_name: impl Into<String>) -> Self {
        Self {
            dir_name: dir_name.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(
        &self,
        runner: &dyn GitRunner,
        cwd: &Path,
        is_amend: bool,
    ) -> Result<DraftPaths, AppError> {
        let key = (
            fs::canonicalize(cwd).unwrap_or_else(|_| cwd.to_path_buf()),
            is_amend,
        );
        if let Some(paths) = self.cache.lock().get(&key) {
            return Ok(paths.clone());
        }

        let (root, git_dir) = git::resolve_repo(runner, cwd)?;
        let paths = DraftPaths::new(root, &git_dir.join(&self.dir_name), is_amend);
        debug!(cwd = %cwd.display(), is_amend, title = %paths.title_path.display(), "Resolved draft paths");
        self.cache.lock().insert(key, paths.clone());
        Ok(paths)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub body: Vec<String>,
    pub footer: Vec<String>,
}

impl Draft {
    pub fn load(paths: &DraftPaths) -> Result<Self, AppError> {
        let title = read_or_empty(&paths.title_path)?;
        Ok(Self {
            title: title.lines().next().unwrap_or("").trim_end().to_string(),
            body: trimmed_lines(&read_or_empty(&paths.body_path)?),
            footer: trimmed_lines(&read_or_empty(&paths.footer_path)?),
        })
    }

    pub fn save(&self, paths: &DraftPaths) -> Result<(), AppError> {
        if let Some(parent) = paths.title_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&paths.title_path, format!("{}\n", self.title))?;
        fs::write(&paths.body_path, join_lines(&self.body))?;
        fs::write(&paths.footer_path, join_lines(&self.footer))?;
        Ok(())
    }

    pub fn clear(paths: &DraftPaths) -> Result<(), AppError> {
        for path in paths.all() {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Splits a full commit message: subject, body, trailing trailer block.
    pub fn from_message(message: &str) -> Self {
        let mut lines: Vec<&str> = message.lines().collect();
        while lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }
        let title = lines.first().map(|l| l.trim().to_string()).unwrap_or_default();
        let rest = lines.get(1..).unwrap_or(&[]);

        let last_paragraph_start = rest
            .iter()
            .rposition(|l| l.trim().is_empty())
            .map(|i| i + 1)
            .unwrap_or(0);
        let last_paragraph = &rest[last_paragraph_start..];
        let is_trailer_block = !last_paragraph.is_empty()
            && last_paragraph.iter().all(|l| TRAILER.is_match(l));

        let (body, footer) = if is_trailer_block {
            (&rest[..last_paragraph_start], last_paragraph)
        } else {
            (rest, &[][..])
        };

        Self {
            title,
            body: trimmed_lines(&body.join("\n")),
            footer: footer.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Fills the amend drafts from HEAD's message unless an amend title already exists.
pub async fn seed_amend(runner: &dyn GitRunner, paths: &DraftPaths) -> Result<bool, AppError> {
    if paths.title_path.exists() {
        return Ok(false);
    }
    let out = runner
        .run_async(git::head_message_args(), paths.root.clone())
        .await;
    if !out.success() {
        return Err(AppError::command_failed("read HEAD message", out.excerpt()));
    }
    Draft::from_message(&out.stdout).save(paths)?;
    info!(root = %paths.root.display(), "Seeded amend drafts from HEAD");
    Ok(true)
}

fn read_or_empty(path: &Path) -> Result<String, AppError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

/// Lines with leading and trailing blank lines dropped.
fn trimmed_lines(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines.iter().rposition(|l| !l.is_empty()).map_or(start, |i| i + 1);
    lines[start..end].iter().map(|l| l.to_string()).collect()
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("{}\n", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::runner::testing::ScriptedRunner;
    use crate::git::runner::CommandOutput;

    fn paths_in(dir: &Path, is_amend: bool) -> DraftPaths {
        DraftPaths::new(dir.to_path_buf(), &dir.join(".git/commit-pane"), is_amend)
    }

    #[test]
    fn modes_use_distinct_prefixes() {
        let draft = paths_in(Path::new("/w"), false);
        let amend = paths_in(Path::new("/w"), true);
        assert!(draft.title_path.ends_with("draft.title"));
        assert!(amend.title_path.ends_with("amend.title"));
        assert_ne!(draft.body_path, amend.body_path);
        assert_ne!(draft.footer_path, amend.footer_path);
    }

    #[test]
    fn resolver_memoizes_per_directory_and_mode() {
        let runner = ScriptedRunner::new(|_| CommandOutput::ok("/w\n/w/.git/worktrees/feature\n"));
        let resolver = DraftResolver::new("commit-pane");

        let first = resolver.resolve(&runner, Path::new("/w"), false).unwrap();
        let again = resolver.resolve(&runner, Path::new("/w"), false).unwrap();
        assert_eq!(first, again);
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(
            first.title_path,
            PathBuf::from("/w/.git/worktrees/feature/commit-pane/draft.title")
        );

        let amend = resolver.resolve(&runner, Path::new("/w"), true).unwrap();
        assert!(amend.title_path.ends_with("amend.title"));
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path(), false);
        assert_eq!(Draft::load(&paths).unwrap(), Draft::default());

        let draft = Draft {
            title: "feat: add pane".into(),
            body: vec!["first".into(), "".into(), "second".into()],
            footer: vec!["Refs: #12".into()],
        };
        draft.save(&paths).unwrap();
        assert_eq!(Draft::load(&paths).unwrap(), draft);

        Draft::clear(&paths).unwrap();
        assert!(!paths.title_path.exists());
        Draft::clear(&paths).unwrap();
    }

    #[test]
    fn message_split_detects_trailers() {
        let draft = Draft::from_message(
            "fix: handle rename\n\nExplain the change.\nMore detail.\n\nSigned-off-by: A <a@x>\nRefs: #3\n",
        );
        assert_eq!(draft.title, "fix: handle rename");
        assert_eq!(draft.body, vec!["Explain the change.", "More detail."]);
        assert_eq!(draft.footer, vec!["Signed-off-by: A <a@x>", "Refs: #3"]);
    }

    #[test]
    fn message_without_trailers_has_no_footer() {
        let draft = Draft::from_message("subject only\n\nbody line\n");
        assert_eq!(draft.title, "subject only");
        assert_eq!(draft.body, vec!["body line"]);
        assert!(draft.footer.is_empty());
    }

    #[tokio::test]
    async fn seed_amend_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path(), true);
        let runner = ScriptedRunner::new(|_| CommandOutput::ok("chore: bump\n\nReviewed-by: B\n"));

        assert!(seed_amend(&runner, &paths).await.unwrap());
        let seeded = Draft::load(&paths).unwrap();
        assert_eq!(seeded.title, "chore: bump");
        assert_eq!(seeded.footer, vec!["Reviewed-by: B"]);

        assert!(!seed_amend(&runner, &paths).await.unwrap());
        assert_eq!(runner.calls().len(), 1);
    }

    struct AsyncOnly;

    impl GitRunner for AsyncOnly {
        fn run(&self, args: &[String], _cwd: &Path) -> CommandOutput {
            panic!("blocking git call: {:?}", args);
        }

        fn run_async(&self, _args: Vec<String>, _cwd: PathBuf) -> crate::git::runner::RunFuture {
            Box::pin(async { CommandOutput::ok("fix: typo\n") })
        }
    }

    #[tokio::test]
    async fn seed_amend_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path(), true);
        assert!(seed_amend(&AsyncOnly, &paths).await.unwrap());
        assert_eq!(Draft::load(&paths).unwrap().title, "fix: typo");
    }
}
