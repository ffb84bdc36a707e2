use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::actions::{self, CommitOutcome, ToggleTarget, NO_ACTIONABLE_FILE};
use crate::config::Config;
use crate::drafts::{Draft, DraftPaths};
use crate::error::AppError;
use crate::git::{self, runner::GitRunner};
use crate::status::layout::LayoutOptions;
use crate::status::types::{FocusHint, StatusSnapshot};
use crate::status::{self, ApplyResult, RefreshOutcome, StatusView};
use crate::watcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// The presentation layer. Receives finished snapshots and user-facing messages.
pub trait Presenter: Send {
    fn render(&mut self, snapshot: &StatusSnapshot, cursor: usize);

    fn notify(&mut self, level: NoticeLevel, message: &str);
}

#[derive(Debug)]
pub enum SessionEvent {
    RefreshRequested,
    Refreshed(RefreshOutcome),
    Toggled {
        target: ToggleTarget,
        result: Result<(), AppError>,
    },
    Pushed {
        branch: String,
        result: Result<(), AppError>,
    },
}

/// One open status pane on one worktree.
///
/// All state changes happen in [`Session::handle_event`] on the caller's
/// task; git runs in spawned tasks that report back through the channel.
/// Methods that start git work must be called inside a tokio runtime.
pub struct Session {
    root: PathBuf,
    git_dir: PathBuf,
    runner: Arc<dyn GitRunner>,
    view: StatusView,
    presenter: Box<dyn Presenter>,
    tx: UnboundedSender<SessionEvent>,
    rx: UnboundedReceiver<SessionEvent>,
    in_flight: usize,
    _watcher: Option<RecommendedWatcher>,
}

impl Session {
    pub fn open(
        cwd: &Path,
        config: &Config,
        runner: Arc<dyn GitRunner>,
        presenter: Box<dyn Presenter>,
    ) -> Result<Self, AppError> {
        let (root, git_dir) = git::resolve_repo(runner.as_ref(), cwd)?;
        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = if config.watch_index {
            match watcher::watch_git_dir(
                &git_dir,
                Duration::from_millis(config.debounce_ms),
                tx.clone(),
                || SessionEvent::RefreshRequested,
            ) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!(git_dir = %git_dir.display(), err = %e, "Auto refresh disabled");
                    None
                }
            }
        } else {
            None
        };

        info!(root = %root.display(), "Session opened");
        Ok(Self {
            root,
            git_dir,
            runner,
            view: StatusView::new(LayoutOptions::new(config.content_width(), config.show_totals)),
            presenter,
            tx,
            rx,
            in_flight: 0,
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn view(&self) -> &StatusView {
        &self.view
    }

    pub fn runner(&self) -> &dyn GitRunner {
        self.runner.as_ref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn request_refresh(&mut self, focus: Option<FocusHint>) {
        let seq = self.view.begin_refresh(focus);
        let runner = Arc::clone(&self.runner);
        let root = self.root.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let outcome = status::fetch(runner, root, seq).await;
            let _ = tx.send(SessionEvent::Refreshed(outcome));
        });
    }

    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Handles events until no refresh or action is outstanding.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::RefreshRequested => self.request_refresh(None),
            SessionEvent::Refreshed(outcome) => {
                self.finish_one();
                match self.view.apply(outcome) {
                    ApplyResult::Applied => self.render(),
                    ApplyResult::Stale => {}
                    ApplyResult::Failed(err) => self
                        .presenter
                        .notify(NoticeLevel::Error, &format!("git status failed: {}", err)),
                }
            }
            SessionEvent::Toggled { target, result } => {
                self.finish_one();
                match result {
                    Ok(()) => self.request_refresh(Some(FocusHint {
                        path: target.path,
                        prior_section: target.section,
                    })),
                    // The index is presumed unchanged: no refresh.
                    Err(e) => self.presenter.notify(NoticeLevel::Error, &e.to_string()),
                }
            }
            SessionEvent::Pushed { branch, result } => {
                self.finish_one();
                match result {
                    Ok(()) => self
                        .presenter
                        .notify(NoticeLevel::Info, &format!("Pushed to origin/{}", branch)),
                    Err(e) => self.presenter.notify(NoticeLevel::Error, &e.to_string()),
                }
            }
        }
    }

    fn finish_one(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn render(&mut self) {
        self.presenter
            .render(self.view.snapshot(), self.view.cursor());
    }

    pub fn set_cursor(&mut self, row: usize) {
        self.view.set_cursor(row);
        self.render();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.view.move_cursor(delta);
        self.render();
    }

    pub fn resize(&mut self, config: &Config) {
        self.view
            .set_layout(LayoutOptions::new(config.content_width(), config.show_totals));
        self.render();
    }

    pub fn hover(&mut self, row: usize) -> Option<String> {
        self.view.hover(row).map(str::to_string)
    }

    /// Stages or unstages the file on `row`; structural rows only warn.
    pub fn toggle_stage(&mut self, row: usize) {
        let target = match actions::toggle_target(self.view.snapshot(), row) {
            Ok(target) => target,
            Err(e) => {
                self.presenter.notify(NoticeLevel::Warn, &e.to_string());
                return;
            }
        };
        self.toggle_path(target);
    }

    /// Moves `target.path` out of `target.section`, then refreshes with the
    /// cursor following the file.
    pub fn toggle_path(&mut self, target: ToggleTarget) {
        debug!(path = %target.path, section = ?target.section, "Toggling stage");

        let runner = Arc::clone(&self.runner);
        let root = self.root.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = actions::toggle(runner.as_ref(), &root, &target).await;
            let _ = tx.send(SessionEvent::Toggled { target, result });
        });
    }

    pub fn toggle_stage_at_cursor(&mut self) {
        self.toggle_stage(self.view.cursor());
    }

    /// Repo-relative path of the file on `row`.
    pub fn yank_path(&mut self, row: usize) -> Option<String> {
        match self.view.snapshot().record_at(row) {
            Some((record, _)) => Some(record.path.clone()),
            None => {
                self.presenter.notify(NoticeLevel::Warn, NO_ACTIONABLE_FILE);
                None
            }
        }
    }

    /// Absolute path of the file on `row`, for opening it.
    pub fn focus_path(&mut self, row: usize) -> Option<PathBuf> {
        self.yank_path(row).map(|path| self.root.join(path))
    }

    /// Commits `draft`. Failures are reported once through the presenter and
    /// leave the draft alone.
    pub async fn commit(&mut self, draft: &Draft, is_amend: bool) -> Result<CommitOutcome, AppError> {
        let result = actions::commit(
            self.runner.as_ref(),
            &self.root,
            &draft.title,
            &draft.body,
            &draft.footer,
            is_amend,
        )
        .await;

        match &result {
            Ok(outcome) => {
                let hash = outcome.short_hash.as_deref().unwrap_or("?");
                let verb = if is_amend { "Amended" } else { "Committed" };
                self.presenter
                    .notify(NoticeLevel::Info, &format!("{} {}", verb, hash));
                self.request_refresh(None);
            }
            Err(e) => self.presenter.notify(NoticeLevel::Error, &e.to_string()),
        }
        result
    }

    /// Commits the drafts at `paths` and clears them only on success.
    pub async fn commit_drafts(
        &mut self,
        paths: &DraftPaths,
        is_amend: bool,
    ) -> Result<CommitOutcome, AppError> {
        let draft = match Draft::load(paths) {
            Ok(draft) => draft,
            Err(e) => {
                self.presenter.notify(NoticeLevel::Error, &e.to_string());
                return Err(e);
            }
        };
        let outcome = self.commit(&draft, is_amend).await?;
        if let Err(e) = Draft::clear(paths) {
            warn!(err = %e, "Committed but could not clear drafts");
        }
        Ok(outcome)
    }

    /// Pushes the current HEAD commit to its branch on origin in the background.
    pub async fn push_head(&mut self, is_amend: bool) -> Result<(), AppError> {
        let resolved = async {
            let full_hash = git::full_head(self.runner.as_ref(), &self.root).await?;
            let branch = git::current_branch(self.runner.as_ref(), &self.root)
                .await
                .ok_or(AppError::DetachedHead)?;
            Ok::<_, AppError>((branch, full_hash))
        }
        .await;
        let (branch, full_hash) = match resolved {
            Ok(pair) => pair,
            Err(e) => {
                self.presenter.notify(NoticeLevel::Error, &e.to_string());
                return Err(e);
            }
        };
        self.start_push(branch, full_hash, is_amend);
        Ok(())
    }

    pub fn start_push(&mut self, branch: String, full_hash: String, force_with_lease: bool) {
        let runner = Arc::clone(&self.runner);
        let root = self.root.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = actions::push(runner.as_ref(), &root, &branch, &full_hash, force_with_lease)
                .await
                .map(|_| ());
            let _ = tx.send(SessionEvent::Pushed { branch, result });
        });
    }
}
