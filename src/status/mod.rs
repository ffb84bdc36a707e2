//! The status pane's view model.
//!
//! A refresh is issued with [`StatusView::begin_refresh`], which hands out a
//! sequence number. [`fetch`] runs the git queries off the event loop and
//! tags its [`RefreshOutcome`] with that number. [`StatusView::apply`] only
//! accepts the outcome of the most recently issued request; anything older
//! is dropped, so a slow refresh can never overwrite a newer one.

pub mod layout;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::git::{self, parse, runner::GitRunner};
use crate::git::types::{FileChangeRecord, LineChangeTotals, ParsedStatus, Section};
use layout::{build_snapshot, LayoutOptions};
use types::{FocusHint, StatusSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusData {
    pub branch: String,
    pub parsed: ParsedStatus,
    pub staged_totals: LineChangeTotals,
    pub unstaged_totals: LineChangeTotals,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub seq: u64,
    pub data: Result<StatusData, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    /// A newer refresh was issued after this one.
    Stale,
    /// The status listing failed; the previous snapshot stays.
    Failed(String),
}

/// Runs the status listing, both numstat diffs and the branch lookup concurrently.
pub async fn fetch(runner: Arc<dyn GitRunner>, root: PathBuf, seq: u64) -> RefreshOutcome {
    debug!(seq, root = %root.display(), "Fetching status");
    let (status, staged, unstaged, branch) = tokio::join!(
        runner.run_async(git::status_args(), root.clone()),
        runner.run_async(git::staged_numstat_args(), root.clone()),
        runner.run_async(git::unstaged_numstat_args(), root.clone()),
        git::branch_label(runner.as_ref(), &root),
    );

    if !status.success() {
        return RefreshOutcome {
            seq,
            data: Err(status.excerpt()),
        };
    }
    for (name, out) in [("staged", &staged), ("unstaged", &unstaged)] {
        if !out.success() {
            warn!(seq, diff = name, err = %out.excerpt(), "numstat failed, totals will read zero");
        }
    }

    RefreshOutcome {
        seq,
        data: Ok(StatusData {
            branch,
            parsed: parse::parse_status(&status.stdout),
            staged_totals: parse::parse_numstat(&staged.stdout),
            unstaged_totals: parse::parse_numstat(&unstaged.stdout),
        }),
    }
}

pub struct StatusView {
    layout: LayoutOptions,
    snapshot: StatusSnapshot,
    data: Option<StatusData>,
    cursor: usize,
    hover: Option<usize>,
    latest_seq: u64,
    pending_focus: Option<FocusHint>,
}

impl StatusView {
    pub fn new(layout: LayoutOptions) -> Self {
        Self {
            layout,
            snapshot: StatusSnapshot::default(),
            data: None,
            cursor: 0,
            hover: None,
            latest_seq: 0,
            pending_focus: None,
        }
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Issues a new request number. A focus hint survives being superseded
    /// by a later request that carries none.
    pub fn begin_refresh(&mut self, focus: Option<FocusHint>) -> u64 {
        self.latest_seq += 1;
        if focus.is_some() {
            self.pending_focus = focus;
        }
        self.latest_seq
    }

    pub fn apply(&mut self, outcome: RefreshOutcome) -> ApplyResult {
        if outcome.seq != self.latest_seq {
            debug!(seq = outcome.seq, latest = self.latest_seq, "Dropping stale refresh");
            return ApplyResult::Stale;
        }
        let data = match outcome.data {
            Ok(data) => data,
            Err(err) => {
                warn!(seq = outcome.seq, err = %err, "Status refresh failed");
                // A later plain refresh must not jump to a file acted on long ago.
                self.pending_focus = None;
                return ApplyResult::Failed(err);
            }
        };

        let previous = self.snapshot.identity_at(self.cursor);
        let previous_row = self.cursor;
        self.snapshot = self.layout_snapshot(&data);
        self.data = Some(data);
        self.hover = None;

        let focused = self
            .pending_focus
            .take()
            .and_then(|hint| self.row_for_focus(&hint));
        let followed = previous.and_then(|(path, section)| {
            self.snapshot
                .find_row(&path, Some(section))
                .or_else(|| self.snapshot.find_row(&path, None))
        });
        self.cursor = focused.or(followed).unwrap_or(previous_row);
        self.clamp_cursor();
        ApplyResult::Applied
    }

    /// Re-lays out the last applied data, e.g. after the pane was resized.
    pub fn set_layout(&mut self, layout: LayoutOptions) {
        self.layout = layout;
        if let Some(data) = &self.data {
            let identity = self.snapshot.identity_at(self.cursor);
            self.snapshot = self.layout_snapshot(data);
            self.hover = None;
            if let Some(row) = identity.and_then(|(p, s)| self.snapshot.find_row(&p, Some(s))) {
                self.cursor = row;
            }
            self.clamp_cursor();
        }
    }

    fn layout_snapshot(&self, data: &StatusData) -> StatusSnapshot {
        build_snapshot(
            &data.branch,
            &data.parsed,
            data.staged_totals,
            data.unstaged_totals,
            &self.layout,
        )
    }

    fn row_for_focus(&self, hint: &FocusHint) -> Option<usize> {
        self.snapshot
            .find_row(&hint.path, Some(hint.prior_section.toggled()))
            .or_else(|| self.snapshot.find_row(&hint.path, None))
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.snapshot.len().saturating_sub(1));
    }

    pub fn set_cursor(&mut self, row: usize) {
        self.cursor = row;
        self.clamp_cursor();
    }

    pub fn move_cursor(&mut self, delta: isize) {
        self.set_cursor(self.cursor.saturating_add_signed(delta));
    }

    pub fn selected(&self) -> Option<(&FileChangeRecord, Section)> {
        self.snapshot.record_at(self.cursor)
    }

    /// Opens the hover overlay for `row` when its text was shortened.
    pub fn hover(&mut self, row: usize) -> Option<&str> {
        let target = self.snapshot.row(row).filter(|r| r.show_hover)?;
        self.hover = Some(row);
        Some(target.full_text.as_str())
    }

    pub fn hover_row(&self) -> Option<usize> {
        self.hover
    }

    pub fn close_hover(&mut self) {
        self.hover = None;
    }
}
