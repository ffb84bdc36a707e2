use std::collections::{HashMap, HashSet};

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::types::{DisplayRow, StatusSnapshot};
use crate::git::types::{FileChangeRecord, LineChangeTotals, ParsedStatus, Section};

pub const ELLIPSIS: &str = "…";
pub const NO_CHANGES: &str = "No changes.";

/// Columns taken by the status mark and its separator on a file row.
const MARK_COLUMNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    pub content_width: usize,
    pub show_totals: bool,
}

impl LayoutOptions {
    pub fn new(content_width: usize, show_totals: bool) -> Self {
        Self {
            content_width: content_width.max(1),
            show_totals,
        }
    }

    fn path_width(&self) -> usize {
        self.content_width.saturating_sub(MARK_COLUMNS).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folded {
    pub text: String,
    /// The input did not fit, whether or not it could be shortened.
    pub overflow: bool,
}

/// Cuts `text` to `width` columns, ending in an ellipsis when cut.
pub fn truncate_end(text: &str, width: usize) -> (String, bool) {
    let width = width.max(1);
    if text.width() <= width {
        return (text.to_string(), false);
    }
    let budget = width - ELLIPSIS.width();
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    (out, true)
}

/// Shortens a slash-separated path from the left, whole segments at a time.
///
/// Keeps the file name, then adds parent directories right to left while
/// `…/<kept>` fits. A path without separators is returned as is.
pub fn fold_path(path: &str, width: usize) -> Folded {
    if path.width() <= width {
        return Folded {
            text: path.to_string(),
            overflow: false,
        };
    }

    if !path.contains('/') {
        return Folded {
            text: path.to_string(),
            overflow: true,
        };
    }

    let mut segments = path.split('/').rev();
    let file_name = segments.next().unwrap_or(path);
    let prefix = format!("{}/", ELLIPSIS);
    let mut kept = file_name.to_string();
    for segment in segments {
        let candidate = format!("{}/{}", segment, kept);
        if prefix.width() + candidate.width() > width {
            break;
        }
        kept = candidate;
    }

    Folded {
        text: format!("{}{}", prefix, kept),
        overflow: true,
    }
}

/// File names shown by more than one distinct path in this refresh.
///
/// Counted per path, not per record: a partially staged file is listed in
/// both sections but only collides with a different file of the same name.
fn colliding_names(parsed: &ParsedStatus) -> HashSet<String> {
    let mut by_name: HashMap<&str, HashSet<&str>> = HashMap::new();
    for record in parsed.staged.iter().chain(&parsed.unstaged) {
        by_name
            .entry(record.file_name())
            .or_default()
            .insert(record.path.as_str());
    }
    by_name
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn mark_row(mark: &str, path: &str) -> String {
    format!("{:<2} {}", mark, path)
}

fn file_row(
    record: &FileChangeRecord,
    index: usize,
    section: Section,
    collisions: &HashSet<String>,
    opts: &LayoutOptions,
) -> DisplayRow {
    let name = record.file_name();
    let path_text = if collisions.contains(name) {
        record.path.as_str()
    } else {
        name
    };
    let folded = fold_path(path_text, opts.path_width());
    let mark = record.mark();
    let display_text = mark_row(&mark, &folded.text);
    let full_text = mark_row(&mark, &record.path);

    DisplayRow {
        show_hover: folded.overflow || display_text != full_text,
        display_text,
        full_text,
        record: Some(index),
        section: Some(section),
    }
}

pub fn header_text(
    section: Section,
    count: usize,
    totals: LineChangeTotals,
    opts: &LayoutOptions,
) -> String {
    let label = format!("{} ({})", section.label(), count);
    if !opts.show_totals {
        return label;
    }
    let totals = format!("+{} -{}", totals.added, totals.deleted);
    let gap = opts
        .content_width
        .saturating_sub(label.width() + totals.width())
        .max(1);
    format!("{}{}{}", label, " ".repeat(gap), totals)
}

/// Lays out the full row sequence for one refresh.
pub fn build_snapshot(
    branch: &str,
    parsed: &ParsedStatus,
    staged_totals: LineChangeTotals,
    unstaged_totals: LineChangeTotals,
    opts: &LayoutOptions,
) -> StatusSnapshot {
    let mut rows = Vec::new();
    let mut records = Vec::new();

    let (branch_text, truncated) = truncate_end(branch, opts.content_width);
    rows.push(DisplayRow {
        display_text: branch_text,
        full_text: branch.to_string(),
        record: None,
        section: None,
        show_hover: truncated,
    });
    rows.push(DisplayRow::blank());

    if parsed.is_empty() {
        rows.push(DisplayRow::structural(NO_CHANGES));
    }

    let collisions = colliding_names(parsed);
    let sections = [
        (Section::Staged, &parsed.staged, staged_totals),
        (Section::Unstaged, &parsed.unstaged, unstaged_totals),
    ];
    for (section, section_records, totals) in sections {
        if section_records.is_empty() {
            continue;
        }
        if section == Section::Unstaged && !parsed.staged.is_empty() {
            rows.push(DisplayRow::blank());
        }
        rows.push(DisplayRow::structural(header_text(
            section,
            section_records.len(),
            totals,
            opts,
        )));
        for record in section_records {
            let index = records.len();
            records.push(record.clone());
            rows.push(file_row(record, index, section, &collisions, opts));
        }
    }

    StatusSnapshot {
        rows,
        records,
        staged_totals,
        unstaged_totals,
    }
}
