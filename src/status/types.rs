use serde::Serialize;

use crate::git::types::{FileChangeRecord, LineChangeTotals, Section};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub display_text: String,
    pub full_text: String,
    /// Index into [`StatusSnapshot::records`]; `None` for structural rows.
    pub record: Option<usize>,
    pub section: Option<Section>,
    pub show_hover: bool,
}

impl DisplayRow {
    pub fn structural(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            display_text: text.clone(),
            full_text: text,
            record: None,
            section: None,
            show_hover: false,
        }
    }

    pub fn blank() -> Self {
        Self::structural("")
    }

    pub fn is_actionable(&self) -> bool {
        self.record.is_some() && self.section.is_some()
    }
}

/// One published rendering of the status pane. Row numbers only mean
/// something within the snapshot that produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub rows: Vec<DisplayRow>,
    pub records: Vec<FileChangeRecord>,
    pub staged_totals: LineChangeTotals,
    pub unstaged_totals: LineChangeTotals,
}

impl StatusSnapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, row: usize) -> Option<&DisplayRow> {
        self.rows.get(row)
    }

    pub fn record_at(&self, row: usize) -> Option<(&FileChangeRecord, Section)> {
        let row = self.rows.get(row)?;
        let record = self.records.get(row.record?)?;
        Some((record, row.section?))
    }

    /// The identity that survives across snapshots.
    pub fn identity_at(&self, row: usize) -> Option<(String, Section)> {
        self.record_at(row)
            .map(|(record, section)| (record.path.clone(), section))
    }

    /// First row showing `path`, restricted to `section` when given.
    pub fn find_row(&self, path: &str, section: Option<Section>) -> Option<usize> {
        (0..self.rows.len()).find(|&i| {
            matches!(
                self.record_at(i),
                Some((record, s)) if record.path == path && section.map_or(true, |want| want == s)
            )
        })
    }
}

/// A snapshot with its cursor row, as handed to machine-readable presenters.
#[derive(Debug, Serialize)]
pub struct Frame<'a> {
    pub cursor: usize,
    pub snapshot: &'a StatusSnapshot,
}

/// Where to put the cursor after an action: the acted-on path and the
/// section it was in before the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusHint {
    pub path: String,
    pub prior_section: Section,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::parse::parse_status;
    use crate::status::layout::{build_snapshot, LayoutOptions};

    #[test]
    fn frame_serializes_rows_and_records() {
        let snapshot = build_snapshot(
            "main",
            &parse_status("MM src/lib.rs\n"),
            LineChangeTotals { added: 3, deleted: 1 },
            LineChangeTotals::default(),
            &LayoutOptions::new(40, true),
        );
        let value = serde_json::to_value(Frame {
            cursor: 3,
            snapshot: &snapshot,
        })
        .unwrap();

        assert_eq!(value["cursor"], 3);
        assert_eq!(value["snapshot"]["rows"][0]["display_text"], "main");
        assert_eq!(value["snapshot"]["rows"][3]["section"], "Staged");
        assert_eq!(value["snapshot"]["rows"][3]["record"], 0);
        assert_eq!(value["snapshot"]["records"][0]["status"], "Modified");
        assert_eq!(value["snapshot"]["records"][0]["partial"], true);
        assert_eq!(value["snapshot"]["staged_totals"]["added"], 3);
    }
}
