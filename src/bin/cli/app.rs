use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use gpxcmt::{CommitOutcome, EditSession, GpxError, GpxFile, WptRow};
use ratatui::layout::Rect;
use ratatui::widgets::{ListState, TableState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AppState {
    Picker,
    Table,
    Help,
}

pub struct App {
    pub(crate) state: AppState,
    pub(crate) previous_state: Option<AppState>,
    pub(crate) gpx: Option<GpxFile>,
    pub(crate) rows: Vec<WptRow>,
    pub(crate) table_state: TableState,
    pub(crate) edit: Option<EditSession>,
    pub(crate) error: Option<String>,
    pub(crate) notice: Option<String>,
    pub(crate) dirty: bool,
    pub(crate) picker_entries: Vec<PathBuf>,
    pub(crate) picker_state: ListState,
    // body of the table as last rendered, for mapping mouse clicks to rows
    pub(crate) table_area: Rect,
    pub(crate) last_click: Option<(usize, Instant)>,
}

impl App {
    pub(crate) fn new() -> Self {
        let picker_entries = scan_gpx_files();
        let mut picker_state = ListState::default();
        if !picker_entries.is_empty() {
            picker_state.select(Some(0));
        }
        Self {
            state: AppState::Picker,
            previous_state: None,
            gpx: None,
            rows: Vec::new(),
            table_state: TableState::default(),
            edit: None,
            error: None,
            notice: None,
            dirty: false,
            picker_entries,
            picker_state,
            table_area: Rect::default(),
            last_click: None,
        }
    }

    pub(crate) fn with_file(path: &Path) -> Result<Self, GpxError> {
        let mut app = Self::new();
        app.open_file(path)?;
        Ok(app)
    }

    /// Load a document and run the one-time projection pass over its
    /// waypoints. Malformed XML propagates: there is nothing to edit.
    pub(crate) fn open_file(&mut self, path: &Path) -> Result<(), GpxError> {
        let mut gpx = GpxFile::open(path)?;
        self.rows = gpx.project_rows();
        self.gpx = Some(gpx);
        self.table_state = TableState::default();
        if !self.rows.is_empty() {
            self.table_state.select(Some(0));
        }
        self.edit = None;
        self.dirty = false;
        self.state = AppState::Table;
        Ok(())
    }

    pub(crate) fn file_label(&self) -> String {
        self.gpx
            .as_ref()
            .map(|g| g.path().display().to_string())
            .unwrap_or_else(|| "no file".to_string())
    }

    /// Open the inline editor on the selected row's comment cell. A session
    /// already open elsewhere is discarded first, unsaved text and all.
    pub(crate) fn begin_edit(&mut self) {
        self.edit = None;
        self.notice = None;
        let Some(row) = self.table_state.selected() else {
            return;
        };
        let Some(data) = self.rows.get(row) else {
            return;
        };
        self.edit = Some(EditSession::new(row, &data.cmt));
    }

    pub(crate) fn cancel_edit(&mut self) {
        self.edit = None;
    }

    /// Confirm the open edit session: unchanged text closes silently, an
    /// over-budget comment reports the exact overage and keeps the session
    /// open for another try, a stale row reports and discards, anything
    /// else writes through to the document and the row.
    pub(crate) fn confirm_edit(&mut self) {
        let Some(session) = self.edit.take() else {
            return;
        };
        if session.unchanged() {
            return;
        }
        let Some(gpx) = self.gpx.as_mut() else {
            return;
        };
        let Some(row) = self.rows.get_mut(session.row) else {
            return;
        };
        match gpx.commit_comment(&row.name, &session.input) {
            CommitOutcome::Written => {
                row.cmt = session.input.clone();
                self.dirty = true;
            }
            CommitOutcome::TooLong { excess } => {
                self.error = Some(format!(
                    "Comment is over the limit: remove {excess} more significant character(s)."
                ));
                self.edit = Some(session);
            }
            CommitOutcome::UnknownName => {
                self.error = Some(format!(
                    "Internal error: no waypoint named \"{}\" in the data, the change will not be kept.",
                    row.name
                ));
            }
        }
    }

    /// Explicit save request. A document identical to what was loaded is
    /// left alone and only reported as such.
    pub(crate) fn save(&mut self) {
        let Some(gpx) = self.gpx.as_mut() else {
            return;
        };
        match gpx.save() {
            Ok(true) => {
                self.notice = Some("saved".to_string());
                self.dirty = false;
            }
            Ok(false) => self.notice = Some("no changes".to_string()),
            Err(e) => self.error = Some(format!("Save failed: {e}")),
        }
    }

    pub(crate) fn select_next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = (self.table_state.selected().unwrap_or(0) + 1).min(self.rows.len() - 1);
        self.table_state.select(Some(i));
    }

    pub(crate) fn select_prev(&mut self) {
        let i = self.table_state.selected().unwrap_or(0).saturating_sub(1);
        self.table_state.select(Some(i));
    }
}

fn scan_gpx_files() -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(".")
        .map(|rd| {
            rd.flatten()
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("gpx"))
                })
                .collect()
        })
        .unwrap_or_default();
    entries.sort();
    entries
}
