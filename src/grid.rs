//! The rendered grid: the in-memory presentation of records under a column model.
//!
//! The grid is what the user sees and what exports are rebuilt from. Hidden
//! columns and filtered rows stay in the grid, flagged as not displayed, so
//! visibility and filter changes patch flags instead of rebuilding.

use tracing::trace;

use crate::columns::{self, ColumnModel};
use crate::format;
use crate::record::Record;

pub const EMPTY_MARKER: &str = "-";
pub const NO_DATA_TEXT: &str = "No data found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCell {
    pub column_id: String,
    pub label: String,
    pub displayed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub column_id: String,
    pub value: String,
    pub is_empty: bool,
    pub displayed: bool,
}

impl Cell {
    /// Text shown on screen, with the empty marker standing in for no value.
    pub fn text(&self) -> &str {
        if self.is_empty {
            EMPTY_MARKER
        } else {
            &self.value
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub cells: Vec<Cell>,
    pub displayed: bool,
}

impl GridRow {
    pub fn cell(&self, column_id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column_id == column_id)
    }

    pub fn displayed_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.displayed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<GridRow>,
    pub placeholder: Option<String>,
    filter: Option<String>,
}

/// Builds the grid for every column of the model, hidden ones included.
pub fn render(records: &[Record], model: &ColumnModel) -> Grid {
    let headers = model
        .columns()
        .iter()
        .map(|c| HeaderCell {
            column_id: c.id.clone(),
            label: c.display_name.clone(),
            displayed: c.visible,
        })
        .collect();

    let rows = records
        .iter()
        .map(|record| GridRow {
            cells: model
                .columns()
                .iter()
                .map(|c| {
                    let raw = columns::resolve_text(record, &c.id);
                    let value = format::format_value(&c.id, &raw);
                    Cell {
                        column_id: c.id.clone(),
                        is_empty: value.is_empty(),
                        value,
                        displayed: c.visible,
                    }
                })
                .collect(),
            displayed: true,
        })
        .collect::<Vec<GridRow>>();

    let placeholder = rows.is_empty().then(|| NO_DATA_TEXT.to_string());
    trace!(
        "Rendered grid: {} columns x {} rows",
        model.len(),
        records.len()
    );

    Grid {
        headers,
        rows,
        placeholder,
        filter: None,
    }
}

impl Grid {
    pub fn header(&self, column_id: &str) -> Option<&HeaderCell> {
        self.headers.iter().find(|h| h.column_id == column_id)
    }

    pub fn displayed_headers(&self) -> impl Iterator<Item = &HeaderCell> {
        self.headers.iter().filter(|h| h.displayed)
    }

    pub fn displayed_rows(&self) -> impl Iterator<Item = &GridRow> {
        self.rows.iter().filter(|r| r.displayed)
    }

    pub fn has_displayed_columns(&self) -> bool {
        self.headers.iter().any(|h| h.displayed)
    }

    pub fn record_count(&self) -> usize {
        self.rows.len()
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed_rows().count()
    }

    pub fn record_count_text(&self) -> String {
        let total = self.record_count();
        let noun = |n: usize| if n == 1 { "record" } else { "records" };
        if self.filter.is_some() {
            let shown = self.displayed_count();
            format!("{shown} of {total} {}", noun(total))
        } else {
            format!("{total} {}", noun(total))
        }
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// Shows or hides one column's header and body cells in place.
    pub fn set_column_displayed(&mut self, column_id: &str, displayed: bool) {
        for header in self.headers.iter_mut().filter(|h| h.column_id == column_id) {
            header.displayed = displayed;
        }
        for row in self.rows.iter_mut() {
            for cell in row.cells.iter_mut().filter(|c| c.column_id == column_id) {
                cell.displayed = displayed;
            }
        }
        // Row matches depend on which cells are visible.
        if let Some(term) = self.filter.clone() {
            self.apply_filter(&term);
        }
    }

    /// Displays only rows with a visible cell containing `term`, ignoring case.
    pub fn apply_filter(&mut self, term: &str) {
        if term.is_empty() {
            self.clear_filter();
            return;
        }
        let needle = term.to_lowercase();
        for row in self.rows.iter_mut() {
            row.displayed = row
                .cells
                .iter()
                .filter(|c| c.displayed && !c.is_empty)
                .any(|c| c.value.to_lowercase().contains(&needle));
        }
        self.filter = Some(term.to_string());
    }

    pub fn clear_filter(&mut self) {
        for row in self.rows.iter_mut() {
            row.displayed = true;
        }
        self.filter = None;
    }
}
