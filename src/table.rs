use tracing::{debug, info};

use crate::columns::ColumnModel;
use crate::grid::{self, Grid};
use crate::record::Record;
use crate::reorder::{DropOutcome, ReorderController};

/// Owns the record list, the column model and the rendered grid, and keeps the
/// grid consistent with the model after every mutation.
#[derive(Debug)]
pub struct ShipmentTable {
    records: Vec<Record>,
    columns: ColumnModel,
    grid: Grid,
    drag: ReorderController,
}

impl Default for ShipmentTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ShipmentTable {
    pub fn new(records: Vec<Record>) -> Self {
        Self::with_columns(records, ColumnModel::canonical())
    }

    pub fn with_columns(records: Vec<Record>, columns: ColumnModel) -> Self {
        let grid = grid::render(&records, &columns);
        Self {
            records,
            columns,
            grid,
            drag: ReorderController::default(),
        }
    }

    /// Replaces the result set wholesale with a fresh canonical column model.
    pub fn load(&mut self, records: Vec<Record>) {
        info!("Loading result set with {} records", records.len());
        *self = Self::new(records);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn drag(&self) -> &ReorderController {
        &self.drag
    }

    // -------------------- Reorder ---------------------- //

    pub fn start_drag(&mut self, column_id: &str) {
        self.drag.start(column_id);
    }

    pub fn hover(&mut self, column_id: &str) {
        self.drag.hover(column_id);
    }

    pub fn drop_on(&mut self, column_id: &str) -> DropOutcome {
        let outcome = self.drag.drop_on(column_id, &mut self.columns);
        if let DropOutcome::Moved { .. } = outcome {
            self.rebuild();
        }
        outcome
    }

    pub fn end_drag(&mut self) {
        self.drag.end();
    }

    // -------------------- Visibility ---------------------- //

    pub fn set_visible(&mut self, column_id: &str, visible: bool) -> bool {
        if !self.columns.set_visible(column_id, visible) {
            return false;
        }
        debug!("Column {column_id} visible: {visible}");
        self.grid.set_column_displayed(column_id, visible);
        true
    }

    pub fn toggle_visible(&mut self, column_id: &str) -> Option<bool> {
        let visible = !self.columns.get(column_id)?.visible;
        self.set_visible(column_id, visible);
        Some(visible)
    }

    // -------------------- Filter ---------------------- //

    pub fn apply_filter(&mut self, term: &str) {
        self.grid.apply_filter(term);
        debug!(
            "Filter {term:?} keeps {} of {} rows",
            self.grid.displayed_count(),
            self.grid.record_count()
        );
    }

    pub fn clear_filter(&mut self) {
        self.grid.clear_filter();
    }

    // Full rebuild, keeping an active filter.
    fn rebuild(&mut self) {
        let filter = self.grid.filter().map(str::to_string);
        self.grid = grid::render(&self.records, &self.columns);
        if let Some(term) = filter {
            self.grid.apply_filter(&term);
        }
    }
}
