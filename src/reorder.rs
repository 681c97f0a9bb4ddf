use tracing::{debug, trace};

use crate::columns::ColumnModel;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: String,
        hover: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Moved { source: String, target: String },
    SelfDrop,
    UnknownColumn,
    NotDragging,
}

/// Drag sequence for column headers: `start`, any number of `hover`, then
/// `drop_on` or `end`. Both return to idle.
#[derive(Debug, Default)]
pub struct ReorderController {
    state: DragState,
}

impl ReorderController {
    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn source(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging { source, .. } => Some(source),
            DragState::Idle => None,
        }
    }

    pub fn hover_target(&self) -> Option<&str> {
        match &self.state {
            DragState::Dragging { hover, .. } => hover.as_deref(),
            DragState::Idle => None,
        }
    }

    pub fn start(&mut self, column_id: &str) {
        if let Some(previous) = self.source() {
            debug!("Drag of {previous} still active, ending it before starting {column_id}");
            self.end();
        }
        trace!("Drag start: {column_id}");
        self.state = DragState::Dragging {
            source: column_id.to_string(),
            hover: None,
        };
    }

    /// Marks a drop-target candidate. Ignored while idle.
    pub fn hover(&mut self, column_id: &str) -> bool {
        match &mut self.state {
            DragState::Dragging { hover, .. } => {
                *hover = Some(column_id.to_string());
                true
            }
            DragState::Idle => false,
        }
    }

    /// Moves the dragged column before `target` in `model`. The caller rebuilds
    /// the grid on `Moved`.
    pub fn drop_on(&mut self, target: &str, model: &mut ColumnModel) -> DropOutcome {
        let DragState::Dragging { source, .. } = std::mem::take(&mut self.state) else {
            return DropOutcome::NotDragging;
        };
        if source == target {
            trace!("Dropped {source} onto itself");
            return DropOutcome::SelfDrop;
        }
        if model.move_before(&source, target) {
            debug!("Moved column {source} before {target}");
            DropOutcome::Moved {
                source,
                target: target.to_string(),
            }
        } else {
            DropOutcome::UnknownColumn
        }
    }

    pub fn end(&mut self) {
        trace!("Drag end");
        self.state = DragState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ColumnModel {
        ColumnModel::from_ids(&["A", "B", "C", "D"])
    }

    #[test]
    fn full_sequence_moves_before_target() {
        let mut model = model();
        let mut drag = ReorderController::default();
        drag.start("A");
        assert!(drag.hover("B"));
        assert!(drag.hover("C"));
        assert_eq!(drag.hover_target(), Some("C"));

        let outcome = drag.drop_on("C", &mut model);
        assert_eq!(
            outcome,
            DropOutcome::Moved {
                source: "A".into(),
                target: "C".into()
            }
        );
        assert_eq!(model.ids(), ["B", "C", "A", "D"]);
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn self_drop_leaves_order_untouched() {
        let mut model = model();
        let before = model.clone();
        let mut drag = ReorderController::default();
        drag.start("B");
        assert_eq!(drag.drop_on("B", &mut model), DropOutcome::SelfDrop);
        assert_eq!(model, before);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn end_without_drop_changes_nothing() {
        let mut model = model();
        let before = model.clone();
        let mut drag = ReorderController::default();
        drag.start("D");
        drag.hover("A");
        drag.end();
        assert_eq!(drag.hover_target(), None);
        assert_eq!(drag.drop_on("A", &mut model), DropOutcome::NotDragging);
        assert_eq!(model, before);
    }

    #[test]
    fn hover_while_idle_is_ignored() {
        let mut drag = ReorderController::default();
        assert!(!drag.hover("A"));
        assert_eq!(drag.state(), &DragState::Idle);
    }

    #[test]
    fn second_start_replaces_active_drag() {
        let mut model = model();
        let mut drag = ReorderController::default();
        drag.start("A");
        drag.hover("C");
        drag.start("D");
        assert_eq!(drag.source(), Some("D"));
        assert_eq!(drag.hover_target(), None);
        drag.drop_on("A", &mut model);
        assert_eq!(model.ids(), ["D", "A", "B", "C"]);
    }

    #[test]
    fn drop_on_unknown_column_is_noop() {
        let mut model = model();
        let mut drag = ReorderController::default();
        drag.start("A");
        assert_eq!(drag.drop_on("Z", &mut model), DropOutcome::UnknownColumn);
        assert_eq!(model.ids(), ["A", "B", "C", "D"]);
    }
}
