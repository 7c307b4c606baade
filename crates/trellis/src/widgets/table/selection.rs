//! Row selection for tables.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::event::{Event, EventType, ModifierMask, MouseButton};
use crate::input_map::{InputMap, KeyStroke};

/// Whether more than one row may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    Single,
    #[default]
    Multiple,
}

/// The selected rows plus the anchor and lead indices.
///
/// The anchor is where a range selection started, the lead is where it ends and where
/// the keyboard cursor sits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSelectionModel {
    mode: SelectionMode,
    selected: BTreeSet<usize>,
    anchor: Option<usize>,
    lead: Option<usize>,
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

impl TableSelectionModel {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Switching to single selection keeps only the lead row.
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        if mode == SelectionMode::Single && self.selected.len() > 1 {
            let keep = self.lead.filter(|lead| self.selected.contains(lead));
            self.selected.clear();
            self.selected.extend(keep);
        }
    }

    pub fn anchor_index(&self) -> Option<usize> {
        self.anchor
    }

    pub fn set_anchor_index(&mut self, index: Option<usize>) {
        self.anchor = index;
    }

    pub fn lead_index(&self) -> Option<usize> {
        self.lead
    }

    pub fn set_lead_index(&mut self, index: Option<usize>) {
        self.lead = index;
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn first_selected(&self) -> Option<usize> {
        self.selected.first().copied()
    }

    pub fn last_selected(&self) -> Option<usize> {
        self.selected.last().copied()
    }

    /// The selected rows in ascending order.
    pub fn selection(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    fn mark(&mut self, anchor: usize, lead: usize) {
        self.anchor = Some(anchor);
        self.lead = Some(lead);
    }

    /// Select exactly the rows between `index0` and `index1`, inclusive.
    pub fn set_selection(&mut self, index0: usize, index1: usize) {
        self.selected.clear();
        self.add_selection(index0, index1);
    }

    pub fn add_selection(&mut self, index0: usize, index1: usize) {
        if self.mode == SelectionMode::Single {
            self.selected.clear();
            self.selected.insert(index1);
            self.mark(index1, index1);
            return;
        }
        let (lo, hi) = ordered(index0, index1);
        self.selected.extend(lo..=hi);
        self.mark(index0, index1);
    }

    pub fn remove_selection(&mut self, index0: usize, index1: usize) {
        let (lo, hi) = ordered(index0, index1);
        self.selected.retain(|&row| row < lo || row > hi);
        self.mark(index0, index1);
    }

    /// Toggle every row between `index0` and `index1`.
    pub fn invert_selection(&mut self, index0: usize, index1: usize) {
        if self.mode == SelectionMode::Single {
            let was_selected = self.selected.contains(&index1);
            self.selected.clear();
            if !was_selected {
                self.selected.insert(index1);
            }
            self.mark(index1, index1);
            return;
        }
        let (lo, hi) = ordered(index0, index1);
        for row in lo..=hi {
            if !self.selected.remove(&row) {
                self.selected.insert(row);
            }
        }
        self.mark(index0, index1);
    }

    /// Deselect everything. Anchor and lead stay where they are.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Shift indices at or after `index` down by `count`.
    pub fn rows_inserted(&mut self, index: usize, count: usize) {
        let shift = |row: usize| if row >= index { row + count } else { row };
        self.selected = self.selected.iter().map(|&row| shift(row)).collect();
        self.anchor = self.anchor.map(shift);
        self.lead = self.lead.map(shift);
    }

    /// Drop selected rows in the deleted range and shift the ones after it up.
    pub fn rows_deleted(&mut self, index: usize, count: usize) {
        let end = index + count;
        let shift = |row: usize| {
            if row >= end {
                row - count
            } else if row >= index {
                index.saturating_sub(1)
            } else {
                row
            }
        };
        self.selected = self
            .selected
            .iter()
            .filter(|&&row| row < index || row >= end)
            .map(|&row| shift(row))
            .collect();
        self.anchor = self.anchor.map(shift);
        self.lead = self.lead.map(shift);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Toggle,
    Extend,
    Set,
    Move,
}

/// What the table has to do after the selection manager handled input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionOutcome {
    pub handled: bool,
    /// Row to scroll into view.
    pub scroll_to: Option<usize>,
}

impl SelectionOutcome {
    const IGNORED: Self = Self {
        handled: false,
        scroll_to: None,
    };

    fn handled(scroll_to: Option<usize>) -> Self {
        Self {
            handled: true,
            scroll_to,
        }
    }
}

/// Translates mouse presses and input map actions into row selection changes.
#[derive(Debug, Clone, Default)]
pub struct RowSelectionManager {
    model: TableSelectionModel,
}

impl RowSelectionManager {
    pub fn new(model: TableSelectionModel) -> Self {
        Self { model }
    }

    pub fn selection_model(&self) -> &TableSelectionModel {
        &self.model
    }

    pub fn selection_model_mut(&mut self) -> &mut TableSelectionModel {
        &mut self.model
    }

    pub fn is_row_selected(&self, row: usize) -> bool {
        self.model.is_selected(row)
    }

    pub fn lead_row(&self) -> Option<usize> {
        self.model.lead_index()
    }

    /// The table got a new model: forget everything.
    pub fn model_changed(&mut self) {
        self.model.clear_selection();
        self.model.set_anchor_index(None);
        self.model.set_lead_index(None);
    }

    pub fn rows_inserted(&mut self, index: usize, count: usize) {
        self.model.rows_inserted(index, count);
    }

    pub fn rows_deleted(&mut self, index: usize, count: usize) {
        self.model.rows_deleted(index, count);
    }

    /// The key strokes used when the theme supplies no input map.
    pub fn default_input_map() -> Rc<InputMap> {
        let strokes = [
            ("DOWN", "selectNextRow"),
            ("UP", "selectPreviousRow"),
            ("PAGEDOWN", "selectNextPage"),
            ("PAGEUP", "selectPreviousPage"),
            ("HOME", "selectFirstRow"),
            ("END", "selectLastRow"),
            ("shift DOWN", "extendSelectionToNextRow"),
            ("shift UP", "extendSelectionToPreviousRow"),
            ("shift PAGEDOWN", "extendSelectionToNextPage"),
            ("shift PAGEUP", "extendSelectionToPreviousPage"),
            ("shift HOME", "extendSelectionToFirstRow"),
            ("shift END", "extendSelectionToLastRow"),
            ("ctrl DOWN", "moveLeadToNextRow"),
            ("ctrl UP", "moveLeadToPreviousRow"),
            ("ctrl PAGEDOWN", "moveLeadToNextPage"),
            ("ctrl PAGEUP", "moveLeadToPreviousPage"),
            ("ctrl HOME", "moveLeadToFirstRow"),
            ("ctrl END", "moveLeadToLastRow"),
            ("ctrl SPACE", "toggleSelectionOnLeadRow"),
            ("ctrl A", "selectAll"),
            ("ctrl shift A", "selectNone"),
        ];
        let mut map = InputMap::new();
        for (stroke, action) in strokes {
            if let Some(stroke) = KeyStroke::parse(stroke, action) {
                map.add(stroke);
            }
        }
        Rc::new(map)
    }

    /// Run a named action. `page_size` is the number of visible rows.
    pub fn handle_key_stroke_action(
        &mut self,
        action: &str,
        num_rows: usize,
        page_size: usize,
    ) -> SelectionOutcome {
        let page = isize::try_from(page_size.max(1)).unwrap_or(isize::MAX);
        let last = num_rows.saturating_sub(1);
        match action {
            "selectNextRow" => self.relative(1, Mode::Set, num_rows),
            "selectPreviousRow" => self.relative(-1, Mode::Set, num_rows),
            "selectNextPage" => self.relative(page, Mode::Set, num_rows),
            "selectPreviousPage" => self.relative(-page, Mode::Set, num_rows),
            "selectFirstRow" => self.absolute(0, Mode::Set, num_rows),
            "selectLastRow" => self.absolute(last, Mode::Set, num_rows),
            "extendSelectionToNextRow" => self.relative(1, Mode::Extend, num_rows),
            "extendSelectionToPreviousRow" => self.relative(-1, Mode::Extend, num_rows),
            "extendSelectionToNextPage" => self.relative(page, Mode::Extend, num_rows),
            "extendSelectionToPreviousPage" => self.relative(-page, Mode::Extend, num_rows),
            "extendSelectionToFirstRow" => self.absolute(0, Mode::Extend, num_rows),
            "extendSelectionToLastRow" => self.absolute(last, Mode::Extend, num_rows),
            "moveLeadToNextRow" => self.relative(1, Mode::Move, num_rows),
            "moveLeadToPreviousRow" => self.relative(-1, Mode::Move, num_rows),
            "moveLeadToNextPage" => self.relative(page, Mode::Move, num_rows),
            "moveLeadToPreviousPage" => self.relative(-page, Mode::Move, num_rows),
            "moveLeadToFirstRow" => self.absolute(0, Mode::Move, num_rows),
            "moveLeadToLastRow" => self.absolute(last, Mode::Move, num_rows),
            "toggleSelectionOnLeadRow" => {
                if let Some(lead) = self.model.lead_index().filter(|&lead| lead < num_rows) {
                    self.apply(lead, Mode::Toggle);
                }
                SelectionOutcome::handled(None)
            }
            "selectAll" => {
                if num_rows > 0 {
                    self.model.set_selection(0, last);
                }
                SelectionOutcome::handled(None)
            }
            "selectNone" => {
                self.model.clear_selection();
                SelectionOutcome::handled(None)
            }
            _ => SelectionOutcome::IGNORED,
        }
    }

    /// Handle a mouse event over `row` (`None` outside of the rows).
    pub fn handle_mouse_event(
        &mut self,
        row: Option<usize>,
        num_rows: usize,
        evt: &Event,
    ) -> SelectionOutcome {
        let shift = evt.modifiers().intersects(ModifierMask::SHIFT);
        let ctrl = evt.modifiers().intersects(ModifierMask::CTRL);
        if evt.event_type() == EventType::MouseBtnDown
            && evt.mouse_button() == Some(MouseButton::Left)
        {
            return self.handle_mouse_down(row.filter(|&r| r < num_rows), shift, ctrl);
        }
        SelectionOutcome::IGNORED
    }

    fn handle_mouse_down(&mut self, row: Option<usize>, shift: bool, ctrl: bool) -> SelectionOutcome {
        let Some(row) = row else {
            if !shift {
                self.model.clear_selection();
            }
            return SelectionOutcome::handled(None);
        };
        let (anchor, anchor_selected) = match self.model.anchor_index() {
            Some(anchor) => (anchor, self.model.is_selected(anchor)),
            None => (0, false),
        };
        if ctrl {
            if shift {
                if anchor_selected {
                    self.model.add_selection(anchor, row);
                } else {
                    self.model.remove_selection(anchor, row);
                }
            } else if self.model.is_selected(row) {
                self.model.remove_selection(row, row);
            } else {
                self.model.add_selection(row, row);
            }
        } else if shift {
            self.model.set_selection(anchor, row);
        } else {
            self.model.set_selection(row, row);
        }
        SelectionOutcome::handled(Some(row))
    }

    fn relative(&mut self, delta: isize, mode: Mode, num_rows: usize) -> SelectionOutcome {
        if num_rows == 0 {
            return SelectionOutcome::handled(None);
        }
        let lead = self.model.lead_index().unwrap_or(0);
        let index = lead.saturating_add_signed(delta).min(num_rows - 1);
        self.apply(index, mode);
        SelectionOutcome::handled(Some(index))
    }

    fn absolute(&mut self, index: usize, mode: Mode, num_rows: usize) -> SelectionOutcome {
        if num_rows == 0 {
            return SelectionOutcome::handled(None);
        }
        self.apply(index, mode);
        SelectionOutcome::handled(Some(index))
    }

    fn apply(&mut self, index: usize, mode: Mode) {
        match mode {
            Mode::Move => self.model.set_lead_index(Some(index)),
            Mode::Extend => {
                let anchor = self.model.anchor_index().unwrap_or(0);
                self.model.set_selection(anchor, index);
            }
            Mode::Toggle => self.model.invert_selection(index, index),
            Mode::Set => self.model.set_selection(index, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(modifiers: ModifierMask) -> Event {
        Event::mouse(EventType::MouseBtnDown, 0, 0)
            .with_button(MouseButton::Left)
            .with_modifiers(modifiers)
    }

    #[test]
    fn test_click_shift_and_ctrl() {
        let mut manager = RowSelectionManager::default();
        let outcome = manager.handle_mouse_event(Some(2), 10, &click(ModifierMask::NONE));
        assert_eq!(outcome.scroll_to, Some(2));
        assert_eq!(manager.selection_model().selection(), vec![2]);

        manager.handle_mouse_event(Some(5), 10, &click(ModifierMask::LSHIFT));
        assert_eq!(manager.selection_model().selection(), vec![2, 3, 4, 5]);
        assert_eq!(manager.selection_model().anchor_index(), Some(2));
        assert_eq!(manager.lead_row(), Some(5));

        manager.handle_mouse_event(Some(3), 10, &click(ModifierMask::LCTRL));
        assert_eq!(manager.selection_model().selection(), vec![2, 4, 5]);
    }

    #[test]
    fn test_click_outside_rows_clears() {
        let mut manager = RowSelectionManager::default();
        manager.handle_mouse_event(Some(1), 3, &click(ModifierMask::NONE));
        manager.handle_mouse_event(None, 3, &click(ModifierMask::NONE));
        assert!(!manager.selection_model().has_selection());
    }

    #[test]
    fn test_keyboard_actions() {
        let mut manager = RowSelectionManager::default();
        manager.handle_key_stroke_action("selectNextRow", 10, 4);
        assert_eq!(manager.selection_model().selection(), vec![1]);
        manager.handle_key_stroke_action("extendSelectionToNextPage", 10, 4);
        assert_eq!(manager.selection_model().selection(), vec![1, 2, 3, 4, 5]);
        let outcome = manager.handle_key_stroke_action("selectLastRow", 10, 4);
        assert_eq!(outcome.scroll_to, Some(9));
        assert_eq!(manager.selection_model().selection(), vec![9]);
        manager.handle_key_stroke_action("moveLeadToFirstRow", 10, 4);
        assert_eq!(manager.lead_row(), Some(0));
        manager.handle_key_stroke_action("toggleSelectionOnLeadRow", 10, 4);
        assert_eq!(manager.selection_model().selection(), vec![0, 9]);
        assert!(!manager.handle_key_stroke_action("unknown", 10, 4).handled);
    }

    #[test]
    fn test_single_mode_keeps_one_row() {
        let mut model = TableSelectionModel::new(SelectionMode::Single);
        model.set_selection(1, 4);
        assert_eq!(model.selection(), vec![4]);
        model.add_selection(0, 2);
        assert_eq!(model.selection(), vec![2]);
    }

    #[test]
    fn test_rows_inserted_and_deleted_shift_selection() {
        let mut model = TableSelectionModel::default();
        model.set_selection(3, 5);
        model.rows_inserted(0, 2);
        assert_eq!(model.selection(), vec![5, 6, 7]);
        assert_eq!(model.lead_index(), Some(7));
        model.rows_deleted(5, 2);
        assert_eq!(model.selection(), vec![5]);
        assert_eq!(model.lead_index(), Some(5));
    }
}
