//! Virtualized tables.
//!
//! [`TableBase`] shows a [`TableModel`] as a grid under a row of column headers. Cells
//! are painted by flyweight [`CellRenderer`]s; only renderers that implement
//! [`CellWidgetCreator`] produce real widgets, and only the widgets of the visible rows
//! are children of the table at any time.
//!
//! Column widths live in a [`SizeSequence`]. When the table is not inside a
//! [`ScrollPane`], or the pane is fixed horizontally, the columns always fill the inner
//! width: dragging a divider then moves width between the two neighbouring columns.
//! Otherwise every column has its own width and the content grows and shrinks.
//!
//! # Example
//!
//! ```
//! use trellis::widgets::table::{SimpleTableModel, TableBase};
//! use trellis::{Gui, GuiConfig};
//! use trellis_render::HeadlessRenderer;
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(300, 200)), GuiConfig::default());
//! let model = SimpleTableModel::new(["Name", "Size"]).shared();
//! model.add_row(&mut gui, vec!["a.txt".into(), 12i64.into()]);
//!
//! let table = gui.create(TableBase::new(Some(model)));
//! let root = gui.root_pane();
//! gui.add(root, table);
//! gui.set_size(table, 300, 200);
//! gui.validate_layout(table);
//!
//! let table = gui.widget::<TableBase>(table).unwrap();
//! assert_eq!(table.num_rows(), 1);
//! assert_eq!(table.column_width(0) + table.column_width(1), 300);
//! ```

mod model;
mod renderer;
mod selection;

#[cfg(test)]
mod tests;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use cursor_icon::CursorIcon;
use trellis_core::logging::targets;
use trellis_core::{SizeSequence, SparseGrid, StateKey};
use trellis_render::{Alignment, Color, Image, Rect};

pub use model::{CellData, SimpleTableModel, TableModel, TableModelEvent};
pub use renderer::{CellRenderer, CellWidgetCreator, StringCellRenderer};
pub use selection::{RowSelectionManager, SelectionMode, SelectionOutcome, TableSelectionModel};

use super::{AutoScrollable, CustomPageSize, Fixed, ScrollPane, Scrollable, STATE_HOVER, STATE_PRESSED};
use crate::event::{Event, EventType, Key, MouseButton};
use crate::gui::Gui;
use crate::signal::{ConnectionId, Signal};
use crate::theme::ThemeInfo;
use crate::widget::{Cx, TooltipContent, Widget, WidgetId};

pub const STATE_FIRST_COLUMN_HEADER: StateKey = StateKey::new("firstColumnHeader");
pub const STATE_LAST_COLUMN_HEADER: StateKey = StateKey::new("lastColumnHeader");
pub const STATE_ROW_SELECTED: StateKey = StateKey::new("rowSelected");
pub const STATE_ROW_HOVER: StateKey = StateKey::new("rowHover");
pub const STATE_ROW_DROP_TARGET: StateKey = StateKey::new("rowDropTarget");
pub const STATE_ROW_ODD: StateKey = StateKey::new("rowOdd");
pub const STATE_LEAD_ROW: StateKey = StateKey::new("leadRow");
pub const STATE_SORT_ASCENDING: StateKey = StateKey::new("sortAscending");
pub const STATE_SORT_DESCENDING: StateKey = StateKey::new("sortDescending");

const DEFAULT_ROW_HEIGHT: i32 = 32;
const DEFAULT_COLUMN_WIDTH: i32 = 256;
const DEFAULT_COLUMN_HEADER_HEIGHT: i32 = 10;
const DEFAULT_DIVIDER_DISTANCE: i32 = 3;

/// Receives drags that start on the table body.
pub trait DragListener {
    /// A drag started over `row` and `column` (`None` outside the cells).
    ///
    /// Returns `false` to refuse the drag; the table then ignores the mouse until all
    /// buttons are released.
    fn drag_started(
        &mut self,
        cx: &mut Cx<'_>,
        row: Option<usize>,
        column: Option<usize>,
        evt: &Event,
    ) -> bool;

    /// The mouse moved during the drag. Returns the cursor to show.
    fn dragged(&mut self, cx: &mut Cx<'_>, evt: &Event) -> Option<CursorIcon>;

    /// All buttons were released.
    fn drag_stopped(&mut self, cx: &mut Cx<'_>, evt: &Event);

    /// ESCAPE was pressed during the drag.
    fn drag_cancelled(&mut self, _cx: &mut Cx<'_>) {}
}

/// Type-to-find support for tables.
pub trait KeyboardSearchHandler {
    /// Offer a key event. Returns `true` if it was consumed.
    fn handle_key_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool;

    /// While active the handler sees key events before the table does.
    fn is_active(&self) -> bool;

    /// The table moved or changed size.
    fn update_info_window_position(&mut self, _cx: &mut Cx<'_>) {}
}

/// Which part of the table owns the current drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragState {
    Inactive,
    ColumnHeader,
    User,
    /// Nobody accepted the drag; wait for the buttons to be released.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellWidgetEntry {
    widget: WidgetId,
    /// Kind of cell data whose renderer created the widget.
    kind: &'static str,
}

type SharedRenderer = Rc<RefCell<dyn CellRenderer>>;

/// A virtualized grid over a [`TableModel`].
pub struct TableBase {
    initial_model: Option<Rc<dyn TableModel>>,
    model: Option<Rc<dyn TableModel>>,
    model_connection: Option<ConnectionId>,
    num_rows: usize,
    num_columns: usize,

    cell_container: Option<WidgetId>,
    column_headers: Vec<WidgetId>,
    /// Width assigned by the user or a divider drag; 0 uses the default width.
    column_widths: Vec<i32>,
    column_model: SizeSequence,
    row_model: Option<SizeSequence>,
    widget_grid: SparseGrid<CellWidgetEntry>,

    string_renderer: SharedRenderer,
    renderers: HashMap<&'static str, SharedRenderer>,
    column_default_renderers: Vec<Option<SharedRenderer>>,
    has_cell_widget_creators: bool,

    selection: RowSelectionManager,
    drag_listener: Option<Box<dyn DragListener>>,
    keyboard_search: Option<Box<dyn KeyboardSearchHandler>>,

    image_column_divider: Option<Rc<dyn Image>>,
    image_row_background: Option<Rc<dyn Image>>,
    image_row_overlay: Option<Rc<dyn Image>>,
    image_row_drop_marker: Option<Rc<dyn Image>>,
    row_height: i32,
    default_column_width: i32,
    column_header_height: i32,
    divider_distance: i32,
    ensure_column_header_min_width: bool,
    column_resize_cursor: Option<CursorIcon>,
    drag_not_possible_cursor: Option<CursorIcon>,

    scroll_x: i32,
    scroll_y: i32,
    visible_rows: Option<(usize, usize)>,
    visible_columns: Option<(usize, usize)>,
    first_row_partial_visible: bool,
    last_row_partial_visible: bool,
    fixed_width_mode: Cell<bool>,

    update_all_column_width: bool,
    update_all_cell_widgets: bool,
    auto_size_all_rows: bool,

    drop_marker: Option<(usize, bool)>,
    drag: DragState,
    drag_column: usize,
    drag_start_x: i32,
    drag_start_col_width: i32,
    drag_start_sum_width: i32,
    drag_cursor: Option<CursorIcon>,

    last_mouse_y: Option<i32>,
    last_mouse_row: Option<usize>,
    last_mouse_column: Option<usize>,

    /// A cell was double clicked: `(row, column)`.
    pub double_click: Signal<(usize, usize)>,
    /// The right button was released over the body.
    pub right_click: Signal<(Option<usize>, Option<usize>, Event)>,
    /// A column header was clicked.
    pub column_header_click: Signal<usize>,
    /// Mouse or keyboard input changed the selection.
    pub selection_changed: Signal<()>,
}

impl Default for TableBase {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TableBase {
    pub fn new(model: Option<Rc<dyn TableModel>>) -> Self {
        let mut column_model = SizeSequence::new();
        column_model.set_default_value(DEFAULT_COLUMN_WIDTH);
        Self {
            initial_model: model,
            model: None,
            model_connection: None,
            num_rows: 0,
            num_columns: 0,
            cell_container: None,
            column_headers: Vec::new(),
            column_widths: Vec::new(),
            column_model,
            row_model: None,
            widget_grid: SparseGrid::new(),
            string_renderer: Rc::new(RefCell::new(StringCellRenderer::default())),
            renderers: HashMap::new(),
            column_default_renderers: Vec::new(),
            has_cell_widget_creators: false,
            selection: RowSelectionManager::default(),
            drag_listener: None,
            keyboard_search: None,
            image_column_divider: None,
            image_row_background: None,
            image_row_overlay: None,
            image_row_drop_marker: None,
            row_height: DEFAULT_ROW_HEIGHT,
            default_column_width: DEFAULT_COLUMN_WIDTH,
            column_header_height: DEFAULT_COLUMN_HEADER_HEIGHT,
            divider_distance: DEFAULT_DIVIDER_DISTANCE,
            ensure_column_header_min_width: false,
            column_resize_cursor: Some(CursorIcon::ColResize),
            drag_not_possible_cursor: Some(CursorIcon::NotAllowed),
            scroll_x: 0,
            scroll_y: 0,
            visible_rows: None,
            visible_columns: None,
            first_row_partial_visible: false,
            last_row_partial_visible: false,
            fixed_width_mode: Cell::new(true),
            update_all_column_width: true,
            update_all_cell_widgets: false,
            auto_size_all_rows: false,
            drop_marker: None,
            drag: DragState::Inactive,
            drag_column: 0,
            drag_start_x: 0,
            drag_start_col_width: 0,
            drag_start_sum_width: 0,
            drag_cursor: None,
            last_mouse_y: None,
            last_mouse_row: None,
            last_mouse_column: None,
            double_click: Signal::new(),
            right_click: Signal::new(),
            column_header_click: Signal::new(),
            selection_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Model
    // =========================================================================

    pub fn model(&self) -> Option<&Rc<dyn TableModel>> {
        self.model.as_ref()
    }

    /// Show another model. The selection and all column widths are reset.
    pub fn set_model(&mut self, cx: &mut Cx<'_>, model: Option<Rc<dyn TableModel>>) {
        self.disconnect_model();
        if let Some(model) = &model {
            let id = cx.id();
            let connection = model.changes().connect(move |gui: &mut Gui, evt: &TableModelEvent| {
                let evt = *evt;
                gui.with_widget::<TableBase, _>(id, |table, cx| table.model_changed(cx, evt));
            });
            self.model_connection = Some(connection);
        }
        self.model = model;
        self.model_all_changed(cx);
    }

    fn disconnect_model(&mut self) {
        if let (Some(model), Some(connection)) = (&self.model, self.model_connection.take()) {
            model.changes().disconnect(connection);
        }
    }

    fn sync_counts(&mut self) {
        let (rows, columns) = self
            .model
            .as_ref()
            .map_or((0, 0), |m| (m.num_rows(), m.num_columns()));
        self.num_rows = rows;
        self.num_columns = columns;
    }

    fn model_changed(&mut self, cx: &mut Cx<'_>, evt: TableModelEvent) {
        tracing::trace!(target: targets::TABLE, ?evt, "table model changed");
        match evt {
            TableModelEvent::RowsInserted { index, count } => self.model_rows_inserted(cx, index, count),
            TableModelEvent::RowsDeleted { index, count } => self.model_rows_deleted(cx, index, count),
            TableModelEvent::RowsChanged { index, count } => self.model_rows_changed(cx, index, count),
            TableModelEvent::CellChanged { row, column } => self.model_cell_changed(cx, row, column),
            TableModelEvent::ColumnsInserted { index, count } => {
                self.model_columns_inserted(cx, index, count)
            }
            TableModelEvent::ColumnsDeleted { index, count } => {
                self.model_columns_deleted(cx, index, count)
            }
            TableModelEvent::ColumnHeaderChanged { column } => self.update_column_header(cx, column),
            TableModelEvent::AllChanged => self.model_all_changed(cx),
        }
    }

    fn model_all_changed(&mut self, cx: &mut Cx<'_>) {
        self.sync_counts();
        for header in std::mem::take(&mut self.column_headers) {
            cx.dispose(header);
        }
        self.drop_marker = None;
        self.column_widths = vec![0; self.num_columns];
        for column in 0..self.num_columns {
            let header = self.create_column_header(cx);
            self.column_headers.push(header);
            self.update_column_header(cx, column);
        }
        self.selection.model_changed();
        self.update_all(cx);
    }

    fn model_rows_inserted(&mut self, cx: &mut Cx<'_>, index: usize, count: usize) {
        self.sync_counts();
        if let Some(row_model) = &mut self.row_model {
            row_model.insert(index, count);
        }
        if let Some((marker, before)) = &mut self.drop_marker
            && (*marker > index || (*marker == index && *before))
        {
            *marker += count;
        }
        if !self.widget_grid.is_empty() || self.has_cell_widget_creators {
            self.remove_all_cell_widgets(cx);
            self.widget_grid.insert_rows(grid_index(index), grid_index(count));
            for row in index..index + count {
                for column in 0..self.num_columns {
                    self.update_cell_widget(cx, row, column);
                }
            }
        }
        if self.row_model.is_some() {
            for row in index..index + count {
                self.auto_size_row(cx, row);
            }
        }
        let id = cx.id();
        cx.invalidate_layout(id);
        if self.row_from_position(self.scroll_y).is_some_and(|first| index < first) {
            let height = self.rows_height(index, count);
            self.scroll_pane_to_y(cx, self.scroll_y + height);
        }
        self.selection.rows_inserted(index, count);
    }

    fn model_rows_deleted(&mut self, cx: &mut Cx<'_>, index: usize, count: usize) {
        if self.row_from_position(self.scroll_y).is_some_and(|first| index + count <= first) {
            let height = self.rows_height(index, count);
            self.scroll_pane_to_y(cx, self.scroll_y - height);
        }
        self.sync_counts();
        if let Some(row_model) = &mut self.row_model {
            row_model.remove(index, count);
        }
        if let Some((marker, _)) = self.drop_marker
            && marker >= index
        {
            self.drop_marker = if marker < index + count {
                None
            } else {
                self.drop_marker.map(|(m, before)| (m - count, before))
            };
        }
        if !self.widget_grid.is_empty() {
            let removed = self.widget_grid.drain_window(
                grid_index(index),
                0,
                grid_index(index + count) - 1,
                i32::MAX,
            );
            for (_, _, entry) in removed {
                self.dispose_cell_widget(cx, entry.widget);
            }
            self.widget_grid.remove_rows(grid_index(index), grid_index(count));
        }
        self.selection.rows_deleted(index, count);
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn model_rows_changed(&mut self, cx: &mut Cx<'_>, index: usize, count: usize) {
        self.sync_counts();
        let mut row_height_changed = false;
        for row in index..(index + count).min(self.num_rows) {
            if self.row_model.is_some() {
                row_height_changed |= self.auto_size_row(cx, row);
            }
            for column in 0..self.num_columns {
                self.update_cell_widget(cx, row, column);
            }
        }
        let id = cx.id();
        cx.invalidate_layout_locally(id);
        if row_height_changed {
            cx.invalidate_layout(id);
        }
    }

    fn model_cell_changed(&mut self, cx: &mut Cx<'_>, row: usize, column: usize) {
        self.sync_counts();
        if row >= self.num_rows || column >= self.num_columns {
            tracing::warn!(target: targets::TABLE, row, column, "cell change outside of the model");
            return;
        }
        if self.row_model.is_some() {
            self.auto_size_row(cx, row);
        }
        self.update_cell_widget(cx, row, column);
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn model_columns_inserted(&mut self, cx: &mut Cx<'_>, index: usize, count: usize) {
        self.sync_counts();
        for offset in 0..count {
            let header = self.create_column_header(cx);
            self.column_headers.insert(index + offset, header);
            self.column_widths.insert(index + offset, 0);
        }
        for column in index..index + count {
            self.update_column_header(cx, column);
        }
        self.column_model.insert(index, count);
        if !self.widget_grid.is_empty() || self.has_cell_widget_creators {
            self.remove_all_cell_widgets(cx);
            self.widget_grid.insert_columns(grid_index(index), grid_index(count));
            for row in 0..self.num_rows {
                for column in index..index + count {
                    self.update_cell_widget(cx, row, column);
                }
            }
        }
        let start = self.column_model.position(index);
        if start < self.scroll_x {
            let width = self.column_model.position(index + count) - start;
            self.scroll_pane_to_x(cx, self.scroll_x + width);
        }
        self.update_all_column_width = true;
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn model_columns_deleted(&mut self, cx: &mut Cx<'_>, index: usize, count: usize) {
        let end = self.column_model.position(index + count);
        if end <= self.scroll_x {
            let width = end - self.column_model.position(index);
            self.scroll_pane_to_x(cx, self.scroll_x - width);
        }
        self.sync_counts();
        self.column_model.remove(index, count);
        if !self.widget_grid.is_empty() {
            let removed = self.widget_grid.drain_window(
                0,
                grid_index(index),
                i32::MAX,
                grid_index(index + count) - 1,
            );
            for (_, _, entry) in removed {
                self.dispose_cell_widget(cx, entry.widget);
            }
            self.widget_grid.remove_columns(grid_index(index), grid_index(count));
        }
        for header in self.column_headers.drain(index..index + count) {
            cx.dispose(header);
        }
        self.column_widths.drain(index..index + count);
        self.update_all_column_width = true;
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn update_all(&mut self, cx: &mut Cx<'_>) {
        if !self.widget_grid.is_empty() {
            self.remove_all_cell_widgets(cx);
            let entries: Vec<WidgetId> = self.widget_grid.iter().map(|(_, _, e)| e.widget).collect();
            self.widget_grid.clear();
            for widget in entries {
                cx.dispose(widget);
            }
        }
        if self.row_model.is_some() {
            self.auto_size_all_rows = true;
        }
        self.update_all_cell_widgets = true;
        self.update_all_column_width = true;
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// The row at `y` in content coordinates. `Some(num_rows())` below the last row.
    pub fn row_from_position(&self, y: i32) -> Option<usize> {
        if y < 0 {
            return None;
        }
        Some(match &self.row_model {
            Some(row_model) => row_model.index(y),
            None => usize::try_from(y / self.row_height.max(1)).map_or(0, |r| r.min(self.num_rows)),
        })
    }

    /// Start of `row` in content coordinates. `row == num_rows()` yields the end of the rows.
    pub fn row_start_position(&self, row: usize) -> i32 {
        match &self.row_model {
            Some(row_model) => row_model.position(row),
            None => grid_index(row) * self.row_height,
        }
    }

    pub fn row_end_position(&self, row: usize) -> i32 {
        self.row_start_position(row + 1)
    }

    pub fn row_height(&self, row: usize) -> i32 {
        self.row_end_position(row) - self.row_start_position(row)
    }

    fn rows_height(&self, index: usize, count: usize) -> i32 {
        self.row_start_position(index + count) - self.row_start_position(index)
    }

    pub fn column_from_position(&self, x: i32) -> Option<usize> {
        (x >= 0).then(|| self.column_model.index(x))
    }

    pub fn column_start_position(&self, column: usize) -> i32 {
        self.column_model.position(column)
    }

    pub fn column_end_position(&self, column: usize) -> i32 {
        self.column_model.position(column + 1)
    }

    /// Current width of `column`.
    ///
    /// # Panics
    ///
    /// Panics if `column >= num_columns()`.
    pub fn column_width(&self, column: usize) -> i32 {
        assert!(column < self.num_columns, "column {column} out of range 0..{}", self.num_columns);
        self.column_model.size(column)
    }

    /// Set the width of `column`. In fixed width mode this is the preferred width used
    /// when distributing the inner width.
    ///
    /// # Panics
    ///
    /// Panics if `column >= num_columns()`.
    pub fn set_column_width(&mut self, cx: &mut Cx<'_>, column: usize, width: i32) {
        assert!(column < self.num_columns, "column {column} out of range 0..{}", self.num_columns);
        self.column_widths[column] = width;
        let id = cx.id();
        if self.is_fixed_width_mode(cx) {
            self.update_all_column_width = true;
            cx.invalidate_layout(id);
            return;
        }
        let mut width = self.compute_preferred_column_width(cx, column);
        if self.ensure_column_header_min_width {
            width = width.max(cx.min_width(self.column_headers[column]));
        }
        if self.column_model.len() > column && self.column_model.set_size(column, width) {
            cx.invalidate_layout(id);
        }
    }

    pub fn row_height_default(&self) -> i32 {
        self.row_height
    }

    pub fn column_header_height(&self) -> i32 {
        self.column_header_height
    }

    pub fn is_variable_row_height(&self) -> bool {
        self.row_model.is_some()
    }

    /// Size every row to the tallest cell renderer in it instead of the theme's row height.
    pub fn set_variable_row_height(&mut self, cx: &mut Cx<'_>, variable: bool) {
        if variable && self.row_model.is_none() {
            self.row_model = Some(SizeSequence::with_capacity(self.num_rows.max(16)));
            self.auto_size_all_rows = true;
            let id = cx.id();
            cx.invalidate_layout(id);
        } else if !variable {
            self.row_model = None;
        }
    }

    fn compute_row_height(&self, cx: &Cx<'_>, row: usize) -> i32 {
        let font = cx.font();
        let mut height = 0;
        let mut column = 0;
        while column < self.num_columns {
            let span = match self.cell_renderer(row, column) {
                Some(renderer) => {
                    let renderer = renderer.borrow();
                    height = height.max(renderer.preferred_height(font.as_ref()));
                    renderer.column_span().max(1)
                }
                None => 1,
            };
            column += span;
        }
        height
    }

    fn auto_size_row(&mut self, cx: &Cx<'_>, row: usize) -> bool {
        let height = self.compute_row_height(cx, row);
        match &mut self.row_model {
            Some(row_model) if row < row_model.len() => row_model.set_size(row, height),
            _ => false,
        }
    }

    fn auto_size_rows(&mut self, cx: &Cx<'_>) {
        if self.row_model.is_some() {
            let heights: Vec<i32> = (0..self.num_rows).map(|row| self.compute_row_height(cx, row)).collect();
            if let Some(row_model) = &mut self.row_model {
                row_model.initialize_all_with(heights.len(), |row| heights[row]);
            }
        }
        self.auto_size_all_rows = false;
    }

    /// Number of fully visible rows.
    pub fn num_visible_rows(&self) -> usize {
        match self.visible_rows {
            Some((first, last)) => {
                let rows = last - first;
                if self.last_row_partial_visible { rows } else { rows + 1 }
            }
            None => 0,
        }
    }

    fn offset_x(&self, cx: &Cx<'_>) -> i32 {
        cx.base().inner_x() - self.scroll_x
    }

    fn offset_y(&self, cx: &Cx<'_>) -> i32 {
        cx.base().inner_y() - self.scroll_y + self.column_header_height
    }

    fn is_mouse_in_column_header(&self, cx: &Cx<'_>, y: i32) -> bool {
        let y = y - cx.base().inner_y();
        y >= 0 && y < self.column_header_height
    }

    /// The column whose right divider is within dragging distance of `x`.
    fn column_separator_under_mouse(&self, cx: &Cx<'_>, x: i32) -> Option<usize> {
        let x = x - self.offset_x(cx) + self.divider_distance;
        if x < 0 || self.num_columns == 0 {
            return None;
        }
        let column = self.column_model.index(x);
        let distance = x - self.column_model.position(column);
        (distance < 2 * self.divider_distance && column > 0).then(|| column - 1)
    }

    fn row_under_mouse(&self, cx: &Cx<'_>, y: i32) -> Option<usize> {
        self.row_from_position(y - self.offset_y(cx))
            .filter(|&row| row < self.num_rows)
    }

    fn column_under_mouse(&self, cx: &Cx<'_>, x: i32) -> Option<usize> {
        self.column_from_position(x - self.offset_x(cx))
            .filter(|&column| column < self.num_columns)
    }

    /// Whether the columns always fill the inner width.
    pub fn is_fixed_width_mode(&self, cx: &Cx<'_>) -> bool {
        let Some(pane) = ScrollPane::containing_scroll_pane(cx, cx.id()) else {
            return true;
        };
        // The pane is busy while it queries our size; keep the last answer then.
        if let Some(scroll_pane) = cx.widget::<ScrollPane>(pane) {
            self.fixed_width_mode.set(scroll_pane.fixed() == Fixed::Horizontal);
        }
        self.fixed_width_mode.get()
    }

    fn clamp_column_width(&self, width: i32) -> i32 {
        width.max(2 * self.divider_distance + 1)
    }

    fn header_preferred_width(&self, cx: &mut Cx<'_>, column: usize) -> i32 {
        let assigned = self.column_widths.get(column).copied().unwrap_or(0);
        if assigned > 0 {
            return assigned;
        }
        let text_width = cx.preferred_width(self.column_headers[column]);
        self.default_column_width.max(text_width)
    }

    fn compute_preferred_column_width(&self, cx: &mut Cx<'_>, column: usize) -> i32 {
        let width = self.header_preferred_width(cx, column);
        self.clamp_column_width(width)
    }

    /// The narrowest `column` may get when widths are distributed.
    fn column_min_width(&self, cx: &mut Cx<'_>, column: usize) -> i32 {
        self.clamp_column_width(cx.preferred_width(self.column_headers[column]))
    }

    fn compute_column_widths(&self, cx: &mut Cx<'_>) -> Vec<i32> {
        let inner_width = cx.base().inner_width();
        let prefs: Vec<i32> = (0..self.num_columns)
            .map(|column| self.header_preferred_width(cx, column))
            .collect();
        if !self.is_fixed_width_mode(cx) {
            let widths: Vec<i32> = prefs.iter().map(|&w| self.clamp_column_width(w)).collect();
            if widths.iter().sum::<i32>() >= inner_width {
                return widths;
            }
        }
        let mins: Vec<i32> = (0..self.num_columns)
            .map(|column| self.column_min_width(cx, column))
            .collect();
        distribute_widths(&prefs, &mins, inner_width)
            .into_iter()
            .map(|w| self.clamp_column_width(w))
            .collect()
    }

    fn recompute_column_widths(&mut self, cx: &mut Cx<'_>) {
        if cx.base().inner_width() > 0 {
            let widths = self.compute_column_widths(cx);
            self.column_model
                .initialize_all_with(widths.len(), |column| widths[column]);
            self.update_all_column_width = false;
        }
    }

    fn compute_preferred_width(&self, cx: &mut Cx<'_>) -> i32 {
        if self.is_fixed_width_mode(cx) {
            (0..self.num_columns)
                .map(|column| self.header_preferred_width(cx, column))
                .sum()
        } else {
            (0..self.num_columns)
                .map(|column| self.compute_preferred_column_width(cx, column))
                .sum()
        }
    }

    // =========================================================================
    // Scrolling
    // =========================================================================

    fn scroll_pane_to_x(&self, cx: &mut Cx<'_>, pos: i32) {
        if let Some(pane) = ScrollPane::containing_scroll_pane(cx, cx.id()) {
            cx.defer(move |gui| ScrollPane::set_scroll_position_x(gui, pane, pos));
        }
    }

    fn scroll_pane_to_y(&self, cx: &mut Cx<'_>, pos: i32) {
        if let Some(pane) = ScrollPane::containing_scroll_pane(cx, cx.id()) {
            cx.defer(move |gui| ScrollPane::set_scroll_position_y(gui, pane, pos));
        }
    }

    /// Center `row` in the containing scroll pane.
    pub fn scroll_to_row(&self, cx: &mut Cx<'_>, row: usize) {
        let Some(pane) = ScrollPane::containing_scroll_pane(cx, cx.id()) else {
            return;
        };
        if row >= self.num_rows {
            return;
        }
        let start = self.row_start_position(row);
        let height = self.row_height(row);
        cx.defer(move |gui| {
            gui.validate_layout(pane);
            ScrollPane::scroll_to_area_y(gui, pane, start, height, height / 2);
        });
    }

    /// Scroll the least amount that makes `row` fully visible.
    pub fn adjust_scroll_position(&self, cx: &mut Cx<'_>, row: usize) {
        let Some((first, last)) = self.visible_rows else {
            return;
        };
        if row >= self.num_rows || self.num_visible_rows() < 1 {
            return;
        }
        if row < first || (row == first && self.first_row_partial_visible) {
            self.scroll_pane_to_y(cx, self.row_start_position(row));
        } else if row > last || (row == last && self.last_row_partial_visible) {
            let inner_height = (cx.base().inner_height() - self.column_header_height).max(0);
            let pos = (self.row_end_position(row) - inner_height).max(0);
            self.scroll_pane_to_y(cx, pos);
        }
    }

    // =========================================================================
    // Selection, drag and drop
    // =========================================================================

    pub fn selection_manager(&self) -> &RowSelectionManager {
        &self.selection
    }

    pub fn selection_manager_mut(&mut self) -> &mut RowSelectionManager {
        &mut self.selection
    }

    pub fn is_row_selected(&self, row: usize) -> bool {
        self.selection.is_row_selected(row)
    }

    pub fn set_drag_listener(&mut self, listener: Option<Box<dyn DragListener>>) {
        self.drag_listener = listener;
    }

    pub fn set_keyboard_search_handler(&mut self, handler: Option<Box<dyn KeyboardSearchHandler>>) {
        self.keyboard_search = handler;
    }

    /// The drop marker: a row and whether the marker sits before it (or on it).
    pub fn drop_marker(&self) -> Option<(usize, bool)> {
        self.drop_marker
    }

    /// Place the drop marker before `row` or on `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row > num_rows()`, or `row == num_rows()` and `before_row` is `false`.
    pub fn set_drop_marker(&mut self, row: usize, before_row: bool) {
        assert!(
            row < self.num_rows || (row == self.num_rows && before_row),
            "drop marker row {row} out of range for {} rows",
            self.num_rows
        );
        self.drop_marker = Some((row, before_row));
    }

    /// Place the drop marker for a drag at the event's position.
    ///
    /// The top and bottom quarter of a row put the marker between rows, the middle
    /// on the row. Returns `false` if the position is outside of the rows.
    pub fn set_drop_marker_at(&mut self, cx: &Cx<'_>, evt: &Event) -> bool {
        let (x, y) = (evt.mouse_x(), evt.mouse_y());
        if !cx.base().is_inside(x, y) || self.is_mouse_in_column_header(cx, y) {
            return false;
        }
        let y = y - self.offset_y(cx);
        match self.row_from_position(y) {
            Some(row) if row < self.num_rows => {
                let start = self.row_start_position(row);
                let end = self.row_end_position(row);
                let margin = (end - start + 2) / 4;
                if y - start < margin {
                    self.set_drop_marker(row, true);
                } else if end - y < margin {
                    self.set_drop_marker(row + 1, true);
                } else {
                    self.set_drop_marker(row, false);
                }
                true
            }
            Some(row) if row == self.num_rows => {
                self.set_drop_marker(row, true);
                true
            }
            _ => false,
        }
    }

    pub fn clear_drop_marker(&mut self) {
        self.drop_marker = None;
    }

    // =========================================================================
    // Cell renderers and cell widgets
    // =========================================================================

    /// Use `renderer` for every cell whose data is of `kind` (see [`CellData::kind`]).
    pub fn register_cell_renderer(
        &mut self,
        cx: &mut Cx<'_>,
        kind: &'static str,
        renderer: Rc<RefCell<dyn CellRenderer>>,
    ) {
        if renderer.borrow_mut().as_widget_creator().is_some() {
            self.has_cell_widget_creators = true;
        }
        self.apply_cell_renderer_theme_from_manager(cx, &renderer);
        self.renderers.insert(kind, renderer);
        self.update_all(cx);
    }

    /// Use `renderer` for the cells of `column` that have no renderer registered for
    /// their kind.
    pub fn set_column_default_cell_renderer(
        &mut self,
        cx: &mut Cx<'_>,
        column: usize,
        renderer: Option<Rc<RefCell<dyn CellRenderer>>>,
    ) {
        if self.column_default_renderers.len() <= column {
            self.column_default_renderers.resize(column + 1, None);
        }
        if let Some(renderer) = &renderer {
            if renderer.borrow_mut().as_widget_creator().is_some() {
                self.has_cell_widget_creators = true;
            }
            self.apply_cell_renderer_theme_from_manager(cx, renderer);
        }
        self.column_default_renderers[column] = renderer;
        self.update_all(cx);
    }

    fn apply_cell_renderer_theme_from_manager(&self, cx: &Cx<'_>, renderer: &SharedRenderer) {
        let Some(manager) = cx.theme_manager() else {
            return;
        };
        let path = cx.theme_path(cx.id());
        if let Some(info) = manager.find_theme_info(&path) {
            apply_cell_renderer_theme(info.as_ref(), renderer);
        }
    }

    /// The renderer for a cell, loaded with the cell's data. `None` for empty cells.
    fn cell_renderer(&self, row: usize, column: usize) -> Option<SharedRenderer> {
        let data = self.model.as_ref()?.cell(row, column);
        if matches!(data, CellData::Empty) {
            return None;
        }
        let renderer = self
            .renderers
            .get(data.kind())
            .or_else(|| self.column_default_renderers.get(column).and_then(Option::as_ref))
            .unwrap_or(&self.string_renderer);
        renderer.borrow_mut().set_cell_data(row, column, &data);
        Some(Rc::clone(renderer))
    }

    fn update_cell_widget(&mut self, cx: &mut Cx<'_>, row: usize, column: usize) {
        let (r, c) = (grid_index(row), grid_index(column));
        let old = self.widget_grid.get(r, c).copied();
        let mut new = None;
        if let Some(renderer) = self.cell_renderer(row, column) {
            let kind = self
                .model
                .as_ref()
                .map_or(CellData::KIND_EMPTY, |m| m.cell(row, column).kind());
            let mut renderer = renderer.borrow_mut();
            if let Some(creator) = renderer.as_widget_creator() {
                let existing = old.filter(|e| e.kind == kind).map(|e| e.widget);
                let widget = creator.update_widget(cx, existing);
                new = Some(CellWidgetEntry { widget, kind });
            }
        }
        match new {
            Some(entry) => {
                self.widget_grid.set(r, c, entry);
            }
            None => {
                self.widget_grid.remove(r, c);
            }
        }
        if let Some(old) = old
            && new.map(|e| e.widget) != Some(old.widget)
        {
            self.dispose_cell_widget(cx, old.widget);
        }
    }

    fn refresh_cell_widgets(&mut self, cx: &mut Cx<'_>) {
        if !self.widget_grid.is_empty() || self.has_cell_widget_creators {
            for row in 0..self.num_rows {
                for column in 0..self.num_columns {
                    self.update_cell_widget(cx, row, column);
                }
            }
        }
        self.update_all_cell_widgets = false;
    }

    /// The live widget of a cell, if its renderer creates widgets.
    pub fn cell_widget(&self, row: usize, column: usize) -> Option<WidgetId> {
        self.widget_grid
            .get(grid_index(row), grid_index(column))
            .map(|e| e.widget)
    }

    fn remove_cell_widget(&self, cx: &mut Cx<'_>, widget: WidgetId) {
        if let Some(container) = self.cell_container
            && cx.contains(widget)
            && cx.parent_of(widget) == Some(container)
        {
            cx.remove_child(container, widget);
        }
    }

    fn dispose_cell_widget(&self, cx: &mut Cx<'_>, widget: WidgetId) {
        if cx.contains(widget) {
            cx.dispose(widget);
        }
    }

    fn remove_all_cell_widgets(&self, cx: &mut Cx<'_>) {
        if let Some(container) = self.cell_container {
            cx.remove_all_children(container);
        }
    }

    fn position_cell_widget(&self, cx: &mut Cx<'_>, row: usize, column: usize, entry: CellWidgetEntry) {
        let Some(container) = self.cell_container else {
            return;
        };
        let Some(renderer) = self.cell_renderer(row, column) else {
            return;
        };
        if cx.parent_of(entry.widget) != Some(container) {
            let index = cx.num_children(container);
            cx.insert_child(container, entry.widget, index);
        }
        let x = self.column_start_position(column);
        let y = self.row_start_position(row);
        let rect = Rect::new(
            x + self.offset_x(cx),
            y + self.offset_y(cx),
            self.column_end_position(column) - x,
            self.row_end_position(row) - y,
        );
        let mut renderer = renderer.borrow_mut();
        if let Some(creator) = renderer.as_widget_creator() {
            creator.position_widget(cx, entry.widget, rect);
        }
    }

    // =========================================================================
    // Column headers
    // =========================================================================

    fn create_column_header(&self, cx: &mut Cx<'_>) -> WidgetId {
        let header = cx.create(ColumnHeader::default());
        cx.set_theme(header, "columnHeader");
        cx.base_of_mut(header).set_can_accept_keyboard_focus(false);
        let id = cx.id();
        cx.add(id, header);
        header
    }

    fn update_column_header(&self, cx: &mut Cx<'_>, column: usize) {
        let (Some(model), Some(&header)) = (&self.model, self.column_headers.get(column)) else {
            return;
        };
        let text = model.column_header_text(column);
        if let Some(h) = cx.widget_mut::<ColumnHeader>(header) {
            h.text = text;
        }
        cx.invalidate_layout(header);
    }

    /// The header widget of `column`.
    pub fn column_header(&self, column: usize) -> Option<WidgetId> {
        self.column_headers.get(column).copied()
    }

    /// Mark one column as sorted. `None` clears the markers.
    pub fn set_column_sort_order(&self, cx: &mut Cx<'_>, sorted: Option<(usize, bool)>) {
        for (column, &header) in self.column_headers.iter().enumerate() {
            let base = cx.base_of(header);
            base.set_animation_state(STATE_SORT_ASCENDING, sorted == Some((column, true)));
            base.set_animation_state(STATE_SORT_DESCENDING, sorted == Some((column, false)));
        }
    }

    fn column_header_clicked_by(&mut self, cx: &mut Cx<'_>, header: WidgetId) {
        if let Some(column) = self.column_headers.iter().position(|&h| h == header) {
            tracing::debug!(target: targets::TABLE, column, "column header clicked");
            self.column_header_click.emit(cx, column);
        }
    }

    fn column_header_dragged(&mut self, cx: &mut Cx<'_>, new_width: i32) {
        let column = self.drag_column;
        if self.is_fixed_width_mode(cx) {
            if column + 1 >= self.num_columns {
                return;
            }
            let min_left = self.column_min_width(cx, column);
            let min_right = self.column_min_width(cx, column + 1);
            let new_width = new_width
                .min(self.drag_start_sum_width - min_right)
                .max(min_left);
            self.column_widths[column] = new_width;
            self.column_widths[column + 1] = self.drag_start_sum_width - new_width;
            self.update_all_column_width = true;
            let id = cx.id();
            cx.invalidate_layout(id);
        } else if column < self.num_columns {
            self.set_column_width(cx, column, new_width);
        }
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    fn cancel_dragging(&mut self, cx: &mut Cx<'_>) {
        if self.drag == DragState::User {
            if let Some(listener) = self.drag_listener.as_mut() {
                listener.drag_cancelled(cx);
            }
            self.drag = DragState::Ignore;
        }
    }

    fn handle_drag_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if evt.is_mouse_event() {
            return self.handle_mouse_event(cx, evt);
        }
        if evt.is_key_pressed_event() && evt.key_code() == Key::Escape {
            match self.drag {
                DragState::User => self.cancel_dragging(cx),
                DragState::ColumnHeader => {
                    let width = self.drag_start_col_width;
                    self.column_header_dragged(cx, width);
                    self.drag = DragState::Ignore;
                }
                DragState::Inactive | DragState::Ignore => {}
            }
            self.drag_cursor = None;
        }
        true
    }

    fn track_mouse(&mut self, cx: &mut Cx<'_>, evt: &Event) {
        if evt.event_type() == EventType::MouseExited {
            self.last_mouse_y = None;
            self.last_mouse_row = None;
            self.last_mouse_column = None;
            return;
        }
        self.last_mouse_y = Some(evt.mouse_y());
        if self.drag != DragState::Inactive {
            return;
        }
        let (row, column) = if self.is_mouse_in_column_header(cx, evt.mouse_y()) {
            (None, None)
        } else {
            (
                self.row_under_mouse(cx, evt.mouse_y()),
                self.column_under_mouse(cx, evt.mouse_x()),
            )
        };
        if row != self.last_mouse_row || column != self.last_mouse_column {
            self.last_mouse_row = row;
            self.last_mouse_column = column;
            let id = cx.id();
            cx.reset_tooltip(id);
        }
    }

    fn handle_mouse_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let event_type = evt.event_type();
        if self.drag != DragState::Inactive {
            match self.drag {
                DragState::ColumnHeader => {
                    if cx.base().inner_width() > 0 {
                        let width = self.clamp_column_width(evt.mouse_x() - self.drag_start_x);
                        self.column_header_dragged(cx, width);
                    }
                }
                DragState::User => {
                    if let Some(listener) = self.drag_listener.as_mut() {
                        let cursor = listener.dragged(cx, evt);
                        if evt.is_mouse_drag_end() {
                            listener.drag_stopped(cx, evt);
                        }
                        self.drag_cursor = cursor;
                    }
                }
                DragState::Inactive | DragState::Ignore => {}
            }
            if evt.is_mouse_drag_end() {
                self.drag = DragState::Inactive;
                self.drag_cursor = None;
            }
            return true;
        }

        if self.is_mouse_in_column_header(cx, evt.mouse_y()) {
            if let Some(column) = self.column_separator_under_mouse(cx, evt.mouse_x())
                && (column + 1 < self.num_columns || !self.is_fixed_width_mode(cx))
            {
                if event_type == EventType::MouseBtnDown {
                    self.drag_start_col_width = self.column_width(column);
                    self.drag_column = column;
                    self.drag_start_x = evt.mouse_x() - self.drag_start_col_width;
                    if self.is_fixed_width_mode(cx) {
                        for i in 0..self.num_columns {
                            self.column_widths[i] = self.column_model.size(i);
                        }
                        self.drag_start_sum_width =
                            self.drag_start_col_width + self.column_width(column + 1);
                    }
                }
                if evt.is_mouse_drag_event() {
                    self.drag = DragState::ColumnHeader;
                }
                return true;
            }
        } else {
            let (row, column) = (self.last_mouse_row, self.last_mouse_column);
            if evt.is_mouse_drag_event() {
                let accepted = match self.drag_listener.as_mut() {
                    Some(listener) => {
                        if listener.drag_started(cx, row, column, evt) {
                            Some(listener.dragged(cx, evt))
                        } else {
                            None
                        }
                    }
                    None => None,
                };
                match accepted {
                    Some(cursor) => {
                        self.drag_cursor = cursor;
                        self.drag = DragState::User;
                    }
                    None => self.drag = DragState::Ignore,
                }
                return true;
            }
            let outcome = self.selection.handle_mouse_event(row, self.num_rows, evt);
            if outcome.handled {
                self.selection_changed.emit(cx, ());
            }
            if event_type == EventType::MouseClicked
                && evt.click_count() == 2
                && let (Some(row), Some(column)) = (row, column)
            {
                self.double_click.emit(cx, (row, column));
            }
            if event_type == EventType::MouseBtnUp && evt.mouse_button() == Some(MouseButton::Right) {
                self.right_click.emit(cx, (row, column, *evt));
            }
        }
        event_type != EventType::MouseWheel
    }

    // =========================================================================
    // Painting
    // =========================================================================

    fn paint_row_image(&self, cx: &mut Cx<'_>, image: &Rc<dyn Image>) {
        let Some((first, last)) = self.visible_rows else {
            return;
        };
        let x = self.offset_x(cx);
        let width = self.column_model.end_position();
        let offset_y = self.offset_y(cx);
        let lead = self.selection.lead_row();
        for row in first..=last {
            let y = offset_y + self.row_start_position(row);
            let height = self.row_height(row);
            let hover = self.drag == DragState::Inactive
                && self.last_mouse_y.is_some_and(|my| my >= y && my < y + height);
            let base = cx.base();
            base.set_animation_state(STATE_ROW_SELECTED, self.is_row_selected(row));
            base.set_animation_state(STATE_ROW_HOVER, hover);
            base.set_animation_state(STATE_LEAD_ROW, lead == Some(row));
            base.set_animation_state(STATE_ROW_DROP_TARGET, self.drop_marker == Some((row, false)));
            base.set_animation_state(STATE_ROW_ODD, row % 2 == 1);
            cx.draw_image(image, Rect::new(x, y, width, height));
        }
    }
}

/// Spread `total` over columns in proportion to their preferred widths.
///
/// Each column keeps at least its minimum; the rounding residue goes to the last column.
fn distribute_widths(prefs: &[i32], mins: &[i32], total: i32) -> Vec<i32> {
    let Some(&last_min) = mins.last() else {
        return Vec::new();
    };
    let sum: i64 = prefs.iter().map(|&p| i64::from(p)).sum();
    let count = prefs.len() as i64;
    let diff = i64::from(total) - sum;
    let mut widths: Vec<i32> = prefs
        .iter()
        .zip(mins)
        .map(|(&pref, &min)| {
            let share = if sum > 0 {
                diff * i64::from(pref) / sum
            } else {
                diff / count
            };
            let width = (i64::from(pref) + share).clamp(0, i64::from(i32::MAX));
            (width as i32).max(min)
        })
        .collect();
    let used: i32 = widths.iter().sum();
    if let Some(last) = widths.last_mut() {
        *last = (*last + total - used).max(last_min);
    }
    widths
}

fn apply_cell_renderer_theme(theme: &dyn ThemeInfo, renderer: &SharedRenderer) {
    let mut renderer = renderer.borrow_mut();
    if let Some(child) = theme.child_theme(renderer.theme()) {
        renderer.apply_theme(child.as_ref());
    }
}

/// Sparse grid coordinate for a row or column index.
fn grid_index(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

impl Drop for TableBase {
    fn drop(&mut self) {
        self.disconnect_model();
    }
}

impl Widget for TableBase {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let container = cx.create(CellWidgetContainer);
        cx.set_theme(container, "");
        {
            let base = cx.base_of_mut(container);
            base.set_clip(true);
            base.set_can_accept_keyboard_focus(false);
        }
        cx.add(id, container);
        self.cell_container = Some(container);
        cx.base_mut()
            .set_input_map(Some(RowSelectionManager::default_input_map()));
        let model = self.initial_model.take();
        self.set_model(cx, model);
    }

    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        if cx.base().input_map().is_none() {
            cx.base_mut()
                .set_input_map(Some(RowSelectionManager::default_input_map()));
        }
        self.image_column_divider = theme.get_image("columnDivider");
        self.image_row_background = theme.get_image("row.background");
        self.image_row_overlay = theme.get_image("row.overlay");
        self.image_row_drop_marker = theme.get_image("row.dropmarker");
        self.row_height = theme.get_int("rowHeight", DEFAULT_ROW_HEIGHT).max(1);
        self.default_column_width = theme.get_int("columnHeaderWidth", DEFAULT_COLUMN_WIDTH);
        self.column_header_height = theme.get_int("columnHeaderHeight", DEFAULT_COLUMN_HEADER_HEIGHT);
        self.divider_distance =
            theme.get_int("columnDividerDragableDistance", DEFAULT_DIVIDER_DISTANCE);
        self.ensure_column_header_min_width = theme.get_bool("ensureColumnHeaderMinWidth", false);
        self.column_resize_cursor = theme
            .get_mouse_cursor("columnResizeCursor")
            .or(Some(CursorIcon::ColResize));
        self.drag_not_possible_cursor = theme
            .get_mouse_cursor("dragNotPossibleCursor")
            .or(Some(CursorIcon::NotAllowed));
        self.column_model.set_default_value(self.default_column_width);
        for renderer in self.renderers.values() {
            apply_cell_renderer_theme(theme, renderer);
        }
        for renderer in self.column_default_renderers.iter().flatten() {
            apply_cell_renderer_theme(theme, renderer);
        }
        apply_cell_renderer_theme(theme, &self.string_renderer);
        self.update_all(cx);
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        let (inner_x, inner_y, inner_width, inner_height) = {
            let base = cx.base();
            (base.inner_x(), base.inner_y(), base.inner_width(), base.inner_height())
        };
        let body_height = (inner_height - self.column_header_height).max(0);
        if let Some(container) = self.cell_container {
            cx.set_position(container, inner_x, inner_y + self.column_header_height);
            cx.set_size(container, inner_width, body_height);
        }
        if self.update_all_column_width {
            self.recompute_column_widths(cx);
        }
        if self.auto_size_all_rows {
            self.auto_size_rows(cx);
        }
        if self.update_all_cell_widgets {
            self.refresh_cell_widgets(cx);
        }

        let scroll_end_x = self.scroll_x + inner_width;
        let scroll_end_y = self.scroll_y + body_height;
        let previous = self.visible_rows;
        self.visible_rows = (self.num_rows > 0).then(|| {
            let last_row = self.num_rows - 1;
            let start = self.row_from_position(self.scroll_y).unwrap_or(0).min(last_row);
            let end = self
                .row_from_position(scroll_end_y)
                .unwrap_or(0)
                .clamp(start, last_row);
            (start, end)
        });
        self.visible_columns = (self.num_columns > 0 && self.column_model.len() == self.num_columns)
            .then(|| {
                let last_column = self.num_columns - 1;
                let start = self.column_from_position(self.scroll_x).unwrap_or(0).min(last_column);
                let end = self
                    .column_from_position(scroll_end_x)
                    .unwrap_or(0)
                    .clamp(start, last_column);
                (start, end)
            });
        match self.visible_rows {
            Some((start, end)) => {
                self.first_row_partial_visible = self.row_start_position(start) < self.scroll_y;
                self.last_row_partial_visible = self.row_end_position(end) > scroll_end_y;
            }
            None => {
                self.first_row_partial_visible = false;
                self.last_row_partial_visible = false;
            }
        }

        if !self.widget_grid.is_empty() {
            let visible = self.visible_rows;
            let hidden: Vec<WidgetId> = self
                .widget_grid
                .iter()
                .filter(|&(row, _, _)| {
                    let row = usize::try_from(row).unwrap_or(usize::MAX);
                    visible.is_none_or(|(start, end)| row < start || row > end)
                })
                .map(|(_, _, e)| e.widget)
                .collect();
            if previous.is_some() {
                for widget in hidden {
                    self.remove_cell_widget(cx, widget);
                }
            }
            if let Some((start, end)) = visible {
                let shown: Vec<(usize, usize, CellWidgetEntry)> = self
                    .widget_grid
                    .iter_window(grid_index(start), 0, grid_index(end), i32::MAX)
                    .filter_map(|(r, c, e)| {
                        Some((usize::try_from(r).ok()?, usize::try_from(c).ok()?, *e))
                    })
                    .collect();
                for (row, column, entry) in shown {
                    self.position_cell_widget(cx, row, column, entry);
                }
            }
        }

        if self.column_model.len() == self.num_columns {
            let offset_x = self.offset_x(cx);
            let last = self.num_columns.saturating_sub(1);
            for (column, &header) in self.column_headers.iter().enumerate() {
                let start = self.column_start_position(column);
                let end = self.column_end_position(column);
                cx.set_position(header, offset_x + start + self.divider_distance, inner_y);
                cx.set_size(
                    header,
                    (end - start - 2 * self.divider_distance).max(0),
                    self.column_header_height,
                );
                cx.set_visible(header, self.column_header_height > 0);
                let base = cx.base_of(header);
                base.set_animation_state(STATE_FIRST_COLUMN_HEADER, column == 0);
                base.set_animation_state(STATE_LAST_COLUMN_HEADER, column == last);
            }
        }
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let (Some((first_row, last_row)), Some((first_column, last_column))) =
            (self.visible_rows, self.visible_columns)
        else {
            return;
        };
        let (inner_x, inner_y, inner_width, inner_height) = {
            let base = cx.base();
            (
                base.inner_x(),
                base.inner_y() + self.column_header_height,
                base.inner_width(),
                base.inner_height() - self.column_header_height,
            )
        };
        let offset_x = self.offset_x(cx);
        let offset_y = self.offset_y(cx);
        cx.renderer_mut()
            .clip_enter(Rect::new(inner_x, inner_y, inner_width, inner_height.max(0)));

        if let Some(image) = self.image_row_background.clone() {
            self.paint_row_image(cx, &image);
        }
        if let Some(image) = self.image_column_divider.clone() {
            cx.base().set_animation_state(STATE_ROW_SELECTED, false);
            for column in first_column..=last_column {
                let x = offset_x + self.column_end_position(column);
                cx.draw_image(&image, Rect::new(x, inner_y, 1, inner_height));
            }
        }
        for row in first_row..=last_row {
            let y = offset_y + self.row_start_position(row);
            let height = self.row_height(row);
            let mut column = first_column;
            while column <= last_column {
                let start = self.column_start_position(column);
                let mut span = 1;
                if let Some(renderer) = self.cell_renderer(row, column) {
                    let mut renderer = renderer.borrow_mut();
                    span = renderer.column_span().max(1);
                    let end_column = (column + span - 1).min(self.num_columns - 1);
                    let end = self.column_end_position(end_column);
                    if renderer.as_widget_creator().is_none() {
                        renderer.paint(cx, Rect::new(offset_x + start, y, end - start, height));
                    }
                }
                column += span;
            }
        }
        if let Some(image) = self.image_row_overlay.clone() {
            self.paint_row_image(cx, &image);
        }
        if let (Some((row, true)), Some(image)) = (self.drop_marker, self.image_row_drop_marker.clone()) {
            let y = offset_y + self.row_start_position(row);
            cx.draw_image(
                &image,
                Rect::new(offset_x, y, self.column_model.end_position(), 1),
            );
        }
        cx.renderer_mut().clip_leave();
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if evt.is_mouse_event() {
            self.track_mouse(cx, evt);
        }
        if self.drag != DragState::Inactive {
            return self.handle_drag_event(cx, evt);
        }
        if evt.is_key_event()
            && let Some(search) = self.keyboard_search.as_mut()
            && search.is_active()
            && search.handle_key_event(cx, evt)
        {
            return true;
        }
        if cx.default_handle_event(evt) || self.handle_mapped_key(cx, evt) {
            return true;
        }
        if evt.is_mouse_event() {
            return self.handle_mouse_event(cx, evt);
        }
        if evt.is_key_event()
            && let Some(search) = self.keyboard_search.as_mut()
        {
            return search.handle_key_event(cx, evt);
        }
        false
    }

    fn handle_key_stroke_action(&mut self, cx: &mut Cx<'_>, action: &str, _evt: &Event) -> bool {
        let page_size = self.num_visible_rows();
        let outcome = self
            .selection
            .handle_key_stroke_action(action, self.num_rows, page_size);
        if !outcome.handled {
            return false;
        }
        if let Some(row) = outcome.scroll_to {
            self.adjust_scroll_position(cx, row);
        }
        self.selection_changed.emit(cx, ());
        let id = cx.id();
        cx.request_keyboard_focus(id);
        true
    }

    fn mouse_cursor(&mut self, cx: &mut Cx<'_>, evt: &Event) -> Option<CursorIcon> {
        match self.drag {
            DragState::ColumnHeader => return self.column_resize_cursor,
            DragState::User => return self.drag_cursor,
            DragState::Ignore => return self.drag_not_possible_cursor,
            DragState::Inactive => {}
        }
        if self.is_mouse_in_column_header(cx, evt.mouse_y())
            && let Some(column) = self.column_separator_under_mouse(cx, evt.mouse_x())
            && (column + 1 < self.num_columns || !self.is_fixed_width_mode(cx))
        {
            return self.column_resize_cursor;
        }
        cx.base().mouse_cursor()
    }

    fn tooltip_content_at(&mut self, cx: &mut Cx<'_>, _x: i32, _y: i32) -> Option<TooltipContent> {
        if let (Some(model), Some(row), Some(column)) =
            (&self.model, self.last_mouse_row, self.last_mouse_column)
            && row < self.num_rows
            && column < self.num_columns
            && let Some(tooltip) = model.tooltip_content(row, column)
        {
            return Some(TooltipContent::Text(tooltip));
        }
        let base = cx.base();
        base.tooltip_content()
            .cloned()
            .or_else(|| base.theme_tooltip_content().map(|t| TooltipContent::Text(t.to_owned())))
    }

    fn min_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.base().min_height().max(self.column_header_height)
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        if cx.base().inner_width() == 0 {
            return self.compute_preferred_width(cx);
        }
        if self.update_all_column_width {
            self.recompute_column_widths(cx);
        }
        self.column_model.end_position()
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        if self.auto_size_all_rows {
            self.auto_size_rows(cx);
        }
        // One extra pixel for a drop marker after the last row.
        self.column_header_height + 1 + self.row_start_position(self.num_rows)
    }

    fn size_changed(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        cx.invalidate_layout_locally(id);
        if self.is_fixed_width_mode(cx) {
            self.update_all_column_width = true;
        }
        if let Some(search) = self.keyboard_search.as_mut() {
            search.update_info_window_position(cx);
        }
    }

    fn position_changed(&mut self, cx: &mut Cx<'_>) {
        if let Some(search) = self.keyboard_search.as_mut() {
            search.update_info_window_position(cx);
        }
    }

    fn child_added(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn child_removed(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn as_scrollable(&mut self) -> Option<&mut dyn Scrollable> {
        Some(self)
    }

    fn as_auto_scrollable(&mut self) -> Option<&mut dyn AutoScrollable> {
        Some(self)
    }

    fn as_custom_page_size(&mut self) -> Option<&mut dyn CustomPageSize> {
        Some(self)
    }
}

impl Scrollable for TableBase {
    fn set_scroll_position(&mut self, cx: &mut Cx<'_>, x: i32, y: i32) {
        if self.scroll_x != x || self.scroll_y != y {
            self.scroll_x = x;
            self.scroll_y = y;
            let id = cx.id();
            cx.invalidate_layout_locally(id);
        }
    }
}

impl AutoScrollable for TableBase {
    fn auto_scroll_direction(&mut self, cx: &mut Cx<'_>, evt: &Event, area: i32) -> i32 {
        let area_y = cx.base().inner_y() + self.column_header_height;
        let area_height = cx.base().inner_height() - self.column_header_height;
        let mouse_y = evt.mouse_y();
        if mouse_y >= area_y && mouse_y < area_y + area_height {
            let mouse_y = mouse_y - area_y;
            if mouse_y <= area || area_height - mouse_y <= area {
                return if mouse_y < area_height / 2 { -1 } else { 1 };
            }
        }
        0
    }
}

impl CustomPageSize for TableBase {
    fn page_size_x(&mut self, _cx: &mut Cx<'_>, available_width: i32) -> i32 {
        available_width
    }

    fn page_size_y(&mut self, _cx: &mut Cx<'_>, available_height: i32) -> i32 {
        available_height - self.column_header_height
    }
}

/// Holds the live cell widgets below the column headers.
struct CellWidgetContainer;

impl Widget for CellWidgetContainer {
    fn child_added(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn child_removed(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn all_children_removed(&mut self, _cx: &mut Cx<'_>) {}

    fn child_invalidate_layout(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}
}

/// A clickable column title.
#[derive(Debug, Default)]
pub struct ColumnHeader {
    text: String,
    text_color: Color,
    alignment: Alignment,
    pressed: bool,
}

impl ColumnHeader {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Widget for ColumnHeader {
    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        self.text_color = theme.get_color("textColor", Color::WHITE);
        self.alignment = theme.get_alignment("textAlignment", Alignment::Center);
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().compute_text_width(&self.text)
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.font().line_height()
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let left = evt.mouse_button() == Some(MouseButton::Left);
        match evt.event_type() {
            EventType::MouseEntered => {
                cx.base().set_animation_state(STATE_HOVER, true);
                true
            }
            EventType::MouseExited => {
                cx.base().set_animation_state(STATE_HOVER, false);
                true
            }
            EventType::MouseBtnDown if left => {
                self.pressed = true;
                cx.base().set_animation_state(STATE_PRESSED, true);
                true
            }
            EventType::MouseBtnUp if left => {
                let inside = cx.base().is_inside(evt.mouse_x(), evt.mouse_y());
                let clicked = self.pressed && inside;
                self.pressed = false;
                cx.base().set_animation_state(STATE_PRESSED, false);
                if clicked && let Some(table) = cx.parent() {
                    let header = cx.id();
                    cx.with_widget::<TableBase, _>(table, |t, cx| t.column_header_clicked_by(cx, header));
                }
                true
            }
            EventType::MouseMoved | EventType::MouseClicked => true,
            _ => cx.default_handle_event(evt),
        }
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        if self.text.is_empty() {
            return;
        }
        let rect = cx.base().rect();
        let inner = cx.base().inner_rect();
        let font = cx.font();
        let width = font.compute_text_width(&self.text);
        let x = inner.x + self.alignment.compute_position_x(inner.width, width);
        let y = inner.y + self.alignment.compute_position_y(inner.height, font.line_height());
        cx.renderer_mut().clip_enter(rect);
        cx.draw_text(self.text_color, x, y, &self.text);
        cx.renderer_mut().clip_leave();
    }
}
