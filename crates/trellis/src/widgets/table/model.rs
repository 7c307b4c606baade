//! Table models: the data a [`TableBase`](super::TableBase) displays.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{GuiError, GuiResult};
use crate::gui::Gui;
use crate::signal::Signal;

/// The value of one cell.
///
/// The [`kind`](CellData::kind) selects the cell renderer.
#[derive(Clone, Default)]
pub enum CellData {
    #[default]
    Empty,
    Text(String),
    Bool(bool),
    Int(i64),
    /// Application data drawn by a renderer registered for `kind`.
    Custom {
        kind: &'static str,
        value: Rc<dyn Any>,
    },
}

impl CellData {
    pub const KIND_EMPTY: &'static str = "empty";
    pub const KIND_TEXT: &'static str = "text";
    pub const KIND_BOOL: &'static str = "bool";
    pub const KIND_INT: &'static str = "int";

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => Self::KIND_EMPTY,
            Self::Text(_) => Self::KIND_TEXT,
            Self::Bool(_) => Self::KIND_BOOL,
            Self::Int(_) => Self::KIND_INT,
            Self::Custom { kind, .. } => kind,
        }
    }

    /// The custom value downcast to `T`.
    pub fn custom<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Custom { value, .. } => value.downcast_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for CellData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty | Self::Custom { .. } => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
        }
    }
}

impl fmt::Debug for CellData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Custom { kind, .. } => f.debug_struct("Custom").field("kind", kind).finish(),
        }
    }
}

impl PartialEq for CellData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Custom { kind: ka, value: va }, Self::Custom { kind: kb, value: vb }) => {
                ka == kb && Rc::ptr_eq(va, vb)
            }
            _ => false,
        }
    }
}

impl From<&str> for CellData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for CellData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<bool> for CellData {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CellData {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// A change reported by a [`TableModel`] after it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableModelEvent {
    RowsInserted { index: usize, count: usize },
    RowsDeleted { index: usize, count: usize },
    RowsChanged { index: usize, count: usize },
    CellChanged { row: usize, column: usize },
    ColumnsInserted { index: usize, count: usize },
    ColumnsDeleted { index: usize, count: usize },
    ColumnHeaderChanged { column: usize },
    /// Everything may have changed, including the number of rows and columns.
    AllChanged,
}

/// Rows and columns of cell data with change notification.
pub trait TableModel {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    fn column_header_text(&self, column: usize) -> String;

    fn cell(&self, row: usize, column: usize) -> CellData;

    /// Tooltip shown while the mouse rests over a cell.
    fn tooltip_content(&self, _row: usize, _column: usize) -> Option<String> {
        None
    }

    /// Emitted after every change.
    fn changes(&self) -> &Signal<TableModelEvent>;
}

/// An in-memory [`TableModel`] with fixed column headers.
///
/// Mutating methods take the [`Gui`] so the change can be announced right away.
#[derive(Default)]
pub struct SimpleTableModel {
    headers: RefCell<Vec<String>>,
    rows: RefCell<Vec<Vec<CellData>>>,
    tooltips: RefCell<Vec<Vec<Option<String>>>>,
    changes: Signal<TableModelEvent>,
}

impl SimpleTableModel {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: RefCell::new(headers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Wrap the model for sharing with tables.
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    fn normalized(&self, mut cells: Vec<CellData>) -> Vec<CellData> {
        cells.resize(self.num_columns(), CellData::Empty);
        cells
    }

    fn check_row(&self, row: usize) -> GuiResult<()> {
        let count = self.num_rows();
        if row >= count {
            return Err(GuiError::RowOutOfRange { row, count });
        }
        Ok(())
    }

    fn check_column(&self, column: usize) -> GuiResult<()> {
        let count = self.num_columns();
        if column >= count {
            return Err(GuiError::ColumnOutOfRange { column, count });
        }
        Ok(())
    }

    /// Append a row. Missing cells are empty, extra cells are dropped.
    pub fn add_row(&self, gui: &mut Gui, cells: Vec<CellData>) {
        let index = self.num_rows();
        // Appending never fails the range check.
        let _ = self.insert_rows(gui, index, vec![cells]);
    }

    pub fn insert_rows(&self, gui: &mut Gui, index: usize, rows: Vec<Vec<CellData>>) -> GuiResult<()> {
        let count = self.num_rows();
        if index > count {
            return Err(GuiError::RowOutOfRange { row: index, count });
        }
        let inserted = rows.len();
        if inserted == 0 {
            return Ok(());
        }
        let rows: Vec<Vec<CellData>> = rows.into_iter().map(|r| self.normalized(r)).collect();
        let columns = self.num_columns();
        self.rows.borrow_mut().splice(index..index, rows);
        self.tooltips
            .borrow_mut()
            .splice(index..index, std::iter::repeat_n(vec![None; columns], inserted));
        self.changes.emit(gui, TableModelEvent::RowsInserted { index, count: inserted });
        Ok(())
    }

    pub fn delete_rows(&self, gui: &mut Gui, index: usize, count: usize) -> GuiResult<()> {
        let rows = self.num_rows();
        if index + count > rows {
            return Err(GuiError::RowOutOfRange { row: index + count, count: rows });
        }
        if count == 0 {
            return Ok(());
        }
        self.rows.borrow_mut().drain(index..index + count);
        self.tooltips.borrow_mut().drain(index..index + count);
        self.changes.emit(gui, TableModelEvent::RowsDeleted { index, count });
        Ok(())
    }

    pub fn set_cell(&self, gui: &mut Gui, row: usize, column: usize, data: CellData) -> GuiResult<()> {
        self.check_row(row)?;
        self.check_column(column)?;
        self.rows.borrow_mut()[row][column] = data;
        self.changes.emit(gui, TableModelEvent::CellChanged { row, column });
        Ok(())
    }

    pub fn set_tooltip(
        &self,
        row: usize,
        column: usize,
        tooltip: Option<String>,
    ) -> GuiResult<()> {
        self.check_row(row)?;
        self.check_column(column)?;
        self.tooltips.borrow_mut()[row][column] = tooltip;
        Ok(())
    }

    /// Insert a column with empty cells before `index`.
    pub fn insert_column(&self, gui: &mut Gui, index: usize, header: impl Into<String>) -> GuiResult<()> {
        let count = self.num_columns();
        if index > count {
            return Err(GuiError::ColumnOutOfRange { column: index, count });
        }
        self.headers.borrow_mut().insert(index, header.into());
        for row in self.rows.borrow_mut().iter_mut() {
            row.insert(index, CellData::Empty);
        }
        for row in self.tooltips.borrow_mut().iter_mut() {
            row.insert(index, None);
        }
        self.changes.emit(gui, TableModelEvent::ColumnsInserted { index, count: 1 });
        Ok(())
    }

    pub fn delete_column(&self, gui: &mut Gui, index: usize) -> GuiResult<()> {
        self.check_column(index)?;
        self.headers.borrow_mut().remove(index);
        for row in self.rows.borrow_mut().iter_mut() {
            row.remove(index);
        }
        for row in self.tooltips.borrow_mut().iter_mut() {
            row.remove(index);
        }
        self.changes.emit(gui, TableModelEvent::ColumnsDeleted { index, count: 1 });
        Ok(())
    }

    pub fn set_column_header(&self, gui: &mut Gui, column: usize, header: impl Into<String>) -> GuiResult<()> {
        self.check_column(column)?;
        self.headers.borrow_mut()[column] = header.into();
        self.changes.emit(gui, TableModelEvent::ColumnHeaderChanged { column });
        Ok(())
    }

    /// Replace every row.
    pub fn set_rows(&self, gui: &mut Gui, rows: Vec<Vec<CellData>>) {
        let rows: Vec<Vec<CellData>> = rows.into_iter().map(|r| self.normalized(r)).collect();
        let columns = self.num_columns();
        *self.tooltips.borrow_mut() = vec![vec![None; columns]; rows.len()];
        *self.rows.borrow_mut() = rows;
        self.changes.emit(gui, TableModelEvent::AllChanged);
    }
}

impl TableModel for SimpleTableModel {
    fn num_rows(&self) -> usize {
        self.rows.borrow().len()
    }

    fn num_columns(&self) -> usize {
        self.headers.borrow().len()
    }

    fn column_header_text(&self, column: usize) -> String {
        self.headers.borrow().get(column).cloned().unwrap_or_default()
    }

    fn cell(&self, row: usize, column: usize) -> CellData {
        self.rows
            .borrow()
            .get(row)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or_default()
    }

    fn tooltip_content(&self, row: usize, column: usize) -> Option<String> {
        self.tooltips
            .borrow()
            .get(row)
            .and_then(|r| r.get(column))
            .cloned()
            .flatten()
    }

    fn changes(&self) -> &Signal<TableModelEvent> {
        &self.changes
    }
}

impl fmt::Debug for SimpleTableModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleTableModel")
            .field("columns", &self.num_columns())
            .field("rows", &self.num_rows())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;

    fn gui() -> Gui {
        Gui::new(Box::new(HeadlessRenderer::new(100, 100)), GuiConfig::default())
    }

    #[test]
    fn test_rows_are_padded_to_column_count() {
        let mut gui = gui();
        let model = SimpleTableModel::new(["a", "b", "c"]);
        model.add_row(&mut gui, vec!["x".into()]);
        assert_eq!(model.num_rows(), 1);
        assert_eq!(model.cell(0, 0), CellData::from("x"));
        assert_eq!(model.cell(0, 2), CellData::Empty);
        assert_eq!(model.cell(5, 5), CellData::Empty);
    }

    #[test]
    fn test_changes_are_announced() {
        let mut gui = gui();
        let model = SimpleTableModel::new(["a"]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        model.changes().connect(move |_gui, evt| sink.borrow_mut().push(*evt));

        model.add_row(&mut gui, vec![CellData::Int(1)]);
        model.add_row(&mut gui, vec![CellData::Int(2)]);
        model.set_cell(&mut gui, 1, 0, CellData::Bool(true)).unwrap();
        model.delete_rows(&mut gui, 0, 1).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                TableModelEvent::RowsInserted { index: 0, count: 1 },
                TableModelEvent::RowsInserted { index: 1, count: 1 },
                TableModelEvent::CellChanged { row: 1, column: 0 },
                TableModelEvent::RowsDeleted { index: 0, count: 1 },
            ]
        );
        assert_eq!(model.cell(0, 0).to_string(), "true");
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut gui = gui();
        let model = SimpleTableModel::new(["a", "b"]);
        assert!(matches!(
            model.set_cell(&mut gui, 0, 0, CellData::Empty),
            Err(GuiError::RowOutOfRange { row: 0, count: 0 })
        ));
        model.add_row(&mut gui, Vec::new());
        assert!(matches!(
            model.set_cell(&mut gui, 0, 2, CellData::Empty),
            Err(GuiError::ColumnOutOfRange { column: 2, count: 2 })
        ));
        assert!(model.delete_rows(&mut gui, 0, 2).is_err());
    }

    #[test]
    fn test_columns_and_tooltips() {
        let mut gui = gui();
        let model = SimpleTableModel::new(["a"]);
        model.add_row(&mut gui, vec!["x".into()]);
        model.insert_column(&mut gui, 0, "first").unwrap();
        assert_eq!(model.column_header_text(0), "first");
        assert_eq!(model.cell(0, 1), CellData::from("x"));

        model.set_tooltip(0, 1, Some("hint".to_owned())).unwrap();
        assert_eq!(model.tooltip_content(0, 1).as_deref(), Some("hint"));
        assert_eq!(model.tooltip_content(0, 0), None);
    }
}
