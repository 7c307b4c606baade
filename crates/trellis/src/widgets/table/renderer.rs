//! Cell renderers and cell widget creators.
//!
//! A renderer is a flyweight: one instance paints every cell of its kind, so a table
//! with thousands of rows never creates a widget per cell. Cells that need real
//! interaction use a renderer that also is a [`CellWidgetCreator`]; the table then keeps
//! live widgets only for the visible part of the grid.

use trellis_render::{Alignment, Border, Color, Font, Rect};

use super::model::CellData;
use crate::gui::Gui;
use crate::theme::ThemeInfo;
use crate::widget::{Cx, WidgetId};

/// Paints cells of one data kind.
pub trait CellRenderer {
    /// Theme child, looked up below the table's theme.
    fn theme(&self) -> &str;

    fn apply_theme(&mut self, _theme: &dyn ThemeInfo) {}

    /// Load the cell about to be measured or painted.
    fn set_cell_data(&mut self, row: usize, column: usize, data: &CellData);

    /// Number of columns the current cell covers.
    fn column_span(&self) -> usize {
        1
    }

    fn preferred_height(&self, font: &dyn Font) -> i32;

    /// Paint the current cell into `rect` using the table's context.
    fn paint(&mut self, cx: &mut Cx<'_>, rect: Rect);

    fn as_widget_creator(&mut self) -> Option<&mut dyn CellWidgetCreator> {
        None
    }
}

/// A renderer that puts a real widget into its cells.
pub trait CellWidgetCreator {
    /// Create a widget for the current cell data, or update `existing` and return it.
    fn update_widget(&mut self, gui: &mut Gui, existing: Option<WidgetId>) -> WidgetId;

    /// Place the widget inside its cell.
    fn position_widget(&mut self, gui: &mut Gui, widget: WidgetId, rect: Rect) {
        gui.set_position(widget, rect.x, rect.y);
        gui.set_size(widget, rect.width, rect.height);
    }
}

/// Draws the cell's text form on one line.
#[derive(Debug, Clone)]
pub struct StringCellRenderer {
    text: String,
    color: Color,
    alignment: Alignment,
    padding: Border,
}

impl Default for StringCellRenderer {
    fn default() -> Self {
        Self {
            text: String::new(),
            color: Color::WHITE,
            alignment: Alignment::Left,
            padding: Border::symmetric(2, 0),
        }
    }
}

impl StringCellRenderer {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl CellRenderer for StringCellRenderer {
    fn theme(&self) -> &str {
        "stringcellrenderer"
    }

    fn apply_theme(&mut self, theme: &dyn ThemeInfo) {
        self.color = theme.get_color("textColor", Color::WHITE);
        self.alignment = theme.get_alignment("textAlignment", Alignment::Left);
        self.padding = theme.get_border("border").unwrap_or(Border::symmetric(2, 0));
    }

    fn set_cell_data(&mut self, _row: usize, _column: usize, data: &CellData) {
        self.text = data.to_string();
    }

    fn preferred_height(&self, font: &dyn Font) -> i32 {
        font.line_height() + self.padding.vertical()
    }

    fn paint(&mut self, cx: &mut Cx<'_>, rect: Rect) {
        if self.text.is_empty() {
            return;
        }
        let area = rect.inset(self.padding);
        let font = cx.font();
        let width = font.compute_text_width(&self.text);
        let x = area.x + self.alignment.compute_position_x(area.width, width);
        let y = area.y + self.alignment.compute_position_y(area.height, font.line_height());
        cx.renderer_mut().clip_enter(rect);
        cx.draw_text(self.color, x, y, &self.text);
        cx.renderer_mut().clip_leave();
    }
}
