//! The element tree a [`TextArea`](super::TextArea) lays out.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::style::{Style, StyleSheetKey, attributes};
use crate::gui::Gui;
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HAlignment {
    #[default]
    Left,
    Right,
    Center,
    /// Spread the runs of a full line over the line width.
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VAlignment {
    Top,
    Middle,
    #[default]
    Bottom,
    /// Stretch to the line height.
    Fill,
}

/// Which floats an element moves below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Clear {
    #[default]
    None,
    Left,
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Display {
    #[default]
    Inline,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FloatPosition {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

/// One node of the element tree.
///
/// Elements are immutable once built and shared through `Rc`; the identity of an
/// element (`Rc::ptr_eq`) is what [`TextArea::element_rect`](super::TextArea::element_rect)
/// and the mouse callbacks report.
pub struct Element {
    style: Rc<Style>,
    kind: ElementKind,
}

pub enum ElementKind {
    LineBreak,
    Text(String),
    Image {
        name: String,
        tooltip: Option<String>,
    },
    /// A widget registered with the text area or produced by a widget resolver.
    Widget {
        name: String,
        param: Option<String>,
    },
    Container(Vec<Rc<Element>>),
    Paragraph(Vec<Rc<Element>>),
    Link {
        href: String,
        children: Vec<Rc<Element>>,
    },
    /// One unordered list item: the list bullet floats left of the children.
    List(Vec<Rc<Element>>),
    /// Numbered items: every child is one item.
    OrderedList {
        start: i32,
        children: Vec<Rc<Element>>,
    },
    /// A box with its own padding, background and optional float.
    Block(Vec<Rc<Element>>),
    TableCell {
        colspan: usize,
        children: Vec<Rc<Element>>,
    },
    Table(TableElement),
}

impl Element {
    fn new(style: Rc<Style>, kind: ElementKind) -> Rc<Self> {
        Rc::new(Self { style, kind })
    }

    pub fn line_break(style: Rc<Style>) -> Rc<Self> {
        Self::new(style, ElementKind::LineBreak)
    }

    pub fn text(style: Rc<Style>, text: impl Into<String>) -> Rc<Self> {
        Self::new(style, ElementKind::Text(text.into()))
    }

    pub fn image(style: Rc<Style>, name: impl Into<String>, tooltip: Option<String>) -> Rc<Self> {
        Self::new(
            style,
            ElementKind::Image {
                name: name.into(),
                tooltip,
            },
        )
    }

    pub fn widget(style: Rc<Style>, name: impl Into<String>, param: Option<String>) -> Rc<Self> {
        Self::new(
            style,
            ElementKind::Widget {
                name: name.into(),
                param,
            },
        )
    }

    pub fn container(style: Rc<Style>, children: Vec<Rc<Element>>) -> Rc<Self> {
        Self::new(style, ElementKind::Container(children))
    }

    pub fn paragraph(style: Rc<Style>, children: Vec<Rc<Element>>) -> Rc<Self> {
        Self::new(style, ElementKind::Paragraph(children))
    }

    pub fn link(style: Rc<Style>, href: impl Into<String>, children: Vec<Rc<Element>>) -> Rc<Self> {
        Self::new(
            style,
            ElementKind::Link {
                href: href.into(),
                children,
            },
        )
    }

    pub fn list(style: Rc<Style>, children: Vec<Rc<Element>>) -> Rc<Self> {
        Self::new(style, ElementKind::List(children))
    }

    pub fn ordered_list(style: Rc<Style>, start: i32, items: Vec<Rc<Element>>) -> Rc<Self> {
        Self::new(
            style,
            ElementKind::OrderedList {
                start,
                children: items,
            },
        )
    }

    pub fn block(style: Rc<Style>, children: Vec<Rc<Element>>) -> Rc<Self> {
        Self::new(style, ElementKind::Block(children))
    }

    /// # Panics
    ///
    /// If `colspan` is zero.
    pub fn table_cell(style: Rc<Style>, colspan: usize, children: Vec<Rc<Element>>) -> Rc<Self> {
        assert!(colspan > 0, "colspan must be at least 1");
        Self::new(style, ElementKind::TableCell { colspan, children })
    }

    pub fn table(style: Rc<Style>, table: TableElement) -> Rc<Self> {
        Self::new(style, ElementKind::Table(table))
    }

    pub fn style(&self) -> &Rc<Style> {
        &self.style
    }

    pub fn kind(&self) -> &ElementKind {
        &self.kind
    }

    /// Child elements of container kinds; empty for everything else.
    pub fn children(&self) -> &[Rc<Element>] {
        match &self.kind {
            ElementKind::Container(children)
            | ElementKind::Paragraph(children)
            | ElementKind::List(children)
            | ElementKind::Block(children)
            | ElementKind::Link { children, .. }
            | ElementKind::OrderedList { children, .. }
            | ElementKind::TableCell { children, .. } => children,
            ElementKind::LineBreak
            | ElementKind::Text(_)
            | ElementKind::Image { .. }
            | ElementKind::Widget { .. }
            | ElementKind::Table(_) => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ElementKind::LineBreak => "line-break",
            ElementKind::Text(_) => "text",
            ElementKind::Image { .. } => "image",
            ElementKind::Widget { .. } => "widget",
            ElementKind::Container(_) => "container",
            ElementKind::Paragraph(_) => "paragraph",
            ElementKind::Link { .. } => "link",
            ElementKind::List(_) => "list",
            ElementKind::OrderedList { .. } => "ordered-list",
            ElementKind::Block(_) => "block",
            ElementKind::TableCell { .. } => "table-cell",
            ElementKind::Table(_) => "table",
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Element");
        d.field("kind", &self.kind_name());
        if let ElementKind::Text(text) = &self.kind {
            d.field("text", text);
        }
        d.field("children", &self.children().len()).finish()
    }
}

/// A grid of [`Element::table_cell`]s.
///
/// Cells are placed with [`set_cell`](Self::set_cell) before the table is wrapped with
/// [`Element::table`]. A cell spanning several columns occupies its first column; the
/// slots it covers stay empty.
#[derive(Debug)]
pub struct TableElement {
    num_columns: usize,
    num_rows: usize,
    cell_spacing: i32,
    cell_padding: i32,
    cells: Vec<Option<Rc<Element>>>,
    row_styles: Vec<Option<Rc<Style>>>,
}

impl TableElement {
    pub fn new(num_columns: usize, num_rows: usize, cell_spacing: i32, cell_padding: i32) -> Self {
        Self {
            num_columns,
            num_rows,
            cell_spacing,
            cell_padding,
            cells: vec![None; num_columns * num_rows],
            row_styles: vec![None; num_rows],
        }
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn cell_spacing(&self) -> i32 {
        self.cell_spacing
    }

    pub fn cell_padding(&self) -> i32 {
        self.cell_padding
    }

    fn index(&self, row: usize, column: usize) -> usize {
        assert!(column < self.num_columns, "column {column} out of range");
        assert!(row < self.num_rows, "row {row} out of range");
        row * self.num_columns + column
    }

    /// # Panics
    ///
    /// If `row` or `column` is out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&Rc<Element>> {
        self.cells[self.index(row, column)].as_ref()
    }

    /// # Panics
    ///
    /// If `row` or `column` is out of range, or `cell` is not a table cell.
    pub fn set_cell(&mut self, row: usize, column: usize, cell: Option<Rc<Element>>) {
        if let Some(cell) = &cell {
            assert!(
                matches!(cell.kind(), ElementKind::TableCell { .. }),
                "table cells must be TableCell elements, got {}",
                cell.kind_name()
            );
        }
        let idx = self.index(row, column);
        self.cells[idx] = cell;
    }

    pub fn row_style(&self, row: usize) -> Option<&Rc<Style>> {
        self.row_styles.get(row).and_then(Option::as_ref)
    }

    pub fn set_row_style(&mut self, row: usize, style: Option<Rc<Style>>) {
        assert!(row < self.num_rows, "row {row} out of range");
        self.row_styles[row] = style;
    }
}

/// The content of a text area.
pub trait TextAreaModel {
    /// The top level elements, in document order.
    fn elements(&self) -> Vec<Rc<Element>>;

    /// Emitted after the content changed.
    fn changes(&self) -> &Signal<()>;
}

/// A [`TextAreaModel`] holding a plain list of elements.
///
/// ```
/// use trellis::widgets::text_area::{SimpleTextAreaModel, TextAreaModel};
/// use trellis::{Gui, GuiConfig};
/// use trellis_render::HeadlessRenderer;
///
/// let mut gui = Gui::new(Box::new(HeadlessRenderer::new(64, 64)), GuiConfig::default());
/// let model = SimpleTextAreaModel::new().shared();
/// model.set_text(&mut gui, "one\ntwo", false);
/// assert_eq!(model.elements().len(), 2);
/// ```
#[derive(Default)]
pub struct SimpleTextAreaModel {
    style: Rc<Style>,
    elements: RefCell<Vec<Rc<Element>>>,
    changes: Signal<()>,
}

impl SimpleTextAreaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose generated elements use `style` as their root style.
    pub fn with_style(style: Rc<Style>) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    pub fn set_elements(&self, gui: &mut Gui, elements: Vec<Rc<Element>>) {
        *self.elements.borrow_mut() = elements;
        self.changes.emit(gui, ());
    }

    pub fn push(&self, gui: &mut Gui, element: Rc<Element>) {
        self.elements.borrow_mut().push(element);
        self.changes.emit(gui, ());
    }

    pub fn clear(&self, gui: &mut Gui) {
        self.elements.borrow_mut().clear();
        self.changes.emit(gui, ());
    }

    /// Replace the content with plain text.
    ///
    /// Preformatted text becomes one text element keeping line breaks and tabs;
    /// otherwise every line becomes a paragraph.
    pub fn set_text(&self, gui: &mut Gui, text: &str, preformatted: bool) {
        let elements = if preformatted {
            let style = Rc::new(
                Style::child_of(&self.style, Some(StyleSheetKey::element("pre")))
                    .with(&attributes::PREFORMATTED, true),
            );
            vec![Element::text(style, text)]
        } else {
            let p_style = Rc::new(Style::child_of(&self.style, Some(StyleSheetKey::element("p"))));
            text.split('\n')
                .map(|line| {
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    let text = Element::text(Rc::new(Style::child_of(&p_style, None)), line);
                    Element::paragraph(Rc::clone(&p_style), vec![text])
                })
                .collect()
        };
        self.set_elements(gui, elements);
    }
}

impl TextAreaModel for SimpleTextAreaModel {
    fn elements(&self) -> Vec<Rc<Element>> {
        self.elements.borrow().clone()
    }

    fn changes(&self) -> &Signal<()> {
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_cells() {
        let style = Rc::new(Style::new());
        let mut table = TableElement::new(2, 1, 0, 0);
        let cell = Element::table_cell(Rc::clone(&style), 2, vec![Element::text(Rc::clone(&style), "x")]);
        table.set_cell(0, 0, Some(Rc::clone(&cell)));
        assert!(Rc::ptr_eq(table.cell(0, 0).unwrap(), &cell));
        assert!(table.cell(0, 1).is_none());
        assert!(table.row_style(0).is_none());
    }

    #[test]
    #[should_panic(expected = "TableCell")]
    fn test_table_rejects_plain_elements() {
        let style = Rc::new(Style::new());
        let mut table = TableElement::new(1, 1, 0, 0);
        table.set_cell(0, 0, Some(Element::text(style, "x")));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_table_cell_out_of_range() {
        let table = TableElement::new(1, 1, 0, 0);
        table.cell(1, 0);
    }

    #[test]
    fn test_children_of_leaf_is_empty() {
        let style = Rc::new(Style::new());
        assert!(Element::text(Rc::clone(&style), "a").children().is_empty());
        let p = Element::paragraph(Rc::clone(&style), vec![Element::line_break(style)]);
        assert_eq!(p.children().len(), 1);
    }
}
