use std::cell::RefCell;
use std::rc::Rc;

use trellis_render::HeadlessRenderer;

use super::*;
use crate::event::Key;
use crate::gui::GuiConfig;

fn table_with(rows: usize) -> (Gui, WidgetId, Rc<SimpleTableModel>) {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 300)), GuiConfig::default());
    let model = SimpleTableModel::new(["A", "B", "C"]).shared();
    for row in 0..rows {
        let row = row as i64;
        model.add_row(&mut gui, vec![row.into(), "x".into(), (row % 2 == 0).into()]);
    }
    let table = gui.create(TableBase::new(Some(model.clone())));
    let root = gui.root_pane();
    gui.add(root, table);
    gui.set_position(table, 0, 0);
    gui.set_size(table, 300, 200);
    gui.update();
    (gui, table, model)
}

fn table(gui: &Gui, id: WidgetId) -> &TableBase {
    gui.widget::<TableBase>(id).unwrap()
}

fn widths(gui: &Gui, id: WidgetId) -> Vec<i32> {
    let t = table(gui, id);
    (0..t.num_columns()).map(|c| t.column_width(c)).collect()
}

fn click(gui: &mut Gui, x: i32, y: i32) {
    gui.handle_mouse(x, y, Some(MouseButton::Left), true);
    gui.handle_mouse(x, y, Some(MouseButton::Left), false);
}

#[test]
fn test_columns_fill_width_without_scroll_pane() {
    let (gui, id, _) = table_with(3);
    assert_eq!(widths(&gui, id), vec![100, 100, 100]);
    assert_eq!(table(&gui, id).num_rows(), 3);
}

#[test]
fn test_fixed_width_divider_drag_moves_width_to_neighbour() {
    let (mut gui, id, _) = table_with(3);

    gui.handle_mouse(100, 5, Some(MouseButton::Left), true);
    gui.handle_mouse(110, 5, None, false);
    gui.handle_mouse(120, 5, None, false);
    gui.handle_mouse(120, 5, Some(MouseButton::Left), false);
    gui.update();

    let w = widths(&gui, id);
    assert_eq!(w, vec![120, 80, 100]);
    assert_eq!(w[0] + w[1], 200);
}

#[test]
fn test_escape_restores_dragged_column() {
    let (mut gui, id, _) = table_with(3);

    gui.handle_mouse(100, 5, Some(MouseButton::Left), true);
    gui.handle_mouse(110, 5, None, false);
    gui.handle_mouse(140, 5, None, false);
    gui.update();
    assert_eq!(widths(&gui, id)[0], 140);

    gui.handle_key(Key::Escape, None, true);
    gui.handle_mouse(150, 5, None, false);
    gui.handle_mouse(150, 5, Some(MouseButton::Left), false);
    gui.update();
    assert_eq!(widths(&gui, id), vec![100, 100, 100]);
}

#[test]
fn test_click_selects_row_and_keys_move_selection() {
    let (mut gui, id, _) = table_with(5);
    let changes = Rc::new(RefCell::new(0));
    let counter = changes.clone();
    table(&gui, id)
        .selection_changed
        .connect(move |_, _| *counter.borrow_mut() += 1);

    // Header is 10 high, rows are 32: y = 50 is row 1.
    click(&mut gui, 50, 50);
    assert!(table(&gui, id).is_row_selected(1));
    assert!(!table(&gui, id).is_row_selected(0));
    assert_eq!(*changes.borrow(), 1);

    gui.handle_key(Key::ArrowDown, None, true);
    gui.handle_key(Key::ArrowDown, None, false);
    assert!(table(&gui, id).is_row_selected(2));
    assert!(!table(&gui, id).is_row_selected(1));
    assert_eq!(table(&gui, id).selection_manager().lead_row(), Some(2));
}

#[test]
fn test_double_click_reports_cell() {
    let (mut gui, id, _) = table_with(5);
    let cells = Rc::new(RefCell::new(Vec::new()));
    let sink = cells.clone();
    table(&gui, id)
        .double_click
        .connect(move |_, &cell| sink.borrow_mut().push(cell));

    click(&mut gui, 150, 20);
    click(&mut gui, 150, 20);
    assert_eq!(*cells.borrow(), vec![(0, 1)]);
}

#[test]
fn test_column_header_click() {
    let (mut gui, id, _) = table_with(2);
    let clicked = Rc::new(RefCell::new(Vec::new()));
    let sink = clicked.clone();
    table(&gui, id)
        .column_header_click
        .connect(move |_, &column| sink.borrow_mut().push(column));

    click(&mut gui, 250, 5);
    assert_eq!(*clicked.borrow(), vec![2]);
}

#[test]
fn test_drop_marker_follows_inserted_rows() {
    let (mut gui, id, model) = table_with(4);
    gui.widget_mut::<TableBase>(id).unwrap().set_drop_marker(2, true);

    model
        .insert_rows(&mut gui, 1, vec![vec!["new".into()], vec!["new".into()]])
        .unwrap();
    assert_eq!(table(&gui, id).drop_marker(), Some((4, true)));

    model.insert_rows(&mut gui, 6, vec![vec!["tail".into()]]).unwrap();
    assert_eq!(table(&gui, id).drop_marker(), Some((4, true)));

    model.delete_rows(&mut gui, 3, 2).unwrap();
    assert_eq!(table(&gui, id).drop_marker(), None);
}

#[test]
#[should_panic(expected = "drop marker row")]
fn test_drop_marker_on_row_past_end_panics() {
    let (mut gui, id, _) = table_with(2);
    gui.widget_mut::<TableBase>(id).unwrap().set_drop_marker(2, false);
}

#[test]
fn test_rows_deleted_shift_selection() {
    let (mut gui, id, model) = table_with(5);
    click(&mut gui, 50, 10 + 3 * 32 + 5);
    assert!(table(&gui, id).is_row_selected(3));

    model.delete_rows(&mut gui, 0, 2).unwrap();
    let t = table(&gui, id);
    assert_eq!(t.num_rows(), 3);
    assert!(t.is_row_selected(1));
}

#[test]
fn test_preferred_height_covers_rows_and_header() {
    let (mut gui, id, _) = table_with(4);
    // header + one pixel for a trailing drop marker + 4 rows
    assert_eq!(gui.preferred_inner_height(id), 10 + 1 + 4 * 32);
}

#[test]
fn test_model_column_insert_adds_header() {
    let (mut gui, id, model) = table_with(1);
    model.insert_column(&mut gui, 1, "Inserted").unwrap();
    gui.update();

    let t = table(&gui, id);
    assert_eq!(t.num_columns(), 4);
    let header = t.column_header(1).unwrap();
    assert_eq!(gui.widget::<ColumnHeader>(header).unwrap().text(), "Inserted");
    assert_eq!(widths(&gui, id).iter().sum::<i32>(), 300);
}

#[test]
fn test_distribute_widths_keeps_total() {
    assert_eq!(distribute_widths(&[100, 100, 100], &[7, 7, 7], 300), vec![100, 100, 100]);
    assert_eq!(distribute_widths(&[256, 256, 256], &[7, 7, 7], 300), vec![100, 100, 100]);
    assert_eq!(distribute_widths(&[120, 80, 100], &[7, 7, 7], 600), vec![240, 160, 200]);
    let w = distribute_widths(&[10, 10, 10], &[7, 7, 7], 100);
    assert_eq!(w.iter().sum::<i32>(), 100);
    assert!(distribute_widths(&[], &[], 100).is_empty());
}

#[test]
fn test_fixed_width_divider_drag_is_clamped_to_neighbour_minimum() {
    let (mut gui, id, _) = table_with(3);

    gui.handle_mouse(100, 5, Some(MouseButton::Left), true);
    gui.handle_mouse(110, 5, None, false);
    gui.handle_mouse(290, 5, None, false);
    gui.update();
    let w = widths(&gui, id);
    assert_eq!(w[0] + w[1], 200);
    assert_eq!(w[2], 100);
    assert!(w[1] > 2 * DEFAULT_DIVIDER_DISTANCE);

    gui.handle_mouse(2, 5, None, false);
    gui.handle_mouse(2, 5, Some(MouseButton::Left), false);
    gui.update();
    let w = widths(&gui, id);
    assert_eq!(w[0] + w[1], 200);
    assert_eq!(w[2], 100);
    assert!(w[0] > 2 * DEFAULT_DIVIDER_DISTANCE);
}

struct LoggingDragListener {
    log: Rc<RefCell<Vec<String>>>,
}

impl DragListener for LoggingDragListener {
    fn drag_started(
        &mut self,
        _cx: &mut Cx<'_>,
        row: Option<usize>,
        column: Option<usize>,
        _evt: &Event,
    ) -> bool {
        self.log.borrow_mut().push(format!("started {row:?} {column:?}"));
        true
    }

    fn dragged(&mut self, _cx: &mut Cx<'_>, _evt: &Event) -> Option<CursorIcon> {
        self.log.borrow_mut().push("dragged".to_owned());
        None
    }

    fn drag_stopped(&mut self, _cx: &mut Cx<'_>, _evt: &Event) {
        self.log.borrow_mut().push("stopped".to_owned());
    }
}

#[test]
fn test_body_drag_reaches_drag_listener_with_cell() {
    let (mut gui, id, _) = table_with(5);
    let log = Rc::new(RefCell::new(Vec::new()));
    gui.widget_mut::<TableBase>(id)
        .unwrap()
        .set_drag_listener(Some(Box::new(LoggingDragListener { log: log.clone() })));

    // Row 1 spans y = 42..74, column 0 spans x = 0..100.
    gui.handle_mouse(50, 50, Some(MouseButton::Left), true);
    gui.handle_mouse(60, 50, None, false);
    assert_eq!(*log.borrow(), vec!["started Some(1) Some(0)", "dragged"]);

    gui.handle_mouse(60, 50, Some(MouseButton::Left), false);
    assert_eq!(
        *log.borrow(),
        vec!["started Some(1) Some(0)", "dragged", "dragged", "stopped"]
    );
}
