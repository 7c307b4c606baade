//! Integration tests driving whole widget trees through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::NaiveDate;
use trellis::widgets::table::{SimpleTableModel, TableBase};
use trellis::widgets::{DatePicker, EditField, EditFieldCallbackKind, PopupWindow};
use trellis::{
    Container, Cx, Event, EventType, Gui, GuiConfig, Key, MouseButton, QueuedInput, Widget,
};
use trellis_render::{HeadlessRenderer, ManualClock};

/// Counts clicks and accepts every mouse event.
#[derive(Default)]
struct ClickCounter {
    counts: Rc<RefCell<Vec<u32>>>,
}

impl Widget for ClickCounter {
    fn handle_event(&mut self, _cx: &mut Cx<'_>, evt: &Event) -> bool {
        if evt.event_type() == EventType::MouseClicked {
            self.counts.borrow_mut().push(evt.click_count());
        }
        evt.is_mouse_event()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_config_from_toml_controls_double_click_time() {
    let config = GuiConfig::from_toml_str("double_click_ms = 100").unwrap();
    let clock = ManualClock::new();
    let mut gui = Gui::new(Box::new(HeadlessRenderer::with_clock(100, 100, clock.clone())), config);
    let counts = Rc::new(RefCell::new(Vec::new()));
    let id = gui.create(ClickCounter {
        counts: Rc::clone(&counts),
    });
    let root = gui.root_pane();
    gui.add(root, id);
    gui.set_size(id, 50, 50);
    gui.update();

    let input = QueuedInput::new();
    gui.set_input(Some(Box::new(input.clone())));
    input.click(10, 10, MouseButton::Left);
    gui.update();
    clock.advance(50);
    input.click(10, 10, MouseButton::Left);
    gui.update();
    clock.advance(150);
    input.click(10, 10, MouseButton::Left);
    gui.update();

    assert_eq!(*counts.borrow(), vec![1, 2, 1]);
}

#[test]
fn test_edit_field_driven_by_queued_input() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 100)), GuiConfig::default());
    let other = gui.create(Container);
    let field = gui.create(EditField::new());
    let root = gui.root_pane();
    gui.add(root, other);
    gui.add(root, field);
    gui.set_position(field, 10, 10);
    gui.set_size(field, 80, 16);
    gui.request_keyboard_focus(other);
    gui.update();

    let returned = Rc::new(Cell::new(0));
    let sink = Rc::clone(&returned);
    gui.widget::<EditField>(field)
        .unwrap()
        .callback
        .connect(move |_gui, cb| {
            if cb.kind == EditFieldCallbackKind::Return {
                sink.set(sink.get() + 1);
            }
        });

    let input = QueuedInput::new();
    input.click(20, 15, MouseButton::Left);
    input.type_key(Key::None, Some('h'));
    input.type_key(Key::None, Some('i'));
    input.type_key(Key::Enter, None);
    gui.set_input(Some(Box::new(input)));
    gui.update();

    assert_eq!(gui.focus_owner(), field);
    assert_eq!(gui.widget::<EditField>(field).unwrap().text(), "hi");
    assert_eq!(returned.get(), 1);
}

#[test]
fn test_fixed_width_table_follows_resize() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(800, 400)), GuiConfig::default());
    let model = SimpleTableModel::new(["Name", "Size", "Kind"]).shared();
    model.add_row(&mut gui, vec!["a".into(), 1i64.into(), "file".into()]);
    let table = gui.create(TableBase::new(Some(model)));
    let root = gui.root_pane();
    gui.add(root, table);
    gui.set_size(table, 300, 200);
    gui.update();

    let widths = |gui: &Gui| -> Vec<i32> {
        let t = gui.widget::<TableBase>(table).unwrap();
        (0..t.num_columns()).map(|c| t.column_width(c)).collect()
    };
    assert_eq!(widths(&gui), vec![100, 100, 100]);

    gui.set_size(table, 600, 200);
    gui.update();
    assert_eq!(widths(&gui), vec![200, 200, 200]);
}

#[test]
fn test_date_picker_inside_popup() {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(300, 300)), GuiConfig::default());
    let owner = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, owner);
    gui.update();

    let popup = gui.create(PopupWindow::new(owner));
    let picker = gui.create(DatePicker::with_date(date(2024, 5, 15)));
    gui.add(popup, picker);
    PopupWindow::open_popup_centered_with_size(&mut gui, popup, 200, 200);
    gui.layout_child_full_inner_area(popup, picker);
    gui.update();
    assert_eq!(gui.top_pane(), popup);

    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    gui.widget::<DatePicker>(picker)
        .unwrap()
        .calendar_changed
        .connect(move |_gui, d| sink.borrow_mut().push(*d));

    let parsed = gui
        .with_widget::<DatePicker, _>(picker, |p, cx| p.parse_date(cx, "June 2024"))
        .unwrap()
        .unwrap();
    assert_eq!(parsed, date(2024, 6, 15));
    assert_eq!(*changes.borrow(), vec![date(2024, 6, 15)]);
    assert_eq!(gui.widget::<DatePicker>(picker).unwrap().month_text(), "June 2024");

    PopupWindow::close_popup(&mut gui, popup);
    assert_eq!(gui.top_pane(), root);
    assert_eq!(gui.focus_owner(), owner);
}
