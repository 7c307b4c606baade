use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use trellis_render::{HeadlessRenderer, ManualClock};

use super::*;
use crate::event::{Event, EventType, Key, MouseButton};
use crate::widget::{Container, Cx, Widget};
use crate::widgets::PopupWindow;

/// Logs every event it sees and consumes mouse events.
#[derive(Default)]
struct Recorder {
    log: Rc<RefCell<Vec<Event>>>,
    consume_keys: bool,
}

impl Widget for Recorder {
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        self.log.borrow_mut().push(*evt);
        if evt.is_mouse_event() {
            return true;
        }
        if evt.is_key_event() && self.consume_keys {
            return true;
        }
        cx.default_handle_event(evt)
    }
}

/// Invalidates itself from every layout pass.
struct Restless {
    runs: Rc<Cell<u32>>,
    settle_after: Option<u32>,
}

impl Widget for Restless {
    fn layout(&mut self, cx: &mut Cx<'_>) {
        self.runs.set(self.runs.get() + 1);
        if self.settle_after.is_none_or(|limit| self.runs.get() < limit) {
            let id = cx.id();
            cx.invalidate_layout_locally(id);
        }
    }
}

/// Defers a job from inside its layout hook.
struct Deferring {
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Widget for Deferring {
    fn layout(&mut self, cx: &mut Cx<'_>) {
        self.log.borrow_mut().push("layout start");
        let log = Rc::clone(&self.log);
        cx.defer(move |gui| {
            log.borrow_mut().push(if gui.in_hook() {
                "deferred inside hook"
            } else {
                "deferred"
            });
        });
        self.log.borrow_mut().push("layout end");
    }
}

/// Log to the test output; filter with `RUST_LOG`, e.g. `RUST_LOG=trellis::focus=trace`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn gui_with_clock(clock: &ManualClock) -> Gui {
    init_tracing();
    let mut gui = Gui::new(
        Box::new(HeadlessRenderer::with_clock(200, 100, clock.clone())),
        GuiConfig::default(),
    );
    gui.update();
    gui
}

fn add_recorder(gui: &mut Gui, x: i32, y: i32) -> (WidgetId, Rc<RefCell<Vec<Event>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let id = gui.create(Recorder {
        log: Rc::clone(&log),
        consume_keys: true,
    });
    let root = gui.root_pane();
    gui.add(root, id);
    gui.set_position(id, x, y);
    gui.set_size(id, 40, 40);
    (id, log)
}

fn click(gui: &mut Gui, x: i32, y: i32) {
    gui.handle_mouse(x, y, Some(MouseButton::Left), true);
    gui.handle_mouse(x, y, Some(MouseButton::Left), false);
}

fn click_counts(log: &RefCell<Vec<Event>>) -> Vec<u32> {
    log.borrow()
        .iter()
        .filter(|e| e.event_type() == EventType::MouseClicked)
        .map(Event::click_count)
        .collect()
}

fn types(log: &RefCell<Vec<Event>>) -> Vec<EventType> {
    log.borrow().iter().map(Event::event_type).collect()
}

#[test]
fn test_new_gui_layout() {
    let gui = Gui::new(Box::new(HeadlessRenderer::new(320, 240)), GuiConfig::default());
    let root = gui.root();
    assert_eq!(gui.num_children(root), 3);
    assert_eq!(gui.child(root, 0), gui.root_pane());
    assert_eq!(gui.child(root, 2), gui.tooltip_window());
    assert_eq!(gui.top_pane(), gui.root_pane());
    assert_eq!((gui.base_of(root).width(), gui.base_of(root).height()), (320, 240));
    assert!(gui.is_attached(gui.root_pane()));
}

#[test]
fn test_update_follows_viewport() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    gui.renderer_as_mut::<HeadlessRenderer>()
        .unwrap()
        .set_viewport(150, 80);
    gui.update();
    let root = gui.root();
    assert_eq!((gui.base_of(root).width(), gui.base_of(root).height()), (150, 80));
}

#[test]
fn test_click_reaches_widget_and_moves_focus() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (id, log) = add_recorder(&mut gui, 10, 10);

    click(&mut gui, 20, 20);

    let seen = types(&log);
    assert_eq!(seen[0], EventType::MouseEntered);
    assert!(seen.contains(&EventType::MouseBtnDown));
    assert!(seen.contains(&EventType::MouseBtnUp));
    assert_eq!(click_counts(&log), vec![1]);
    assert!(gui.has_keyboard_focus(id));
    assert_eq!(gui.focus_owner(), id);
    assert_eq!(gui.widget_under_mouse(), id);
}

#[test]
fn test_multi_click_counts_and_reset() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (_id, log) = add_recorder(&mut gui, 10, 10);

    click(&mut gui, 20, 20);
    click(&mut gui, 20, 20);
    click(&mut gui, 21, 20);
    assert_eq!(click_counts(&log), vec![1, 2, 3]);

    clock.advance(600);
    gui.update();
    click(&mut gui, 20, 20);
    assert_eq!(click_counts(&log), vec![1, 2, 3, 1]);
}

#[test]
fn test_click_on_other_widget_restarts_count() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (_a, log_a) = add_recorder(&mut gui, 10, 10);
    let (_b, log_b) = add_recorder(&mut gui, 60, 10);

    click(&mut gui, 20, 20);
    click(&mut gui, 70, 20);
    assert_eq!(click_counts(&log_a), vec![1]);
    assert_eq!(click_counts(&log_b), vec![1]);
}

#[test]
fn test_drag_goes_to_pressed_widget_without_click() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (_a, log_a) = add_recorder(&mut gui, 10, 10);
    let (_b, log_b) = add_recorder(&mut gui, 60, 10);

    gui.handle_mouse(20, 20, Some(MouseButton::Left), true);
    gui.handle_mouse(22, 20, None, false);
    assert!(!gui.is_drag_active());
    gui.handle_mouse(70, 20, None, false);
    assert!(gui.is_drag_active());
    gui.handle_mouse(70, 20, Some(MouseButton::Left), false);
    assert!(!gui.is_drag_active());

    let seen = types(&log_a);
    assert!(seen.contains(&EventType::MouseDragged));
    assert!(seen.contains(&EventType::MouseBtnUp));
    assert!(click_counts(&log_a).is_empty());
    assert!(!types(&log_b).contains(&EventType::MouseDragged));
}

#[test]
fn test_keys_go_to_focus_owner() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (a, log_a) = add_recorder(&mut gui, 10, 10);
    let (_b, log_b) = add_recorder(&mut gui, 60, 10);

    assert!(gui.request_keyboard_focus(a));
    assert!(gui.handle_key(Key::A, Some('a'), true));
    assert!(gui.handle_key(Key::A, Some('a'), false));

    let keys: Vec<_> = log_a
        .borrow()
        .iter()
        .filter(|e| e.is_key_event())
        .map(|e| (e.event_type(), e.key_char()))
        .collect();
    assert_eq!(
        keys,
        vec![
            (EventType::KeyPressed, Some('a')),
            (EventType::KeyReleased, Some('a'))
        ]
    );
    assert!(log_b.borrow().iter().all(|e| !e.is_key_event()));
}

#[test]
fn test_key_repeat() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (a, log) = add_recorder(&mut gui, 10, 10);
    gui.request_keyboard_focus(a);

    gui.handle_key(Key::ArrowDown, None, true);
    clock.advance(100);
    gui.update();
    clock.advance(200);
    gui.update();
    clock.advance(40);
    gui.update();
    gui.handle_key(Key::ArrowDown, None, false);
    clock.advance(400);
    gui.update();

    let presses: Vec<bool> = log
        .borrow()
        .iter()
        .filter(|e| e.event_type() == EventType::KeyPressed)
        .map(Event::is_key_repeated)
        .collect();
    assert_eq!(presses, vec![false, true, true]);
}

#[test]
fn test_focus_key_cycles_children() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let panel = gui.create(Container);
    let a = gui.create(Container);
    let b = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, a);
    gui.add(panel, b);

    assert!(gui.request_keyboard_focus(a));
    assert!(gui.handle_key(Key::Tab, None, true));
    assert_eq!(gui.focus_owner(), b);
    gui.handle_key(Key::Tab, None, false);

    gui.handle_key(Key::Tab, None, true);
    assert_eq!(gui.focus_owner(), a);
    gui.handle_key(Key::Tab, None, false);

    gui.handle_key(Key::ShiftLeft, None, true);
    gui.handle_key(Key::Tab, None, true);
    assert_eq!(gui.focus_owner(), b);
}

#[test]
fn test_timer_fires_once() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let fired = Rc::new(Cell::new(0));
    let timer = gui.create_timer();
    gui.set_timer_delay(timer, 100).unwrap();
    let counter = Rc::clone(&fired);
    gui.set_timer_callback(timer, move |_| counter.set(counter.get() + 1));
    gui.start_timer(timer);

    clock.advance(50);
    gui.update();
    assert_eq!(fired.get(), 0);
    clock.advance(60);
    gui.update();
    assert_eq!(fired.get(), 1);
    assert!(!gui.is_timer_running(timer));
    clock.advance(200);
    gui.update();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_continuous_timer_stops_itself() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let fired = Rc::new(Cell::new(0));
    let timer = gui.create_timer();
    gui.set_timer_delay(timer, 10).unwrap();
    gui.set_timer_continuous(timer, true);
    let counter = Rc::clone(&fired);
    gui.set_timer_callback(timer, move |gui| {
        counter.set(counter.get() + 1);
        if counter.get() == 3 {
            gui.stop_timer(timer);
        }
    });
    gui.start_timer(timer);

    for _ in 0..5 {
        clock.advance(10);
        gui.update();
    }
    assert_eq!(fired.get(), 3);
    assert!(!gui.is_timer_running(timer));
}

#[test]
fn test_timer_rejects_zero_delay() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let timer = gui.create_timer();
    assert!(gui.set_timer_delay(timer, 0).is_err());
    gui.remove_timer(timer).unwrap();
    assert!(gui.set_timer_delay(timer, 5).is_err());
}

#[test]
fn test_invoke_later_runs_on_next_update() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    gui.invoke_later(|gui| {
        let child = gui.create(Container);
        let root = gui.root_pane();
        gui.add(root, child);
    });
    let root = gui.root_pane();
    assert_eq!(gui.num_children(root), 0);
    gui.update();
    assert_eq!(gui.num_children(root), 1);
    gui.update();
    assert_eq!(gui.num_children(root), 1);
}

#[test]
fn test_invoke_later_from_other_thread() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let ran = Arc::new(AtomicU32::new(0));
    let handle = gui.invoke_later_handle();
    let flag = Arc::clone(&ran);
    std::thread::spawn(move || {
        handle
            .invoke_later(move |_gui: &mut Gui| {
                flag.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    gui.update();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_defer_runs_after_hook_returns() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let log = Rc::new(RefCell::new(Vec::new()));
    let id = gui.create(Deferring {
        log: Rc::clone(&log),
    });
    let root = gui.root_pane();
    gui.add(root, id);
    gui.invalidate_layout_locally(id);
    gui.validate_gui_layout();
    assert_eq!(*log.borrow(), vec!["layout start", "layout end", "deferred"]);

    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    gui.defer(move |_| flag.set(true));
    assert!(ran.get());
}

#[test]
fn test_layout_loop_is_capped() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    gui.config_mut().max_layout_iterations = 5;
    let runs = Rc::new(Cell::new(0));
    let id = gui.create(Restless {
        runs: Rc::clone(&runs),
        settle_after: None,
    });
    let root = gui.root_pane();
    gui.add(root, id);
    gui.invalidate_layout_locally(id);

    gui.validate_gui_layout();
    assert_eq!(runs.get(), 5);
    assert_eq!(gui.collect_layout_loop(), vec![(id, "Restless")]);
}

#[test]
fn test_layout_settles_after_self_invalidation() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let runs = Rc::new(Cell::new(0));
    let id = gui.create(Restless {
        runs: Rc::clone(&runs),
        settle_after: Some(3),
    });
    let root = gui.root_pane();
    gui.add(root, id);
    gui.invalidate_layout_locally(id);

    gui.validate_gui_layout();
    assert_eq!(runs.get(), 3);
    assert!(!gui.is_layout_invalid(id));
    assert!(gui.collect_layout_loop().is_empty());
}

#[test]
fn test_queued_input_is_replayed_by_update() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (id, log) = add_recorder(&mut gui, 10, 10);
    let input = QueuedInput::new();
    input.move_to(20, 20);
    input.click(20, 20, MouseButton::Left);
    input.type_key(Key::B, Some('b'));
    gui.set_input(Some(Box::new(input.clone())));
    assert_eq!(input.len(), 5);

    gui.update();
    assert!(input.is_empty());
    assert_eq!(click_counts(&log), vec![1]);
    assert_eq!(gui.focus_owner(), id);
    assert!(
        log.borrow()
            .iter()
            .any(|e| e.event_type() == EventType::KeyPressed && e.key_char() == Some('b'))
    );
}

#[test]
fn test_queued_input_filled_from_other_thread() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (_, log) = add_recorder(&mut gui, 10, 10);
    let input = QueuedInput::new();
    gui.set_input(Some(Box::new(input.clone())));

    let script = input.clone();
    std::thread::spawn(move || script.click(20, 20, MouseButton::Left))
        .join()
        .unwrap();
    assert_eq!(input.len(), 2);

    gui.update();
    assert!(input.is_empty());
    assert_eq!(click_counts(&log), vec![1]);
}

#[test]
fn test_popup_becomes_top_pane_and_receives_keys() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (owner, owner_log) = add_recorder(&mut gui, 10, 10);
    gui.request_keyboard_focus(owner);

    let popup = gui.create(PopupWindow::new(owner));
    let (inner, inner_log) = {
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = gui.create(Recorder {
            log: Rc::clone(&log),
            consume_keys: true,
        });
        (id, log)
    };
    gui.add(popup, inner);
    assert!(PopupWindow::open_popup(&mut gui, popup));
    assert_eq!(gui.top_pane(), popup);
    assert_eq!(gui.open_popups(), vec![popup]);
    assert!(gui.request_keyboard_focus(inner));

    owner_log.borrow_mut().clear();
    gui.handle_key(Key::C, Some('c'), true);
    assert!(owner_log.borrow().iter().all(|e| !e.is_key_event()));
    assert!(inner_log.borrow().iter().any(|e| e.is_key_event()));

    PopupWindow::close_popup(&mut gui, popup);
    assert_eq!(gui.top_pane(), gui.root_pane());
    assert!(gui.open_popups().is_empty());
}

#[test]
fn test_hiding_owner_closes_popup() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let panel = gui.create(Container);
    let owner = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, owner);
    let popup = gui.create(PopupWindow::new(owner));
    assert!(PopupWindow::open_popup(&mut gui, popup));
    assert!(gui.base_of(panel).has_open_popup());

    gui.set_visible(panel, false);
    assert!(!PopupWindow::is_open(&gui, popup));
    assert!(!gui.base_of(panel).has_open_popup());
}

#[test]
fn test_removing_owner_closes_popup() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let owner = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, owner);
    let popup = gui.create(PopupWindow::new(owner));
    assert!(PopupWindow::open_popup(&mut gui, popup));

    gui.remove_child(root, owner);
    assert!(!PopupWindow::is_open(&gui, popup));
    assert_eq!(gui.top_pane(), root);
}

#[test]
fn test_close_popup_from_widgets_restores_top_pane_focus() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let owner = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, owner);
    let popup = gui.create(PopupWindow::new(owner));
    assert!(PopupWindow::open_popup(&mut gui, popup));
    assert_eq!(gui.focus_child(gui.root()), Some(popup));

    gui.close_popup_from_widgets(owner);
    assert!(!PopupWindow::is_open(&gui, popup));
    assert_eq!(gui.focus_child(gui.root()), Some(root));
    assert!(!gui.base_of(owner).has_open_popup());
}

#[test]
fn test_clear_keyboard_state_reaches_widgets() {
    let clock = ManualClock::new();
    let mut gui = gui_with_clock(&clock);
    let (_id, log) = add_recorder(&mut gui, 10, 10);
    gui.clear_keyboard_state();
    assert!(types(&log).contains(&EventType::ClearKeyboardState));
}
