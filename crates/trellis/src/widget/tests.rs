use std::cell::{Cell, RefCell};

use trellis_render::HeadlessRenderer;

use super::*;
use crate::event::{EventType, MouseButton};
use crate::gui::GuiConfig;

/// Records lifecycle, focus and mouse hooks.
#[derive(Default)]
struct Tracker {
    log: Rc<RefCell<Vec<String>>>,
    previous_focus: Rc<Cell<Option<WidgetId>>>,
}

impl Tracker {
    fn push(&self, entry: impl Into<String>) {
        self.log.borrow_mut().push(entry.into());
    }
}

impl Widget for Tracker {
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if evt.is_mouse_event() {
            self.push(format!("{:?}", evt.event_type()));
            return true;
        }
        cx.default_handle_event(evt)
    }

    fn destroy(&mut self, _cx: &mut Cx<'_>) {
        self.push("destroy");
    }

    fn after_add_to_gui(&mut self, _cx: &mut Cx<'_>) {
        self.push("added");
    }

    fn before_remove_from_gui(&mut self, _cx: &mut Cx<'_>) {
        self.push("removed");
    }

    fn keyboard_focus_gained(
        &mut self,
        _cx: &mut Cx<'_>,
        cause: FocusGainedCause,
        previous: Option<WidgetId>,
    ) {
        self.previous_focus.set(previous);
        self.push(format!("gained {cause:?}"));
    }

    fn keyboard_focus_lost(&mut self, _cx: &mut Cx<'_>) {
        self.push("lost");
    }
}

fn new_gui() -> Gui {
    let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 100)), GuiConfig::default());
    gui.update();
    gui
}

fn tracker(gui: &mut Gui) -> (WidgetId, Rc<RefCell<Vec<String>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let id = gui.create(Tracker {
        log: Rc::clone(&log),
        ..Tracker::default()
    });
    (id, log)
}

fn entries(log: &RefCell<Vec<String>>) -> Vec<String> {
    log.borrow().clone()
}

fn pos(gui: &Gui, id: WidgetId) -> (i32, i32) {
    let base = gui.base_of(id);
    (base.x(), base.y())
}

#[test]
fn test_short_type_name() {
    assert_eq!(short_type_name("trellis::widgets::ScrollPane"), "ScrollPane");
    assert_eq!(short_type_name("a::b::Wrapper<c::Inner>"), "Wrapper");
    assert_eq!(short_type_name("Plain"), "Plain");
}

#[test]
fn test_insert_offsets_by_parent_inner_origin() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    gui.set_position(panel, 10, 20);
    gui.set_border_size(panel, Border::uniform(2));
    gui.set_position(child, 5, 5);

    gui.add(panel, child);
    assert_eq!(pos(&gui, child), (17, 27));

    gui.remove_child(panel, child);
    assert_eq!(pos(&gui, child), (5, 5));
    assert_eq!(gui.parent_of(child), None);
}

#[test]
fn test_set_position_moves_subtree() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    let grandchild = gui.create(Container);
    gui.add(panel, child);
    gui.add(child, grandchild);
    gui.set_position(grandchild, 4, 4);

    assert!(gui.set_position(panel, 30, 40));
    assert_eq!(pos(&gui, child), (30, 40));
    assert_eq!(pos(&gui, grandchild), (34, 44));
    assert!(!gui.set_position(panel, 30, 40));
}

#[test]
fn test_border_change_keeps_inner_size() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    gui.add(panel, child);
    gui.set_size(panel, 50, 40);

    assert!(gui.set_border_size(panel, Border::new(1, 2, 3, 4)));
    let base = gui.base_of(panel);
    assert_eq!((base.width(), base.height()), (56, 44));
    assert_eq!((base.inner_width(), base.inner_height()), (50, 40));
    assert_eq!((base.inner_x(), base.inner_y()), (2, 1));
    assert_eq!(pos(&gui, child), (2, 1));

    gui.set_inner_size(panel, 10, 10);
    assert_eq!(gui.base_of(panel).width(), 16);
}

#[test]
#[should_panic(expected = "already has a parent")]
fn test_adding_parented_widget_panics() {
    let mut gui = new_gui();
    let a = gui.create(Container);
    let b = gui.create(Container);
    let child = gui.create(Container);
    gui.add(a, child);
    gui.add(b, child);
}

#[test]
#[should_panic(expected = "can't add a widget to itself")]
fn test_adding_widget_to_itself_panics() {
    let mut gui = new_gui();
    let a = gui.create(Container);
    gui.add(a, a);
}

#[test]
#[should_panic(expected = "managed by the GUI")]
fn test_adding_to_gui_root_panics() {
    let mut gui = new_gui();
    let a = gui.create(Container);
    let root = gui.root();
    gui.add(root, a);
}

#[test]
#[should_panic(expected = "negative size")]
fn test_negative_size_panics() {
    let mut gui = new_gui();
    let a = gui.create(Container);
    gui.set_size(a, -1, 5);
}

#[test]
fn test_removing_one_child_keeps_sibling() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let (a, log_a) = tracker(&mut gui);
    let b = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, a);
    gui.add(panel, b);
    gui.set_position(b, 30, 12);
    assert!(gui.is_attached(a));

    assert_eq!(gui.remove_child(panel, a), 0);
    assert_eq!(pos(&gui, b), (30, 12));
    assert_eq!(gui.children_of(panel), &[b]);
    assert_eq!(gui.child_index(panel, b), Some(0));
    assert!(gui.contains(a));
    assert!(!gui.is_attached(a));
    assert!(gui.is_attached(b));
    assert_eq!(entries(&log_a), vec!["added", "lost", "removed", "destroy"]);
}

#[test]
fn test_move_child_and_remove_all() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let ids: Vec<_> = (0..3).map(|_| gui.create(Container)).collect();
    for &id in &ids {
        gui.add(panel, id);
    }
    gui.move_child(panel, 0, 2);
    assert_eq!(gui.children_of(panel), &[ids[1], ids[2], ids[0]]);

    gui.remove_all_children(panel);
    assert_eq!(gui.num_children(panel), 0);
    assert!(ids.iter().all(|&id| gui.parent_of(id).is_none()));
}

#[test]
fn test_dispose_removes_subtree() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let (child, log) = tracker(&mut gui);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, child);

    gui.dispose(panel);
    assert!(!gui.contains(panel));
    assert!(!gui.contains(child));
    assert_eq!(gui.num_children(root), 0);
    assert_eq!(entries(&log), vec!["added", "removed", "destroy"]);
}

#[test]
fn test_invalidate_layout_bubbles_to_parent() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, child);
    gui.validate_gui_layout();
    assert!(!gui.is_layout_invalid(panel));

    gui.invalidate_layout_locally(child);
    assert!(gui.is_layout_invalid(child));
    assert!(!gui.is_layout_invalid(panel));

    gui.invalidate_layout(child);
    assert!(gui.is_layout_invalid(panel));

    gui.validate_gui_layout();
    assert!(!gui.is_layout_invalid(child));
    assert!(!gui.is_layout_invalid(panel));
}

#[test]
fn test_resize_invalidates_only_the_widget() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, child);
    gui.validate_gui_layout();

    assert!(gui.set_size(child, 20, 20));
    assert!(gui.is_layout_invalid(child));
    assert!(!gui.is_layout_invalid(panel));
    assert!(!gui.set_size(child, 20, 20));
}

#[test]
fn test_adjust_size_uses_children_extent_and_limits() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    gui.add(panel, child);
    gui.set_position(child, 10, 5);
    gui.set_size(child, 30, 20);

    gui.adjust_size(panel);
    let base = gui.base_of(panel);
    assert_eq!((base.width(), base.height()), (40, 25));

    gui.set_max_size(panel, 35, 100);
    gui.adjust_size(panel);
    assert_eq!(gui.base_of(panel).width(), 35);

    gui.set_min_size(panel, 60, 0);
    gui.adjust_size(panel);
    assert_eq!(gui.base_of(panel).width(), 60);
}

#[test]
fn test_child_at_prefers_topmost_visible() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let below = gui.create(Container);
    let above = gui.create(Container);
    gui.add(panel, below);
    gui.add(panel, above);
    gui.set_size(panel, 100, 100);
    gui.set_size(below, 50, 50);
    gui.set_size(above, 50, 50);

    assert_eq!(gui.child_at(panel, 10, 10), Some(above));
    gui.set_visible(above, false);
    assert_eq!(gui.child_at(panel, 10, 10), Some(below));
    assert_eq!(gui.child_at(panel, 80, 80), None);
    assert_eq!(gui.widget_at(panel, 80, 80), panel);
    assert_eq!(gui.widget_at(panel, 10, 10), below);
}

#[test]
fn test_focus_transfer_reports_cause_and_previous() {
    let mut gui = new_gui();
    let (a, log_a) = tracker(&mut gui);
    let (b, log_b) = tracker(&mut gui);
    let root = gui.root_pane();
    gui.add(root, a);
    gui.add(root, b);

    assert!(gui.request_keyboard_focus(a));
    assert!(gui.request_keyboard_focus(b));
    assert_eq!(gui.focus_owner(), b);
    assert!(!gui.has_keyboard_focus(a));
    assert!(gui.base_of(b).get_animation_state(STATE_KEYBOARD_FOCUS));
    assert!(!gui.base_of(a).get_animation_state(STATE_KEYBOARD_FOCUS));
    assert!(gui.base_of(root).get_animation_state(STATE_HAS_FOCUSED_CHILD));

    assert_eq!(entries(&log_a), vec!["added", "gained Manual", "lost"]);
    assert_eq!(entries(&log_b), vec!["added", "gained Manual"]);
    let previous = gui.widget::<Tracker>(b).unwrap().previous_focus.get();
    assert_eq!(previous, Some(a));
}

#[test]
fn test_hidden_or_detached_widget_cannot_take_focus() {
    let mut gui = new_gui();
    let detached = gui.create(Container);
    assert!(!gui.request_keyboard_focus(detached));

    let hidden = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, hidden);
    gui.set_visible(hidden, false);
    assert!(!gui.request_keyboard_focus(hidden));
}

#[test]
fn test_hiding_or_disabling_drops_focus() {
    let mut gui = new_gui();
    let a = gui.create(Container);
    let b = gui.create(Container);
    let root = gui.root_pane();
    gui.add(root, a);
    gui.add(root, b);

    gui.request_keyboard_focus(a);
    gui.set_visible(a, false);
    assert_eq!(gui.focus_child(root), None);

    gui.request_keyboard_focus(b);
    gui.set_enabled(b, false);
    assert!(!gui.has_keyboard_focus(b));
}

#[test]
fn test_removing_focused_child_clears_chain() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let (child, log) = tracker(&mut gui);
    let root = gui.root_pane();
    gui.add(root, panel);
    gui.add(panel, child);
    gui.request_keyboard_focus(child);
    assert!(gui.has_keyboard_focus(panel));

    gui.remove_child(panel, child);
    assert_eq!(gui.focus_child(panel), None);
    assert!(!gui.base_of(panel).get_animation_state(STATE_HAS_FOCUSED_CHILD));
    assert!(entries(&log).contains(&"lost".to_owned()));
}

#[test]
fn test_disable_propagates_to_children() {
    let mut gui = new_gui();
    let panel = gui.create(Container);
    let child = gui.create(Container);
    gui.add(panel, child);

    gui.set_enabled(panel, false);
    assert!(!gui.base_of(child).is_enabled());
    assert!(gui.base_of(child).is_locally_enabled());
    assert!(gui.base_of(child).get_animation_state(STATE_DISABLED));

    gui.set_enabled(panel, true);
    assert!(gui.base_of(child).is_enabled());

    let late = gui.create(Container);
    gui.set_enabled(panel, false);
    gui.add(panel, late);
    assert!(!gui.base_of(late).is_enabled());
}

#[test]
fn test_mouse_press_focuses_with_mouse_cause() {
    let mut gui = new_gui();
    let (a, log) = tracker(&mut gui);
    let root = gui.root_pane();
    gui.add(root, a);
    gui.set_position(a, 10, 10);
    gui.set_size(a, 20, 20);

    gui.handle_mouse(15, 15, Some(MouseButton::Left), true);
    gui.handle_mouse(15, 15, Some(MouseButton::Left), false);
    assert_eq!(gui.focus_owner(), a);
    assert!(entries(&log).contains(&"gained MouseButtonDown".to_owned()));
}

#[test]
fn test_disabled_widget_swallows_mouse_actions() {
    let mut gui = new_gui();
    let (a, log) = tracker(&mut gui);
    let root = gui.root_pane();
    gui.add(root, a);
    gui.set_position(a, 10, 10);
    gui.set_size(a, 20, 20);
    gui.set_enabled(a, false);

    gui.handle_mouse(15, 15, Some(MouseButton::Left), true);
    gui.handle_mouse(15, 15, Some(MouseButton::Left), false);
    let seen = entries(&log);
    assert!(seen.contains(&format!("{:?}", EventType::MouseEntered)));
    assert!(!seen.contains(&format!("{:?}", EventType::MouseBtnDown)));
    assert!(!gui.has_keyboard_focus(a));
}

#[test]
fn test_hidden_widget_gets_no_mouse_events() {
    let mut gui = new_gui();
    let (a, log) = tracker(&mut gui);
    let root = gui.root_pane();
    gui.add(root, a);
    gui.set_size(a, 50, 50);
    gui.set_visible(a, false);

    gui.handle_mouse(5, 5, None, false);
    gui.handle_mouse(6, 5, Some(MouseButton::Left), true);
    assert_eq!(entries(&log), vec!["added"]);
}

#[test]
fn test_widget_access_during_hook_falls_back() {
    let mut gui = new_gui();
    let (a, _log) = tracker(&mut gui);
    let nested = gui.with_widget::<Tracker, _>(a, |_tracker, cx| {
        let id = cx.id();
        cx.widget::<Tracker>(id).is_none() && cx.in_hook()
    });
    assert_eq!(nested, Some(true));
    assert!(gui.with_widget::<Container, _>(a, |_, _| ()).is_none());
    assert!(!gui.in_hook());
}

/// Panics in every child hook.
struct Fragile;

impl Widget for Fragile {
    fn child_added(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {
        panic!("child_added failed");
    }

    fn child_removed(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {
        panic!("child_removed failed");
    }

    fn all_children_removed(&mut self, _cx: &mut Cx<'_>) {
        panic!("all_children_removed failed");
    }
}

#[test]
fn test_panicking_child_hooks_keep_tree_consistent() {
    let mut gui = new_gui();
    let panel = gui.create(Fragile);
    let root = gui.root_pane();
    gui.add(root, panel);
    let a = gui.create(Container);
    let b = gui.create(Container);
    gui.add(panel, a);
    gui.add(panel, b);
    assert_eq!(gui.children_of(panel), &[a, b]);

    assert_eq!(gui.remove_child(panel, a), 0);
    assert_eq!(gui.children_of(panel), &[b]);
    assert_eq!(gui.parent_of(a), None);
    assert!(gui.widget::<Fragile>(panel).is_some());

    gui.remove_all_children(panel);
    assert_eq!(gui.num_children(panel), 0);
    assert_eq!(gui.parent_of(b), None);
    assert!(gui.widget::<Fragile>(panel).is_some());
}
