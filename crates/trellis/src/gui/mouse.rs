//! Mouse input: entered/exited tracking, drags, multi-clicks and the wheel.

use trellis_core::guarded;
use trellis_core::logging::targets;

use super::Gui;
use crate::event::{EventType, ModifierMask, MouseButton};
use crate::widget::WidgetId;

#[derive(Debug, Default)]
pub(crate) struct MouseState {
    pub(crate) was_inside: bool,
    pub(crate) drag_active: bool,
    pub(crate) drag_button: Option<MouseButton>,
    down_x: i32,
    down_y: i32,
    last_x: i32,
    last_y: i32,
    clicked_x: i32,
    clicked_y: i32,
    click_count: u32,
    clicked_time: i64,
    pub(crate) event_time: i64,
    pub(crate) last_down: Option<WidgetId>,
    last_click: Option<WidgetId>,
}

impl Gui {
    /// Feed a mouse position and optionally a button change.
    ///
    /// `button` is `None` for plain moves. Returns `true` if a widget consumed the input.
    pub fn handle_mouse(
        &mut self,
        x: i32,
        y: i32,
        button: Option<MouseButton>,
        mut pressed: bool,
    ) -> bool {
        let now = self.current_time();
        self.mouse.event_time = now;
        self.tooltip.event_time = now;
        self.event.mouse_button = button;

        let prev_buttons = self.event.modifiers.without(ModifierMask::KEYS);
        let was_pressed = button.is_some_and(|b| prev_buttons.intersects(b.mask()));
        if let Some(b) = button {
            self.event.set_button_state(b, pressed);
            self.renderer.set_mouse_button(b.index(), pressed);
        }

        if self.mouse.drag_active || prev_buttons.is_empty() {
            self.event.mouse_x = x;
            self.event.mouse_y = y;
        } else {
            self.event.mouse_x = self.mouse.down_x;
            self.event.mouse_y = self.mouse.down_y;
        }

        let mut handled = self.mouse.drag_active;
        if !self.mouse.drag_active {
            let root = self.root();
            if !self.base_of(root).is_inside(x, y) {
                pressed = false;
                self.mouse.click_count = 0;
                if self.mouse.was_inside {
                    self.send_mouse_event(EventType::MouseExited, None);
                    self.mouse.was_inside = false;
                }
            } else if !self.mouse.was_inside {
                self.mouse.was_inside = true;
                if self.send_mouse_event(EventType::MouseEntered, None).is_some() {
                    handled = true;
                }
            }
        }

        if x != self.mouse.last_x || y != self.mouse.last_y {
            self.mouse.last_x = x;
            self.mouse.last_y = y;
            let drag_distance = self.config().drag_distance;
            if !prev_buttons.is_empty()
                && !self.mouse.drag_active
                && ((x - self.mouse.down_x).abs() > drag_distance
                    || (y - self.mouse.down_y).abs() > drag_distance)
            {
                self.mouse.drag_active = true;
                self.mouse.click_count = 0;
                self.hide_tooltip();
                self.tooltip.had_open = false;
                self.tooltip.owner = self.mouse.last_down;
                tracing::trace!(target: targets::EVENT, x, y, "drag started");
            }
            if self.mouse.drag_active {
                if self.bound_drag.is_some() {
                    self.send_mouse_event(EventType::MouseMoved, None);
                } else if let Some(target) = self.mouse.last_down {
                    self.send_mouse_event(EventType::MouseDragged, Some(target));
                }
            } else if prev_buttons.is_empty()
                && self.send_mouse_event(EventType::MouseMoved, None).is_some()
            {
                handled = true;
            }
        }

        if let Some(b) = button
            && pressed != was_pressed
        {
            if pressed {
                if self.mouse.drag_button.is_none() {
                    self.mouse.down_x = x;
                    self.mouse.down_y = y;
                    self.mouse.drag_button = Some(b);
                    self.mouse.last_down = self.send_mouse_event(EventType::MouseBtnDown, None);
                } else if let Some(target) = self.mouse.last_down
                    && self.bound_drag.is_none()
                {
                    self.send_mouse_event(EventType::MouseBtnDown, Some(target));
                }
            } else if self.mouse.drag_button.is_some()
                && (self.bound_drag.is_none() || self.event.is_mouse_drag_end())
            {
                if self.bound_drag.is_some() && self.mouse.drag_button == Some(b) {
                    let under = self.widget_under_mouse();
                    self.send_mouse_event(EventType::MouseBtnUp, Some(under));
                }
                if let Some(target) = self.mouse.last_down {
                    self.send_mouse_event(EventType::MouseBtnUp, Some(target));
                }
            }
            if self.mouse.last_down.is_some() {
                handled = true;
            }
            if b == MouseButton::Left && !self.popup_event_occurred && !pressed && !self.mouse.drag_active {
                self.detect_click(x, y, now);
            }
        }

        if self.event.is_mouse_drag_end() {
            if self.mouse.drag_active {
                self.mouse.drag_active = false;
                self.send_mouse_event(EventType::MouseMoved, None);
            }
            self.mouse.drag_button = None;
            if let Some(bound) = self.bound_drag.take()
                && let Some(callback) = bound.callback
            {
                guarded("bound_drag_callback", || callback(self));
            }
        }
        handled
    }

    /// Count multi-clicks: same widget, within the double-click time and drag distance.
    fn detect_click(&mut self, x: i32, y: i32, now: i64) {
        let double_click_ms = self.config().double_click_ms;
        let drag_distance = self.config().drag_distance;
        let mouse = &mut self.mouse;
        if mouse.click_count == 0
            || now - mouse.clicked_time > double_click_ms
            || mouse.last_click != mouse.last_down
        {
            mouse.clicked_x = x;
            mouse.clicked_y = y;
            mouse.last_click = mouse.last_down;
            mouse.click_count = 0;
            mouse.clicked_time = now;
        }
        if (x - mouse.clicked_x).abs() < drag_distance && (y - mouse.clicked_y).abs() < drag_distance {
            mouse.click_count += 1;
            mouse.clicked_time = now;
            self.event.mouse_x = mouse.clicked_x;
            self.event.mouse_y = mouse.clicked_y;
            self.event.click_count = mouse.click_count;
            if let Some(target) = mouse.last_click {
                self.send_mouse_event(EventType::MouseClicked, Some(target));
            }
        } else {
            mouse.last_click = None;
        }
    }

    /// Release all buttons and end any drag without a click.
    pub fn clear_mouse_state(&mut self) {
        for button in [MouseButton::Left, MouseButton::Middle, MouseButton::Right] {
            self.event.set_button_state(button, false);
            self.renderer.set_mouse_button(button.index(), false);
        }
        self.mouse.last_click = None;
        self.mouse.click_count = 0;
        self.mouse.clicked_time = self.current_time();
        self.bound_drag = None;
        if self.mouse.drag_active {
            self.mouse.drag_active = false;
            self.send_mouse_event(EventType::MouseMoved, None);
        }
        self.mouse.drag_button = None;
    }

    /// Feed a wheel movement. During a drag it goes to the widget the drag started on.
    pub fn handle_mouse_wheel(&mut self, delta: i32) -> bool {
        self.event.wheel_delta = delta;
        let target = if self.mouse.drag_active {
            self.mouse.last_down
        } else {
            None
        };
        let handled = self.send_mouse_event(EventType::MouseWheel, target).is_some();
        self.event.wheel_delta = 0;
        handled
    }

    /// Send a move at the last mouse position, e.g. after the tree under the mouse changed.
    pub fn resend_last_mouse_move(&mut self) {
        if !self.mouse.drag_active {
            self.send_mouse_event(EventType::MouseMoved, None);
        }
    }

    /// Whether a mouse drag is in progress.
    pub fn is_drag_active(&self) -> bool {
        self.mouse.drag_active
    }

    /// Deliver the current event as `event_type` to `target`, or route it from the top pane.
    pub(crate) fn send_mouse_event(
        &mut self,
        event_type: EventType,
        target: Option<WidgetId>,
    ) -> Option<WidgetId> {
        self.popup_event_occurred = false;
        self.event.event_type = event_type;
        self.event.drag_event = self.mouse.drag_active && self.bound_drag.is_none();
        self.renderer
            .set_mouse_position(self.event.mouse_x, self.event.mouse_y);
        let evt = self.event;

        if let Some(target) = target {
            if !self.contains(target) {
                return None;
            }
            if self.base_of(target).is_enabled() || !evt.is_mouse_action() {
                self.handle_event(target, &evt);
            }
            return Some(target);
        }

        let root = self.root();
        let mut widget = None;
        if let Some(info) = self.active_info
            && self.with_behavior(info, |w, cx| w.is_mouse_inside(cx, &evt))
            && self.set_mouse_over_child(root, Some(info), &evt)
        {
            widget = Some(info);
        }
        let widget = match widget {
            Some(widget) => widget,
            None => {
                let top = self.top_pane();
                self.set_mouse_over_child(root, Some(top), &evt);
                top
            }
        };
        self.route_mouse_event(widget, &evt)
    }
}
