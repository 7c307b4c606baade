//! Keyboard input, key repeat and focus-key fallback.

use super::Gui;
use crate::event::{EventType, Key, ModifierMask};
use crate::widget::WidgetId;

impl Gui {
    /// Feed a key press or release. Returns `true` if a widget consumed it.
    pub fn handle_key(&mut self, key: Key, ch: Option<char>, pressed: bool) -> bool {
        self.event.key = key;
        self.event.key_char = ch;
        self.event.key_repeated = false;
        self.keys.event_time = self.current_time();
        if key == Key::None && ch.is_none() {
            self.keys.repeat_delay = 0;
            return false;
        }
        self.event.update_modifier_keys(pressed);
        if pressed {
            self.keys.repeat_delay = self.config().key_repeat_initial_ms;
            self.send_key_event(EventType::KeyPressed)
        } else {
            self.keys.repeat_delay = 0;
            self.send_key_event(EventType::KeyReleased)
        }
    }

    /// Forget held modifiers and tell every widget of the top pane.
    pub fn clear_keyboard_state(&mut self) {
        self.event.modifiers = self.event.modifiers.without(ModifierMask::KEYS);
        self.keys.repeat_delay = 0;
        self.event.event_type = EventType::ClearKeyboardState;
        let evt = self.event;
        let root = self.root();
        self.route_popup_event(root, &evt);
    }

    pub(crate) fn handle_key_repeat(&mut self) {
        if self.keys.repeat_delay == 0 {
            return;
        }
        let now = self.current_time();
        if now - self.keys.event_time > self.keys.repeat_delay {
            self.keys.event_time = now;
            self.keys.repeat_delay = self.config().key_repeat_interval_ms;
            self.event.key_repeated = true;
            self.send_key_event(EventType::KeyPressed);
        }
    }

    fn is_focus_key(&self) -> bool {
        self.event.key == Key::Tab
            && !self
                .event
                .modifiers
                .intersects(ModifierMask::CTRL.union(ModifierMask::META).union(ModifierMask::ALT))
    }

    /// Remember the outermost focus-key enabled widget a focus key passed through.
    pub(crate) fn set_focus_key_widget(&mut self, id: WidgetId) {
        if self.keys.focus_key_widget.is_none() && self.is_focus_key() {
            self.keys.focus_key_widget = Some(id);
        }
    }

    fn send_key_event(&mut self, event_type: EventType) -> bool {
        self.popup_event_occurred = false;
        self.keys.focus_key_widget = None;
        self.event.event_type = event_type;
        self.event.drag_event = false;
        let evt = self.event;
        let top = self.top_pane();
        let mut handled = self.handle_event(top, &evt);
        if !handled && let Some(widget) = self.keys.focus_key_widget.take() {
            if self.contains(widget) {
                self.handle_focus_key_event(widget, &evt);
            }
            handled = true;
        }
        self.keys.focus_key_widget = None;
        handled
    }
}
