//! Event routing through the tree.

use super::{FocusGainedCause, WidgetId};
use crate::event::{Event, EventType};
use crate::gui::Gui;

impl Gui {
    /// Deliver `evt` to the widget's `handle_event` hook.
    pub fn handle_event(&mut self, id: WidgetId, evt: &Event) -> bool {
        self.with_behavior(id, |w, cx| w.handle_event(cx, evt))
    }

    /// Route a mouse event down to the topmost widget under the mouse that consumes it.
    ///
    /// Pressing a button moves keyboard focus to the widget that consumed the press.
    /// Returns the consuming widget.
    pub(crate) fn route_mouse_event(&mut self, id: WidgetId, evt: &Event) -> Option<WidgetId> {
        let event_type = evt.event_type();
        let children = self.node(id).children.clone();
        for &child in children.iter().rev() {
            if !self.contains(child) || !self.node(child).base.visible {
                continue;
            }
            if !self.with_behavior(child, |w, cx| w.is_mouse_inside(cx, evt)) {
                continue;
            }
            if !self.set_mouse_over_child(id, Some(child), evt) {
                continue;
            }
            if matches!(event_type, EventType::MouseEntered | EventType::MouseExited) {
                return Some(child);
            }
            if let Some(result) = self.route_mouse_event(child, evt) {
                if event_type == EventType::MouseBtnDown && self.node(id).focus_child != Some(child) {
                    self.node_mut(child).focus_gained_cause = Some(FocusGainedCause::MouseButtonDown);
                    let base = &self.node(child).base;
                    if base.is_enabled() && base.can_accept_keyboard_focus() {
                        self.request_child_focus(id, Some(child));
                    }
                    if let Some(node) = self.nodes.get_mut(child) {
                        node.focus_gained_cause = None;
                    }
                }
                return Some(result);
            }
        }

        let base = &self.node(id).base;
        if event_type == EventType::MouseBtnDown
            && base.is_enabled()
            && base.can_accept_keyboard_focus()
        {
            self.node_mut(id).focus_gained_cause = Some(FocusGainedCause::MouseButtonDown);
            if self.node(id).focus_child.is_none() {
                self.request_keyboard_focus(id);
            } else {
                self.request_child_focus(id, None);
            }
            if let Some(node) = self.nodes.get_mut(id) {
                node.focus_gained_cause = None;
            }
        }
        if event_type != EventType::MouseWheel {
            self.set_mouse_over_child(id, None, evt);
        }
        if !self.node(id).base.is_enabled() && evt.is_mouse_action() {
            return Some(id);
        }
        if self.handle_event(id, evt) {
            return Some(id);
        }
        None
    }

    /// Track the child under the mouse, sending entered/exited sub-events on change.
    ///
    /// Returns `false` if the new child refused the entered event.
    pub(crate) fn set_mouse_over_child(
        &mut self,
        id: WidgetId,
        child: Option<WidgetId>,
        evt: &Event,
    ) -> bool {
        let last = self.node(id).mouse_over_child;
        if last == child {
            return true;
        }
        if let Some(child) = child {
            let entered = evt.sub_event(EventType::MouseEntered);
            if self.route_mouse_event(child, &entered).is_none() {
                return false;
            }
        }
        if let Some(last) = last
            && self.contains(last)
        {
            let exited = evt.sub_event(EventType::MouseExited);
            self.route_mouse_event(last, &exited);
        }
        self.node_mut(id).mouse_over_child = child;
        true
    }

    /// The deepest visible widget on the mouse-over chain starting at `id`.
    pub(crate) fn widget_under_mouse_of(&self, id: WidgetId) -> WidgetId {
        let mut widget = id;
        while let Some(child) = self.node(widget).mouse_over_child {
            if !self.node(child).base.visible {
                break;
            }
            widget = child;
        }
        widget
    }

    /// Deliver a popup event to `id` and every descendant.
    pub(crate) fn route_popup_event(&mut self, id: WidgetId, evt: &Event) {
        self.handle_event(id, evt);
        let children = self.node(id).children.clone();
        for child in children {
            if self.contains(child) {
                self.route_popup_event(child, evt);
            }
        }
    }

    /// Default key handling: offer the event to the focus child.
    pub(crate) fn handle_key_event_default(&mut self, id: WidgetId, evt: &Event) -> bool {
        let node = self.node(id);
        if node.children.is_empty() {
            return false;
        }
        if node.base.is_focus_key_enabled() && node.attached {
            self.set_focus_key_widget(id);
        }
        if let Some(focus_child) = self.node(id).focus_child
            && self.node(focus_child).base.visible
        {
            return self.handle_event(focus_child, evt);
        }
        false
    }
}
