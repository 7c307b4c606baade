//! Popup windows, the info window slot and drag binding.
//!
//! Open popups sit between the root pane and the info placeholder in the root's child
//! list, newest last. Every popup has an owner widget; the owner and its ancestors carry
//! the "has open popups" flag while the popup is open.

use trellis_core::guarded;
use trellis_core::logging::targets;

use super::{BoundDrag, Gui};
use crate::event::EventType;
use crate::widget::{STATE_HAS_OPEN_POPUPS, WidgetId, WindowRole};

impl Gui {
    /// Mark `id` as a popup window owned by `owner`.
    pub(crate) fn set_popup_owner(&mut self, id: WidgetId, owner: WidgetId) {
        self.node_mut(id).window = WindowRole::Popup { owner };
    }

    /// Mark `id` as an info window owned by `owner`.
    pub(crate) fn set_info_owner(&mut self, id: WidgetId, owner: WidgetId) {
        self.node_mut(id).window = WindowRole::Info { owner };
    }

    /// The owner of a popup or info window.
    pub fn window_owner(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).window.owner()
    }

    /// Open a popup above the current top pane. An already open popup is closed first.
    ///
    /// # Panics
    ///
    /// Panics if `popup` was not created as a popup window or has a parent other than
    /// the GUI root.
    pub(crate) fn open_popup(&mut self, popup: WidgetId) {
        let WindowRole::Popup { owner } = self.node(popup).window else {
            panic!("widget {popup:?} is not a popup window");
        };
        let root = self.root();
        match self.parent_of(popup) {
            Some(parent) if parent == root => self.close_popup(popup),
            Some(_) => panic!("popup must not be added anywhere"),
            None => {}
        }
        self.hide_tooltip();
        self.tooltip.had_open = false;
        self.send_popup_event(EventType::PopupOpened);
        let index = self.num_children(root) - 2;
        self.insert_child_unchecked(root, popup, index);
        if self.contains(owner) {
            self.set_open_popup(owner, true);
        }
        self.popup_event_occurred = true;
        if let Some(info) = self.active_info {
            self.close_info(info);
        }
        tracing::debug!(target: targets::POPUP, ?popup, ?owner, "popup opened");
    }

    /// Close an open popup and give keyboard focus back to the new top pane.
    pub(crate) fn close_popup(&mut self, popup: WidgetId) {
        if self.bound_drag.as_ref().is_some_and(|drag| drag.popup == popup) {
            self.bound_drag = None;
        }
        let root = self.root();
        if let Some(index) = self.child_index(root, popup)
            && index > 0
        {
            self.remove_child_at(root, index);
        }
        if let Some(owner) = self.window_owner(popup)
            && self.contains(owner)
        {
            self.recalc_open_popups(owner);
        }
        self.send_popup_event(EventType::PopupClosed);
        self.popup_event_occurred = true;
        self.close_info_from_widget(popup);
        let top = self.top_pane();
        self.request_child_focus(root, Some(top));
        self.resend_last_mouse_move();
        tracing::debug!(target: targets::POPUP, ?popup, "popup closed");
    }

    /// The open popups, oldest first.
    pub fn open_popups(&self) -> Vec<WidgetId> {
        let children = self.children_of(self.root());
        children[1..children.len() - 2].to_vec()
    }

    /// Whether a popup owned directly by `owner` is open.
    pub fn has_open_popups(&self, owner: WidgetId) -> bool {
        self.open_popups()
            .into_iter()
            .any(|popup| self.window_owner(popup) == Some(owner))
    }

    /// Whether `widget` is `owner` or one of its ancestors.
    pub(crate) fn is_owner(&self, owner: Option<WidgetId>, widget: WidgetId) -> bool {
        let mut current = owner;
        while let Some(id) = current {
            if id == widget {
                return true;
            }
            current = self.nodes.get(id).and_then(|node| node.parent);
        }
        false
    }

    /// Close every popup whose owner is `widget` or lies inside its subtree.
    pub(crate) fn close_popup_from_widgets(&mut self, widget: WidgetId) {
        let root = self.root();
        let mut index = self.num_children(root) - 2;
        while index > 1 {
            index -= 1;
            let children = self.children_of(root);
            if index >= children.len() - 2 {
                continue;
            }
            let popup = children[index];
            if self.is_owner(self.window_owner(popup), widget) {
                self.close_popup(popup);
            }
        }
    }

    fn close_if_popup(&mut self, widget: WidgetId) {
        if matches!(self.node(widget).window, WindowRole::Popup { .. }) {
            self.close_popup(widget);
        }
    }

    /// Route all mouse moves to `popup` until the current drag ends, then run `callback`.
    ///
    /// Only the top pane can bind, only while a button is held, and only if the drag did
    /// not start inside the popup itself.
    pub(crate) fn bind_drag_event(
        &mut self,
        popup: WidgetId,
        callback: Option<Box<dyn FnOnce(&mut Gui)>>,
    ) -> bool {
        if self.bound_drag.is_none()
            && self.top_pane() == popup
            && self.mouse.drag_button.is_some()
            && !self.is_owner(self.mouse.last_down, popup)
        {
            self.mouse.drag_active = true;
            self.bound_drag = Some(BoundDrag { popup, callback });
            self.send_mouse_event(EventType::MouseMoved, None);
            return true;
        }
        false
    }

    /// An attached widget was hidden.
    pub(crate) fn widget_hidden(&mut self, widget: WidgetId) {
        self.close_if_popup(widget);
        self.close_popup_from_widgets(widget);
        if self.is_owner(self.tooltip.owner, widget) {
            self.hide_tooltip();
            self.tooltip.had_open = false;
        }
        self.close_info_from_widget(widget);
    }

    /// An attached widget became disabled.
    pub(crate) fn widget_disabled(&mut self, widget: WidgetId) {
        self.close_if_popup(widget);
        self.close_info_from_widget(widget);
    }

    pub(crate) fn set_open_popup(&mut self, id: WidgetId, has_open_popup: bool) {
        let node = self.node_mut(id);
        if node.base.has_open_popup == has_open_popup {
            return;
        }
        node.base.has_open_popup = has_open_popup;
        node.base.set_animation_state(STATE_HAS_OPEN_POPUPS, has_open_popup);
        let parent = node.parent;
        if let Some(parent) = parent {
            if has_open_popup {
                self.set_open_popup(parent, true);
            } else {
                self.recalc_open_popups(parent);
            }
        }
    }

    pub(crate) fn recalc_open_popups(&mut self, id: WidgetId) {
        let has_open = self.has_open_popups(id)
            || self
                .children_of(id)
                .iter()
                .any(|&child| self.node(child).base.has_open_popup);
        self.set_open_popup(id, has_open);
    }

    // ---------------------------------------------------------------------
    // Info window
    // ---------------------------------------------------------------------

    /// Show `info` in the info slot. A different active info window is closed first.
    pub(crate) fn open_info(&mut self, info: WidgetId) {
        if let Some(active) = self.active_info {
            if active == info {
                return;
            }
            self.close_info(active);
        }
        let root = self.root();
        let index = self.num_children(root) - 2;
        self.remove_child_at(root, index);
        self.insert_child_unchecked(root, info, index);
        self.active_info = Some(info);
    }

    /// Put the placeholder back if `info` is the active info window.
    pub(crate) fn close_info(&mut self, info: WidgetId) {
        if self.active_info != Some(info) {
            return;
        }
        let root = self.root();
        let index = self.num_children(root) - 2;
        self.remove_child_at(root, index);
        let placeholder = self.info_placeholder;
        self.insert_child_unchecked(root, placeholder, index);
        self.active_info = None;
        self.with_behavior_guarded("info_window_closed", info, |w, cx| w.info_window_closed(cx));
    }

    /// The info window currently shown, if any.
    pub fn active_info_window(&self) -> Option<WidgetId> {
        self.active_info
    }

    fn close_info_from_widget(&mut self, widget: WidgetId) {
        if let Some(active) = self.active_info
            && (active == widget || self.is_owner(self.window_owner(active), widget))
        {
            self.close_info(active);
        }
    }

    fn send_popup_event(&mut self, event_type: EventType) {
        self.popup_event_occurred = false;
        self.event.event_type = event_type;
        self.event.drag_event = false;
        let evt = self.event;
        let top = self.top_pane();
        guarded("popup_event", || self.route_popup_event(top, &evt));
    }
}
