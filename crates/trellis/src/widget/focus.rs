//! Keyboard focus.
//!
//! Every widget has at most one focus child. The focused widget is found by following
//! focus-child links from the GUI root. Requesting focus for a widget first requests
//! focus for its parent, so the whole chain up to the root is updated.

use trellis_core::logging::targets;

use super::{
    FocusGainedCause, STATE_HAS_FOCUSED_CHILD, STATE_KEYBOARD_FOCUS, WidgetId,
};
use crate::event::{Event, ModifierMask};
use crate::gui::Gui;

/// State of one focus transfer, passed down the focus-request chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTransferContext {
    previous: Option<WidgetId>,
}

impl FocusTransferContext {
    /// The widget that had keyboard focus when the transfer started.
    pub fn previous(&self) -> Option<WidgetId> {
        self.previous
    }
}

impl Gui {
    /// Request keyboard focus for `id`.
    ///
    /// Fails if the widget is detached or hidden, or if an ancestor refuses focus.
    pub fn request_keyboard_focus(&mut self, id: WidgetId) -> bool {
        let ctx = self.start_focus_transfer();
        self.request_keyboard_focus_with(id, &ctx)
    }

    fn start_focus_transfer(&self) -> FocusTransferContext {
        let owner = self.focus_owner();
        FocusTransferContext {
            previous: (owner != self.root()).then_some(owner),
        }
    }

    fn request_keyboard_focus_with(&mut self, id: WidgetId, ctx: &FocusTransferContext) -> bool {
        if id == self.root() {
            return true;
        }
        let node = self.node(id);
        let Some(parent) = node.parent else {
            return false;
        };
        if !node.base.visible {
            return false;
        }
        if self.node(parent).focus_child == Some(id) {
            return true;
        }
        self.request_child_focus_with(parent, Some(id), ctx)
    }

    /// Make `child` the focus child of `parent`, or clear it with `None`.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a direct child of `parent`.
    pub(crate) fn request_child_focus(&mut self, parent: WidgetId, child: Option<WidgetId>) -> bool {
        let ctx = self.start_focus_transfer();
        self.request_child_focus_with(parent, child, &ctx)
    }

    fn request_child_focus_with(
        &mut self,
        parent: WidgetId,
        child: Option<WidgetId>,
        ctx: &FocusTransferContext,
    ) -> bool {
        if let Some(child) = child {
            assert_eq!(
                self.node(child).parent,
                Some(parent),
                "{child:?} is not a direct child of {parent:?}"
            );
        }
        if parent == self.root() && child.is_some() && child != Some(self.top_pane()) {
            return false;
        }
        let current = self.node(parent).focus_child;
        if current != child {
            match child {
                None => {
                    if let Some(old) = current {
                        self.recursively_child_focus_lost(old);
                    }
                    self.node_mut(parent).focus_child = None;
                    self.with_behavior(parent, |w, cx| w.keyboard_focus_child_changed(cx, None));
                }
                Some(child) => {
                    let saved_cause = self.node(parent).focus_gained_cause;
                    if saved_cause.is_none() {
                        self.node_mut(parent).focus_gained_cause = Some(FocusGainedCause::ChildFocused);
                    }
                    let granted = self.request_keyboard_focus_with(parent, ctx);
                    self.node_mut(parent).focus_gained_cause = saved_cause;
                    if !granted {
                        return false;
                    }

                    if let Some(old) = self.node(parent).focus_child {
                        self.recursively_child_focus_lost(old);
                    }
                    self.node_mut(parent).focus_child = Some(child);
                    self.with_behavior(parent, |w, cx| {
                        w.keyboard_focus_child_changed(cx, Some(child))
                    });
                    self.node(child)
                        .base
                        .set_animation_state(STATE_KEYBOARD_FOCUS, true);
                    let cause = self
                        .node(child)
                        .focus_gained_cause
                        .unwrap_or(FocusGainedCause::Manual);
                    let previous = ctx.previous;
                    tracing::trace!(target: targets::FOCUS, widget = ?child, ?cause, "keyboard focus gained");
                    self.with_behavior(child, |w, cx| w.keyboard_focus_gained(cx, cause, previous));
                }
            }
        }
        let node = self.node(parent);
        let has_focused_child = node.focus_child.is_some();
        node.base
            .set_animation_state(STATE_HAS_FOCUSED_CHILD, has_focused_child);
        has_focused_child
    }

    /// Walk the focus chain starting at `id`, telling each widget it lost focus.
    pub(crate) fn recursively_child_focus_lost(&mut self, id: WidgetId) {
        let mut current = Some(id);
        while let Some(widget) = current {
            let Some(node) = self.nodes.get(widget) else {
                break;
            };
            let next = node.focus_child;
            node.base.set_animation_state(STATE_KEYBOARD_FOCUS, false);
            self.with_behavior_guarded("keyboard_focus_lost", widget, |w, cx| {
                w.keyboard_focus_lost(cx)
            });
            self.node_mut(widget).focus_child = None;
            current = next;
        }
    }

    /// Give up focus if `id` is its parent's focus child.
    pub fn giveup_keyboard_focus(&mut self, id: WidgetId) {
        if let Some(parent) = self.node(id).parent
            && self.node(parent).focus_child == Some(id)
        {
            self.request_child_focus(parent, None);
        }
    }

    /// Whether `id` is its parent's focus child.
    pub fn has_keyboard_focus(&self, id: WidgetId) -> bool {
        self.node(id)
            .parent
            .is_some_and(|parent| self.node(parent).focus_child == Some(id))
    }

    pub fn focus_child(&self, id: WidgetId) -> Option<WidgetId> {
        self.node(id).focus_child
    }

    /// The end of the focus chain starting at the GUI root.
    pub fn focus_owner(&self) -> WidgetId {
        let mut widget = self.root();
        while let Some(child) = self.node(widget).focus_child {
            widget = child;
        }
        widget
    }

    /// Move focus to the next widget in `id`'s focus order, wrapping around.
    pub fn focus_next_child(&mut self, id: WidgetId) -> bool {
        self.move_focus(id, true, 1)
    }

    pub fn focus_prev_child(&mut self, id: WidgetId) -> bool {
        self.move_focus(id, true, -1)
    }

    pub fn focus_first_child(&mut self, id: WidgetId) -> bool {
        self.move_focus(id, false, 1)
    }

    pub fn focus_last_child(&mut self, id: WidgetId) -> bool {
        self.move_focus(id, false, -1)
    }

    /// Depth-first pre-order list of focusable widgets below `id`.
    ///
    /// Returns the index of the current focus holder in `list`, if any.
    fn collect_focus_order_list(&mut self, id: WidgetId, list: &mut Vec<WidgetId>) -> Option<usize> {
        let order = self.with_behavior(id, |w, cx| w.keyboard_focus_order(cx));
        let focus_child = self.node(id).focus_child;
        let mut index = None;
        for child in order {
            let base = &self.node(child).base;
            if !(base.visible && base.enabled) {
                continue;
            }
            let depth = base.is_depth_focus_traversal();
            if base.can_accept_keyboard_focus() {
                if Some(child) == focus_child {
                    index = Some(list.len());
                }
                list.push(child);
            }
            if depth && let Some(sub) = self.collect_focus_order_list(child, list) {
                index = Some(sub);
            }
        }
        index
    }

    fn move_focus(&mut self, id: WidgetId, relative: bool, dir: i32) -> bool {
        let mut list = Vec::new();
        let current = self.collect_focus_order_list(id, &mut list);
        if list.is_empty() {
            return false;
        }
        let last = list.len() - 1;
        let index = match (relative, current, dir < 0) {
            (true, Some(i), true) if i > 0 => i - 1,
            (_, _, true) => last,
            (true, Some(i), false) if i < last => i + 1,
            (_, _, false) => 0,
        };
        let target = list[index];
        self.node_mut(target).focus_gained_cause = Some(FocusGainedCause::FocusKey);
        self.request_child_focus(target, None);
        self.request_keyboard_focus(target);
        if let Some(node) = self.nodes.get_mut(target) {
            node.focus_gained_cause = None;
        }
        true
    }

    /// Cycle focus with the focus key: SHIFT goes backwards.
    pub(crate) fn handle_focus_key_event(&mut self, id: WidgetId, evt: &Event) {
        if evt.is_key_pressed_event() {
            if evt.modifiers().intersects(ModifierMask::SHIFT) {
                self.focus_prev_child(id);
            } else {
                self.focus_next_child(id);
            }
        }
    }
}
