//! Tree mutation and geometry.

use trellis_core::logging::targets;
use trellis_render::Border;

use super::{MAX_SIZE, STATE_DISABLED, STATE_HAS_FOCUSED_CHILD, TooltipContent, WidgetId};
use crate::gui::Gui;

impl Gui {
    /// Append `child` to `parent`.
    ///
    /// # Panics
    ///
    /// See [`insert_child`](Self::insert_child).
    pub fn add(&mut self, parent: WidgetId, child: WidgetId) {
        let index = self.num_children(parent);
        self.insert_child(parent, child, index);
    }

    /// Insert `child` at `index`.
    ///
    /// The child's position is offset by the parent's inner origin, the effective enabled
    /// state is propagated and, if the parent has a theme manager, the theme is applied.
    ///
    /// # Panics
    ///
    /// Panics if `child == parent`, if `child` already has a parent, if `index` is out of
    /// range or if `parent` is the GUI root (use [`set_root_pane`](Self::set_root_pane)).
    pub fn insert_child(&mut self, parent: WidgetId, child: WidgetId, index: usize) {
        assert!(
            parent != self.root(),
            "children of the GUI root are managed by the GUI"
        );
        self.insert_child_unchecked(parent, child, index);
    }

    pub(crate) fn insert_child_unchecked(&mut self, parent: WidgetId, child: WidgetId, index: usize) {
        assert!(child != parent, "can't add a widget to itself");
        assert!(
            self.node(child).parent.is_none(),
            "widget {child:?} already has a parent"
        );
        let count = self.node(parent).children.len();
        assert!(index <= count, "index {index} out of range (child count {count})");

        self.node_mut(parent).children.insert(index, child);
        self.node_mut(child).parent = Some(parent);

        let (dx, dy) = {
            let base = &self.node(parent).base;
            (base.inner_x(), base.inner_y())
        };
        self.move_subtree(child, dx, dy);

        let parent_enabled = self.node(parent).base.enabled;
        self.recursively_enabled_changed(child, parent_enabled);

        if self.node(parent).attached {
            self.recursively_add_to_gui(child);
        }
        if let Some(manager) = self.node(parent).theme_manager.clone() {
            self.apply_theme_manager(child, manager);
        }
        tracing::trace!(target: targets::TREE, ?parent, ?child, index, "child inserted");
        self.with_behavior_guarded("child_added", parent, |w, cx| w.child_added(cx, child));
    }

    /// Remove `child` from `parent`. Returns its former index.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: WidgetId, child: WidgetId) -> usize {
        let Some(index) = self.child_index(parent, child) else {
            panic!("{child:?} is not a child of {parent:?}");
        };
        self.remove_child_at(parent, index);
        index
    }

    /// Remove the child at `index` and return it.
    ///
    /// The child stays in the arena, detached, with its position made relative again.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn remove_child_at(&mut self, parent: WidgetId, index: usize) -> WidgetId {
        let child = self.node_mut(parent).children.remove(index);
        self.unparent(parent, child);
        let node = self.node_mut(parent);
        if node.mouse_over_child == Some(child) {
            node.mouse_over_child = None;
        }
        if node.focus_child == Some(child) {
            node.focus_child = None;
            node.base.set_animation_state(STATE_HAS_FOCUSED_CHILD, false);
        }
        tracing::trace!(target: targets::TREE, ?parent, ?child, index, "child removed");
        self.with_behavior_guarded("child_removed", parent, |w, cx| w.child_removed(cx, child));
        child
    }

    /// Remove every child of `parent`.
    pub fn remove_all_children(&mut self, parent: WidgetId) {
        let children = {
            let node = self.node_mut(parent);
            node.focus_child = None;
            node.mouse_over_child = None;
            node.base.set_animation_state(STATE_HAS_FOCUSED_CHILD, false);
            node.children.clone()
        };
        if children.is_empty() {
            return;
        }
        for &child in &children {
            self.unparent(parent, child);
        }
        self.node_mut(parent).children.clear();
        if self.node(parent).base.has_open_popup {
            self.recalc_open_popups(parent);
        }
        self.with_behavior_guarded("all_children_removed", parent, |w, cx| w.all_children_removed(cx));
    }

    /// Move the child at `from` to index `to`.
    pub fn move_child(&mut self, parent: WidgetId, from: usize, to: usize) {
        let children = &mut self.node_mut(parent).children;
        let count = children.len();
        assert!(from < count && to < count, "move_child index out of range");
        if from != to {
            let child = children.remove(from);
            children.insert(to, child);
        }
    }

    pub fn child_index(&self, parent: WidgetId, child: WidgetId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    fn unparent(&mut self, parent: WidgetId, child: WidgetId) {
        let attached = self.node(child).attached;
        if attached && self.node(child).base.has_open_popup {
            self.close_popup_from_widgets(child);
        }
        self.recursively_child_focus_lost(child);
        if attached {
            self.recursively_remove_from_gui(child);
        }
        self.node_mut(child).parent = None;
        self.destroy_subtree(child);

        let (dx, dy) = {
            let base = &self.node(parent).base;
            (base.inner_x(), base.inner_y())
        };
        self.move_subtree(child, -dx, -dy);

        let locally_enabled = self.node(child).base.locally_enabled;
        self.recursively_enabled_changed(child, locally_enabled);
    }

    /// Run the `destroy` hook on `id` and then on its subtree.
    pub(crate) fn destroy_subtree(&mut self, id: WidgetId) {
        self.with_behavior_guarded("destroy", id, |w, cx| w.destroy(cx));
        let children = self.node(id).children.clone();
        for child in children {
            self.destroy_subtree(child);
        }
    }

    fn recursively_add_to_gui(&mut self, id: WidgetId) {
        let clock = self.animation_clock().clone();
        let node = self.node_mut(id);
        node.attached = true;
        let layout_invalid = node.base.layout != super::LayoutState::Valid;
        if !node.base.shared_anim {
            node.base.anim.borrow_mut().set_clock(Some(clock));
        }
        if layout_invalid {
            self.has_invalid_layouts = true;
        }
        self.with_behavior_guarded("after_add_to_gui", id, |w, cx| w.after_add_to_gui(cx));
        let children = self.node(id).children.clone();
        for &child in children.iter().rev() {
            self.recursively_add_to_gui(child);
        }
    }

    fn recursively_remove_from_gui(&mut self, id: WidgetId) {
        let children = self.node(id).children.clone();
        for &child in children.iter().rev() {
            self.recursively_remove_from_gui(child);
        }
        let node = self.node_mut(id);
        node.focus_child = None;
        node.mouse_over_child = None;
        if !node.base.shared_anim {
            node.base.anim.borrow_mut().set_clock(None);
        }
        self.with_behavior_guarded("before_remove_from_gui", id, |w, cx| {
            w.before_remove_from_gui(cx)
        });
        self.node_mut(id).attached = false;
    }

    /// The topmost visible child containing `(x, y)`.
    pub fn child_at(&self, parent: WidgetId, x: i32, y: i32) -> Option<WidgetId> {
        self.node(parent)
            .children
            .iter()
            .rev()
            .copied()
            .find(|&child| {
                let base = &self.node(child).base;
                base.visible && base.is_inside(x, y)
            })
    }

    /// The deepest widget at `(x, y)` below and including `id`.
    pub fn widget_at(&self, id: WidgetId, x: i32, y: i32) -> WidgetId {
        let mut current = id;
        while let Some(child) = self.child_at(current, x, y) {
            current = child;
        }
        current
    }

    // ---------------------------------------------------------------------
    // Geometry
    // ---------------------------------------------------------------------

    /// Move a widget to the absolute position `(x, y)`. Children move along.
    ///
    /// Returns `true` if the position changed.
    pub fn set_position(&mut self, id: WidgetId, x: i32, y: i32) -> bool {
        let base = &self.node(id).base;
        let (dx, dy) = (x - base.x, y - base.y);
        if dx == 0 && dy == 0 {
            return false;
        }
        self.move_subtree(id, dx, dy);
        true
    }

    fn move_subtree(&mut self, id: WidgetId, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        let node = self.node_mut(id);
        node.base.x += dx;
        node.base.y += dy;
        let children = node.children.clone();
        for child in children {
            self.move_subtree(child, dx, dy);
        }
        self.with_behavior(id, |w, cx| w.position_changed(cx));
    }

    /// Resize a widget. Returns `true` if the size changed.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is negative.
    pub fn set_size(&mut self, id: WidgetId, width: i32, height: i32) -> bool {
        assert!(
            width >= 0 && height >= 0,
            "negative size {width}x{height} for {id:?}"
        );
        let base = &mut self.node_mut(id).base;
        if base.width == width && base.height == height {
            return false;
        }
        base.width = width;
        base.height = height;
        self.with_behavior(id, |w, cx| w.size_changed(cx));
        true
    }

    /// Resize so the area inside the border is `width` x `height`.
    pub fn set_inner_size(&mut self, id: WidgetId, width: i32, height: i32) -> bool {
        let border = self.node(id).base.border;
        self.set_size(id, width + border.horizontal(), height + border.vertical())
    }

    /// Change the border, keeping the inner size. Children shift with the inner origin.
    ///
    /// # Panics
    ///
    /// Panics if a border component is negative.
    pub fn set_border_size(&mut self, id: WidgetId, border: Border) -> bool {
        assert!(
            border.top >= 0 && border.left >= 0 && border.bottom >= 0 && border.right >= 0,
            "negative border size"
        );
        let base = &self.node(id).base;
        let old = base.border;
        if old == border {
            return false;
        }
        let (inner_width, inner_height) = (base.inner_width(), base.inner_height());
        let dx = border.left - old.left;
        let dy = border.top - old.top;
        self.node_mut(id).base.border = border;
        let children = self.node(id).children.clone();
        for child in children {
            self.move_subtree(child, dx, dy);
        }
        self.set_inner_size(id, inner_width, inner_height);
        self.with_behavior(id, |w, cx| w.border_changed(cx));
        true
    }

    /// # Panics
    ///
    /// Panics on negative sizes.
    pub fn set_min_size(&mut self, id: WidgetId, width: i32, height: i32) {
        assert!(width >= 0 && height >= 0, "negative minimum size");
        let base = &mut self.node_mut(id).base;
        base.min_width = width.min(MAX_SIZE);
        base.min_height = height.min(MAX_SIZE);
        self.invalidate_layout(id);
    }

    /// # Panics
    ///
    /// Panics on negative sizes.
    pub fn set_max_size(&mut self, id: WidgetId, width: i32, height: i32) {
        assert!(width >= 0 && height >= 0, "negative maximum size");
        let base = &mut self.node_mut(id).base;
        base.max_width = width.min(MAX_SIZE);
        base.max_height = height.min(MAX_SIZE);
        self.invalidate_layout(id);
    }

    // ---------------------------------------------------------------------
    // Visibility and enabled state
    // ---------------------------------------------------------------------

    /// Show or hide a widget. Hiding closes popups, tooltips and info windows it owns.
    pub fn set_visible(&mut self, id: WidgetId, visible: bool) {
        let node = self.node_mut(id);
        if node.base.visible == visible {
            return;
        }
        node.base.visible = visible;
        let parent = node.parent;
        let attached = node.attached;
        if !visible {
            if attached {
                self.widget_hidden(id);
            }
            if let Some(parent) = parent {
                self.child_hidden(parent, id);
            }
        }
        self.with_behavior(id, |w, cx| w.visibility_changed(cx, visible));
        if let Some(parent) = parent {
            self.with_behavior(parent, |w, cx| w.child_visibility_changed(cx, id));
        }
    }

    fn child_hidden(&mut self, parent: WidgetId, child: WidgetId) {
        if self.node(parent).focus_child == Some(child) {
            self.recursively_child_focus_lost(child);
            let node = self.node_mut(parent);
            node.focus_child = None;
            node.base.set_animation_state(STATE_HAS_FOCUSED_CHILD, false);
        }
        let node = self.node_mut(parent);
        if node.mouse_over_child == Some(child) {
            node.mouse_over_child = None;
        }
    }

    /// Enable or disable a widget and, effectively, its subtree.
    pub fn set_enabled(&mut self, id: WidgetId, enabled: bool) {
        let node = self.node_mut(id);
        if node.base.locally_enabled == enabled {
            return;
        }
        node.base.locally_enabled = enabled;
        let parent = node.parent;
        let parent_enabled = parent.is_none_or(|parent| self.node(parent).base.enabled);
        self.recursively_enabled_changed(id, parent_enabled);
    }

    fn recursively_enabled_changed(&mut self, id: WidgetId, parent_enabled: bool) {
        let node = self.node_mut(id);
        let enabled = node.base.locally_enabled && parent_enabled;
        if node.base.enabled == enabled {
            return;
        }
        node.base.enabled = enabled;
        node.base.set_animation_state(STATE_DISABLED, !enabled);
        let attached = node.attached;
        if !enabled {
            if attached {
                self.widget_disabled(id);
            }
            self.with_behavior_guarded("widget_disabled", id, |w, cx| w.widget_disabled(cx));
            self.giveup_keyboard_focus(id);
        }
        let children = self.node(id).children.clone();
        for child in children {
            self.recursively_enabled_changed(child, enabled);
        }
    }

    // ---------------------------------------------------------------------
    // Tooltips
    // ---------------------------------------------------------------------

    /// Set the tooltip shown for a widget. `None` falls back to the theme's tooltip.
    pub fn set_tooltip_content(&mut self, id: WidgetId, content: Option<TooltipContent>) {
        self.node_mut(id).base.tooltip = content;
        self.update_tooltip(id);
    }

    /// Refresh an open tooltip of `id` with its current content.
    pub fn update_tooltip(&mut self, id: WidgetId) {
        self.request_tooltip_update(id, false);
    }

    /// Close the tooltip of `id` and restart the tooltip delay.
    pub fn reset_tooltip(&mut self, id: WidgetId) {
        self.request_tooltip_update(id, true);
    }
}
