//! Layout invalidation and size queries.
//!
//! Invalidation has two levels. A *local* invalidation only re-runs the widget's own
//! `layout` hook. A *global* invalidation also tells the parent through
//! `child_invalidate_layout`, whose default bubbles further up.
//!
//! Validation clears the flag before calling `layout`, so a widget may invalidate
//! itself from inside its own layout. The GUI repeats validation until nothing is
//! invalid or [`GuiConfig::max_layout_iterations`](crate::GuiConfig) passes ran.

use trellis_core::logging::targets;

use super::{LayoutState, WidgetId};
use crate::gui::Gui;

/// Clamp a preferred size between a minimum and an optional maximum.
///
/// A `max` of zero or less means "unbounded". The minimum wins over the maximum.
///
/// ```
/// use trellis::compute_size;
///
/// assert_eq!(compute_size(10, 50, 30), 30);
/// assert_eq!(compute_size(10, 5, 30), 10);
/// assert_eq!(compute_size(10, 50, 0), 50);
/// assert_eq!(compute_size(40, 50, 30), 40);
/// ```
pub fn compute_size(min: i32, preferred: i32, max: i32) -> i32 {
    let preferred = if max > 0 { preferred.min(max) } else { preferred };
    min.max(preferred)
}

impl Gui {
    /// Request a new layout of `id` and its parent.
    pub fn invalidate_layout(&mut self, id: WidgetId) {
        let node = self.node(id);
        if node.base.layout < LayoutState::Global {
            self.invalidate_layout_locally(id);
            let node = self.node_mut(id);
            if let Some(parent) = node.parent {
                node.base.layout = LayoutState::Global;
                self.with_behavior(parent, |w, cx| w.child_invalidate_layout(cx, id));
            }
        }
    }

    /// Request a new layout of `id` only.
    pub fn invalidate_layout_locally(&mut self, id: WidgetId) {
        let node = self.node_mut(id);
        if node.base.layout < LayoutState::Local {
            node.base.layout = LayoutState::Local;
            if node.attached {
                self.has_invalid_layouts = true;
            }
        }
    }

    pub fn is_layout_invalid(&self, id: WidgetId) -> bool {
        self.node(id).base.layout != LayoutState::Valid
    }

    /// Lay out `id` if it is invalid, then its children.
    pub fn validate_layout(&mut self, id: WidgetId) {
        let node = self.node_mut(id);
        if node.base.layout != LayoutState::Valid {
            node.base.layout = LayoutState::Valid;
            self.with_behavior(id, |w, cx| w.layout(cx));
        }
        let children = self.node(id).children.clone();
        for child in children {
            if self.contains(child) {
                self.validate_layout(child);
            }
        }
    }

    /// Validate the whole tree, repeating while widgets re-invalidate themselves.
    ///
    /// Gives up after the configured number of passes and logs the widgets that are
    /// still invalid.
    #[tracing::instrument(skip_all, level = "trace", name = "trellis::layout")]
    pub fn validate_gui_layout(&mut self) {
        let max_iterations = self.config().max_layout_iterations;
        let root = self.root();
        let mut iterations = 0;
        while self.has_invalid_layouts && iterations < max_iterations {
            self.has_invalid_layouts = false;
            self.validate_layout(root);
            iterations += 1;
        }
        if self.has_invalid_layouts {
            let still_invalid = self.collect_layout_loop();
            tracing::warn!(
                target: targets::LAYOUT,
                iterations,
                widgets = ?still_invalid,
                "layout did not settle; abandoning layout for this frame"
            );
        } else if iterations > 1 || self.config().debug_layout {
            tracing::trace!(target: targets::LAYOUT, iterations, "layout validated");
        }
    }

    /// Every invalid widget in the tree with its type name.
    pub fn collect_layout_loop(&self) -> Vec<(WidgetId, &'static str)> {
        let mut result = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.base.layout != LayoutState::Valid {
                result.push((id, node.type_name));
            }
            stack.extend(node.children.iter().rev().copied());
        }
        result
    }

    // ---------------------------------------------------------------------
    // Size queries
    // ---------------------------------------------------------------------

    pub fn min_width(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.min_width(cx))
    }

    pub fn min_height(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.min_height(cx))
    }

    pub fn preferred_width(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.preferred_width(cx))
    }

    pub fn preferred_height(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.preferred_height(cx))
    }

    pub fn preferred_inner_width(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.preferred_inner_width(cx))
    }

    pub fn preferred_inner_height(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.preferred_inner_height(cx))
    }

    pub fn max_width(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.max_width(cx))
    }

    pub fn max_height(&mut self, id: WidgetId) -> i32 {
        self.with_behavior(id, |w, cx| w.max_height(cx))
    }

    /// Resize to the preferred size, clamped by min and max, then validate the layout.
    pub fn adjust_size(&mut self, id: WidgetId) {
        let min_w = self.min_width(id);
        let pref_w = self.preferred_width(id);
        let max_w = self.max_width(id);
        let min_h = self.min_height(id);
        let pref_h = self.preferred_height(id);
        let max_h = self.max_height(id);
        self.set_size(
            id,
            compute_size(min_w, pref_w, max_w),
            compute_size(min_h, pref_h, max_h),
        );
        self.validate_layout(id);
    }

    /// Fill the parent's inner area with `child`.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a child of `parent`.
    pub fn layout_child_full_inner_area(&mut self, parent: WidgetId, child: WidgetId) {
        assert_eq!(
            self.parent_of(child),
            Some(parent),
            "can only lay out direct children"
        );
        let base = self.base_of(parent);
        let (x, y, w, h) = (
            base.inner_x(),
            base.inner_y(),
            base.inner_width(),
            base.inner_height(),
        );
        self.set_position(child, x, y);
        self.set_size(child, w, h);
    }
}
