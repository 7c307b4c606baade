//! Widget system for Trellis.
//!
//! This module provides the widget tree:
//!
//! - [`WidgetId`]: a handle into the GUI's widget arena
//! - [`WidgetBase`]: geometry and flags every widget carries
//! - [`Widget`]: the behavior trait with the overridable hooks
//! - [`Cx`]: the context a hook receives; it derefs to the whole [`Gui`]
//!
//! # Overview
//!
//! Widgets live in an arena owned by the [`Gui`]. Parent, focus-child and mouse-over
//! links are [`WidgetId`]s, so the tree is a plain owned forest. Positions are
//! absolute: moving a widget moves its whole subtree, and inserting a child offsets it
//! by the parent's inner origin.
//!
//! A widget's behavior (`Box<dyn Widget>`) is taken out of its arena slot while one of its
//! hooks runs, so the hook can get `&mut Gui` through its [`Cx`]. If a hook on the same
//! widget is re-entered while its behavior is out, the default behavior of [`Container`]
//! answers instead.
//!
//! # Creating a Widget
//!
//! ```
//! use trellis::{Cx, Gui, GuiConfig, Widget};
//! use trellis_render::{Color, HeadlessRenderer, Rect};
//!
//! struct Swatch {
//!     color: Color,
//! }
//!
//! impl Widget for Swatch {
//!     fn preferred_inner_width(&mut self, _cx: &mut Cx<'_>) -> i32 {
//!         16
//!     }
//!
//!     fn preferred_inner_height(&mut self, _cx: &mut Cx<'_>) -> i32 {
//!         16
//!     }
//!
//!     fn paint_widget(&mut self, cx: &mut Cx<'_>) {
//!         let rect = cx.base().inner_rect();
//!         cx.fill_rect(rect, self.color);
//!     }
//! }
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(100, 100)), GuiConfig::default());
//! let swatch = gui.create(Swatch { color: Color::RED });
//! let root = gui.root_pane();
//! gui.add(root, swatch);
//! gui.adjust_size(swatch);
//! assert_eq!(gui.base_of(swatch).width(), 16);
//! ```

mod focus;
mod layout;
mod paint;
mod routing;
mod theme_apply;
mod tree;

#[cfg(test)]
mod tests;

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use cursor_icon::CursorIcon;
use slotmap::new_key_type;
use trellis_core::logging::targets;
use trellis_core::{AnimationState, SharedAnimationState, StateKey};
use trellis_render::{Border, Color, Font, Image, Rect};

use crate::event::Event;
use crate::gui::Gui;
use crate::input_map::InputMap;
use crate::theme::{ThemeInfo, ThemeManager};
use crate::widgets::{AutoScrollable, CustomPageSize, Scrollable};

pub use focus::FocusTransferContext;
pub use layout::compute_size;
pub use paint::TintAnimator;
pub use theme_apply::is_absolute_theme;

new_key_type! {
    /// A handle to a widget in a [`Gui`]'s arena.
    pub struct WidgetId;
}

/// Set while the widget is the focus child of its parent.
pub const STATE_KEYBOARD_FOCUS: StateKey = StateKey::new("keyboardFocus");
/// Set while a popup owned by this widget or a descendant is open.
pub const STATE_HAS_OPEN_POPUPS: StateKey = StateKey::new("hasOpenPopups");
/// Set while one of the children holds keyboard focus.
pub const STATE_HAS_FOCUSED_CHILD: StateKey = StateKey::new("hasFocusedChild");
/// Set while the widget is effectively disabled.
pub const STATE_DISABLED: StateKey = StateKey::new("disabled");

/// Upper bound for min/max sizes.
pub const MAX_SIZE: i32 = i16::MAX as i32;

/// Why a widget received keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FocusGainedCause {
    /// `request_keyboard_focus` called by application code.
    Manual,
    /// Focus traversal with the focus key (TAB).
    FocusKey,
    /// A mouse button was pressed on the widget.
    MouseButtonDown,
    /// A descendant requested focus.
    ChildFocused,
}

/// What the tooltip window shows for a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TooltipContent {
    Text(String),
    /// A detached widget shown inside the tooltip window.
    Widget(WidgetId),
}

impl From<&str> for TooltipContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for TooltipContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub(crate) enum LayoutState {
    #[default]
    Valid,
    Local,
    Global,
}

/// Geometry and flags shared by every widget.
///
/// Fields that trigger hooks when they change (position, size, border, visibility,
/// enabled state, theme) are changed through [`Gui`] methods. The plain flags have
/// setters here.
#[derive(Debug)]
pub struct WidgetBase {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
    pub(crate) border: Border,
    pub(crate) min_width: i32,
    pub(crate) min_height: i32,
    pub(crate) max_width: i32,
    pub(crate) max_height: i32,
    pub(crate) visible: bool,
    pub(crate) locally_enabled: bool,
    pub(crate) enabled: bool,
    clip: bool,
    can_accept_focus: bool,
    depth_focus_traversal: bool,
    focus_key_enabled: bool,
    pub(crate) theme: String,
    pub(crate) background: Option<Rc<dyn Image>>,
    pub(crate) overlay: Option<Rc<dyn Image>>,
    pub(crate) font: Option<Rc<dyn Font>>,
    pub(crate) anim: SharedAnimationState,
    pub(crate) shared_anim: bool,
    pub(crate) tint: Option<TintAnimator>,
    pub(crate) tooltip: Option<TooltipContent>,
    pub(crate) theme_tooltip: Option<String>,
    mouse_cursor: Option<CursorIcon>,
    input_map: Option<Rc<InputMap>>,
    pub(crate) has_open_popup: bool,
    pub(crate) layout: LayoutState,
}

impl WidgetBase {
    pub(crate) fn new(theme: String, anim: Option<SharedAnimationState>) -> Self {
        let (anim, shared_anim) = match anim {
            Some(shared) => (shared, true),
            None => (AnimationState::new().shared(), false),
        };
        Self {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            border: Border::ZERO,
            min_width: 0,
            min_height: 0,
            max_width: MAX_SIZE,
            max_height: MAX_SIZE,
            visible: true,
            locally_enabled: true,
            enabled: true,
            clip: false,
            can_accept_focus: true,
            depth_focus_traversal: true,
            focus_key_enabled: true,
            theme,
            background: None,
            overlay: None,
            font: None,
            anim,
            shared_anim,
            tint: None,
            tooltip: None,
            theme_tooltip: None,
            mouse_cursor: None,
            input_map: None,
            has_open_popup: false,
            layout: LayoutState::Valid,
        }
    }

    /// Absolute x coordinate.
    #[inline]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// Absolute y coordinate.
    #[inline]
    pub fn y(&self) -> i32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn inner_x(&self) -> i32 {
        self.x + self.border.left
    }

    pub fn inner_y(&self) -> i32 {
        self.y + self.border.top
    }

    pub fn inner_width(&self) -> i32 {
        (self.width - self.border.horizontal()).max(0)
    }

    pub fn inner_height(&self) -> i32 {
        (self.height - self.border.vertical()).max(0)
    }

    pub fn inner_right(&self) -> i32 {
        self.x + self.border.left.max(self.width - self.border.right)
    }

    pub fn inner_bottom(&self) -> i32 {
        self.y + self.border.top.max(self.height - self.border.bottom)
    }

    pub fn inner_rect(&self) -> Rect {
        Rect::new(
            self.inner_x(),
            self.inner_y(),
            self.inner_width(),
            self.inner_height(),
        )
    }

    /// Whether `(x, y)` lies inside the widget's outer rectangle.
    pub fn is_inside(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }

    pub fn border(&self) -> Border {
        self.border
    }

    /// The configured minimum width, raised to the border size.
    pub fn min_width(&self) -> i32 {
        self.min_width.max(self.border.horizontal())
    }

    pub fn min_height(&self) -> i32 {
        self.min_height.max(self.border.vertical())
    }

    pub fn max_width(&self) -> i32 {
        self.max_width
    }

    pub fn max_height(&self) -> i32 {
        self.max_height
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The effective enabled state: enabled locally and all ancestors enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_locally_enabled(&self) -> bool {
        self.locally_enabled
    }

    pub fn is_clip(&self) -> bool {
        self.clip
    }

    /// Clip painting of this widget and its children to its rectangle.
    pub fn set_clip(&mut self, clip: bool) {
        self.clip = clip;
    }

    pub fn can_accept_keyboard_focus(&self) -> bool {
        self.can_accept_focus
    }

    pub fn set_can_accept_keyboard_focus(&mut self, can_accept: bool) {
        self.can_accept_focus = can_accept;
    }

    pub fn is_depth_focus_traversal(&self) -> bool {
        self.depth_focus_traversal
    }

    /// Whether focus traversal descends into this widget's children.
    pub fn set_depth_focus_traversal(&mut self, depth: bool) {
        self.depth_focus_traversal = depth;
    }

    pub fn is_focus_key_enabled(&self) -> bool {
        self.focus_key_enabled
    }

    /// Whether an unhandled focus key (TAB) moves focus among this widget's children.
    pub fn set_focus_key_enabled(&mut self, enabled: bool) {
        self.focus_key_enabled = enabled;
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn background(&self) -> Option<&Rc<dyn Image>> {
        self.background.as_ref()
    }

    pub fn set_background(&mut self, background: Option<Rc<dyn Image>>) {
        self.background = background;
    }

    pub fn overlay(&self) -> Option<&Rc<dyn Image>> {
        self.overlay.as_ref()
    }

    pub fn set_overlay(&mut self, overlay: Option<Rc<dyn Image>>) {
        self.overlay = overlay;
    }

    /// The font named by the theme, if any.
    pub fn font(&self) -> Option<&Rc<dyn Font>> {
        self.font.as_ref()
    }

    pub fn set_font(&mut self, font: Option<Rc<dyn Font>>) {
        self.font = font;
    }

    pub fn animation_state(&self) -> &SharedAnimationState {
        &self.anim
    }

    /// Whether the animation state belongs to another widget.
    pub fn has_shared_animation_state(&self) -> bool {
        self.shared_anim
    }

    /// Set an animation state flag unless the state is shared.
    pub fn set_animation_state(&self, key: StateKey, active: bool) {
        if !self.shared_anim {
            self.anim.borrow_mut().set(key, active);
        }
    }

    pub fn get_animation_state(&self, key: StateKey) -> bool {
        self.anim.borrow().get(key)
    }

    pub fn tooltip_content(&self) -> Option<&TooltipContent> {
        self.tooltip.as_ref()
    }

    pub fn theme_tooltip_content(&self) -> Option<&str> {
        self.theme_tooltip.as_deref()
    }

    pub fn mouse_cursor(&self) -> Option<CursorIcon> {
        self.mouse_cursor
    }

    pub fn set_mouse_cursor(&mut self, cursor: Option<CursorIcon>) {
        self.mouse_cursor = cursor;
    }

    pub fn input_map(&self) -> Option<&Rc<InputMap>> {
        self.input_map.as_ref()
    }

    pub fn set_input_map(&mut self, input_map: Option<Rc<InputMap>>) {
        self.input_map = input_map;
    }

    pub fn tint(&self) -> Option<&TintAnimator> {
        self.tint.as_ref()
    }

    pub fn set_tint(&mut self, tint: Option<TintAnimator>) {
        self.tint = tint;
    }

    pub fn has_open_popup(&self) -> bool {
        self.has_open_popup
    }
}

/// An arena slot.
pub(crate) struct Node {
    pub(crate) base: WidgetBase,
    pub(crate) parent: Option<WidgetId>,
    pub(crate) children: Vec<WidgetId>,
    pub(crate) focus_child: Option<WidgetId>,
    pub(crate) mouse_over_child: Option<WidgetId>,
    /// Part of the tree under the GUI root.
    pub(crate) attached: bool,
    pub(crate) focus_gained_cause: Option<FocusGainedCause>,
    pub(crate) theme_manager: Option<Rc<dyn ThemeManager>>,
    pub(crate) type_name: &'static str,
    pub(crate) window: WindowRole,
    pub(crate) behavior: Option<Box<dyn Widget>>,
}

/// Whether a node is a top-level window managed by the GUI root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum WindowRole {
    #[default]
    None,
    Popup { owner: WidgetId },
    Info { owner: WidgetId },
}

impl WindowRole {
    pub(crate) fn owner(self) -> Option<WidgetId> {
        match self {
            Self::None => None,
            Self::Popup { owner } | Self::Info { owner } => Some(owner),
        }
    }
}

impl Node {
    pub(crate) fn new(behavior: Box<dyn Widget>, anim: Option<SharedAnimationState>) -> Self {
        let theme = behavior.default_theme();
        let type_name = behavior.type_name();
        Self {
            base: WidgetBase::new(theme, anim),
            parent: None,
            children: Vec::new(),
            focus_child: None,
            mouse_over_child: None,
            attached: false,
            focus_gained_cause: None,
            theme_manager: None,
            type_name,
            window: WindowRole::None,
            behavior: Some(behavior),
        }
    }
}

/// The last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let plain = full.split('<').next().unwrap_or(full);
    plain.rsplit("::").next().unwrap_or(plain)
}

/// Behavior of a widget.
///
/// Every method is a hook with a default matching a plain container. Hooks receive the
/// widget's [`Cx`]; use [`Cx::id`] for the widget's own id and the [`Gui`] methods
/// (reached through `Deref`) for everything else.
pub trait Widget: Any {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Theme name assigned at creation: the lowercased type name.
    fn default_theme(&self) -> String {
        self.type_name().to_ascii_lowercase()
    }

    /// Called once right after the widget entered the arena; create children here.
    fn created(&mut self, _cx: &mut Cx<'_>) {}

    /// Called when the widget is removed from its parent or disposed.
    fn destroy(&mut self, _cx: &mut Cx<'_>) {}

    fn after_add_to_gui(&mut self, _cx: &mut Cx<'_>) {}

    fn before_remove_from_gui(&mut self, _cx: &mut Cx<'_>) {}

    /// Position and size the children.
    fn layout(&mut self, _cx: &mut Cx<'_>) {}

    /// Handle an event. Returns `true` if it was consumed.
    ///
    /// The default forwards key events to the focus child and then to the input map.
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        cx.default_handle_event(evt) || self.handle_mapped_key(cx, evt)
    }

    /// Handle an action mapped from a key stroke by the widget's input map.
    fn handle_key_stroke_action(&mut self, _cx: &mut Cx<'_>, _action: &str, _evt: &Event) -> bool {
        false
    }

    /// Look `evt` up in the widget's input map and run the action it maps to.
    ///
    /// Overrides of [`handle_event`](Self::handle_event) call this after
    /// [`Cx::default_handle_event`] to keep input map support.
    fn handle_mapped_key(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let Some(action) = cx.mapped_action(evt) else {
            return false;
        };
        if self.handle_key_stroke_action(cx, &action, evt) {
            return true;
        }
        if cx.config().warn_on_unhandled_action {
            tracing::warn!(
                target: targets::EVENT,
                action = %action,
                widget = cx.type_name_of(cx.id()),
                "unhandled input map action"
            );
        }
        false
    }

    /// Whether the mouse position of `evt` hits this widget.
    fn is_mouse_inside(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        cx.base().is_inside(evt.mouse_x(), evt.mouse_y())
    }

    fn mouse_cursor(&mut self, cx: &mut Cx<'_>, _evt: &Event) -> Option<CursorIcon> {
        cx.base().mouse_cursor()
    }

    /// Tooltip shown when the mouse rests at `(x, y)`.
    fn tooltip_content_at(&mut self, cx: &mut Cx<'_>, _x: i32, _y: i32) -> Option<TooltipContent> {
        let base = cx.base();
        base.tooltip
            .clone()
            .or_else(|| base.theme_tooltip.clone().map(TooltipContent::Text))
    }

    /// Paint background, widget, children and overlay in that order.
    fn paint(&mut self, cx: &mut Cx<'_>) {
        cx.paint_background();
        self.paint_widget(cx);
        cx.paint_children();
        cx.paint_overlay();
    }

    /// Paint the widget's own content between background and children.
    fn paint_widget(&mut self, _cx: &mut Cx<'_>) {}

    fn min_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.base().min_width()
    }

    fn min_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.base().min_height()
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.default_preferred_inner_width()
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.default_preferred_inner_height()
    }

    fn preferred_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let inner = self.preferred_inner_width(cx);
        cx.outer_preferred_width(inner)
    }

    fn preferred_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let inner = self.preferred_inner_height(cx);
        cx.outer_preferred_height(inner)
    }

    fn max_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.base().max_width()
    }

    fn max_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        cx.base().max_height()
    }

    /// Apply theme parameters. The default reads the common widget parameters.
    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
    }

    fn keyboard_focus_gained(
        &mut self,
        _cx: &mut Cx<'_>,
        _cause: FocusGainedCause,
        _previous: Option<WidgetId>,
    ) {
    }

    fn keyboard_focus_lost(&mut self, _cx: &mut Cx<'_>) {}

    fn keyboard_focus_child_changed(&mut self, _cx: &mut Cx<'_>, _child: Option<WidgetId>) {}

    /// Children in focus traversal order.
    fn keyboard_focus_order(&mut self, cx: &mut Cx<'_>) -> Vec<WidgetId> {
        cx.children_of(cx.id()).to_vec()
    }

    /// The widget became effectively disabled.
    fn widget_disabled(&mut self, _cx: &mut Cx<'_>) {}

    fn child_added(&mut self, cx: &mut Cx<'_>, _child: WidgetId) {
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn child_removed(&mut self, cx: &mut Cx<'_>, _child: WidgetId) {
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn all_children_removed(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    /// A child called `invalidate_layout`; the default bubbles up.
    fn child_invalidate_layout(&mut self, cx: &mut Cx<'_>, _child: WidgetId) {
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    fn child_visibility_changed(&mut self, _cx: &mut Cx<'_>, _child: WidgetId) {}

    fn size_changed(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        cx.invalidate_layout_locally(id);
    }

    fn position_changed(&mut self, _cx: &mut Cx<'_>) {}

    fn border_changed(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        cx.invalidate_layout(id);
    }

    /// The widget's own visibility flag changed.
    fn visibility_changed(&mut self, _cx: &mut Cx<'_>, _visible: bool) {}

    /// The widget was shown as the GUI's info window and has just been closed.
    fn info_window_closed(&mut self, _cx: &mut Cx<'_>) {}

    // =========================================================================
    // Capabilities queried by a containing ScrollPane
    // =========================================================================

    /// Scrolls itself instead of being moved by the scroll pane.
    fn as_scrollable(&mut self) -> Option<&mut dyn Scrollable> {
        None
    }

    fn as_auto_scrollable(&mut self) -> Option<&mut dyn AutoScrollable> {
        None
    }

    /// Chooses its own page sizes for the scroll pane's scrollbars.
    fn as_custom_page_size(&mut self) -> Option<&mut dyn CustomPageSize> {
        None
    }
}

/// A widget with default behavior: children keep the positions they are given.
#[derive(Debug, Default, Clone, Copy)]
pub struct Container;

impl Widget for Container {}

/// The context passed to every [`Widget`] hook.
///
/// Derefs to the [`Gui`], so all tree operations are available. Methods defined here
/// act on the widget the hook belongs to.
pub struct Cx<'a> {
    gui: &'a mut Gui,
    id: WidgetId,
}

impl<'a> Cx<'a> {
    pub(crate) fn new(gui: &'a mut Gui, id: WidgetId) -> Self {
        Self { gui, id }
    }

    /// The id of the widget whose hook is running.
    #[inline]
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// The widget's own base.
    pub fn base(&self) -> &WidgetBase {
        self.gui.base_of(self.id)
    }

    pub fn base_mut(&mut self) -> &mut WidgetBase {
        self.gui.base_of_mut(self.id)
    }

    pub fn parent(&self) -> Option<WidgetId> {
        self.gui.parent_of(self.id)
    }

    pub fn children(&self) -> &[WidgetId] {
        self.gui.children_of(self.id)
    }

    /// Clone the current child list, for loops that mutate the tree.
    pub fn children_vec(&self) -> Vec<WidgetId> {
        self.gui.children_of(self.id).to_vec()
    }

    /// The font for text painted by this widget.
    pub fn font(&self) -> Rc<dyn Font> {
        self.gui.font_of(self.id)
    }

    /// Default key handling: offer the event to the focus child.
    pub fn default_handle_event(&mut self, evt: &Event) -> bool {
        if evt.is_key_event() {
            return self.gui.handle_key_event_default(self.id, evt);
        }
        false
    }

    /// The action the widget's input map assigns to `evt`.
    pub fn mapped_action(&self, evt: &Event) -> Option<String> {
        if !evt.is_key_event() {
            return None;
        }
        let input_map = self.base().input_map()?;
        input_map.map_event(evt).map(str::to_owned)
    }

    /// Extent of the children beyond the inner origin.
    pub fn default_preferred_inner_width(&self) -> i32 {
        let base = self.base();
        let mut right = base.inner_x();
        for &child in self.children() {
            right = right.max(self.gui.base_of(child).right());
        }
        right - base.inner_x()
    }

    pub fn default_preferred_inner_height(&self) -> i32 {
        let base = self.base();
        let mut bottom = base.inner_y();
        for &child in self.children() {
            bottom = bottom.max(self.gui.base_of(child).bottom());
        }
        bottom - base.inner_y()
    }

    /// Outer preferred width for a preferred inner width: the border added, then raised
    /// to the background image and the minimum width.
    pub fn outer_preferred_width(&self, inner: i32) -> i32 {
        let base = self.base();
        let mut width = base.border.horizontal() + inner;
        if let Some(bg) = &base.background {
            width = width.max(bg.width());
        }
        base.min_width.max(width)
    }

    pub fn outer_preferred_height(&self, inner: i32) -> i32 {
        let base = self.base();
        let mut height = base.border.vertical() + inner;
        if let Some(bg) = &base.background {
            height = height.max(bg.height());
        }
        base.min_height.max(height)
    }

    pub fn default_apply_theme(&mut self, theme: &dyn ThemeInfo) {
        self.gui.apply_common_theme(self.id, theme);
    }

    pub fn paint_background(&mut self) {
        let base = self.gui.base_of(self.id);
        if let Some(bg) = base.background.clone() {
            let rect = base.rect();
            self.draw_image(&bg, rect);
        }
    }

    pub fn paint_overlay(&mut self) {
        let base = self.gui.base_of(self.id);
        if let Some(ov) = base.overlay.clone() {
            let rect = base.rect();
            self.draw_image(&ov, rect);
        }
    }

    /// Draw every visible child in order.
    pub fn paint_children(&mut self) {
        self.gui.draw_children(self.id);
    }

    /// Draw one child.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not a direct child of this widget.
    pub fn paint_child(&mut self, child: WidgetId) {
        assert_eq!(
            self.gui.parent_of(child),
            Some(self.id),
            "can only paint direct children"
        );
        self.gui.draw_widget(child);
    }

    /// Draw an image with this widget's animation state.
    pub fn draw_image(&mut self, image: &Rc<dyn Image>, rect: Rect) {
        let anim = Rc::clone(&self.gui.base_of(self.id).anim);
        let state = anim.borrow();
        self.gui.renderer_mut().draw_image(image.as_ref(), &state, rect);
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.gui.renderer_mut().fill_rect(rect, color);
    }

    /// Draw one line of text with the widget's font. Returns the drawn width.
    pub fn draw_text(&mut self, color: Color, x: i32, y: i32, text: &str) -> i32 {
        let font = self.font();
        self.gui
            .renderer_mut()
            .draw_text(font.as_ref(), color, x, y, text)
    }
}

impl Deref for Cx<'_> {
    type Target = Gui;

    fn deref(&self) -> &Gui {
        self.gui
    }
}

impl DerefMut for Cx<'_> {
    fn deref_mut(&mut self) -> &mut Gui {
        self.gui
    }
}
