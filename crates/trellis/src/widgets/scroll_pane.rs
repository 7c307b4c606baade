//! Scroll pane: a clipped viewport over a single content widget.
//!
//! The pane owns three children: a clipping content area holding the content, a
//! horizontal and a vertical [`Scrollbar`]. Scrollbars appear only when the content
//! does not fit, unless the theme sets `scrollbarsAlwaysVisible`.
//!
//! Content widgets can customize scrolling by returning one of the capability traits
//! from [`Widget::as_scrollable`], [`Widget::as_auto_scrollable`] or
//! [`Widget::as_custom_page_size`].

use trellis_core::{StateKey, TimerId};
use trellis_core::logging::targets;
use trellis_render::Point;

use super::{Orientation, Scrollbar};
use crate::event::{Event, EventType, Key};
use crate::gui::Gui;
use crate::theme::ThemeInfo;
use crate::widget::{Cx, Widget, WidgetId, compute_size};

pub const STATE_DOWN_ARROW_ARMED: StateKey = StateKey::new("downArrowArmed");
pub const STATE_RIGHT_ARROW_ARMED: StateKey = StateKey::new("rightArrowArmed");
pub const STATE_HORIZONTAL_SCROLLBAR_VISIBLE: StateKey =
    StateKey::new("horizontalScrollbarVisible");
pub const STATE_VERTICAL_SCROLLBAR_VISIBLE: StateKey = StateKey::new("verticalScrollbarVisible");
pub const STATE_AUTO_SCROLL_UP: StateKey = StateKey::new("autoScrollUp");
pub const STATE_AUTO_SCROLL_DOWN: StateKey = StateKey::new("autoScrollDown");

const AUTO_SCROLL_DELAY: i32 = 50;

const CONTENT_AREA: usize = 0;
const HSCROLLBAR: usize = 1;
const VSCROLLBAR: usize = 2;

/// Content that positions its visible part itself.
///
/// The pane then sizes the content to the viewport and forwards the scroll position.
pub trait Scrollable {
    fn set_scroll_position(&mut self, cx: &mut Cx<'_>, x: i32, y: i32);
}

/// Content that decides where dragging near its edge scrolls.
pub trait AutoScrollable {
    /// Returns -1 to scroll up, +1 to scroll down, 0 for no auto scroll.
    fn auto_scroll_direction(&mut self, cx: &mut Cx<'_>, evt: &Event, area: i32) -> i32;
}

/// Content with page sizes that differ from the viewport size.
pub trait CustomPageSize {
    fn page_size_x(&mut self, cx: &mut Cx<'_>, available_width: i32) -> i32;
    fn page_size_y(&mut self, cx: &mut Cx<'_>, available_height: i32) -> i32;
}

/// Axis along which the content follows the viewport size instead of scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fixed {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// The clipping viewport. A distinct type so a content widget can find its pane.
#[derive(Default)]
struct ContentArea;

impl Widget for ContentArea {}

/// A viewport with scrollbars around one content widget.
pub struct ScrollPane {
    initial_content: Option<WidgetId>,
    fixed: Fixed,
    expand_content_size: bool,
    scrollbars_always_visible: bool,
    hscrollbar_offset: Point,
    vscrollbar_offset: Point,
    content_scrollbar_spacing: Point,
    /// Bits 1/2 (horizontal) and 4/8 (vertical) record scrollbars shown or hidden during
    /// the current frame. Both bits set means the bar flipped and is kept visible.
    scrollbars_toggle_flags: u8,
    auto_scroll_area: i32,
    auto_scroll_speed: i32,
    auto_scroll_timer: Option<TimerId>,
    auto_scroll_direction: i32,
}

impl Default for ScrollPane {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ScrollPane {
    /// Create a pane around `content`.
    pub fn new(content: Option<WidgetId>) -> Self {
        Self {
            initial_content: content,
            fixed: Fixed::None,
            expand_content_size: false,
            scrollbars_always_visible: false,
            hscrollbar_offset: Point::ZERO,
            vscrollbar_offset: Point::ZERO,
            content_scrollbar_spacing: Point::ZERO,
            scrollbars_toggle_flags: 0,
            auto_scroll_area: 5,
            auto_scroll_speed: 10,
            auto_scroll_timer: None,
            auto_scroll_direction: 0,
        }
    }

    // =========================================================================
    // Children
    // =========================================================================

    pub fn content_area(gui: &Gui, pane: WidgetId) -> WidgetId {
        gui.child(pane, CONTENT_AREA)
    }

    pub fn horizontal_scrollbar(gui: &Gui, pane: WidgetId) -> WidgetId {
        gui.child(pane, HSCROLLBAR)
    }

    pub fn vertical_scrollbar(gui: &Gui, pane: WidgetId) -> WidgetId {
        gui.child(pane, VSCROLLBAR)
    }

    /// The scrolled widget, if any.
    pub fn content(gui: &Gui, pane: WidgetId) -> Option<WidgetId> {
        gui.children_of(Self::content_area(gui, pane)).first().copied()
    }

    /// Replace the scrolled widget. `None` removes the current content.
    pub fn set_content(gui: &mut Gui, pane: WidgetId, content: Option<WidgetId>) {
        let area = Self::content_area(gui, pane);
        if gui.num_children(area) > 0 {
            gui.remove_all_children(area);
        }
        if let Some(content) = content {
            gui.add(area, content);
        }
        gui.invalidate_layout(pane);
    }

    /// The pane whose content `widget` is.
    pub fn containing_scroll_pane(gui: &Gui, widget: WidgetId) -> Option<WidgetId> {
        let area = gui.parent_of(widget)?;
        gui.widget::<ContentArea>(area)?;
        gui.parent_of(area)
    }

    // =========================================================================
    // Scroll position
    // =========================================================================

    fn bar_value(gui: &Gui, bar: WidgetId, f: fn(&Scrollbar) -> i32) -> i32 {
        gui.widget::<Scrollbar>(bar).map_or(0, f)
    }

    pub fn scroll_position_x(gui: &Gui, pane: WidgetId) -> i32 {
        Self::bar_value(gui, Self::horizontal_scrollbar(gui, pane), Scrollbar::value)
    }

    pub fn scroll_position_y(gui: &Gui, pane: WidgetId) -> i32 {
        Self::bar_value(gui, Self::vertical_scrollbar(gui, pane), Scrollbar::value)
    }

    pub fn max_scroll_pos_x(gui: &Gui, pane: WidgetId) -> i32 {
        Self::bar_value(gui, Self::horizontal_scrollbar(gui, pane), Scrollbar::max_value)
    }

    pub fn max_scroll_pos_y(gui: &Gui, pane: WidgetId) -> i32 {
        Self::bar_value(gui, Self::vertical_scrollbar(gui, pane), Scrollbar::max_value)
    }

    pub fn set_scroll_position_x(gui: &mut Gui, pane: WidgetId, pos: i32) {
        let bar = Self::horizontal_scrollbar(gui, pane);
        gui.with_widget::<Scrollbar, _>(bar, |sb, cx| sb.set_value(cx, pos));
    }

    pub fn set_scroll_position_y(gui: &mut Gui, pane: WidgetId, pos: i32) {
        let bar = Self::vertical_scrollbar(gui, pane);
        gui.with_widget::<Scrollbar, _>(bar, |sb, cx| sb.set_value(cx, pos));
    }

    /// Scroll horizontally so `[start, start + size)` is visible.
    pub fn scroll_to_area_x(gui: &mut Gui, pane: WidgetId, start: i32, size: i32, extra: i32) {
        let bar = Self::horizontal_scrollbar(gui, pane);
        gui.with_widget::<Scrollbar, _>(bar, |sb, cx| sb.scroll_to_area(cx, start, size, extra));
    }

    /// Scroll vertically so `[start, start + size)` is visible.
    pub fn scroll_to_area_y(gui: &mut Gui, pane: WidgetId, start: i32, size: i32, extra: i32) {
        let bar = Self::vertical_scrollbar(gui, pane);
        gui.with_widget::<Scrollbar, _>(bar, |sb, cx| sb.scroll_to_area(cx, start, size, extra));
    }

    pub fn content_area_width(gui: &Gui, pane: WidgetId) -> i32 {
        gui.base_of(Self::content_area(gui, pane)).width()
    }

    pub fn content_area_height(gui: &Gui, pane: WidgetId) -> i32 {
        gui.base_of(Self::content_area(gui, pane)).height()
    }

    /// Lay the pane out now, recomputing scrollbar ranges.
    pub fn update_scrollbar_sizes(gui: &mut Gui, pane: WidgetId) {
        gui.invalidate_layout_locally(pane);
        gui.validate_layout(pane);
    }

    /// Apply the scrollbar values to the content.
    pub fn scroll_content(gui: &mut Gui, pane: WidgetId) {
        let Some(content) = Self::content(gui, pane) else {
            return;
        };
        let x = Self::scroll_position_x(gui, pane);
        let y = Self::scroll_position_y(gui, pane);
        let scrolled = gui.with_behavior(content, |w, cx| match w.as_scrollable() {
            Some(scrollable) => {
                scrollable.set_scroll_position(cx, x, y);
                true
            }
            None => false,
        });
        if !scrolled {
            let area = gui.base_of(Self::content_area(gui, pane));
            let (ax, ay) = (area.x(), area.y());
            gui.set_position(content, ax - x, ay - y);
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn fixed(&self) -> Fixed {
        self.fixed
    }

    pub fn set_fixed(&mut self, cx: &mut Cx<'_>, fixed: Fixed) {
        if self.fixed != fixed {
            self.fixed = fixed;
            let id = cx.id();
            cx.invalidate_layout(id);
        }
    }

    pub fn is_expand_content_size(&self) -> bool {
        self.expand_content_size
    }

    /// Grow the content to fill the viewport when it is smaller.
    pub fn set_expand_content_size(&mut self, cx: &mut Cx<'_>, expand: bool) {
        if self.expand_content_size != expand {
            self.expand_content_size = expand;
            let id = cx.id();
            cx.invalidate_layout_locally(id);
        }
    }

    pub fn is_scrollbars_always_visible(&self) -> bool {
        self.scrollbars_always_visible
    }

    pub fn set_scrollbars_always_visible(&mut self, cx: &mut Cx<'_>, visible: bool) {
        if self.scrollbars_always_visible != visible {
            self.scrollbars_always_visible = visible;
            let id = cx.id();
            cx.invalidate_layout_locally(id);
        }
    }

    // =========================================================================
    // Auto scroll
    // =========================================================================

    /// Start, continue or stop scrolling while something is dragged near the edge.
    ///
    /// Returns `true` while auto scrolling is active.
    pub fn check_auto_scroll(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        if !cx.is_attached(cx.id()) {
            self.stop_auto_scroll(cx);
            return false;
        }
        self.auto_scroll_direction = self.auto_scroll_direction_for(cx, evt);
        if self.auto_scroll_direction == 0 {
            self.stop_auto_scroll(cx);
            return false;
        }
        self.set_auto_scroll_marker(cx);
        let timer = match self.auto_scroll_timer {
            Some(timer) => timer,
            None => {
                let timer = self.create_auto_scroll_timer(cx);
                self.do_auto_scroll(cx);
                timer
            }
        };
        cx.start_timer(timer);
        true
    }

    pub fn stop_auto_scroll(&mut self, cx: &mut Cx<'_>) {
        if let Some(timer) = self.auto_scroll_timer {
            cx.stop_timer(timer);
        }
        self.auto_scroll_direction = 0;
        self.set_auto_scroll_marker(cx);
    }

    fn create_auto_scroll_timer(&mut self, cx: &mut Cx<'_>) -> TimerId {
        let id = cx.id();
        let timer = cx.create_timer();
        cx.set_timer_continuous(timer, true);
        if let Err(err) = cx.set_timer_delay(timer, AUTO_SCROLL_DELAY) {
            tracing::warn!(target: targets::TIMER, %err, "auto scroll delay rejected");
        }
        cx.set_timer_callback(timer, move |gui: &mut Gui| {
            gui.with_widget::<ScrollPane, _>(id, |sp, cx| sp.do_auto_scroll(cx));
        });
        self.auto_scroll_timer = Some(timer);
        timer
    }

    fn auto_scroll_direction_for(&mut self, cx: &mut Cx<'_>, evt: &Event) -> i32 {
        let area_size = self.auto_scroll_area;
        let id = cx.id();
        if let Some(content) = Self::content(cx, id) {
            let custom = cx.with_behavior(content, |w, cx| {
                w.as_auto_scrollable()
                    .map(|auto| auto.auto_scroll_direction(cx, evt, area_size))
            });
            if let Some(direction) = custom {
                return direction;
            }
        }
        let area = cx.base_of(Self::content_area(cx, id));
        if area.is_inside(evt.mouse_x(), evt.mouse_y()) {
            let mouse_y = evt.mouse_y();
            if mouse_y - area.y() <= area_size || area.bottom() - mouse_y <= area_size {
                return if mouse_y < area.y() + area.height() / 2 { -1 } else { 1 };
            }
        }
        0
    }

    fn do_auto_scroll(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let bar = Self::vertical_scrollbar(cx, id);
        let delta = self.auto_scroll_direction * self.auto_scroll_speed;
        cx.with_widget::<Scrollbar, _>(bar, |sb, cx| sb.set_value(cx, sb.value() + delta));
        self.set_auto_scroll_marker(cx);
    }

    fn set_auto_scroll_marker(&self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let pos = Self::scroll_position_y(cx, id);
        let max = Self::max_scroll_pos_y(cx, id);
        let base = cx.base();
        base.set_animation_state(STATE_AUTO_SCROLL_UP, self.auto_scroll_direction < 0 && pos > 0);
        base.set_animation_state(
            STATE_AUTO_SCROLL_DOWN,
            self.auto_scroll_direction > 0 && pos < max,
        );
    }

    // =========================================================================
    // Layout
    // =========================================================================

    fn layout_content(&mut self, cx: &mut Cx<'_>, content: WidgetId) {
        let id = cx.id();
        let area = Self::content_area(cx, id);
        let hbar = Self::horizontal_scrollbar(cx, id);
        let vbar = Self::vertical_scrollbar(cx, id);
        let (inner_x, inner_y, mut inner_width, mut inner_height) = {
            let base = cx.base();
            (base.inner_x(), base.inner_y(), base.inner_width(), base.inner_height())
        };
        let mut avail_width = inner_width;
        let mut avail_height = inner_height;
        inner_width += self.vscrollbar_offset.x;
        inner_height += self.hscrollbar_offset.y;

        let scrollbar_hx = self.hscrollbar_offset.x;
        let mut scrollbar_hy = inner_height;
        let mut scrollbar_vx = inner_width;
        let scrollbar_vy = self.vscrollbar_offset.y;

        let (mut required_width, mut required_height) = match self.fixed {
            Fixed::Horizontal => (avail_width, cx.preferred_height(content)),
            Fixed::Vertical => (cx.preferred_width(content), avail_height),
            Fixed::None => (cx.preferred_width(content), cx.preferred_height(content)),
        };

        let mut hscrollbar_max = 0;
        let mut vscrollbar_max = 0;
        let mut visible_h = false;
        let mut visible_v = false;
        let flags = self.scrollbars_toggle_flags;
        if avail_width > 0 && avail_height > 0 {
            loop {
                let mut repeat = false;
                if self.fixed != Fixed::Horizontal {
                    hscrollbar_max = (required_width - avail_width).max(0);
                    if hscrollbar_max > 0 || self.scrollbars_always_visible || flags & 3 == 3 {
                        repeat |= !visible_h;
                        visible_h = true;
                        scrollbar_hy = inner_height - cx.preferred_height(hbar);
                        avail_height = (scrollbar_hy - self.content_scrollbar_spacing.y).max(0);
                    }
                } else {
                    hscrollbar_max = 0;
                    required_width = avail_width;
                }
                if self.fixed != Fixed::Vertical {
                    vscrollbar_max = (required_height - avail_height).max(0);
                    if vscrollbar_max > 0 || self.scrollbars_always_visible || flags & 12 == 12 {
                        repeat |= !visible_v;
                        visible_v = true;
                        scrollbar_vx = inner_width - cx.preferred_width(vbar);
                        avail_width = (scrollbar_vx - self.content_scrollbar_spacing.x).max(0);
                    }
                } else {
                    vscrollbar_max = 0;
                    required_height = avail_height;
                }
                if !repeat {
                    break;
                }
            }
        }

        let was_visible_h = cx.base_of(hbar).is_visible();
        let was_visible_v = cx.base_of(vbar).is_visible();
        if visible_h && !was_visible_h {
            self.scrollbars_toggle_flags |= 1;
        }
        if !visible_h && was_visible_h {
            self.scrollbars_toggle_flags |= 2;
        }
        if visible_v && !was_visible_v {
            self.scrollbars_toggle_flags |= 4;
        }
        if !visible_v && was_visible_v {
            self.scrollbars_toggle_flags |= 8;
        }
        let changed_h = visible_h != was_visible_h;
        let changed_v = visible_v != was_visible_v;
        if changed_h || changed_v {
            if (changed_h && self.fixed == Fixed::Vertical)
                || (changed_v && self.fixed == Fixed::Horizontal)
            {
                cx.invalidate_layout(id);
            } else {
                cx.invalidate_layout_locally(id);
            }
        }

        let custom_page = cx.with_behavior(content, |w, cx| {
            w.as_custom_page_size().map(|custom| {
                (
                    custom.page_size_x(cx, avail_width),
                    custom.page_size_y(cx, avail_height),
                )
            })
        });
        let (page_x, page_y) = custom_page.unwrap_or((avail_width, avail_height));

        cx.set_visible(hbar, visible_h);
        cx.with_widget::<Scrollbar, _>(hbar, |sb, cx| {
            sb.set_min_max_value(cx, 0, hscrollbar_max);
            sb.set_page_size(cx, page_x.max(1));
            sb.set_step_size((page_x / 10).max(1));
        });
        cx.set_size(
            hbar,
            (scrollbar_vx - scrollbar_hx).max(0),
            (inner_height - scrollbar_hy).max(0),
        );
        cx.set_position(hbar, inner_x + scrollbar_hx, inner_y + scrollbar_hy);

        cx.set_visible(vbar, visible_v);
        cx.with_widget::<Scrollbar, _>(vbar, |sb, cx| {
            sb.set_min_max_value(cx, 0, vscrollbar_max);
            sb.set_page_size(cx, page_y.max(1));
            sb.set_step_size((page_y / 10).max(1));
        });
        cx.set_size(
            vbar,
            (inner_width - scrollbar_vx).max(0),
            (scrollbar_hy - scrollbar_vy).max(0),
        );
        cx.set_position(vbar, inner_x + scrollbar_vx, inner_y + scrollbar_vy);

        cx.set_position(area, inner_x, inner_y);
        cx.set_size(area, avail_width, avail_height);

        let scrollable = cx.with_behavior(content, |w, _cx| w.as_scrollable().is_some());
        if scrollable {
            cx.set_position(content, inner_x, inner_y);
            cx.set_size(content, avail_width, avail_height);
        } else if self.expand_content_size {
            cx.set_size(
                content,
                avail_width.max(required_width),
                avail_height.max(required_height),
            );
        } else {
            cx.set_size(content, required_width.max(0), required_height.max(0));
        }

        let base = cx.base();
        base.set_animation_state(STATE_HORIZONTAL_SCROLLBAR_VISIBLE, visible_h);
        base.set_animation_state(STATE_VERTICAL_SCROLLBAR_VISIBLE, visible_v);
        Self::scroll_content(cx, id);
    }

    fn scrollbar_visible(cx: &Cx<'_>, index: usize) -> bool {
        cx.base_of(cx.child(cx.id(), index)).is_visible()
    }
}

impl Widget for ScrollPane {
    fn created(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let area = cx.create(ContentArea);
        let hbar = cx.create(Scrollbar::new(Orientation::Horizontal));
        let vbar = cx.create(Scrollbar::new(Orientation::Vertical));
        cx.base_of_mut(area).set_clip(true);
        cx.set_theme(area, "");
        for (index, child) in [area, hbar, vbar].into_iter().enumerate() {
            if child != area {
                cx.set_visible(child, false);
                let signal_pane = id;
                if let Some(sb) = cx.widget::<Scrollbar>(child) {
                    sb.position_changed
                        .connect(move |gui, _| Self::scroll_content(gui, signal_pane));
                }
            }
            cx.insert_child(id, child, index);
        }
        if let Some(content) = self.initial_content.take() {
            cx.add(area, content);
        }
        cx.base_mut().set_can_accept_keyboard_focus(true);
    }

    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        self.auto_scroll_area = theme.get_int("autoScrollArea", 5);
        self.auto_scroll_speed = theme.get_int("autoScrollSpeed", self.auto_scroll_area * 2);
        self.hscrollbar_offset = theme.get_point("hscrollbarOffset", Point::ZERO);
        self.vscrollbar_offset = theme.get_point("vscrollbarOffset", Point::ZERO);
        self.content_scrollbar_spacing = theme.get_point("contentScrollbarSpacing", Point::ZERO);
        self.scrollbars_always_visible = theme.get_bool("scrollbarsAlwaysVisible", false);
    }

    fn before_remove_from_gui(&mut self, cx: &mut Cx<'_>) {
        if let Some(timer) = self.auto_scroll_timer.take()
            && let Err(err) = cx.remove_timer(timer)
        {
            tracing::warn!(target: targets::TIMER, %err, "auto scroll timer already gone");
        }
        self.auto_scroll_direction = 0;
    }

    fn min_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let id = cx.id();
        let mut min_width = cx.base().min_width();
        if self.fixed == Fixed::Horizontal
            && let Some(content) = Self::content(cx, id)
        {
            let vbar = Self::vertical_scrollbar(cx, id);
            let bar_width = if Self::scrollbar_visible(cx, VSCROLLBAR) {
                cx.min_width(vbar)
            } else {
                0
            };
            let border = cx.base().border().horizontal();
            min_width = min_width.max(cx.min_width(content) + border + bar_width);
        }
        min_width
    }

    fn min_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let id = cx.id();
        let mut min_height = cx.base().min_height();
        if self.fixed == Fixed::Vertical
            && let Some(content) = Self::content(cx, id)
        {
            let hbar = Self::horizontal_scrollbar(cx, id);
            let bar_height = if Self::scrollbar_visible(cx, HSCROLLBAR) {
                cx.min_height(hbar)
            } else {
                0
            };
            let border = cx.base().border().vertical();
            min_height = min_height.max(cx.min_height(content) + border + bar_height);
        }
        min_height
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let id = cx.id();
        let Some(content) = Self::content(cx, id) else {
            return 0;
        };
        match self.fixed {
            Fixed::Horizontal => {
                let mut width = compute_size(
                    cx.min_width(content),
                    cx.preferred_width(content),
                    cx.max_width(content),
                );
                if Self::scrollbar_visible(cx, VSCROLLBAR) {
                    let vbar = Self::vertical_scrollbar(cx, id);
                    width += cx.preferred_width(vbar);
                }
                width
            }
            Fixed::Vertical => cx.preferred_width(content),
            Fixed::None => 0,
        }
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let id = cx.id();
        let Some(content) = Self::content(cx, id) else {
            return 0;
        };
        match self.fixed {
            Fixed::Horizontal => cx.preferred_height(content),
            Fixed::Vertical => {
                let mut height = compute_size(
                    cx.min_height(content),
                    cx.preferred_height(content),
                    cx.max_height(content),
                );
                if Self::scrollbar_visible(cx, HSCROLLBAR) {
                    let hbar = Self::horizontal_scrollbar(cx, id);
                    height += cx.preferred_height(hbar);
                }
                height
            }
            Fixed::None => 0,
        }
    }

    fn child_invalidate_layout(&mut self, cx: &mut Cx<'_>, child: WidgetId) {
        let id = cx.id();
        if child == Self::content_area(cx, id) {
            cx.invalidate_layout_locally(id);
        } else {
            cx.invalidate_layout(id);
        }
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        self.scrollbars_toggle_flags = 0;
        let id = cx.id();
        let down_armed = cx
            .widget::<Scrollbar>(Self::vertical_scrollbar(cx, id))
            .is_some_and(Scrollbar::is_down_right_button_armed);
        let right_armed = cx
            .widget::<Scrollbar>(Self::horizontal_scrollbar(cx, id))
            .is_some_and(Scrollbar::is_down_right_button_armed);
        let base = cx.base();
        base.set_animation_state(STATE_DOWN_ARROW_ARMED, down_armed);
        base.set_animation_state(STATE_RIGHT_ARROW_ARMED, right_armed);
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        match Self::content(cx, id) {
            Some(content) => self.layout_content(cx, content),
            None => {
                let hbar = Self::horizontal_scrollbar(cx, id);
                let vbar = Self::vertical_scrollbar(cx, id);
                cx.set_visible(hbar, false);
                cx.set_visible(vbar, false);
            }
        }
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let id = cx.id();
        let content = Self::content(cx, id);
        if evt.is_key_event()
            && let Some(content) = content
            && cx.base_of(content).can_accept_keyboard_focus()
            && cx.handle_event(content, evt)
        {
            cx.request_keyboard_focus(content);
            return true;
        }
        if cx.default_handle_event(evt) || self.handle_mapped_key(cx, evt) {
            return true;
        }
        match evt.event_type() {
            EventType::KeyPressed | EventType::KeyReleased => match evt.key_code() {
                Key::ArrowLeft | Key::ArrowRight => {
                    let hbar = Self::horizontal_scrollbar(cx, id);
                    cx.handle_event(hbar, evt)
                }
                Key::ArrowUp | Key::ArrowDown | Key::PageUp | Key::PageDown => {
                    let vbar = Self::vertical_scrollbar(cx, id);
                    cx.handle_event(vbar, evt)
                }
                _ => false,
            },
            EventType::MouseWheel => {
                let vbar = Self::vertical_scrollbar(cx, id);
                cx.base_of(vbar).is_visible() && cx.handle_event(vbar, evt)
            }
            _ => {
                evt.is_mouse_event()
                    && cx
                        .base_of(Self::content_area(cx, id))
                        .is_inside(evt.mouse_x(), evt.mouse_y())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;
    use crate::widget::Container;

    /// A content widget with a fixed preferred size.
    struct FixedSize(i32, i32);

    impl Widget for FixedSize {
        fn preferred_width(&mut self, _cx: &mut Cx<'_>) -> i32 {
            self.0
        }

        fn preferred_height(&mut self, _cx: &mut Cx<'_>) -> i32 {
            self.1
        }
    }

    fn pane_with(content_w: i32, content_h: i32) -> (Gui, WidgetId, WidgetId) {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(400, 400)), GuiConfig::default());
        let content = gui.create(FixedSize(content_w, content_h));
        let pane = gui.create(ScrollPane::new(Some(content)));
        let root = gui.root_pane();
        gui.add(root, pane);
        gui.set_size(pane, 100, 100);
        gui.validate_layout(pane);
        (gui, pane, content)
    }

    #[test]
    fn test_small_content_needs_no_scrollbars() {
        let (gui, pane, content) = pane_with(50, 50);
        assert!(!gui.base_of(ScrollPane::horizontal_scrollbar(&gui, pane)).is_visible());
        assert!(!gui.base_of(ScrollPane::vertical_scrollbar(&gui, pane)).is_visible());
        assert_eq!(ScrollPane::content(&gui, pane), Some(content));
        assert_eq!(ScrollPane::content_area_width(&gui, pane), 100);
    }

    #[test]
    fn test_tall_content_shows_vertical_scrollbar() {
        let (gui, pane, _content) = pane_with(50, 300);
        assert!(gui.base_of(ScrollPane::vertical_scrollbar(&gui, pane)).is_visible());
        assert!(!gui.base_of(ScrollPane::horizontal_scrollbar(&gui, pane)).is_visible());
        assert_eq!(ScrollPane::max_scroll_pos_y(&gui, pane), 200);
    }

    #[test]
    fn test_scrolling_moves_content() {
        let (mut gui, pane, content) = pane_with(50, 300);
        let top = gui.base_of(ScrollPane::content_area(&gui, pane)).y();
        ScrollPane::set_scroll_position_y(&mut gui, pane, 40);
        assert_eq!(ScrollPane::scroll_position_y(&gui, pane), 40);
        assert_eq!(gui.base_of(content).y(), top - 40);

        ScrollPane::scroll_to_area_y(&mut gui, pane, 0, 10, 0);
        assert_eq!(gui.base_of(content).y(), top);
    }

    #[test]
    fn test_wheel_scrolls_vertically() {
        let (mut gui, pane, _content) = pane_with(50, 300);
        let wheel = Event::mouse(EventType::MouseWheel, 10, 10).with_wheel_delta(-1);
        assert!(gui.handle_event(pane, &wheel));
        assert!(ScrollPane::scroll_position_y(&gui, pane) > 0);
    }

    #[test]
    fn test_containing_scroll_pane() {
        let (mut gui, pane, content) = pane_with(10, 10);
        assert_eq!(ScrollPane::containing_scroll_pane(&gui, content), Some(pane));
        let other = gui.create(Container);
        let root = gui.root_pane();
        gui.add(root, other);
        assert_eq!(ScrollPane::containing_scroll_pane(&gui, other), None);
    }

    #[test]
    fn test_replacing_content() {
        let (mut gui, pane, old) = pane_with(10, 10);
        let new = gui.create(FixedSize(20, 20));
        ScrollPane::set_content(&mut gui, pane, Some(new));
        assert_eq!(ScrollPane::content(&gui, pane), Some(new));
        assert_eq!(gui.parent_of(old), None);
    }
}
