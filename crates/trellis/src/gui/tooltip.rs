//! Tooltips and mouse idle tracking.

use trellis_core::StateKey;
use trellis_core::logging::targets;
use trellis_render::{Color, Rect};

use super::Gui;
use crate::theme::ThemeInfo;
use crate::widget::{Cx, TooltipContent, Widget, WidgetId};

/// Animation state reset each time the tooltip window is shown.
pub const STATE_FADE: StateKey = StateKey::new("fade");

#[derive(Debug, Default)]
pub(crate) struct TooltipState {
    /// Last mouse input; the tooltip delay counts from here.
    pub(crate) event_time: i64,
    pub(crate) had_open: bool,
    pub(crate) closed_time: i64,
    pub(crate) owner: Option<WidgetId>,
    pub(crate) mouse_idle: bool,
}

/// The window tooltips are shown in. It fades in over the theme's `fadeInTime`.
#[derive(Debug)]
pub struct TooltipWindow {
    text: String,
    text_color: Color,
    fade_in_time: i32,
}

impl Default for TooltipWindow {
    fn default() -> Self {
        Self {
            text: String::new(),
            text_color: Color::BLACK,
            fade_in_time: 0,
        }
    }
}

impl TooltipWindow {
    /// The text currently shown; empty while a widget is shown instead.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Widget for TooltipWindow {
    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        self.fade_in_time = theme.get_int("fadeInTime", 0);
        self.text_color = theme.get_color("textColor", Color::BLACK);
    }

    fn visibility_changed(&mut self, cx: &mut Cx<'_>, _visible: bool) {
        cx.base().animation_state().borrow_mut().reset_animation_time(STATE_FADE);
    }

    fn preferred_inner_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        if self.text.is_empty() {
            return cx.default_preferred_inner_width();
        }
        cx.font().compute_multi_line_text_width(&self.text)
    }

    fn preferred_inner_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        if self.text.is_empty() {
            return cx.default_preferred_inner_height();
        }
        cx.font().line_height() * self.text.lines().count().max(1) as i32
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        for child in cx.children_vec() {
            cx.layout_child_full_inner_area(id, child);
        }
    }

    fn paint(&mut self, cx: &mut Cx<'_>) {
        let time = cx.base().animation_state().borrow().animation_time(STATE_FADE);
        let fading = time < self.fade_in_time;
        if fading {
            let alpha = time as f32 / self.fade_in_time as f32;
            cx.renderer_mut().push_tint(Color::WHITE.with_alpha(alpha));
        }
        cx.paint_background();
        self.paint_widget(cx);
        cx.paint_children();
        cx.paint_overlay();
        if fading {
            cx.renderer_mut().pop_tint();
        }
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        if self.text.is_empty() {
            return;
        }
        let Rect { x, mut y, .. } = cx.base().inner_rect();
        let line_height = cx.font().line_height();
        for line in self.text.lines() {
            cx.draw_text(self.text_color, x, y, line);
            y += line_height;
        }
    }
}

impl Gui {
    /// Show or hide the tooltip for the widget under the mouse and track mouse idleness.
    pub(crate) fn handle_tooltips(&mut self) {
        let now = self.current_time();
        let under = self.widget_under_mouse();
        if self.tooltip.owner != Some(under) {
            let delay = self.config().tooltip_delay_ms();
            let reappear = self.config().tooltip_reappear_delay_ms();
            if now - self.tooltip.event_time > delay
                || (self.tooltip.had_open && now - self.tooltip.closed_time < reappear)
            {
                let (x, y) = (self.event.mouse_x, self.event.mouse_y);
                let content = self.with_behavior(under, |w, cx| w.tooltip_content_at(cx, x, y));
                let (dx, dy) = self.config().tooltip_offset;
                self.set_tooltip(x + dx, y + dy, under, content);
            } else {
                self.hide_tooltip();
            }
        }

        let idle_ms = self.config().mouse_idle_ms();
        let idle = now - self.mouse.event_time > idle_ms;
        if self.tooltip.mouse_idle != idle {
            self.tooltip.mouse_idle = idle;
            if let Some(mut listener) = self.mouse_idle_listener.take() {
                listener(self, idle);
                if self.mouse_idle_listener.is_none() {
                    self.mouse_idle_listener = Some(listener);
                }
            }
        }
    }

    /// Whether the mouse has not moved for the configured idle time.
    pub fn is_mouse_idle(&self) -> bool {
        self.tooltip.mouse_idle
    }

    /// The widget whose tooltip is shown.
    pub fn tooltip_owner(&self) -> Option<WidgetId> {
        self.tooltip.owner
    }

    pub fn tooltip_window(&self) -> WidgetId {
        self.tooltip_window
    }

    /// Forget the shown tooltip of `widget` so the next frame asks it again.
    ///
    /// With `reset_timer` the tooltip is also hidden and the delay restarts.
    pub(crate) fn request_tooltip_update(&mut self, widget: WidgetId, reset_timer: bool) {
        if self.tooltip.owner != Some(widget) {
            return;
        }
        self.tooltip.owner = None;
        if reset_timer {
            self.hide_tooltip();
            self.tooltip.had_open = false;
            self.tooltip.event_time = self.current_time();
        }
    }

    pub(crate) fn hide_tooltip(&mut self) {
        let window = self.tooltip_window;
        if self.base_of(window).is_visible() {
            self.tooltip.closed_time = self.current_time();
            self.tooltip.had_open = true;
        }
        self.set_visible(window, false);
        self.tooltip.owner = None;
        if self.num_children(window) > 0 {
            self.remove_all_children(window);
        }
    }

    fn set_tooltip(&mut self, x: i32, y: i32, widget: WidgetId, content: Option<TooltipContent>) {
        let window = self.tooltip_window;
        match content {
            None => {
                self.hide_tooltip();
                return;
            }
            Some(TooltipContent::Text(text)) => {
                if text.is_empty() {
                    self.hide_tooltip();
                    return;
                }
                if self.num_children(window) > 0 {
                    self.remove_all_children(window);
                }
                if let Some(tooltip) = self.widget_mut::<TooltipWindow>(window) {
                    tooltip.text = text;
                }
                self.invalidate_layout(window);
            }
            Some(TooltipContent::Widget(content)) => {
                let parent = self.parent_of(content);
                if parent.is_some_and(|parent| parent != window) {
                    tracing::warn!(target: targets::POPUP, ?content, "tooltip widget already has a parent");
                    self.hide_tooltip();
                    return;
                }
                if let Some(tooltip) = self.widget_mut::<TooltipWindow>(window) {
                    tooltip.text.clear();
                }
                if parent.is_none() {
                    self.remove_all_children(window);
                    self.add(window, content);
                }
            }
        }

        self.adjust_size(window);
        if self.is_layout_invalid(window) {
            self.adjust_size(window);
        }
        let (width, height) = {
            let base = self.base_of(window);
            (base.width(), base.height())
        };
        let root = self.base_of(self.root());
        let (root_width, root_height) = (root.width(), root.height());

        // Anchored at its bottom left corner.
        let mut y = y - height;
        let mut x = x;
        if x + width > root_width {
            x = root_width - width;
        }
        if y + height > root_height {
            y = root_height - height;
        }
        x = x.max(0);
        y = y.max(0);

        self.tooltip.owner = Some(widget);
        self.set_position(window, x, y);
        self.set_visible(window, true);
    }
}
