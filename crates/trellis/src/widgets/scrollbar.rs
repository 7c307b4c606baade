//! Scrollbar widget.
//!
//! A [`Scrollbar`] has two step buttons and a draggable thumb as children. Pressing and
//! holding a button or the track repeats the step through a GUI timer.
//!
//! Operations that move the thumb take the scrollbar's [`Cx`]. From application code
//! reach them through [`Gui::with_widget`]:
//!
//! ```
//! use trellis::widgets::{Orientation, Scrollbar};
//! use trellis::{Gui, GuiConfig};
//! use trellis_render::HeadlessRenderer;
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(100, 100)), GuiConfig::default());
//! let bar = gui.create(Scrollbar::new(Orientation::Vertical));
//! gui.with_widget::<Scrollbar, _>(bar, |sb, cx| {
//!     sb.set_min_max_value(cx, 0, 50);
//!     sb.set_value(cx, 80);
//! });
//! assert_eq!(gui.widget::<Scrollbar>(bar).map(Scrollbar::value), Some(50));
//! ```

use std::rc::Rc;

use trellis_core::TimerId;
use trellis_core::logging::targets;
use trellis_render::{Image, Rect};

use super::{Orientation, STATE_ARMED, STATE_HOVER, STATE_PRESSED};
use crate::event::{Event, EventType, Key, ModifierMask, MouseButton};
use crate::gui::Gui;
use crate::signal::Signal;
use crate::theme::ThemeInfo;
use crate::widget::{Cx, Widget, WidgetId};

const INITIAL_DELAY: i32 = 300;
const REPEAT_DELAY: i32 = 75;

/// A horizontal or vertical scrollbar.
pub struct Scrollbar {
    orientation: Orientation,
    up_left: WidgetId,
    down_right: WidgetId,
    thumb: WidgetId,
    up_left_armed: bool,
    down_right_armed: bool,
    thumb_dragged: bool,
    drag_start_value: i32,
    timer: Option<TimerId>,
    /// -1 or +1 while the track is held above/below the thumb.
    track_clicked: i32,
    track_click_limit: i32,
    track_image_up_left: Option<Rc<dyn Image>>,
    track_image_down_right: Option<Rc<dyn Image>>,
    page_size: i32,
    step_size: i32,
    scale_thumb: bool,
    min_value: i32,
    max_value: i32,
    value: i32,

    /// Emitted with the new value whenever the value changes.
    pub position_changed: Signal<i32>,
}

impl Scrollbar {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            up_left: WidgetId::default(),
            down_right: WidgetId::default(),
            thumb: WidgetId::default(),
            up_left_armed: false,
            down_right_armed: false,
            thumb_dragged: false,
            drag_start_value: 0,
            timer: None,
            track_clicked: 0,
            track_click_limit: 0,
            track_image_up_left: None,
            track_image_down_right: None,
            page_size: 10,
            step_size: 1,
            scale_thumb: false,
            min_value: 0,
            max_value: 100,
            value: 0,
            position_changed: Signal::new(),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    // =========================================================================
    // Value and Range
    // =========================================================================

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Set the value, clamped to the range, and emit `position_changed`.
    pub fn set_value(&mut self, cx: &mut Cx<'_>, value: i32) {
        self.set_value_with(cx, value, true);
    }

    /// Set the value, emitting `position_changed` only if `notify` is set.
    pub fn set_value_with(&mut self, cx: &mut Cx<'_>, value: i32, notify: bool) {
        let value = self.range(value);
        if self.value == value {
            return;
        }
        self.value = value;
        self.set_thumb_pos(cx);
        if notify {
            self.position_changed.emit(cx, value);
        }
    }

    /// Move the value by `amount` towards the maximum.
    pub fn scroll(&mut self, cx: &mut Cx<'_>, amount: i32) {
        if self.min_value < self.max_value {
            self.set_value(cx, self.value + amount);
        } else {
            self.set_value(cx, self.value - amount);
        }
    }

    /// Scroll the minimum amount needed to show `[start, start + size)` plus `extra`
    /// on both sides. An area larger than a page is centered instead.
    pub fn scroll_to_area(&mut self, cx: &mut Cx<'_>, start: i32, size: i32, extra: i32) {
        if size <= 0 {
            return;
        }
        let extra = extra.max(0);
        let end = start + size;
        let start = self.range(start);
        let mut pos = self.value;

        let start_with_extra = self.range(start - extra);
        if start_with_extra < pos {
            pos = start_with_extra;
        }
        let page_end = pos + self.page_size;
        let end_with_extra = end + extra;
        if end_with_extra > page_end {
            pos = self.range(end_with_extra - self.page_size);
            if pos > start_with_extra {
                let size = end - start;
                pos = start - (self.page_size - size).max(0) / 2;
            }
        }
        self.set_value(cx, pos);
    }

    pub fn min_value(&self) -> i32 {
        self.min_value
    }

    pub fn max_value(&self) -> i32 {
        self.max_value
    }

    /// Set the range. The thumb is hidden while the range is empty.
    ///
    /// # Panics
    ///
    /// Panics if `max_value < min_value`.
    pub fn set_min_max_value(&mut self, cx: &mut Cx<'_>, min_value: i32, max_value: i32) {
        assert!(max_value >= min_value, "max_value < min_value");
        self.min_value = min_value;
        self.max_value = max_value;
        self.value = self.range(self.value);
        self.set_thumb_pos(cx);
        let thumb = self.thumb;
        cx.set_visible(thumb, min_value != max_value);
    }

    pub fn page_size(&self) -> i32 {
        self.page_size
    }

    /// # Panics
    ///
    /// Panics if `page_size < 1`.
    pub fn set_page_size(&mut self, cx: &mut Cx<'_>, page_size: i32) {
        assert!(page_size >= 1, "page_size < 1");
        self.page_size = page_size;
        if self.scale_thumb {
            self.set_thumb_pos(cx);
        }
    }

    pub fn step_size(&self) -> i32 {
        self.step_size
    }

    /// # Panics
    ///
    /// Panics if `step_size < 1`.
    pub fn set_step_size(&mut self, step_size: i32) {
        assert!(step_size >= 1, "step_size < 1");
        self.step_size = step_size;
    }

    pub fn is_scale_thumb(&self) -> bool {
        self.scale_thumb
    }

    /// Scale the thumb with the ratio of page size to range.
    pub fn set_scale_thumb(&mut self, cx: &mut Cx<'_>, scale_thumb: bool) {
        self.scale_thumb = scale_thumb;
        self.set_thumb_pos(cx);
    }

    pub fn is_up_left_button_armed(&self) -> bool {
        self.up_left_armed
    }

    pub fn is_down_right_button_armed(&self) -> bool {
        self.down_right_armed
    }

    pub fn is_thumb_dragged(&self) -> bool {
        self.thumb_dragged
    }

    pub fn thumb(&self) -> WidgetId {
        self.thumb
    }

    fn range(&self, value: i32) -> i32 {
        if self.min_value < self.max_value {
            value.clamp(self.min_value, self.max_value)
        } else {
            value.clamp(self.max_value, self.min_value)
        }
    }

    // =========================================================================
    // Repeat timer
    // =========================================================================

    fn on_timer(&mut self, cx: &mut Cx<'_>, next_delay: i32) {
        if let Some(timer) = self.timer
            && let Err(err) = cx.set_timer_delay(timer, next_delay)
        {
            tracing::warn!(target: targets::TIMER, %err, "scrollbar repeat delay rejected");
        }
        if self.track_clicked != 0 {
            let thumb = cx.base_of(self.thumb);
            let thumb_pos = match self.orientation {
                Orientation::Horizontal => thumb.x(),
                Orientation::Vertical => thumb.y(),
            };
            if (self.track_click_limit - thumb_pos) * self.track_clicked > 0 {
                self.scroll(cx, self.track_clicked * self.page_size);
            }
        } else if self.up_left_armed {
            self.scroll(cx, -self.step_size);
        } else if self.down_right_armed {
            self.scroll(cx, self.step_size);
        }
    }

    fn update_timer(&mut self, cx: &mut Cx<'_>) {
        let Some(timer) = self.timer else {
            return;
        };
        if self.track_clicked != 0 || self.up_left_armed || self.down_right_armed {
            if !cx.is_timer_running(timer) {
                self.on_timer(cx, INITIAL_DELAY);
                cx.start_timer(timer);
            }
        } else {
            cx.stop_timer(timer);
        }
    }

    fn button_armed(&mut self, cx: &mut Cx<'_>, direction: i32, armed: bool) {
        if direction < 0 {
            self.up_left_armed = armed;
        } else {
            self.down_right_armed = armed;
        }
        self.update_timer(cx);
    }

    // =========================================================================
    // Thumb dragging
    // =========================================================================

    fn drag_started(&mut self) {
        self.thumb_dragged = true;
        self.drag_start_value = self.value;
    }

    fn dragged(&mut self, cx: &mut Cx<'_>, dx: i32, dy: i32) {
        let mouse_delta = match self.orientation {
            Orientation::Horizontal => dx,
            Orientation::Vertical => dy,
        };
        let area = self.calc_thumb_area(cx);
        let delta = (self.max_value - self.min_value) * mouse_delta / area;
        let value = self.range(self.drag_start_value + delta);
        self.set_value(cx, value);
    }

    fn drag_stopped(&mut self) {
        self.thumb_dragged = false;
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    fn calc_thumb_area(&self, cx: &Cx<'_>) -> i32 {
        let base = cx.base();
        let (up, down, thumb) = (
            cx.base_of(self.up_left),
            cx.base_of(self.down_right),
            cx.base_of(self.thumb),
        );
        let area = match self.orientation {
            Orientation::Horizontal => {
                base.width() - up.width() - thumb.width() - down.width()
            }
            Orientation::Vertical => {
                base.height() - up.height() - thumb.height() - down.height()
            }
        };
        area.max(1)
    }

    fn set_thumb_pos(&mut self, cx: &mut Cx<'_>) {
        let delta = self.max_value - self.min_value;
        let thumb = self.thumb;
        let (x, y, width, height) = {
            let base = cx.base();
            (base.x(), base.y(), base.width(), base.height())
        };
        let up = cx.base_of(self.up_left).rect();
        let down = cx.base_of(self.down_right).rect();
        match self.orientation {
            Orientation::Horizontal => {
                let mut thumb_width = cx.preferred_width(thumb);
                if self.scale_thumb {
                    let avail = i64::from((width - up.width - down.width).max(1));
                    let scaled = avail * i64::from(self.page_size)
                        / i64::from(self.page_size + delta + 1);
                    thumb_width = thumb_width.max(scaled as i32);
                }
                cx.set_size(thumb, thumb_width, height);
                let mut xpos = up.x + up.width;
                if delta != 0 {
                    xpos += (self.value - self.min_value) * self.calc_thumb_area(cx) / delta;
                }
                cx.set_position(thumb, xpos, y);
            }
            Orientation::Vertical => {
                let mut thumb_height = cx.preferred_height(thumb);
                if self.scale_thumb {
                    let avail = i64::from((height - up.height - down.height).max(1));
                    let scaled = avail * i64::from(self.page_size)
                        / i64::from(self.page_size + delta + 1);
                    thumb_height = thumb_height.max(scaled as i32);
                }
                cx.set_size(thumb, width, thumb_height);
                let mut ypos = up.y + up.height;
                if delta != 0 {
                    ypos += (self.value - self.min_value) * self.calc_thumb_area(cx) / delta;
                }
                cx.set_position(thumb, x, ypos);
            }
        }
    }
}

impl Widget for Scrollbar {
    fn default_theme(&self) -> String {
        match self.orientation {
            Orientation::Horizontal => "hscrollbar".to_owned(),
            Orientation::Vertical => "vscrollbar".to_owned(),
        }
    }

    fn created(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let (up_theme, down_theme) = match self.orientation {
            Orientation::Horizontal => ("leftbutton", "rightbutton"),
            Orientation::Vertical => ("upbutton", "downbutton"),
        };
        self.up_left = cx.create(ScrollbarButton::new(-1));
        self.down_right = cx.create(ScrollbarButton::new(1));
        self.thumb = cx.create(ScrollbarThumb::default());
        for (child, theme) in [
            (self.up_left, up_theme),
            (self.down_right, down_theme),
            (self.thumb, "thumb"),
        ] {
            cx.set_theme(child, theme);
            cx.base_of_mut(child).set_can_accept_keyboard_focus(false);
            cx.add(id, child);
        }
        cx.set_size(id, 30, 200);
        cx.base_mut().set_depth_focus_traversal(false);
    }

    fn after_add_to_gui(&mut self, cx: &mut Cx<'_>) {
        let id = cx.id();
        let timer = cx.create_timer();
        cx.set_timer_callback(timer, move |gui: &mut Gui| {
            gui.with_widget::<Scrollbar, _>(id, |sb, cx| sb.on_timer(cx, REPEAT_DELAY));
        });
        cx.set_timer_continuous(timer, true);
        self.timer = Some(timer);
    }

    fn before_remove_from_gui(&mut self, cx: &mut Cx<'_>) {
        if let Some(timer) = self.timer.take()
            && let Err(err) = cx.remove_timer(timer)
        {
            tracing::warn!(target: targets::TIMER, %err, "scrollbar timer already gone");
        }
    }

    fn apply_theme(&mut self, cx: &mut Cx<'_>, theme: &dyn ThemeInfo) {
        cx.default_apply_theme(theme);
        let scale = theme.get_bool("scaleThumb", false);
        self.set_scale_thumb(cx, scale);
        let (up, down) = match self.orientation {
            Orientation::Horizontal => ("trackImageLeft", "trackImageRight"),
            Orientation::Vertical => ("trackImageUp", "trackImageDown"),
        };
        self.track_image_up_left = theme.get_image(up);
        self.track_image_down_right = theme.get_image(down);
    }

    fn paint_widget(&mut self, cx: &mut Cx<'_>) {
        let inner = cx.base().inner_rect();
        let thumb = cx.base_of(self.thumb).rect();
        let (before, after) = match self.orientation {
            Orientation::Horizontal => (
                Rect::new(inner.x, inner.y, thumb.x - inner.x, inner.height),
                Rect::new(
                    thumb.right(),
                    inner.y,
                    inner.right() - thumb.right(),
                    inner.height,
                ),
            ),
            Orientation::Vertical => (
                Rect::new(inner.x, inner.y, inner.width, thumb.y - inner.y),
                Rect::new(
                    inner.x,
                    thumb.bottom(),
                    inner.width,
                    inner.bottom() - thumb.bottom(),
                ),
            ),
        };
        if let Some(image) = self.track_image_up_left.clone() {
            cx.draw_image(&image, before);
        }
        if let Some(image) = self.track_image_down_right.clone() {
            cx.draw_image(&image, after);
        }
    }

    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let left_button = evt.mouse_button() == Some(MouseButton::Left);
        if evt.event_type() == EventType::MouseBtnUp && left_button {
            self.track_clicked = 0;
            self.update_timer(cx);
        }
        if !cx.default_handle_event(evt)
            && evt.event_type() == EventType::MouseBtnDown
            && left_button
            && cx.base().is_inside(evt.mouse_x(), evt.mouse_y())
        {
            let thumb = cx.base_of(self.thumb);
            let (limit, thumb_pos) = match self.orientation {
                Orientation::Horizontal => (evt.mouse_x(), thumb.x()),
                Orientation::Vertical => (evt.mouse_y(), thumb.y()),
            };
            self.track_click_limit = limit;
            self.track_clicked = if limit < thumb_pos { -1 } else { 1 };
            self.update_timer(cx);
        }

        let page = evt.modifiers().intersects(ModifierMask::CTRL);
        let step = if page { self.page_size } else { self.step_size };
        if evt.event_type() == EventType::KeyPressed {
            let horizontal = self.orientation == Orientation::Horizontal;
            let delta = match evt.key_code() {
                Key::ArrowLeft if horizontal => Some(-step),
                Key::ArrowRight if horizontal => Some(step),
                Key::ArrowUp if !horizontal => Some(-step),
                Key::ArrowDown if !horizontal => Some(step),
                Key::PageUp if !horizontal => Some(-self.page_size),
                Key::PageDown if !horizontal => Some(self.page_size),
                _ => None,
            };
            if let Some(delta) = delta {
                self.set_value(cx, self.value + delta);
                return true;
            }
        }
        if evt.event_type() == EventType::MouseWheel {
            self.set_value(cx, self.value - step * evt.wheel_delta());
        }
        evt.is_mouse_event()
    }

    fn min_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        let own = cx.base().min_width();
        match self.orientation {
            Orientation::Horizontal => {
                let sum = cx.min_width(self.up_left)
                    + cx.min_width(self.thumb)
                    + cx.min_width(self.down_right);
                own.max(sum)
            }
            Orientation::Vertical => own.max(cx.min_width(self.thumb)),
        }
    }

    fn min_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        let own = cx.base().min_height();
        match self.orientation {
            Orientation::Horizontal => own.max(cx.min_height(self.thumb)),
            Orientation::Vertical => {
                let sum = cx.min_height(self.up_left)
                    + cx.min_height(self.thumb)
                    + cx.min_height(self.down_right);
                own.max(sum)
            }
        }
    }

    fn preferred_width(&mut self, cx: &mut Cx<'_>) -> i32 {
        self.min_width(cx)
    }

    fn preferred_height(&mut self, cx: &mut Cx<'_>) -> i32 {
        self.min_height(cx)
    }

    fn layout(&mut self, cx: &mut Cx<'_>) {
        let (x, y, width, height) = {
            let base = cx.base();
            (base.x(), base.y(), base.width(), base.height())
        };
        let (up, down) = (self.up_left, self.down_right);
        match self.orientation {
            Orientation::Horizontal => {
                let up_width = cx.preferred_width(up);
                cx.set_size(up, up_width, height);
                cx.set_position(up, x, y);
                let down_width = cx.preferred_width(down);
                cx.set_size(down, down_width, height);
                cx.set_position(down, x + width - down_width, y);
            }
            Orientation::Vertical => {
                let up_height = cx.preferred_height(up);
                cx.set_size(up, width, up_height);
                cx.set_position(up, x, y);
                let down_height = cx.preferred_height(down);
                cx.set_size(down, width, down_height);
                cx.set_position(down, x, y + height - down_height);
            }
        }
        self.set_thumb_pos(cx);
    }
}

/// A step button. Armed while pressed with the mouse over it.
struct ScrollbarButton {
    direction: i32,
    pressed: bool,
    hover: bool,
}

impl ScrollbarButton {
    fn new(direction: i32) -> Self {
        Self {
            direction,
            pressed: false,
            hover: false,
        }
    }

    fn is_armed(&self) -> bool {
        self.pressed && self.hover
    }
}

impl Widget for ScrollbarButton {
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let was_armed = self.is_armed();
        let left = evt.mouse_button() == Some(MouseButton::Left);
        match evt.event_type() {
            EventType::MouseEntered => self.hover = true,
            EventType::MouseExited => self.hover = false,
            EventType::MouseDragged => {
                self.hover = cx.base().is_inside(evt.mouse_x(), evt.mouse_y());
            }
            EventType::MouseBtnDown if left => {
                self.pressed = true;
                self.hover = cx.base().is_inside(evt.mouse_x(), evt.mouse_y());
            }
            EventType::MouseBtnUp if left => self.pressed = false,
            _ => {}
        }
        let base = cx.base();
        base.set_animation_state(STATE_HOVER, self.hover);
        base.set_animation_state(STATE_PRESSED, self.pressed);
        base.set_animation_state(STATE_ARMED, self.is_armed());

        let armed = self.is_armed();
        if armed != was_armed
            && let Some(parent) = cx.parent()
        {
            let direction = self.direction;
            cx.with_widget::<Scrollbar, _>(parent, |sb, cx| sb.button_armed(cx, direction, armed));
        }
        evt.is_mouse_event()
    }
}

/// The draggable thumb.
#[derive(Default)]
struct ScrollbarThumb {
    drag_x: i32,
    drag_y: i32,
    dragging: bool,
}

impl Widget for ScrollbarThumb {
    fn handle_event(&mut self, cx: &mut Cx<'_>, evt: &Event) -> bool {
        let left = evt.mouse_button() == Some(MouseButton::Left);
        let Some(parent) = cx.parent() else {
            return evt.is_mouse_event();
        };
        match evt.event_type() {
            EventType::MouseEntered => cx.base().set_animation_state(STATE_HOVER, true),
            EventType::MouseExited => cx.base().set_animation_state(STATE_HOVER, false),
            EventType::MouseBtnDown if left => {
                self.dragging = true;
                self.drag_x = evt.mouse_x();
                self.drag_y = evt.mouse_y();
                cx.base().set_animation_state(STATE_PRESSED, true);
                cx.with_widget::<Scrollbar, _>(parent, |sb, _cx| sb.drag_started());
            }
            EventType::MouseDragged if self.dragging => {
                let (dx, dy) = (evt.mouse_x() - self.drag_x, evt.mouse_y() - self.drag_y);
                cx.with_widget::<Scrollbar, _>(parent, |sb, cx| sb.dragged(cx, dx, dy));
            }
            EventType::MouseBtnUp if left && self.dragging => {
                self.dragging = false;
                cx.base().set_animation_state(STATE_PRESSED, false);
                cx.with_widget::<Scrollbar, _>(parent, |sb, _cx| sb.drag_stopped());
            }
            _ => {}
        }
        evt.is_mouse_event()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;

    fn vertical_bar() -> (Gui, WidgetId) {
        let mut gui = Gui::new(Box::new(HeadlessRenderer::new(200, 200)), GuiConfig::default());
        let bar = gui.create(Scrollbar::new(Orientation::Vertical));
        let root = gui.root_pane();
        gui.add(root, bar);
        gui.set_size(bar, 20, 100);
        gui.validate_layout(bar);
        (gui, bar)
    }

    fn with_bar<R>(gui: &mut Gui, bar: WidgetId, f: impl FnOnce(&mut Scrollbar, &mut Cx<'_>) -> R) -> R {
        gui.with_widget::<Scrollbar, _>(bar, f).unwrap()
    }

    #[test]
    fn test_value_is_clamped_and_signalled() {
        let (mut gui, bar) = vertical_bar();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        gui.widget::<Scrollbar>(bar)
            .unwrap()
            .position_changed
            .connect(move |_gui, value| sink.borrow_mut().push(*value));

        with_bar(&mut gui, bar, |sb, cx| {
            sb.set_min_max_value(cx, 0, 40);
            sb.set_value(cx, 25);
            sb.set_value(cx, 99);
            sb.set_value(cx, 40);
        });
        assert_eq!(*seen.borrow(), vec![25, 40]);
    }

    #[test]
    fn test_thumb_position_follows_value() {
        let (mut gui, bar) = vertical_bar();
        with_bar(&mut gui, bar, |sb, cx| {
            sb.set_min_max_value(cx, 0, 100);
            sb.set_value(cx, 50);
        });
        let thumb = gui.widget::<Scrollbar>(bar).unwrap().thumb();
        assert_eq!(gui.base_of(thumb).y(), 50);
        assert!(gui.base_of(thumb).is_visible());

        with_bar(&mut gui, bar, |sb, cx| sb.set_min_max_value(cx, 0, 0));
        assert!(!gui.base_of(thumb).is_visible());
    }

    #[test]
    fn test_scroll_to_area() {
        let (mut gui, bar) = vertical_bar();
        let value = with_bar(&mut gui, bar, |sb, cx| {
            sb.set_min_max_value(cx, 0, 1000);
            sb.set_page_size(cx, 100);
            sb.scroll_to_area(cx, 300, 20, 10);
            sb.value()
        });
        // The area end plus extra lands on the page end.
        assert_eq!(value, 230);

        let value = with_bar(&mut gui, bar, |sb, cx| {
            sb.scroll_to_area(cx, 200, 20, 0);
            sb.value()
        });
        assert_eq!(value, 200);
    }

    #[test]
    fn test_keys_and_wheel() {
        let (mut gui, bar) = vertical_bar();
        with_bar(&mut gui, bar, |sb, cx| {
            sb.set_min_max_value(cx, 0, 100);
            sb.set_page_size(cx, 20);
            sb.set_step_size(5);
        });
        let down = Event::key(EventType::KeyPressed, Key::ArrowDown, None);
        assert!(gui.handle_event(bar, &down));
        let page = Event::key(EventType::KeyPressed, Key::PageDown, None);
        assert!(gui.handle_event(bar, &page));
        let ctrl_down = down.with_modifiers(ModifierMask::LCTRL);
        gui.handle_event(bar, &ctrl_down);
        assert_eq!(gui.widget::<Scrollbar>(bar).unwrap().value(), 45);

        let left = Event::key(EventType::KeyPressed, Key::ArrowLeft, None);
        assert!(!gui.handle_event(bar, &left));

        let wheel = Event::mouse(EventType::MouseWheel, 5, 5).with_wheel_delta(2);
        assert!(gui.handle_event(bar, &wheel));
        assert_eq!(gui.widget::<Scrollbar>(bar).unwrap().value(), 35);
    }

    #[test]
    #[should_panic(expected = "max_value < min_value")]
    fn test_inverted_range_panics() {
        let (mut gui, bar) = vertical_bar();
        with_bar(&mut gui, bar, |sb, cx| sb.set_min_max_value(cx, 10, 0));
    }
}
