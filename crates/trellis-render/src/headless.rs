//! A recording renderer for tests and off-screen use.
//!
//! [`HeadlessRenderer`] draws nothing. It records every primitive as a [`DrawCommand`],
//! tracks the clip and tint stacks, and reads time from a [`ManualClock`] the test
//! advances explicitly. [`MonospaceFont`] and [`SolidImage`] are resources with exact,
//! predictable metrics.

use std::cell::Cell;
use std::rc::Rc;

use cursor_icon::CursorIcon;
use trellis_core::AnimationState;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{RenderError, RenderResult};
use crate::renderer::{Font, Image, Renderer};
use crate::types::{Color, Rect, Size};

/// A millisecond clock advanced by hand.
///
/// Clones share the same time, so a test keeps one clone while the renderer owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<i64>>);

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> i64 {
        self.0.get()
    }

    pub fn set(&self, millis: i64) {
        self.0.set(millis);
    }

    pub fn advance(&self, millis: i64) {
        self.0.set(self.0.get() + millis);
    }
}

/// A primitive recorded by [`HeadlessRenderer`], with the clip region active at the time.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Color, clip: Rect },
    Image { name: String, rect: Rect, clip: Rect },
    Text { text: String, x: i32, y: i32, color: Color, clip: Rect },
}

impl DrawCommand {
    /// The text of a [`DrawCommand::Text`].
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A renderer that records instead of drawing.
#[derive(Debug)]
pub struct HeadlessRenderer {
    clock: ManualClock,
    viewport: Size,
    rendering: bool,
    clip_stack: Vec<Rect>,
    tint_stack: Vec<Color>,
    commands: Vec<DrawCommand>,
    frames: u64,
    cursor: Option<CursorIcon>,
    mouse_position: (i32, i32),
    mouse_buttons: u8,
}

impl HeadlessRenderer {
    /// Create a renderer with the given viewport and its own clock.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_clock(width, height, ManualClock::new())
    }

    /// Create a renderer reading time from `clock`.
    pub fn with_clock(width: i32, height: i32, clock: ManualClock) -> Self {
        Self {
            clock,
            viewport: Size::new(width, height),
            rendering: false,
            clip_stack: Vec::new(),
            tint_stack: Vec::new(),
            commands: Vec::new(),
            frames: 0,
            cursor: None,
            mouse_position: (0, 0),
            mouse_buttons: 0,
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn set_viewport(&mut self, width: i32, height: i32) {
        self.viewport = Size::new(width, height);
    }

    /// Commands recorded during the last completed (or current) frame.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// All text strings drawn in the last frame, in draw order.
    pub fn drawn_text(&self) -> Vec<&str> {
        self.commands.iter().filter_map(DrawCommand::text).collect()
    }

    /// Number of frames ended successfully.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn cursor(&self) -> Option<CursorIcon> {
        self.cursor
    }

    pub fn mouse_position(&self) -> (i32, i32) {
        self.mouse_position
    }

    pub fn is_mouse_button_down(&self, button: u8) -> bool {
        button < 8 && self.mouse_buttons & (1 << button) != 0
    }

    fn current_clip(&self) -> Rect {
        self.clip_stack
            .last()
            .copied()
            .unwrap_or_else(|| Rect::from_origin_size(Default::default(), self.viewport))
    }

    fn tinted(&self, color: Color) -> Color {
        self.tint_stack.last().map_or(color, |t| color.multiply(*t))
    }

    fn visible(&self, rect: &Rect) -> bool {
        !rect.intersect(&self.current_clip()).is_empty()
    }
}

impl Renderer for HeadlessRenderer {
    fn time_millis(&self) -> i64 {
        self.clock.now()
    }

    fn viewport(&self) -> Size {
        self.viewport
    }

    fn start_rendering(&mut self) -> bool {
        self.rendering = true;
        self.commands.clear();
        self.clip_stack.clear();
        self.tint_stack.clear();
        !self.viewport.is_empty()
    }

    fn end_rendering(&mut self) -> RenderResult<()> {
        if !self.rendering {
            return Err(RenderError::NotRendering);
        }
        self.rendering = false;
        if !self.clip_stack.is_empty() {
            return Err(RenderError::UnbalancedClip {
                depth: self.clip_stack.len(),
            });
        }
        if !self.tint_stack.is_empty() {
            return Err(RenderError::UnbalancedTint {
                depth: self.tint_stack.len(),
            });
        }
        self.frames += 1;
        Ok(())
    }

    fn clip_enter(&mut self, rect: Rect) {
        let clip = rect.intersect(&self.current_clip());
        self.clip_stack.push(clip);
    }

    fn clip_leave(&mut self) {
        if self.clip_stack.pop().is_none() {
            tracing::warn!(target: "trellis_render", "{}", RenderError::StackUnderflow("clip"));
        }
    }

    fn clip_is_empty(&self) -> bool {
        self.current_clip().is_empty()
    }

    fn set_cursor(&mut self, cursor: Option<CursorIcon>) {
        self.cursor = cursor;
    }

    fn set_mouse_position(&mut self, x: i32, y: i32) {
        self.mouse_position = (x, y);
    }

    fn set_mouse_button(&mut self, button: u8, down: bool) {
        if button < 8 {
            if down {
                self.mouse_buttons |= 1 << button;
            } else {
                self.mouse_buttons &= !(1 << button);
            }
        }
    }

    fn push_tint(&mut self, color: Color) {
        let tint = self.tinted(color);
        self.tint_stack.push(tint);
    }

    fn pop_tint(&mut self) {
        if self.tint_stack.pop().is_none() {
            tracing::warn!(target: "trellis_render", "{}", RenderError::StackUnderflow("tint"));
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        if self.visible(&rect) {
            let color = self.tinted(color);
            let clip = self.current_clip();
            self.commands.push(DrawCommand::FillRect { rect, color, clip });
        }
    }

    fn draw_image(&mut self, image: &dyn Image, _state: &AnimationState, rect: Rect) {
        if self.visible(&rect) {
            let clip = self.current_clip();
            self.commands.push(DrawCommand::Image {
                name: image.name().to_owned(),
                rect,
                clip,
            });
        }
    }

    fn draw_text(&mut self, font: &dyn Font, color: Color, x: i32, y: i32, text: &str) -> i32 {
        let width = font.compute_text_width(text);
        let rect = Rect::new(x, y, width, font.line_height());
        if !text.is_empty() && self.visible(&rect) {
            let color = self.tinted(color);
            let clip = self.current_clip();
            self.commands.push(DrawCommand::Text {
                text: text.to_owned(),
                x,
                y,
                color,
                clip,
            });
        }
        width
    }
}

/// A font where every grapheme cluster has the same advance.
///
/// Tabs and newlines measure like any other character; callers that treat them
/// specially split the text first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonospaceFont {
    char_width: i32,
    line_height: i32,
}

impl Default for MonospaceFont {
    fn default() -> Self {
        Self::new(8, 16)
    }
}

impl MonospaceFont {
    /// # Panics
    ///
    /// Panics if `char_width` or `line_height` is not positive.
    pub fn new(char_width: i32, line_height: i32) -> Self {
        assert!(char_width > 0, "char_width must be positive");
        assert!(line_height > 0, "line_height must be positive");
        Self {
            char_width,
            line_height,
        }
    }

    pub fn char_width(&self) -> i32 {
        self.char_width
    }
}

impl Font for MonospaceFont {
    fn line_height(&self) -> i32 {
        self.line_height
    }

    fn space_width(&self) -> i32 {
        self.char_width
    }

    fn m_width(&self) -> i32 {
        self.char_width
    }

    fn x_width(&self) -> i32 {
        self.char_width
    }

    fn compute_text_width(&self, text: &str) -> i32 {
        let count = text.graphemes(true).count();
        i32::try_from(count).unwrap_or(i32::MAX / self.char_width) * self.char_width
    }

    fn visible_prefix_len(&self, text: &str, width: i32) -> usize {
        if width < self.char_width {
            return 0;
        }
        let fit = usize::try_from(width / self.char_width).unwrap_or(0);
        match text.grapheme_indices(true).nth(fit) {
            Some((offset, _)) => offset,
            None => text.len(),
        }
    }
}

/// An image of fixed size drawn as a flat color.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidImage {
    name: String,
    width: i32,
    height: i32,
    color: Color,
}

impl SolidImage {
    pub fn new(name: impl Into<String>, width: i32, height: i32, color: Color) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            color,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }
}

impl Image for SolidImage {
    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monospace_metrics() {
        let font = MonospaceFont::new(8, 16);
        assert_eq!(font.compute_text_width("hello"), 40);
        assert_eq!(font.compute_text_width(""), 0);
        assert_eq!(font.visible_prefix_len("hello world", 40), 5);
        assert_eq!(font.visible_prefix_len("hello", 7), 0);
        assert_eq!(font.visible_prefix_len("hi", 100), 2);
        assert_eq!(font.compute_multi_line_text_width("ab\nabcd"), 32);
    }

    #[test]
    fn test_monospace_prefix_respects_char_boundaries() {
        let font = MonospaceFont::new(10, 10);
        let text = "héllo";
        let len = font.visible_prefix_len(text, 20);
        assert_eq!(&text[..len], "hé");
    }

    #[test]
    fn test_clip_nesting_and_culling() {
        let mut r = HeadlessRenderer::new(100, 100);
        assert!(r.start_rendering());
        r.clip_enter(Rect::new(0, 0, 50, 50));
        r.fill_rect(Rect::new(60, 60, 10, 10), Color::RED);
        r.fill_rect(Rect::new(10, 10, 10, 10), Color::RED);
        r.clip_enter(Rect::new(40, 40, 50, 50));
        assert_eq!(r.current_clip(), Rect::new(40, 40, 10, 10));
        r.clip_leave();
        r.clip_leave();
        assert!(r.end_rendering().is_ok());
        assert_eq!(r.commands().len(), 1);
        assert_eq!(r.frames(), 1);
    }

    #[test]
    fn test_unbalanced_clip_is_reported() {
        let mut r = HeadlessRenderer::new(10, 10);
        r.start_rendering();
        r.clip_enter(Rect::new(0, 0, 5, 5));
        assert_eq!(
            r.end_rendering(),
            Err(RenderError::UnbalancedClip { depth: 1 })
        );
        assert_eq!(r.end_rendering(), Err(RenderError::NotRendering));
    }

    #[test]
    fn test_shared_clock() {
        let clock = ManualClock::new();
        let r = HeadlessRenderer::with_clock(1, 1, clock.clone());
        clock.advance(250);
        assert_eq!(r.time_millis(), 250);
    }

    #[test]
    fn test_tint_multiplies() {
        let mut r = HeadlessRenderer::new(10, 10);
        r.start_rendering();
        r.push_tint(Color::from_rgba(0.5, 0.5, 0.5, 1.0));
        r.fill_rect(Rect::new(0, 0, 5, 5), Color::WHITE);
        r.pop_tint();
        r.end_rendering().unwrap();
        match &r.commands()[0] {
            DrawCommand::FillRect { color, .. } => assert_eq!(color.r, 0.5),
            other => panic!("unexpected {other:?}"),
        }
    }
}
