//! The rendering seam consumed by the widget toolkit.
//!
//! The toolkit never talks to a graphics API directly. It brackets every frame with
//! [`Renderer::start_rendering`]/[`Renderer::end_rendering`], nests clip regions, and
//! issues a handful of primitives (rectangles, images, text). Fonts and images are
//! opaque resources that only report metrics.

use std::any::Any;
use std::fmt;

use cursor_icon::CursorIcon;
use trellis_core::AnimationState;

use crate::error::RenderResult;
use crate::types::{Color, Rect, Size};

/// A drawable image resource.
///
/// Images are sized in pixels; a renderer may stretch them to any destination rectangle.
pub trait Image: fmt::Debug {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    /// A short name used in diagnostics and recorded draw commands.
    fn name(&self) -> &str {
        ""
    }
}

/// Font metrics used by layout code.
///
/// All measurements are in pixels. Text is measured in whole strings; callers slice by
/// byte offsets returned from [`Font::visible_prefix_len`].
pub trait Font: fmt::Debug {
    fn line_height(&self) -> i32;

    /// Distance from the top of a line to the text baseline.
    fn base_line(&self) -> i32 {
        self.line_height() * 4 / 5
    }

    fn space_width(&self) -> i32;
    fn m_width(&self) -> i32;
    fn x_width(&self) -> i32;

    /// Width of `text` when drawn on a single line.
    fn compute_text_width(&self, text: &str) -> i32;

    /// Width of the widest line of `text` split at `'\n'`.
    fn compute_multi_line_text_width(&self, text: &str) -> i32 {
        text.split('\n')
            .map(|line| self.compute_text_width(line))
            .max()
            .unwrap_or(0)
    }

    /// Byte length of the longest prefix of `text` whose width does not exceed `width`.
    ///
    /// The returned length always lies on a character boundary.
    fn visible_prefix_len(&self, text: &str, width: i32) -> usize;
}

/// A 2D drawing backend driven by the GUI once per frame.
///
/// Backends are `'static` so the owner can hand them back by concrete type.
pub trait Renderer: Any {
    /// Monotonic time in milliseconds; drives timers, tooltips and animations.
    fn time_millis(&self) -> i64;

    /// Size of the drawable area; the GUI resizes itself to this every frame.
    fn viewport(&self) -> Size;

    /// Begin a frame. Returns `false` when nothing can be drawn this frame.
    fn start_rendering(&mut self) -> bool;

    /// End the current frame.
    fn end_rendering(&mut self) -> RenderResult<()>;

    /// Enter a clip region intersected with the current one.
    fn clip_enter(&mut self, rect: Rect);

    /// Leave the innermost clip region.
    fn clip_leave(&mut self);

    /// Whether the current clip region has no area.
    fn clip_is_empty(&self) -> bool;

    /// Set the OS cursor; `None` restores the default arrow.
    fn set_cursor(&mut self, cursor: Option<CursorIcon>);

    /// Report the mouse position back to the backend (e.g. for a software cursor).
    fn set_mouse_position(&mut self, x: i32, y: i32);

    /// Report a mouse button state back to the backend.
    fn set_mouse_button(&mut self, button: u8, down: bool);

    /// Multiply all following colors by `color` until the matching [`Renderer::pop_tint`].
    fn push_tint(&mut self, color: Color);

    fn pop_tint(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw `image` stretched into `rect`, selecting its appearance from `state`.
    fn draw_image(&mut self, image: &dyn Image, state: &AnimationState, rect: Rect);

    /// Draw a single line of text with its top-left corner at `(x, y)`.
    ///
    /// Returns the drawn width.
    fn draw_text(&mut self, font: &dyn Font, color: Color, x: i32, y: i32, text: &str) -> i32;
}
