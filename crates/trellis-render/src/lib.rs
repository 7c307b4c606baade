//! Rendering seam for Trellis.
//!
//! The widget toolkit draws through the [`Renderer`] trait and measures text through
//! [`Font`]. Backends live outside this workspace; this crate ships the integer geometry
//! types shared by every layer and a recording [`HeadlessRenderer`] used by tests.
//!
//! # Recording a frame
//!
//! ```
//! use trellis_render::{Color, HeadlessRenderer, MonospaceFont, Rect, Renderer};
//!
//! let mut renderer = HeadlessRenderer::new(200, 100);
//! let font = MonospaceFont::new(8, 16);
//!
//! assert!(renderer.start_rendering());
//! renderer.clip_enter(Rect::new(0, 0, 100, 50));
//! renderer.fill_rect(Rect::new(0, 0, 20, 20), Color::BLUE);
//! renderer.draw_text(&font, Color::BLACK, 4, 4, "hello");
//! renderer.clip_leave();
//! renderer.end_rendering().unwrap();
//!
//! assert_eq!(renderer.drawn_text(), vec!["hello"]);
//! ```

pub mod error;
pub mod headless;
pub mod renderer;
pub mod types;

pub use cursor_icon::CursorIcon;
pub use error::{RenderError, RenderResult};
pub use headless::{DrawCommand, HeadlessRenderer, ManualClock, MonospaceFont, SolidImage};
pub use renderer::{Font, Image, Renderer};
pub use types::{Alignment, Border, Color, HAlignment, Point, Rect, Size};
