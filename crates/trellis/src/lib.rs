//! Trellis: a retained-mode widget toolkit.
//!
//! The toolkit keeps every widget in an arena owned by a [`Gui`]. The GUI converts raw
//! mouse and keyboard input into [`Event`]s, routes them through the widget tree, manages
//! keyboard focus, popups, the info window and tooltips, fires frame timers and validates
//! layout before each frame is drawn.
//!
//! On top of the core the crate ships the widgets with real algorithms behind them:
//!
//! - [`widgets::ScrollPane`] and [`widgets::Scrollbar`]
//! - [`widgets::table::TableBase`]: a virtualized grid over a [`widgets::table::TableModel`]
//! - [`widgets::text_area::TextArea`]: a box-model layout engine for rich text
//! - [`widgets::EditField`], [`widgets::DatePicker`], [`widgets::PopupWindow`] and
//!   [`widgets::InfoWindow`]
//!
//! # Quick start
//!
//! ```
//! use trellis::{Container, Gui, GuiConfig};
//! use trellis_render::HeadlessRenderer;
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(320, 240)), GuiConfig::default());
//! let panel = gui.create(Container);
//! let root = gui.root_pane();
//! gui.add(root, panel);
//! gui.set_size(panel, 100, 50);
//!
//! gui.update();
//! assert_eq!(gui.base_of(root).width(), 320);
//! ```

pub mod error;
pub mod event;
pub mod gui;
pub mod input_map;
pub mod signal;
pub mod theme;
pub mod widget;
pub mod widgets;

pub use error::{GuiError, GuiResult};
pub use event::{Event, EventType, Key, KeyboardModifiers, ModifierMask, MouseButton};
pub use gui::{
    Clipboard, Gui, GuiConfig, Input, MemoryClipboard, MouseIdleListener, QueuedInput, RawInput,
    STATE_FADE, TooltipWindow,
};
pub use input_map::{InputMap, KeyStroke};
pub use signal::{ConnectionId, Signal};
pub use theme::{MemoryTheme, MemoryThemeManager, ThemeInfo, ThemeManager, ThemeValue};
pub use widget::{
    Container, Cx, FocusGainedCause, FocusTransferContext, MAX_SIZE, STATE_DISABLED,
    STATE_HAS_FOCUSED_CHILD, STATE_HAS_OPEN_POPUPS, STATE_KEYBOARD_FOCUS, TintAnimator,
    TooltipContent, Widget, WidgetBase, WidgetId, compute_size, is_absolute_theme,
};
