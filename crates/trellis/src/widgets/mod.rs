//! Standard widgets.
//!
//! - [`PopupWindow`] and [`InfoWindow`]: top-level windows owned by another widget
//! - [`Scrollbar`] and [`ScrollPane`]: scrolling
//! - [`table::TableBase`]: a virtualized grid over a [`table::TableModel`]
//! - [`text_area::TextArea`]: rich text with a box-model layout engine
//! - [`EditField`]: single and multi line text input
//! - [`DatePicker`]: a month calendar

mod date_picker;
mod edit_field;
mod info_window;
mod popup_window;
mod scroll_pane;
mod scrollbar;
pub mod table;
pub mod text_area;

pub use date_picker::{
    DateFormat, DateModel, DateParser, DatePicker, ParseOutcome, STATE_NEXT_MONTH, STATE_PREV_MONTH,
    SimpleDateModel,
};
pub use edit_field::{
    AutoCompletionDataSource, EditField, EditFieldCallback, EditFieldCallbackKind,
    STATE_CURSOR_MOVED, STATE_ERROR, STATE_READONLY, SimpleStringModel, StringModel,
};
pub use info_window::InfoWindow;
pub use popup_window::{PopupWindow, RequestCloseCallback};
pub use scroll_pane::{AutoScrollable, CustomPageSize, Fixed, ScrollPane, Scrollable};
pub use scrollbar::Scrollbar;

use trellis_core::StateKey;

/// Axis of a scrollbar or similar one-dimensional widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Left to right.
    #[default]
    Horizontal,
    /// Top to bottom.
    Vertical,
}

/// A button is pressed while the mouse is over it.
pub const STATE_ARMED: StateKey = StateKey::new("armed");
/// The mouse button went down on the button and was not yet released.
pub const STATE_PRESSED: StateKey = StateKey::new("pressed");
/// The mouse is over the widget.
pub const STATE_HOVER: StateKey = StateKey::new("hover");
/// A selectable item is selected.
pub const STATE_SELECTED: StateKey = StateKey::new("selected");
