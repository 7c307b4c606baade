//! Logging targets for Trellis.
//!
//! Trellis uses the `tracing` crate for instrumentation. Install a subscriber in the
//! application to see the records:
//!
//! ```ignore
//! use tracing_subscriber::EnvFilter;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter(EnvFilter::new("trellis::layout=debug,trellis_core=warn"))
//!     .init();
//! ```

/// Span names used throughout Trellis for tracing.
pub mod span_names {
    /// One GUI frame (`Gui::update`).
    pub const FRAME: &str = "trellis::frame";
    /// Layout validation loop.
    pub const LAYOUT: &str = "trellis::layout";
    /// Rich text relayout.
    pub const TEXT_LAYOUT: &str = "trellis::text_layout";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "trellis_core";
    /// Frame timer target.
    pub const TIMER: &str = "trellis_core::timer";
    /// Invoke-later queue target.
    pub const INVOKE: &str = "trellis_core::invoke";
    /// Contained callback failures.
    pub const CALLBACK: &str = "trellis_core::callback";
    /// Widget tree mutation target.
    pub const TREE: &str = "trellis::tree";
    /// Layout validation target.
    pub const LAYOUT: &str = "trellis::layout";
    /// Input event dispatch target.
    pub const EVENT: &str = "trellis::event";
    /// Keyboard focus target.
    pub const FOCUS: &str = "trellis::focus";
    /// Popup, tooltip and info window target.
    pub const POPUP: &str = "trellis::popup";
    /// Theme application target.
    pub const THEME: &str = "trellis::theme";
    /// Rich text layout target.
    pub const TEXT: &str = "trellis::text";
    /// Table widget target.
    pub const TABLE: &str = "trellis::table";
    /// Date picker target.
    pub const DATE: &str = "trellis::date";
}
