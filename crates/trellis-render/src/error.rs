//! Error types for the render crate.

use thiserror::Error;

/// Errors reported by a [`Renderer`](crate::Renderer) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// `end_rendering` was called without a matching `start_rendering`.
    #[error("end_rendering called outside of a frame")]
    NotRendering,

    /// A frame ended while clip regions were still entered.
    #[error("unbalanced clip stack at end of frame: {depth} region(s) still entered")]
    UnbalancedClip { depth: usize },

    /// A frame ended while tint colors were still pushed.
    #[error("unbalanced tint stack at end of frame: {depth} color(s) still pushed")]
    UnbalancedTint { depth: usize },

    /// `clip_leave` or `pop_tint` was called on an empty stack.
    #[error("{0} stack underflow")]
    StackUnderflow(&'static str),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
