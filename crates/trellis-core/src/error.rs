//! Error types for Trellis core.

use std::fmt;

/// The main error type for Trellis core operations.
#[derive(Debug)]
pub enum CoreError {
    /// Timer-related error.
    Timer(TimerError),
    /// The invoke-later queue was closed because its owning GUI was dropped.
    InvokeQueueClosed,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer(err) => write!(f, "Timer error: {err}"),
            Self::InvokeQueueClosed => {
                write!(f, "The invoke-later queue has been closed")
            }
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timer(err) => Some(err),
            Self::InvokeQueueClosed => None,
        }
    }
}

/// Timer-specific errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer ID is invalid or has already been removed.
    InvalidTimerId,
    /// A timer delay must be at least one millisecond.
    InvalidDelay(i32),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimerId => write!(f, "Invalid or expired timer ID"),
            Self::InvalidDelay(delay) => write!(f, "Timer delay must be >= 1 ms, got {delay}"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for CoreError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

/// A specialized Result type for Trellis core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
