//! Error types for the toolkit.

use thiserror::Error;

/// Recoverable failures surfaced by the toolkit.
///
/// Contract violations (stale ids, negative sizes, reparenting) panic instead.
#[derive(Debug, Error)]
pub enum GuiError {
    #[error("failed to parse GUI configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid GUI configuration: {0}")]
    InvalidConfig(String),

    #[error("row {row} out of range (row count {count})")]
    RowOutOfRange { row: usize, count: usize },

    #[error("column {column} out of range (column count {count})")]
    ColumnOutOfRange { column: usize, count: usize },

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("text exceeds the maximum length of {max} characters")]
    TextTooLong { max: usize },

    #[error("invalid style value: {0}")]
    InvalidStyleValue(String),

    #[error(transparent)]
    Core(#[from] trellis_core::CoreError),
}

/// Result alias for toolkit operations.
pub type GuiResult<T> = std::result::Result<T, GuiError>;
