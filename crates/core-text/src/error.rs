//! Core error kinds shared across the editor crates.
//!
//! Every fallible core operation returns `Result<T, CoreError>`. Operations
//! never abort on allocation failure; the checked variants are the only ones
//! exposed and callers propagate with `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Memory could not be reserved for a cell or line array.
    #[error("allocation failure")]
    Alloc,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The bounded task queue had no free slot.
    #[error("task queue full")]
    QueueFull,
    /// The operation observed its cancellation flag and stopped early.
    #[error("cancelled")]
    Cancelled,
    #[error("lock or thread failure: {0}")]
    Lock(&'static str),
    #[error("regex compile error: {0}")]
    Regex(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Stable numeric code carried inside task results (0 is success).
    pub fn code(&self) -> i32 {
        match self {
            CoreError::Alloc => -1,
            CoreError::Io(_) => -2,
            CoreError::QueueFull => -3,
            CoreError::Cancelled => -4,
            CoreError::Lock(_) => -5,
            CoreError::Regex(_) => -6,
            CoreError::InvalidArgument(_) => -7,
            CoreError::Parse(_) => -8,
        }
    }
}
