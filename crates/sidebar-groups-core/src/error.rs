//! Error types for the core runtime.

use crate::scheduler::IdleTaskId;
use crate::timer::TimerId;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core runtime.
///
/// These only ever describe API misuse (stale handles); nothing the runtime
/// does on its own fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The timer ID is invalid or the timer has already fired or been stopped.
    #[error("invalid or expired timer ID {0:?}")]
    InvalidTimerId(TimerId),

    /// The idle task ID is invalid or the task has already run.
    #[error("invalid or completed idle task ID {0:?}")]
    InvalidIdleTaskId(IdleTaskId),
}
