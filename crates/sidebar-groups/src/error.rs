//! Error types for the grouping crate.

use sidebar_groups_core::CoreError;

/// Result type alias for grouping operations.
pub type Result<T> = std::result::Result<T, GroupingError>;

/// Errors that can occur when setting up grouping.
///
/// Grouping itself never fails: a missing container or name node degrades to
/// "no grouping applied" and is only logged. These variants cover API misuse
/// and bad configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupingError {
    /// `start` was called on a component that is already running.
    #[error("{component} has already been started")]
    AlreadyStarted { component: &'static str },

    /// A configuration value was rejected.
    #[error("invalid value for '{field}': {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    /// Core runtime error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl GroupingError {
    /// Create a configuration error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}
