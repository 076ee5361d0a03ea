//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// Producers calling `push` never see these; they reach the outside world only
/// through the error channel or the explicit control calls (`flush`, builders).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A run found queued items but no batch action was assigned.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The batch action returned an error or panicked.
    #[error("batch action failed: {0:#}")]
    UserAction(#[source] anyhow::Error),
    /// A run could not be handed to a worker.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    /// Scheduler configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A flush did not complete before its deadline.
    #[error("operation timed out")]
    Timeout,
    /// The run chain is halted by an infrastructure fault and items are still queued.
    #[error("run chain halted after an infrastructure fault")]
    Halted,
}

impl SchedulerError {
    /// Whether this error originated inside the caller's batch action.
    #[must_use]
    pub const fn is_user_action(&self) -> bool {
        matches!(self, Self::UserAction(_))
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
