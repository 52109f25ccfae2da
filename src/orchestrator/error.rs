//! Errors for turn submission.

use thiserror::Error;

/// Reasons a submission is rejected before a turn starts.
///
/// Rejected submissions leave the conversation untouched. Failures after a
/// turn has started are not errors: they end the turn with a failure line.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    /// The message is empty or whitespace only.
    #[error("message is empty")]
    EmptyMessage,
    /// Another turn is still in flight for this conversation.
    #[error("a turn is already in progress")]
    Busy,
}

/// Result type alias for turn submission.
pub type TurnResult<T> = Result<T, TurnError>;
