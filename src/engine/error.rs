//! Executor error types

use crate::program::state::StateError;

/// Errors raised by a single step's conditions or actions.
///
/// A step error is local to one step; whether it ends the run depends on
/// the execution mode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error("Action '{action}' failed: {message}")]
    Action { action: String, message: String },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Condition '{condition}' failed: {message}")]
    Condition { condition: String, message: String },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Panicked: {0}")]
    Panicked(String),
}

impl StepError {
    /// Shorthand for an action failure
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Action {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// Errors that stop a run before the execution loop starts
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Unknown execution mode: {0}")]
    UnknownMode(String),

    #[error("Invalid initial state: {0}")]
    InvalidState(#[from] StateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
