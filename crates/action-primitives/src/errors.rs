//! Error types for action primitives

use domflow_core_types::DomError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// The document backend rejected a call
    #[error(transparent)]
    Dom(#[from] DomError),

    /// A watch was cancelled before it settled
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::Dom(err) => err.is_retryable(),
            ActionError::Cancelled(_) | ActionError::Internal(_) => false,
        }
    }
}
