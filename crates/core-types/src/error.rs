use thiserror::Error;

/// Errors raised by a [`crate::Document`] backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The element handle no longer points at a node attached to the document
    #[error("element detached: {0}")]
    Detached(String),

    /// The selector could not be parsed by the backend
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    /// Transport or protocol failure talking to the page
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The backend cannot perform the requested operation
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomError {
    /// Whether retrying the same call can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomError::Protocol(_))
    }
}
