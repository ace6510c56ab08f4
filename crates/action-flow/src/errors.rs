//! Workflow error types

use action_primitives::ActionError;
use thiserror::Error;

/// Workflow errors. Every variant aborts the workflow that raised it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A required element never showed up
    #[error("{0}")]
    ElementNotFound(String),

    /// A bounded wait for an outcome ran out
    #[error("{0}")]
    Timeout(String),

    /// The host application rejected the operation; carries its text verbatim
    #[error("{0}")]
    HostValidation(String),

    /// The workflow was started in a state it cannot run from
    #[error("{0}")]
    Precondition(String),

    /// The host finished the interaction without reaching the goal
    #[error("{0}")]
    Incomplete(String),

    /// An interaction primitive reported failure
    #[error("{0}")]
    Interaction(String),

    #[error(transparent)]
    Action(#[from] ActionError),
}

impl From<domflow_core_types::DomError> for FlowError {
    fn from(err: domflow_core_types::DomError) -> Self {
        FlowError::Action(err.into())
    }
}

impl FlowError {
    /// Stable label for logs and exit reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::ElementNotFound(_) => "element_not_found",
            FlowError::Timeout(_) => "timeout",
            FlowError::HostValidation(_) => "host_validation",
            FlowError::Precondition(_) => "precondition",
            FlowError::Incomplete(_) => "incomplete",
            FlowError::Interaction(_) => "interaction",
            FlowError::Action(_) => "action",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            FlowError::Action(err) => err.is_retryable(),
            FlowError::Timeout(_) => true,
            _ => false,
        }
    }
}
