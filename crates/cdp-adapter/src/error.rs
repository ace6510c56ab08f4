use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level error categories surfaced while attaching to a browser.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdapterErrorKind {
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("no matching page target")]
    TargetNotFound,
    #[error("cdp command timed out")]
    Timeout,
    #[error("invalid adapter configuration")]
    Config,
    #[error("internal error")]
    Internal,
}

/// Enriched error metadata passed back to the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdapterError {
    pub kind: AdapterErrorKind,
    pub hint: Option<String>,
    pub retriable: bool,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdapterError {}

impl AdapterError {
    pub fn new(kind: AdapterErrorKind) -> Self {
        let retriable = matches!(kind, AdapterErrorKind::CdpIo | AdapterErrorKind::Timeout);
        Self {
            kind,
            hint: None,
            retriable,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn retriable(mut self, flag: bool) -> Self {
        self.retriable = flag;
        self
    }
}
