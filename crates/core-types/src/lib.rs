//! Shared primitives for the domflow automation engine.
//!
//! Everything above this crate talks to a host page through the [`Document`]
//! port. Backends (an in-memory tree for tests, a DevTools-protocol page for
//! real browsers) implement it; the wait, interaction and workflow layers only
//! ever see [`ElementRef`] handles and the types defined here.

mod document;
mod error;
mod event;
mod mutation;

pub use document::Document;
pub use error::DomError;
pub use event::{DomEvent, DomEventKind, EditCommand, ElementCapability, ValueSetter};
pub use mutation::{
    MutationBatch, MutationKind, MutationRecord, MutationSubscription, ObserveOptions,
    ObserveTarget,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a live element owned by the host document.
///
/// Handles are only meaningful to the backend that produced them and are never
/// retained beyond the workflow step that resolved them.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}
