//! Workflow orchestration
//!
//! Composes the action primitives into the two host workflows: connecting a
//! wallet ([`Connector`]) and swapping tokens ([`Exchanger`]). Selectors and
//! timings come from a [`SiteProfile`] and [`FlowTimings`]; the asynchronous
//! end of each workflow is detected by a completion observer.

pub mod completion;
pub mod connector;
pub mod errors;
pub mod exchanger;
pub mod profile;
mod steps;

pub use completion::{CompletionSignal, ConnectorCompletion, SwapCompletion};
pub use connector::Connector;
pub use errors::FlowError;
pub use exchanger::{Exchanger, SwapParams, SwapSide, TokenSpec};
pub use profile::{FlowTimings, SiteProfile};
