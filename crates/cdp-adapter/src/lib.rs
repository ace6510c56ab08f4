//! Chrome DevTools Protocol backend for the domflow [`Document`] port.
//!
//! [`CdpSession::connect`] attaches to an already running browser (started
//! with `--remote-debugging-port`) and picks the tab that hosts the
//! application. The resulting [`CdpDocument`] drives that tab through
//! `Runtime.evaluate`; element handles are ids minted by a small registry
//! installed in the page.
//!
//! [`Document`]: domflow_core_types::Document

mod config;
mod document;
mod error;
mod observer;
pub mod scripts;
mod session;

pub use config::{CdpConfig, DEFAULT_ENDPOINT};
pub use document::CdpDocument;
pub use error::{AdapterError, AdapterErrorKind};
pub use observer::ObserverRegistry;
pub use session::{pick_page, CdpSession};
