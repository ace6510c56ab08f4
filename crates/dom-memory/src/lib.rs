//! In-memory DOM backend.
//!
//! [`MemoryDocument`] keeps a small element tree behind a mutex and implements
//! the [`domflow_core_types::Document`] port on top of it: CSS selector
//! queries, mutation observers delivering batched records, event dispatch with
//! bubbling listeners, focus and selection state, and framework-style value
//! trackers on inputs. Listeners registered with [`MemoryDocument::on`] let a
//! test script a fake host application that reacts to clicks and input the
//! same way a real page would.

mod document;
mod selector;
mod tree;

pub use document::{DispatchedEvent, ListenerContext, MemoryDocument};
pub use selector::SelectorList;
pub use tree::{ElementSpec, ValueTracker};
