//! Action primitives over the `Document` port
//!
//! This crate provides the building blocks the workflows compose:
//! - `Watch`: one cancellable task that probes, observes mutations and races
//!   a deadline, shared by every wait
//! - wait primitives: `wait_for_element`, `wait_for_any_element`,
//!   `wait_for_element_removed`
//! - interaction primitives: `click_element`, `double_focus`,
//!   `insert_text_into_element`, `set_react_input_value`, `simulate_typing`

pub mod errors;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
