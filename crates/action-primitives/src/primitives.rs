//! Action primitives implementation
//!
//! Wait primitives locate elements and observe their removal; interaction
//! primitives click, focus and enter text on elements a wait returned.

mod click;
mod focus;
mod type_text;
mod wait;

pub use click::*;
pub use focus::*;
pub use type_text::*;
pub use wait::*;
