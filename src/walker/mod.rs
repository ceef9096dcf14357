//! Walking lazily loaded lists
//!
//! This module contains:
//! - `Windows`: bounded half-open windows over a range of sequence numbers
//! - `WalkState`: the per-source walk state machine
//! - `ListWalker`: drives a live list through those windows and snapshots
//!   the newly revealed items

mod list;
mod state;
mod window;

pub use list::{parse_item_number, walks_descending, ListWalker, WalkOutcome};
pub use state::WalkState;
pub use window::Windows;
