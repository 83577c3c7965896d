//! Argument acceptance under grounded semantics

mod grounded;
mod label;

pub use grounded::{GroundedSemantics, RelabelStats};
pub use label::{Label, Labelling, WinnerSet};
