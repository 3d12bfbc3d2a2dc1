//! Value types for muster collaborators
//!
//! This crate defines the data exchanged between the attendance core and the
//! systems around it:
//! - Scan events and pre-paired sessions (event source -> core)
//! - Members of the roster
//! - Evaluation results and batch reports (core -> reporting)

mod events;
mod report;
mod types;

pub use events::*;
pub use report::*;
pub use types::*;
