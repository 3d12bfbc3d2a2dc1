//! Attendance evaluation core for muster
//!
//! This crate contains:
//! - Event reconciliation (raw badge scans to same-day sessions)
//! - Policy evaluation (attended time, flexible hours, regular attendance, violations)
//! - The policy registry shared by built-in and runtime-registered policies
//! - Roster-wide batch evaluation

mod batch;
mod error;
mod evaluator;
mod reconcile;
mod registry;

pub use batch::*;
pub use error::*;
pub use evaluator::*;
pub use reconcile::*;
pub use registry::*;
