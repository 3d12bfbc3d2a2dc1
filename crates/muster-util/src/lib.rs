//! Shared utilities for muster
//!
//! This crate provides:
//! - ID types (MemberId, PolicyName) and roster id normalization
//! - Calendar utilities (local day, seconds-of-day, day windows)
//! - Duration formatting
//! - Default paths for the policy file

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
