//! Domain types used throughout the search.
//!
//! This module defines:
//!
//! - the input sample (`Sample`) and search configuration (`SearchConfig`)
//! - fitted models and the ranked outcome (`CandidateModel`, `SearchOutcome`)

pub mod types;

pub use types::*;
