//! `subset-regress` library crate.
//!
//! Best-subset regression search: every candidate variable is tried alone
//! (OLS), then stored combinations are greedily extended one variable at a
//! time and fitted by principal-component regression. Only models whose
//! coefficients are significant and sign-consistent are kept, in a bounded
//! store ranked by standard error.
//!
//! The binary (`subset`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the search can be embedded with a custom `DataSource`, observer or tables

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;
pub mod search;
pub mod stats;

pub use domain::{CandidateModel, RankedModel, Sample, SearchConfig, SearchOutcome, SearchStats, Significance};
pub use error::{AppError, CandidateError, SearchError};
pub use search::{SearchEngine, search};
