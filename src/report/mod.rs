//! Reporting utilities: ranked-model tables, residual outliers and the run
//! summary.

pub mod format;

pub use format::*;
