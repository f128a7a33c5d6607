//! Where samples come from.
//!
//! The engine only ever sees a `Sample`. Anything that can produce one
//! implements `DataSource`: CSV files (`io::CsvSource`), in-memory samples, and
//! the synthetic generator used by `subset demo`.

pub mod synthetic;

use crate::domain::Sample;
use crate::error::SearchError;

pub trait DataSource {
    fn load(&self) -> Result<Sample, SearchError>;

    /// Short human-readable description for logs and reports.
    fn describe(&self) -> String {
        "in-memory sample".to_string()
    }
}

impl DataSource for Sample {
    fn load(&self) -> Result<Sample, SearchError> {
        Ok(self.clone())
    }
}

pub use synthetic::{MISSING_SENTINEL, SyntheticOptions, SyntheticSource, generate};
