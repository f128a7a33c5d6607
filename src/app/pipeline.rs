//! Shared "search pipeline" used by every command.
//!
//! load sample -> search -> ranked outcome
//!
//! Commands then only differ in where the sample comes from and what they print.

use crate::data::DataSource;
use crate::domain::{Sample, SearchConfig, SearchOutcome};
use crate::error::AppError;
use crate::search::{LogObserver, SearchEngine};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub source: String,
    pub sample: Sample,
    pub outcome: SearchOutcome,
}

/// Load the sample from `source` and run the search on it.
pub fn run_search(source: &dyn DataSource, config: &SearchConfig) -> Result<RunOutput, AppError> {
    let description = source.describe();
    log::info!("loading {description}");
    let sample = source.load()?;

    let outcome = SearchEngine::new(config.clone()).run(&sample, &mut LogObserver)?;

    Ok(RunOutput {
        source: description,
        sample,
        outcome,
    })
}
