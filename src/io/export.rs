//! Result exports.
//!
//! - ranked models as JSON, with run metadata (`write_results_json`)
//! - observed/fitted/residual series of one model as CSV (`write_residuals_csv`)
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::domain::{RankedModel, Sample, SearchOutcome, SearchStats};
use crate::error::AppError;

/// Top-level JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsFile {
    pub tool: String,
    pub generated_at: String,
    pub source: String,
    pub dependent: String,
    pub candidates: Vec<String>,
    pub rows: usize,
    pub stats: ExportedStats,
    pub models: Vec<ExportedModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportedStats {
    pub evaluated: usize,
    pub stored: usize,
    pub rejected: usize,
    pub deepest_size: usize,
    pub truncated: bool,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportedModel {
    pub rank: usize,
    pub variables: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<ExportedCoefficient>,
    pub r: f64,
    pub r_squared: f64,
    pub std_error: f64,
    pub n_obs: usize,
    pub components: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportedCoefficient {
    pub name: String,
    pub value: f64,
}

impl ExportedStats {
    fn from_stats(stats: &SearchStats) -> Self {
        Self {
            evaluated: stats.evaluated,
            stored: stats.stored,
            rejected: stats.rejected(),
            deepest_size: stats.deepest_size,
            truncated: stats.truncated,
            elapsed_ms: u64::try_from(stats.elapsed_ms).unwrap_or(u64::MAX),
        }
    }
}

impl ExportedModel {
    fn from_ranked(ranked: &RankedModel, sample: &Sample) -> Self {
        let m = &ranked.model;
        let coefficients = m
            .coefficients
            .iter()
            .enumerate()
            .filter_map(|(v, b)| {
                b.map(|value| ExportedCoefficient {
                    name: sample.name(v).to_string(),
                    value,
                })
            })
            .collect();
        Self {
            rank: ranked.rank,
            variables: ranked.subset.members().map(|v| sample.name(v).to_string()).collect(),
            intercept: m.intercept,
            coefficients,
            r: m.r,
            r_squared: m.r_squared(),
            std_error: m.std_error,
            n_obs: m.n_obs,
            components: m.components,
        }
    }
}

pub fn build_results(outcome: &SearchOutcome, sample: &Sample, source: &str) -> ResultsFile {
    ResultsFile {
        tool: "subset".to_string(),
        generated_at: Local::now().to_rfc3339(),
        source: source.to_string(),
        dependent: sample.dependent_name().to_string(),
        candidates: sample.names().to_vec(),
        rows: sample.n_rows(),
        stats: ExportedStats::from_stats(&outcome.stats),
        models: outcome.models.iter().map(|m| ExportedModel::from_ranked(m, sample)).collect(),
    }
}

/// Write ranked models to a JSON file.
pub fn write_results_json(path: &Path, outcome: &SearchOutcome, sample: &Sample, source: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create results JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &build_results(outcome, sample, source))
        .map_err(|e| AppError::new(4, format!("Failed to write results JSON: {e}")))?;
    Ok(())
}

/// Write the per-row fit of one model to a CSV file.
pub fn write_residuals_csv(path: &Path, ranked: &RankedModel, sample: &Sample) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create residuals CSV '{}': {e}", path.display())))?;
    write_residuals(file, ranked, sample)
}

pub fn write_residuals<W: Write>(writer: W, ranked: &RankedModel, sample: &Sample) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);
    let fail = |e: csv::Error| AppError::new(4, format!("Failed to write residuals CSV: {e}"));

    out.write_record(["row", "observed", "fitted", "residual"]).map_err(fail)?;
    let m = &ranked.model;
    let y = sample.dependent();
    for ((&row, fitted), residual) in m.rows.iter().zip(&m.fitted).zip(&m.residuals) {
        out.write_record([
            (row + 1).to_string(),
            format!("{:.10}", y[row]),
            format!("{fitted:.10}"),
            format!("{residual:.10}"),
        ])
        .map_err(fail)?;
    }
    out.flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush residuals CSV: {e}")))?;
    Ok(())
}
