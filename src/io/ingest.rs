//! CSV ingest.
//!
//! Turns a header-row CSV into a `Sample`:
//! - the dependent column is chosen by name (default: the first column)
//! - independent columns are listed by name, or default to every other column
//! - an optional weight column supplies per-row WLS weights
//! - empty cells, non-numeric cells and configured sentinels become NaN, which
//!   the engine treats as missing
//!
//! Structural problems (unknown column, ragged file, no rows) are hard errors;
//! unparsable cells are not, but they are counted so the caller can report them.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use csv::StringRecord;

use crate::data::DataSource;
use crate::domain::Sample;
use crate::error::SearchError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOptions {
    /// Dependent column name; the first column when `None`.
    pub dependent: Option<String>,
    /// Candidate column names; every remaining column when `None`.
    pub independent: Option<Vec<String>>,
    /// Column holding per-row weights.
    pub weight: Option<String>,
    /// Values that mark a missing observation, in addition to empty cells.
    pub missing_values: Vec<f64>,
}

/// A CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub options: IngestOptions,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, options: IngestOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }
}

impl DataSource for CsvSource {
    fn load(&self) -> Result<Sample, SearchError> {
        let file = File::open(&self.path)
            .map_err(|e| SearchError::Data(format!("failed to open CSV '{}': {e}", self.path.display())))?;
        let ingested = load_from_reader(file, &self.options)?;
        if ingested.unparsed_cells > 0 {
            log::warn!(
                "{}: {} non-numeric cells treated as missing",
                self.path.display(),
                ingested.unparsed_cells
            );
        }
        log::info!(
            "{}: {} rows, {} candidate variables",
            self.path.display(),
            ingested.sample.n_rows(),
            ingested.sample.n_vars()
        );
        Ok(ingested.sample)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Ingest output: the sample plus what was lost along the way.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub sample: Sample,
    pub rows_read: usize,
    /// Non-empty cells that did not parse as numbers.
    pub unparsed_cells: usize,
}

pub fn load_from_reader<R: Read>(reader: R, options: &IngestOptions) -> Result<IngestedData, SearchError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| SearchError::Data(format!("failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    if header_map.is_empty() {
        return Err(SearchError::Data("CSV has no header row".into()));
    }

    let dependent = match &options.dependent {
        Some(name) => lookup(&header_map, name)?,
        None => 0,
    };
    let weight = options.weight.as_deref().map(|name| lookup(&header_map, name)).transpose()?;
    let independent: Vec<usize> = match &options.independent {
        Some(names) => names.iter().map(|name| lookup(&header_map, name)).collect::<Result<_, _>>()?,
        None => (0..headers.len())
            .filter(|&i| i != dependent && Some(i) != weight)
            .collect(),
    };
    if independent.is_empty() {
        return Err(SearchError::Data("no candidate columns selected".into()));
    }
    if independent.contains(&dependent) {
        return Err(SearchError::Data(format!(
            "column `{}` is both dependent and a candidate",
            header_name(&headers, dependent)
        )));
    }

    let mut y = Vec::new();
    let mut columns = vec![Vec::new(); independent.len()];
    let mut weights = Vec::new();
    let mut unparsed_cells = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, after the header.
        let line = idx + 2;
        let record = result.map_err(|e| SearchError::Data(format!("CSV parse error on line {line}: {e}")))?;

        y.push(parse_cell(&record, dependent, &options.missing_values, &mut unparsed_cells));
        for (col, &j) in columns.iter_mut().zip(&independent) {
            col.push(parse_cell(&record, j, &options.missing_values, &mut unparsed_cells));
        }
        if let Some(w) = weight {
            let value = parse_cell(&record, w, &[], &mut unparsed_cells);
            if !value.is_finite() {
                return Err(SearchError::Data(format!("missing or invalid weight on line {line}")));
            }
            weights.push(value);
        }
    }

    let rows_read = y.len();
    if rows_read == 0 {
        return Err(SearchError::Data("CSV contains no data rows".into()));
    }

    let names = independent.iter().map(|&j| header_name(&headers, j)).collect();
    let mut sample = Sample::from_columns(y, &columns)?.with_names(header_name(&headers, dependent), names)?;
    if weight.is_some() {
        sample = sample.with_weights(weights)?;
    }

    Ok(IngestedData {
        sample,
        rows_read,
        unparsed_cells,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn header_name(headers: &StringRecord, idx: usize) -> String {
    headers
        .get(idx)
        .map(|s| s.trim().trim_start_matches('\u{feff}').to_string())
        .unwrap_or_default()
}

fn lookup(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, SearchError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| SearchError::Data(format!("missing column: `{name}`")))
}

fn parse_cell(record: &StringRecord, idx: usize, sentinels: &[f64], unparsed: &mut usize) -> f64 {
    let Some(s) = record.get(idx).map(str::trim).filter(|s| !s.is_empty()) else {
        return f64::NAN;
    };
    match s.parse::<f64>() {
        Ok(v) if sentinels.contains(&v) => f64::NAN,
        Ok(v) => v,
        Err(_) => {
            *unparsed += 1;
            f64::NAN
        }
    }
}
