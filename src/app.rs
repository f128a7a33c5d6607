//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs the logger
//! - loads a sample (CSV or synthetic)
//! - runs the search
//! - prints reports
//! - writes optional exports

use std::time::Duration;

use clap::Parser;

use crate::cli::{Command, DemoArgs, SearchArgs, SearchSettings};
use crate::data::{DataSource, SyntheticOptions, SyntheticSource};
use crate::domain::{SearchConfig, Significance};
use crate::error::AppError;
use crate::io::{CsvSource, IngestOptions};

pub mod pipeline;

/// Entry point for the `subset` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    crate::logging::init(crate::logging::level_from_flags(cli.verbose, cli.quiet));

    match cli.command {
        Command::Search(args) => handle_search(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_search(args: SearchArgs) -> Result<(), AppError> {
    let source = CsvSource::new(args.input.clone(), ingest_options_from_args(&args));
    execute(&source, &args.settings)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let options = SyntheticOptions {
        rows: args.rows,
        candidates: args.candidates,
        informative: args.informative,
        noise: args.noise,
        missing_rate: args.missing_rate,
        seed: args.seed,
    };
    let coefficients: Vec<String> = (0..options.informative)
        .map(|j| format!("X{}={:.4}", j + 1, crate::data::synthetic::true_coefficient(&options, j)))
        .collect();
    let source = SyntheticSource(options);
    execute(&source, &args.settings)?;
    println!("True model: Y = 1 + {} (+ noise)", coefficients.join(" + "));
    Ok(())
}

fn execute(source: &dyn DataSource, settings: &SearchSettings) -> Result<(), AppError> {
    let config = search_config_from_settings(settings)?;
    let run = pipeline::run_search(source, &config)?;

    println!(
        "{}",
        crate::report::format_summary(&run.sample, &run.outcome, &config, &run.source)
    );
    println!(
        "{}",
        crate::report::format_ranked_models(&run.outcome, &run.sample, settings.show)
    );

    let Some(best) = run.outcome.best() else {
        return Err(AppError::new(4, "Search returned no models."));
    };
    if settings.residuals > 0 {
        let rows = crate::report::largest_residuals(best, &run.sample, settings.residuals);
        println!("{}", crate::report::format_residuals(&rows));
    }

    // Optional exports.
    if let Some(path) = &settings.export_json {
        crate::io::write_results_json(path, &run.outcome, &run.sample, &run.source)?;
        log::info!("wrote {}", path.display());
    }
    if let Some(path) = &settings.export_residuals {
        crate::io::write_residuals_csv(path, best, &run.sample)?;
        log::info!("wrote {}", path.display());
    }

    Ok(())
}

pub fn ingest_options_from_args(args: &SearchArgs) -> IngestOptions {
    IngestOptions {
        dependent: args.dependent.clone(),
        independent: args.columns.clone(),
        weight: args.weight.clone(),
        missing_values: args.missing.clone(),
    }
}

pub fn search_config_from_settings(settings: &SearchSettings) -> Result<SearchConfig, AppError> {
    let time_budget = match settings.time_limit {
        None => None,
        Some(secs) => match Duration::try_from_secs_f64(secs) {
            Ok(limit) => Some(limit),
            Err(e) => {
                return Err(AppError::new(
                    2,
                    format!("Invalid --time-limit {secs}: must be a non-negative number of seconds ({e})."),
                ));
            }
        },
    };
    let significance = match settings.critical_t {
        Some(t) => Significance::CriticalT(t),
        None => Significance::Confidence(settings.confidence),
    };

    let config = SearchConfig {
        max_stored_combinations: settings.keep,
        significance,
        min_observations: settings.min_obs,
        max_components: settings.max_components,
        max_combination_size: settings.max_size,
        max_evaluations: settings.max_evaluations,
        time_budget,
        parallel: !settings.sequential,
    };
    config.validate()?;
    Ok(config)
}
