//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the search code stays free of presentation concerns
//! - output changes are localized

use crate::domain::{RankedModel, Sample, SearchConfig, SearchOutcome, Significance};

/// One fitted row of a model, for residual listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualRow {
    /// 0-based sample row.
    pub row: usize,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// Fitted rows of `ranked` with the largest absolute residuals first.
pub fn largest_residuals(ranked: &RankedModel, sample: &Sample, top_n: usize) -> Vec<ResidualRow> {
    let y = sample.dependent();
    let m = &ranked.model;
    let mut rows: Vec<ResidualRow> = m
        .rows
        .iter()
        .zip(&m.fitted)
        .zip(&m.residuals)
        .map(|((&row, &fitted), &residual)| ResidualRow {
            row,
            observed: y[row],
            fitted,
            residual,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(top_n);
    rows
}

/// Format the run summary (sample, settings and search diagnostics).
pub fn format_summary(sample: &Sample, outcome: &SearchOutcome, config: &SearchConfig, source: &str) -> String {
    let mut out = String::new();
    let stats = &outcome.stats;

    out.push_str("=== subset - Best-Subset Regression Search ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Sample: n={} | dependent={} | candidates={}\n",
        sample.n_rows(),
        sample.dependent_name(),
        sample.n_vars()
    ));
    if sample.weights().is_some() {
        out.push_str("Weights: per-row (WLS)\n");
    }
    out.push_str(&format!(
        "Settings: keep={} | {} | min obs={}\n",
        config.max_stored_combinations,
        fmt_significance(config.significance),
        config.min_observations
    ));

    out.push_str("\nSearch diagnostics:\n");
    out.push_str(&format!(
        "- combinations: generated={} evaluated={} deepest size={}\n",
        stats.generated, stats.evaluated, stats.deepest_size
    ));
    out.push_str(&format!(
        "- accepted: stored={} replaced={} discarded={}\n",
        stats.stored, stats.replaced, stats.discarded
    ));
    out.push_str(&format!(
        "- rejected: numerical={} insufficient data={} not significant={} sign={}\n",
        stats.rejected_numerical, stats.rejected_insufficient, stats.rejected_insignificant, stats.rejected_sign
    ));
    if let Some(first) = outcome.models.first() {
        let used = outcome.models.iter().fold(first.subset.clone(), |acc, m| acc.union(&m.subset));
        out.push_str(&format!(
            "- variables in retained models: {} ({} of {})\n",
            used.label(sample.names()),
            used.len(),
            sample.n_vars()
        ));
    }
    out.push_str(&format!("- elapsed: {} ms\n", stats.elapsed_ms));
    if stats.truncated {
        out.push_str("- NOTE: a search budget was exhausted; results are partial\n");
    }
    out.push('\n');

    out
}

/// Format the ranked-model table followed by the equation of the best model.
pub fn format_ranked_models(outcome: &SearchOutcome, sample: &Sample, show: usize) -> String {
    let mut out = String::new();

    out.push_str(
        format!(
            "{:>4} {:<32} {:>5} {:>4} {:>8} {:>8} {:>12}\n",
            "rank", "variables", "n", "pc", "r", "r2", "std_error"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<4} {:-<32} {:-<5} {:-<4} {:-<8} {:-<8} {:-<12}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for ranked in outcome.models.iter().take(show) {
        let m = &ranked.model;
        let pc = if m.components == 0 {
            "-".to_string()
        } else {
            m.components.to_string()
        };
        out.push_str(
            format!(
                "{:>4} {:<32} {:>5} {:>4} {:>8.4} {:>8.4} {:>12.6}\n",
                ranked.rank,
                truncate(&ranked.subset.label(sample.names()), 32),
                m.n_obs,
                pc,
                m.r,
                m.r_squared(),
                m.std_error
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if outcome.models.len() > show {
        out.push_str(&format!("({} more not shown)\n", outcome.models.len() - show));
    }

    if let Some(best) = outcome.best() {
        out.push_str("\nBest model:\n");
        out.push_str(&format!("{}\n", format_equation(best, sample)));
    }

    out
}

/// `Y = a + b1*X1 - b2*X2` for a ranked model.
pub fn format_equation(ranked: &RankedModel, sample: &Sample) -> String {
    let m = &ranked.model;
    let mut out = format!("{} = {:.6}", sample.dependent_name(), m.intercept);
    for (v, b) in m.coefficients.iter().enumerate() {
        let Some(b) = b else { continue };
        let sign = if *b < 0.0 { '-' } else { '+' };
        out.push_str(&format!(" {sign} {:.6}*{}", b.abs(), sample.name(v)));
    }
    out
}

/// Format the largest residuals of a model.
pub fn format_residuals(rows: &[ResidualRow]) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals:\n");
    out.push_str(format!("{:>6} {:>12} {:>12} {:>12}\n", "row", "observed", "fitted", "residual").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<12} {:-<12} {:-<12}\n", "", "", "", "").trim_end());
    out.push('\n');
    for r in rows {
        out.push_str(
            format!(
                "{:>6} {:>12.4} {:>12.4} {:>12.4}\n",
                r.row + 1,
                r.observed,
                r.fitted,
                r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_significance(s: Significance) -> String {
    match s {
        Significance::CriticalT(t) => format!("|t| >= {t:.3}"),
        Significance::Confidence(c) => format!("confidence={:.1}%", c * 100.0),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CandidateModel, SearchStats};
    use crate::search::VariableSubset;

    fn sample() -> Sample {
        Sample::from_columns(vec![1.0, 2.0, 4.0], &[vec![0.0, 1.0, 2.0], vec![3.0, 1.0, 2.0]])
            .unwrap()
            .with_names("Sales", vec!["Price".into(), "Ads".into()])
            .unwrap()
    }

    fn ranked(rank: usize, se: f64) -> RankedModel {
        RankedModel {
            rank,
            subset: VariableSubset::from_members(2, &[0, 1]).unwrap(),
            model: CandidateModel {
                intercept: 1.0,
                coefficients: vec![Some(1.5), Some(-0.25)],
                t_statistics: vec![1.0, 5.0],
                r: 0.9,
                std_error: se,
                n_obs: 3,
                components: 1,
                rows: vec![0, 1, 2],
                fitted: vec![1.0, 2.5, 3.0],
                residuals: vec![0.0, -0.5, 1.0],
            },
        }
    }

    #[test]
    fn equation_lists_signed_terms() {
        let eq = format_equation(&ranked(1, 0.1), &sample());
        assert_eq!(eq, "Sales = 1.000000 + 1.500000*Price - 0.250000*Ads");
    }

    #[test]
    fn table_respects_show_limit() {
        let outcome = SearchOutcome {
            models: vec![ranked(1, 0.1), ranked(2, 0.2), ranked(3, 0.3)],
            stats: SearchStats::default(),
        };
        let text = format_ranked_models(&outcome, &sample(), 2);
        assert!(text.contains("Price + Ads"));
        assert!(text.contains("(1 more not shown)"));
        assert!(text.contains("Best model:"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn residuals_sorted_by_magnitude() {
        let rows = largest_residuals(&ranked(1, 0.1), &sample(), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[0].observed, 4.0);
        assert_eq!(rows[1].row, 1);
        assert!(format_residuals(&rows).contains("Largest residuals"));
    }

    #[test]
    fn summary_flags_truncation() {
        let outcome = SearchOutcome {
            models: vec![],
            stats: SearchStats {
                truncated: true,
                ..SearchStats::default()
            },
        };
        let text = format_summary(&sample(), &outcome, &SearchConfig::default(), "demo");
        assert!(text.contains("confidence=95.0%"));
        assert!(text.contains("results are partial"));
    }

    #[test]
    fn summary_lists_variables_used_by_any_model() {
        let mut single = ranked(2, 0.2);
        single.subset = VariableSubset::single(2, 1);
        let outcome = SearchOutcome {
            models: vec![single, ranked(1, 0.1)],
            stats: SearchStats::default(),
        };
        let text = format_summary(&sample(), &outcome, &SearchConfig::default(), "demo");
        assert!(text.contains("- variables in retained models: Price + Ads (2 of 2)"));
    }

    #[test]
    fn truncate_long_labels() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
