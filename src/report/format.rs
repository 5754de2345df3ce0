//! Fixed-width terminal formatting for tables, per-entity summaries and failures.

use crate::batch::{EntityAnalysis, EntityFailure};
use crate::domain::{AnalysisConfig, Dataset, LogisticParams};
use crate::report::Table;

/// Widest entity column shown by `format_table`; longer keys are truncated.
const KEY_WIDTH: usize = 12;

/// Format the run header (dataset shape + analysis settings).
pub fn format_run_header(dataset: &Dataset, config: &AnalysisConfig) -> String {
    let mut out = String::new();

    out.push_str("=== gs - growth stage analysis ===\n");
    out.push_str(&format!(
        "Dataset: entities={} | points={} | {}=[{}, {}]\n",
        dataset.len(),
        dataset.x().len(),
        dataset.x_key(),
        fmt_opt(dataset.x().iter().copied().reduce(f64::min)),
        fmt_opt(dataset.x().iter().copied().reduce(f64::max)),
    ));
    let grid = &config.grid;
    out.push_str(&format!(
        "Grid: start={} count={} step={} | threshold={} | policy={:?}\n",
        grid.start, grid.count, grid.step, config.threshold, config.policy
    ));
    out.push('\n');

    out
}

/// Format the fitted curve and milestones for one entity.
pub fn format_entity_summary(analysis: &EntityAnalysis) -> String {
    let mut out = String::new();
    let fit = &analysis.fit;

    out.push_str(&format!(
        "{} SSE={:.4} RMSE={:.4} evals={} iters={}\n",
        analysis.entity, fit.sse, fit.rmse, fit.evaluations, fit.iterations
    ));
    out.push_str(&format!("- params {}\n", fmt_params(&fit.params)));
    if fit.at_bound {
        out.push_str("- note: b or g reached its cap; the optimum is on the boundary\n");
    }

    out.push_str(format!("  {:<4} {:>6} {:>10} {:>12}", "t", "index", "day", "rate").trim_end());
    out.push('\n');
    for (kind, m) in analysis.milestones.iter() {
        out.push_str(&format!("  {:<4} {:>6} {:>10.3} {:>12.6}\n", kind.label(), m.index, m.day, m.value));
    }

    out
}

/// Format the list of entities left out of a batch.
pub fn format_failures(failures: &[EntityFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let mut out = format!("Failed entities ({}):\n", failures.len());
    for f in failures {
        out.push_str(&format!("- {}: {}\n", f.entity, f.error));
    }
    out
}

/// Render a `Table` as right-aligned fixed-width text.
pub fn format_table(table: &Table, precision: usize) -> String {
    let label_width = table
        .row_labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(5);

    let mut out = String::new();
    let mut header = format!("{:<label_width$}", "");
    for key in table.keys() {
        header.push_str(&format!(" {:>KEY_WIDTH$}", truncate(key, KEY_WIDTH)));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let mut rule = format!("{:-<label_width$}", "");
    for _ in &table.columns {
        rule.push_str(&format!(" {:-<KEY_WIDTH$}", ""));
    }
    out.push_str(&rule);
    out.push('\n');

    for (row, label) in table.row_labels.iter().enumerate() {
        let mut line = format!("{label:<label_width$}");
        for col in &table.columns {
            match col.values.get(row) {
                Some(v) => line.push_str(&format!(" {v:>KEY_WIDTH$.precision$}")),
                None => line.push_str(&format!(" {:>KEY_WIDTH$}", "-")),
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_params(p: &LogisticParams) -> String {
    let parts: Vec<String> = LogisticParams::NAMES
        .iter()
        .zip(p.to_array())
        .map(|(name, v)| format!("{name}={v:.6}"))
        .collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x}")).unwrap_or_else(|| "-".to_string())
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
