//! Plain-text rendering of pipeline run reports.

use hobart_pipeline::RunReport;
use std::fmt::Write;

/// Render a run report as plain text for console output.
#[must_use]
pub fn render_run_report(report: &RunReport) -> String {
    let mut out = String::new();

    writeln!(out, "Pipeline run summary").unwrap();
    writeln!(out, "====================").unwrap();
    writeln!(out, "  Securities selected:  {}", report.securities_total).unwrap();
    writeln!(out, "  Securities derived:   {}", report.securities_derived).unwrap();
    writeln!(out, "  Securities skipped:   {}", report.securities_skipped).unwrap();
    writeln!(out, "  Derivation failures:  {}", report.failures.len()).unwrap();
    writeln!(out, "  Rows loaded:          {}", report.rows_loaded).unwrap();
    writeln!(out, "  Batches completed:    {}", report.batches_completed).unwrap();
    writeln!(
        out,
        "  Elapsed:              {:.1}s",
        report.elapsed().num_milliseconds() as f64 / 1000.0
    )
    .unwrap();

    if !report.failures.is_empty() {
        writeln!(out).unwrap();
        writeln!(out, "Failures:").unwrap();
        for failure in &report.failures {
            writeln!(
                out,
                "  {} ({}): {}",
                failure.symbol, failure.security_id, failure.message
            )
            .unwrap();
        }
    }

    out
}
