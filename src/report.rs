//! Report rendering
//!
//! Text for humans, JSON for pipelines. Both render the same [`SuiteReport`]
//! snapshot and never touch the target.

use std::fmt::Write as _;

use crate::clock::as_millis_f64;
use crate::experiment::Experiment;
use crate::suite::SuiteReport;
use crate::Result;

const RULE_WIDTH: usize = 80;

/// Fixed follow-up actions printed at the end of every text report.
pub const RECOMMENDATIONS: [&str; 5] = [
    "Implement circuit breakers for failing operations",
    "Add connection pool monitoring and alerts",
    "Set query timeouts to prevent resource exhaustion",
    "Implement retry logic with exponential backoff",
    "Regular chaos drills to validate improvements",
];

fn heading(out: &mut String, title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "\n{rule}\n{title}\n{rule}");
}

fn duration_secs(experiment: &Experiment) -> f64 {
    experiment
        .duration()
        .and_then(|d| d.to_std().ok())
        .map_or(0.0, |d| as_millis_f64(d) / 1000.0)
}

/// Render the human-readable report.
#[must_use]
pub fn render_text(suite: &SuiteReport) -> String {
    let report = suite.report();
    let mut out = String::new();

    heading(&mut out, "CHAOS ENGINEERING EXPERIMENT REPORT");
    let _ = writeln!(out, "Total Experiments: {}", report.experiments().len());
    let _ = writeln!(out, "Completed: {}", report.completed_count());
    let _ = writeln!(out, "Failed: {}", report.failed_count());
    let _ = writeln!(
        out,
        "Baseline Latency: {:.2}ms ({} active connections)",
        suite.baseline().query_latency_ms(),
        suite.baseline().active_connections()
    );

    heading(&mut out, "EXPERIMENT DETAILS");
    for (i, experiment) in report.experiments().iter().enumerate() {
        let _ = writeln!(out, "\n[{}] {}", i + 1, experiment.name());
        let _ = writeln!(out, "    Description: {}", experiment.description());
        let _ = writeln!(out, "    Blast Radius: {}", experiment.blast_radius());
        let _ = writeln!(out, "    Duration: {:.2}s", duration_secs(experiment));
        let _ = writeln!(
            out,
            "    Result: {}",
            experiment.result().to_string().to_uppercase()
        );
        if !experiment.observations().is_empty() {
            out.push_str("    Observations:\n");
            for observation in experiment.observations() {
                let _ = writeln!(out, "      - {observation}");
            }
        }
    }

    heading(&mut out, "RESILIENCE ASSESSMENT");
    let _ = writeln!(out, "Resilience Score: {:.0}/100", report.score());
    let _ = writeln!(out, "Assessment: {}", report.tier());
    let recovery = report.recovery();
    let _ = writeln!(
        out,
        "Recovery: {} after {:.2}ms ({} failed probes)",
        if recovery.recovered { "recovered" } else { "not recovered" },
        recovery.elapsed_ms,
        recovery.attempts
    );

    heading(&mut out, "RECOMMENDATIONS");
    for (i, line) in RECOMMENDATIONS.iter().enumerate() {
        let _ = writeln!(out, "{}. {line}", i + 1);
    }
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out
}

/// Render the report as pretty-printed JSON.
///
/// # Errors
/// `Error::Json` if serialization fails.
pub fn render_json(suite: &SuiteReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(suite)?)
}
