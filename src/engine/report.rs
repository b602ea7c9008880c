// src/engine/report.rs

//! Text reports printed after a pipeline run.

use std::time::Duration;

use crate::engine::pipeline::{PipelineReport, StageTiming};
use crate::errors::ActionFailures;

/// `HH:MM:SS`.
pub fn format_hms(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// "Time Cost Statistic" block, one line per stage run.
pub fn render_time_cost(timings: &[StageTiming]) -> String {
    let mut out = String::from("Time Cost Statistic\n");
    out.push_str(&"-".repeat(60));
    out.push('\n');
    for t in timings {
        out.push_str(&format!("{}: {} [{}]\n", format_hms(t.elapsed), t.stage, t.version));
    }
    out
}

/// Which contexts made it and which failed, with their messages.
pub fn render_partial_success(failures: &ActionFailures) -> String {
    let mut out = String::new();
    out.push_str(&format!("Success: {}\n", failures.succeeded.join(" ")));
    for (ctx, msg) in failures.failures.iter() {
        out.push_str(&format!("Failed: {ctx} -> {msg}\n"));
    }
    out
}

/// Everything worth printing about a finished run.
pub fn render_pipeline(report: &PipelineReport) -> String {
    let mut out = String::new();
    for (version, order) in report.build_orders.iter() {
        out.push_str(&format!("[{version}] {}\n", order.join(" ")));
    }
    if let Some(failure) = &report.failure {
        out.push_str(&format!("\nStage '{}' failed [{}]\n", failure.stage, failure.version));
        out.push_str(&render_partial_success(&failure.failures));
    }
    if !report.timings.is_empty() {
        out.push('\n');
        out.push_str(&render_time_cost(&report.timings));
    }
    out
}
