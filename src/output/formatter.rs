//! Report formatters for benchmark runs
//!
//! Provides text, JSON, and CSV renderings of a `RunSummary`.

use anyhow::{Context, Result};
use std::path::Path;

use crate::benchmark::RunSummary;

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
    Csv,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

/// Run report formatter
pub struct ReportFormatter {
    format: OutputFormat,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a finished run
    pub fn render(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Text => Ok(self.render_text(summary)),
            OutputFormat::Json => {
                serde_json::to_string(summary).context("Failed to serialize report")
            }
            OutputFormat::JsonPretty => {
                serde_json::to_string_pretty(summary).context("Failed to serialize report")
            }
            OutputFormat::Csv => self.render_csv(summary),
        }
    }

    /// Console lines: per-term latencies of the last iteration and the
    /// rendered names (display mode only), then one line per iteration.
    /// A run that did not complete says so right after the iteration lines.
    fn render_text(&self, summary: &RunSummary) -> String {
        let mut output = String::new();

        if summary.display {
            for sample in summary.last_iteration_samples() {
                output.push_str(&format!(
                    "For name: {}, time taken: {}\n",
                    sample.term, sample.sample
                ));
            }
            for name in &summary.rendered_names {
                output.push_str(name);
                output.push('\n');
            }
        }

        for average in &summary.iterations {
            output.push_str(&format!(
                "iteration {}: {}.\n",
                average.iteration, average.average
            ));
        }

        if !summary.is_complete() {
            output.push_str(&format!(
                "{} ({} of {} iterations recorded)\n",
                summary.status, summary.completed_iterations, summary.requested_iterations
            ));
        }

        if !summary.cache_stats.is_empty() {
            output.push('\n');
            for stats in &summary.cache_stats {
                output.push_str(&format!(
                    "{:15} n={:<4} failed={:<3} {}\n",
                    stats.cache.to_string(),
                    stats.latency.count,
                    stats.failures,
                    stats.latency.format_summary()
                ));
            }
        }

        output
    }

    fn render_csv(&self, summary: &RunSummary) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let status = summary.status.to_string();

        writer.write_record([
            "iteration",
            "term",
            "cache",
            "latency_ms",
            "failed",
            "run_status",
        ])?;
        for sample in &summary.history {
            writer.write_record([
                sample.iteration.to_string(),
                sample.term.to_string(),
                sample.cache.to_string(),
                sample
                    .sample
                    .measured()
                    .map(|m| m.duration_ms.to_string())
                    .unwrap_or_default(),
                sample.sample.is_failed().to_string(),
                status.clone(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV report: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV report is not valid UTF-8")
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Text)
    }
}

/// Write a rendered report to a file
pub fn write_report_to_file(
    path: impl AsRef<Path>,
    summary: &RunSummary,
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();
    let content = ReportFormatter::new(format).render(summary)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}
