//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use litcoder_domain::ItemState;
use litcoder_extractor::{RunSummary, StatusReport};
use std::path::PathBuf;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of a run.
    pub fn format_run_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)?),
            OutputFormat::Table => Ok(self.format_run_summary_table(summary)),
        }
    }

    fn format_run_summary_table(&self, summary: &RunSummary) -> String {
        let mut builder = Builder::default();
        builder.push_record(["#", "Document", "State", "Time", "Error"]);

        for (index, item) in summary.items.iter().enumerate() {
            builder.push_record([
                (index + 1).to_string(),
                item.name.clone(),
                self.state_label(item.state),
                item.timing(),
                item.error.clone().unwrap_or_default(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let totals = format!(
            "Total items: {}, succeeded: {}, skipped: {}, failed: {}",
            summary.total, summary.succeeded, summary.skipped, summary.failed
        );
        let saved = format!(
            "Saved {} rows to {}",
            summary.rows_written,
            summary.output.display()
        );
        let closing = if summary.failed > 0 {
            self.warning(&format!("{} item(s) failed; run the job again to retry them", summary.failed))
        } else {
            self.success("All items coded")
        };

        format!("{}\n{}\n{}\n{}", table, totals, self.info(&saved), closing)
    }

    /// Format a job status report.
    pub fn format_status(&self, report: &StatusReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => Ok(self.format_status_table(report)),
        }
    }

    fn format_status_table(&self, report: &StatusReport) -> String {
        let mut builder = Builder::default();
        builder.push_record(["#", "Document", "State", "File"]);

        for (index, item) in report.items.iter().enumerate() {
            let file = if item.document_present {
                "present".to_string()
            } else {
                self.colorize("missing", "red")
            };
            builder.push_record([
                (index + 1).to_string(),
                item.name.clone(),
                self.state_label(item.state),
                file,
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        format!(
            "{}\n{}: {} done, {} failed, {} pending ({})",
            table,
            report.job,
            report.count(ItemState::Succeeded),
            report.count(ItemState::Failed),
            report.count(ItemState::Pending),
            report.output.display()
        )
    }

    /// Format the result of a job check.
    pub fn format_check(&self, job: &str, items: usize, missing: &[PathBuf]) -> Result<String> {
        if self.format == OutputFormat::Json {
            let value = serde_json::json!({
                "job": job,
                "items": items,
                "valid": true,
                "missing_documents": missing,
            });
            return Ok(serde_json::to_string_pretty(&value)?);
        }

        let mut lines = vec![self.success(&format!("Job '{}' is valid ({} items)", job, items))];
        if missing.is_empty() {
            lines.push(self.success("All documents present"));
        } else {
            lines.push(self.warning(&format!("{} document(s) missing:", missing.len())));
            lines.extend(missing.iter().map(|path| format!("  {}", path.display())));
        }
        Ok(lines.join("\n"))
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn state_label(&self, state: ItemState) -> String {
        let color = match state {
            ItemState::Succeeded => "green",
            ItemState::Skipped => "cyan",
            ItemState::Failed => "red",
            ItemState::Pending => "yellow",
        };
        self.colorize(state.as_str(), color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}
