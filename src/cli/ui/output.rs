use console::style;

use crate::research::{ResultEnvelope, RunnerStatus};

/// Styled terminal output for CLI commands
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<18} {}", style(format!("{}:", label)).dim(), value);
    }

    pub fn envelope(&self, envelope: &ResultEnvelope) {
        if envelope.is_success() {
            self.success(&format!("Research completed: {}", envelope.query));
        } else {
            self.error(&format!("Research failed: {}", envelope.query));
        }
        self.field("Session", &envelope.session_id);
        self.field("Status", envelope.status);
        self.field("Output dir", &envelope.output_dir);
        if let Some(path) = &envelope.report_path {
            self.field("Report", path);
        }
        self.field("Summary", &envelope.summary);
        if let Some(error) = &envelope.error {
            self.field("Error", style(error).red());
        }
    }

    pub fn runner_status(&self, status: &RunnerStatus) {
        self.field(
            "Ready",
            if status.ready {
                style("yes").green()
            } else {
                style("no").red()
            },
        );
        self.field("Collector", &status.collector);
        self.field("Analyzer", &status.analyzer);
        self.field(
            "Text generation",
            status.text_generation.as_deref().unwrap_or("disabled"),
        );
        self.field(
            "Session store",
            if status.session_store { "enabled" } else { "disabled" },
        );
        self.field("Agents", status.agents_configured);
        self.field("Tools", status.tools_available);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
