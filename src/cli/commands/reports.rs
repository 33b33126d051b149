//! Reports Command
//!
//! Usage:
//!   bakerstreet reports list [--format json]
//!   bakerstreet reports show <REPORT_ID>

use crate::cli::Output;
use crate::config::Config;
use crate::research::{list_reports, read_report};
use crate::types::Result;

pub fn list(config: &Config, format: &str) -> Result<()> {
    let root = &config.server.reports_root;
    let reports = list_reports(root)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let out = Output::new();
    out.header(&format!("Reports under {}", root.display()));
    if reports.is_empty() {
        out.info("No reports found.");
        return Ok(());
    }

    for entry in &reports {
        out.field(
            &entry.report_id,
            format!(
                "{}  {:>7} B  {}",
                entry.created.format("%Y-%m-%d %H:%M"),
                entry.size,
                entry.path.display()
            ),
        );
    }
    out.info(&format!("{} reports", reports.len()));
    Ok(())
}

/// Print a report's markdown to stdout
pub fn show(config: &Config, report_id: &str) -> Result<()> {
    let doc = read_report(&config.server.reports_root, report_id)?;
    println!("{}", doc.content);
    Ok(())
}
