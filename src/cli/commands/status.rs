//! Status Command
//!
//! Display pipeline readiness, stored session counts and recent sessions,
//! or the full history of one session.

use serde_json::json;

use crate::ai::provider::probe;
use crate::cli::Output;
use crate::config::Config;
use crate::research::PipelineRunner;
use crate::types::{ResearchError, Result};

const RECENT_SESSIONS: usize = 10;

pub async fn run(config: &Config, session: Option<&str>, format: &str) -> Result<()> {
    let json_output = format == "json";
    let (runner, provider) = PipelineRunner::bootstrap(config)?;

    if let Some(session_id) = session {
        let snapshot = runner
            .sessions()
            .snapshot(session_id)?
            .ok_or_else(|| ResearchError::NotFound(format!("session {}", session_id)))?;

        if json_output {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            return Ok(());
        }

        let out = Output::new();
        out.header(&format!("Session {}", snapshot.session.session_id));
        out.field("Query", &snapshot.session.query);
        out.field("Status", snapshot.session.status);
        out.field("Output dir", &snapshot.session.output_dir);
        out.field("Created", &snapshot.session.created_at);
        if let Some(done) = &snapshot.session.completed_at {
            out.field("Finished", done);
        }
        if let Some(summary) = &snapshot.session.summary {
            out.field("Summary", summary);
        }
        if let Some(error) = &snapshot.session.error {
            out.field("Error", error);
        }

        out.section("Phases");
        for phase in &snapshot.phases {
            out.field(
                &phase.phase,
                format!("{} ({} ms)", phase.status, phase.duration_ms),
            );
        }

        if !snapshot.outputs.is_empty() {
            out.section("Outputs");
            for output in &snapshot.outputs {
                out.field(
                    &output.template,
                    format!("{} ({} words)", output.file_path, output.word_count),
                );
            }
        }
        return Ok(());
    }

    let pipeline = runner.status();
    let health = match &provider {
        Some(p) => Some(probe(p).await),
        None => None,
    };
    let counts = runner.sessions().counts()?;
    let recent = runner.sessions().recent(RECENT_SESSIONS)?;

    if json_output {
        let counts: serde_json::Map<_, _> = counts
            .into_iter()
            .map(|(status, n)| (status, json!(n)))
            .collect();
        let status = json!({
            "pipeline": pipeline,
            "provider": health,
            "sessions": counts,
            "recent": recent,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let out = Output::new();
    out.header("Baker Street Laboratory Status");

    out.section("Pipeline");
    out.runner_status(&pipeline);

    out.section("LLM Provider");
    match health {
        Some(h) => {
            out.field("Provider", &h.provider);
            out.field("Model", &h.model);
            out.field("Available", if h.available { "yes" } else { "no" });
        }
        None => out.field("Provider", "disabled"),
    }

    if runner.sessions().has_store() {
        out.section("Sessions");
        if counts.is_empty() {
            out.info("No sessions recorded yet.");
        }
        for (status, n) in &counts {
            out.field(status, n);
        }

        if !recent.is_empty() {
            out.section("Recent");
            for record in &recent {
                out.field(
                    &record.session_id,
                    format!("{:<9} {}", record.status.to_string(), record.query),
                );
            }
        }
    }

    Ok(())
}
