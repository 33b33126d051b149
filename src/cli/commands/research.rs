//! Research Commands
//!
//! Usage:
//!   bakerstreet research --query "<q>" [--output-dir DIR]
//!   bakerstreet interactive [--output-dir DIR]
//!   bakerstreet pipeline [--output-dir DIR]

use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::cli::Output;
use crate::config::Config;
use crate::research::{PipelineRunner, ResultEnvelope};
use crate::types::Result;

fn resolve_output_dir(config: &Config, output_dir: Option<PathBuf>) -> PathBuf {
    output_dir.unwrap_or_else(|| config.research.output_dir.clone())
}

/// Run one query and print the envelope
pub async fn run(
    config: &Config,
    query: &str,
    output_dir: Option<PathBuf>,
) -> Result<ResultEnvelope> {
    let out = Output::new();
    let output_dir = resolve_output_dir(config, output_dir);
    let (runner, _) = PipelineRunner::bootstrap(config)?;

    out.header(&format!("Researching: {}", query.trim()));
    let envelope = runner.conduct(query, &output_dir).await?;
    out.envelope(&envelope);
    Ok(envelope)
}

/// Run the configured sample query
pub async fn pipeline(config: &Config, output_dir: Option<PathBuf>) -> Result<ResultEnvelope> {
    let query = config.research.sample_query.clone();
    run(config, &query, output_dir).await
}

pub async fn interactive(config: &Config, output_dir: Option<PathBuf>) -> Result<()> {
    let out = Output::new();
    let output_dir = resolve_output_dir(config, output_dir);
    let (runner, _) = PipelineRunner::bootstrap(config)?;

    out.header("Baker Street Laboratory - Interactive Research");
    out.info("Type a research question, 'help' for commands, or 'quit' to exit.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let completed = interactive_loop(&runner, &output_dir, stdin, true).await?;
    out.info(&format!("Goodbye. {} sessions completed.", completed));
    Ok(())
}

/// Read queries line by line until EOF or a quit command.
///
/// Returns the number of successfully completed sessions.
pub async fn interactive_loop<R>(
    runner: &PipelineRunner,
    output_dir: &Path,
    reader: R,
    show_prompt: bool,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let out = Output::new();
    let mut lines = reader.lines();
    let mut completed = 0;

    loop {
        if show_prompt {
            print!("\nbakerstreet> ");
            let _ = std::io::stdout().flush();
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let query = line.trim();
        match query.to_lowercase().as_str() {
            "" => continue,
            "quit" | "exit" | "q" => break,
            "help" => {
                out.section("Commands");
                out.field("help", "Show this message");
                out.field("status", "Show pipeline status");
                out.field("quit | exit | q", "Leave interactive mode");
                out.info("Anything else is treated as a research question.");
            }
            "status" => {
                out.section("Pipeline Status");
                out.runner_status(&runner.status());
                out.field("Completed here", completed);
            }
            _ => match runner.conduct(query, output_dir).await {
                Ok(envelope) => {
                    if envelope.is_success() {
                        completed += 1;
                    }
                    out.envelope(&envelope);
                }
                Err(e) => out.error(&e.to_string()),
            },
        }
    }

    Ok(completed)
}
