//! Serve Command
//!
//! Start the HTTP API, optionally overriding the configured address.

use crate::api;
use crate::cli::Output;
use crate::config::Config;
use crate::types::Result;

pub async fn run(mut config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    let out = Output::new();
    out.header("Baker Street Laboratory API");
    out.field(
        "Address",
        format!("http://{}:{}", config.server.host, config.server.port),
    );
    out.field("Reports root", config.server.reports_root.display());
    out.field("Default output", config.server.api_output_dir.display());

    api::serve(config).await
}
