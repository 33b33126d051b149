use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bakerstreet::cli::commands;
use bakerstreet::{Config, ConfigLoader, ResultEnvelope};

#[derive(Parser)]
#[command(name = "bakerstreet")]
#[command(
    version,
    about = "Baker Street Laboratory - research automation pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Explicit config file (TOML)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single research query
    Research {
        #[arg(long, short = 'Q', help = "Research question")]
        query: String,
        #[arg(long, short, help = "Output directory for the report")]
        output_dir: Option<PathBuf>,
    },

    /// Read research questions from stdin in a loop
    Interactive {
        #[arg(long, short, help = "Output directory for reports")]
        output_dir: Option<PathBuf>,
    },

    /// Run the configured sample query end to end
    Pipeline {
        #[arg(long, short, help = "Output directory for the report")]
        output_dir: Option<PathBuf>,
    },

    /// Start the HTTP API
    Serve {
        #[arg(long, help = "Bind host (overrides config)")]
        host: Option<String>,
        #[arg(long, short, help = "Bind port (overrides config)")]
        port: Option<u16>,
    },

    /// Show pipeline and session status
    Status {
        #[arg(long, short, help = "Show one session in detail")]
        session: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Browse generated reports
    Reports {
        #[command(subcommand)]
        action: ReportsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ReportsAction {
    /// List reports, newest first
    List {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Print one report
    Show {
        #[arg(help = "Report id (the session id in the file name)")]
        report_id: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mBaker Street encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Backtrace when RUST_BACKTRACE=1
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn ensure_success(envelope: ResultEnvelope) -> anyhow::Result<()> {
    if envelope.is_success() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "session {} failed: {}",
            envelope.session_id,
            envelope.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

fn run_cli() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let explicit = cli.config.as_deref();
    let load = || -> anyhow::Result<Config> { Ok(ConfigLoader::load(explicit)?) };

    match cli.command {
        Commands::Research { query, output_dir } => {
            let config = load()?;
            let rt = Runtime::new()?;
            let envelope = rt.block_on(commands::research::run(&config, &query, output_dir))?;
            ensure_success(envelope)?;
        }
        Commands::Interactive { output_dir } => {
            let config = load()?;
            let rt = Runtime::new()?;
            rt.block_on(commands::research::interactive(&config, output_dir))?;
        }
        Commands::Pipeline { output_dir } => {
            let config = load()?;
            let rt = Runtime::new()?;
            let envelope = rt.block_on(commands::research::pipeline(&config, output_dir))?;
            ensure_success(envelope)?;
        }
        Commands::Serve { host, port } => {
            let config = load()?;
            let rt = Runtime::new()?;
            rt.block_on(commands::serve::run(config, host, port))?;
        }
        Commands::Status { session, format } => {
            let config = load()?;
            let rt = Runtime::new()?;
            rt.block_on(commands::status::run(&config, session.as_deref(), &format))?;
        }
        Commands::Reports { action } => {
            let config = load()?;
            match action {
                ReportsAction::List { format } => commands::reports::list(&config, &format)?,
                ReportsAction::Show { report_id } => commands::reports::show(&config, &report_id)?,
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(explicit, &format)?,
            ConfigAction::Path => commands::config::path(explicit)?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(())
}
