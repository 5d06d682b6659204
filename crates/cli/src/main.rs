mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::audit::AuditQuery;
use config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Vendor contract evaluation with an auditable decision trail.
#[derive(Parser)]
#[command(
    name = "arbiter",
    version,
    about = "Vendor contract evaluation with an auditable decision trail"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Path to arbiter.toml (default: ./arbiter.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full evaluation pipeline on a contract record
    Evaluate {
        /// Path to the evaluation record JSON (`-` for stdin)
        record: PathBuf,
    },

    /// Recover a decision from saved provider output
    Recover {
        /// Path to the raw provider text (`-` for stdin)
        file: PathBuf,
    },

    /// Show audit ledger entries, oldest first
    Audit {
        /// Only entries written by this actor
        #[arg(long)]
        actor: Option<String>,
        /// Only entries with this action
        #[arg(long)]
        action: Option<String>,
        /// Keep only the newest N matching entries
        #[arg(long)]
        limit: Option<usize>,
        /// Print newest entries first
        #[arg(long)]
        newest_first: bool,
    },

    /// Validate a contract record without running the pipeline
    Validate {
        /// Path to the evaluation record JSON (`-` for stdin)
        record: PathBuf,
    },

    /// Check that the configured generation provider is reachable
    Health,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let code = match cli.command {
        Commands::Recover { file } => commands::cmd_recover(&file, cli.output, cli.quiet),
        Commands::Validate { record } => commands::cmd_validate(&record, cli.output, cli.quiet),
        command => {
            let config = match Config::load(cli.config.as_deref()) {
                Ok(c) => c,
                Err(e) => {
                    report_error(&e.to_string(), cli.output, cli.quiet);
                    process::exit(commands::EXIT_ERROR);
                }
            };
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(&format!("failed to start runtime: {}", e), cli.output, cli.quiet);
                    process::exit(commands::EXIT_ERROR);
                }
            };
            rt.block_on(run_async(command, &config, cli.output, cli.quiet))
        }
    };
    process::exit(code);
}

async fn run_async(command: Commands, config: &Config, output: OutputFormat, quiet: bool) -> i32 {
    match command {
        Commands::Evaluate { record } => {
            commands::cmd_evaluate(&record, config, output, quiet).await
        }
        Commands::Audit {
            actor,
            action,
            limit,
            newest_first,
        } => {
            let query = AuditQuery {
                actor,
                action,
                limit,
                newest_first,
            };
            commands::cmd_audit(query, config, output, quiet).await
        }
        Commands::Health => commands::cmd_health(config, output, quiet).await,
        Commands::Recover { file } => commands::cmd_recover(&file, output, quiet),
        Commands::Validate { record } => commands::cmd_validate(&record, output, quiet),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(quiet: bool) {
    let default = if quiet { "arbiter=warn" } else { "arbiter=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
