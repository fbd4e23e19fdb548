mod cmd_config;
mod cmd_diagnose;
mod cmd_issues;

use std::path::Path;

use autopilot_core::config::Config;
use autopilot_diagnose::{DEFAULT_RADIUS, MAX_RADIUS};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "autopilot",
    version,
    about = "Trace Sentry crashes back to their GitHub source"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start MCP server (stdio transport, JSON-RPC 2.0)
    Serve,
    /// List unresolved Sentry issues
    Issues {
        /// Only issues seen within this many hours
        #[arg(long, default_value_t = 2)]
        hours: u32,
        /// Maximum issues to list
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Locate the crashing code of an issue and print the diagnosis as JSON
    Diagnose {
        /// Sentry issue ID
        issue_id: String,
        /// Lines of code above and below the crash line
        #[arg(
            long,
            default_value_t = DEFAULT_RADIUS,
            value_parser = clap::value_parser!(u32).range(1..=MAX_RADIUS as i64)
        )]
        radius: u32,
        /// Branch, tag or sha to read (default from GITHUB_REF)
        #[arg(long = "ref")]
        git_ref: Option<String>,
    },
    /// Validate configuration and print it with tokens redacted
    Config,
}

/// Log to stderr; stdout carries the MCP transport.
fn init_logging() {
    let filter =
        EnvFilter::try_from_env("AUTOPILOT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load a dotenv file into the process environment. Variables already set
/// win; a missing file is not an error. Returns whether a file was read.
fn load_dotenv(path: &Path) -> anyhow::Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => {
            Err(anyhow::Error::new(e).context(format!("failed to load {}", path.display())))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let dotenv_loaded = load_dotenv(Path::new(".env"))?;
    init_logging();
    if dotenv_loaded {
        tracing::debug!("loaded .env");
    }
    let cli = Cli::parse();

    let config = Config::from_env()?;
    for warning in config.warnings() {
        tracing::warn!("{warning}");
    }

    match cli.cmd {
        Command::Serve => {
            tokio::runtime::Runtime::new()?.block_on(autopilot_mcp::serve(&config))?;
            Ok(())
        }
        Command::Issues { hours, limit, json } => cmd_issues::execute(&config, hours, limit, json),
        Command::Diagnose {
            issue_id,
            radius,
            git_ref,
        } => cmd_diagnose::execute(&config, &issue_id, radius, git_ref.as_deref()),
        Command::Config => cmd_config::execute(&config),
    }
}
