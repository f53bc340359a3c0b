//! Script Bench - interactive script workbench
//!
//! Main entry point: sets up logging and configuration, then dispatches to
//! the requested command.

use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use script_bench::commands::{exit_code, ConfigCommand, HighlightCommand, RunCommand};
use script_bench::core::{AppConfig, APP_NAME, VERSION};
use script_bench::shell::ShellCommand;

#[derive(Parser)]
#[command(name = "script-bench", version, about = "Interactive script workbench")]
struct Cli {
    /// Use this configuration file instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script file and stream its output
    Run {
        script: PathBuf,
        /// Interpreter to launch instead of the configured one
        #[arg(short, long)]
        interpreter: Option<String>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print a file with its keywords highlighted
    Highlight {
        file: PathBuf,
        /// List keyword spans instead of coloring the text
        #[arg(long)]
        spans: bool,
    },
    /// Edit and run a script interactively
    Shell {
        #[arg(short, long)]
        interpreter: Option<String>,
    },
    /// Show the effective configuration
    Config,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so script output on stdout stays clean
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))?;

    info!("{} v{} starting...", APP_NAME, VERSION);

    let config = load_config(cli.config.as_deref()).await?;

    match cli.command {
        Command::Run { script, interpreter, json } => {
            let status = RunCommand { script, interpreter, json }.execute(config).await?;
            Ok(ExitCode::from(exit_code(&status)))
        }
        Command::Highlight { file, spans } => {
            HighlightCommand { file, spans }.execute().await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Shell { interpreter } => {
            ShellCommand { interpreter }.execute(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            ConfigCommand.execute(&config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration from an explicit file or the default location
async fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            AppConfig::load_from(path).await?
        }
        None => AppConfig::load().await?,
    };
    Ok(config)
}
