//! Grounded CLI
//!
//! Main entry point for the `grounded` command-line tool.
//! Serves the HTTP API and runs builds and questions against the local
//! document pool.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, BuildCommand, FilesCommand, ServeCommand, StatusCommand};
use grounded_core::config::{AppConfig, CliOverrides};
use grounded_core::logging::{self, LogFormat};
use grounded_core::AppResult;
use std::path::PathBuf;

/// Grounded - evidence-grounded answers from your own documents
#[derive(Parser, Debug)]
#[command(name = "grounded")]
#[command(about = "Evidence-grounded answers from your own documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "GROUNDED_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "GROUNDED_CONFIG")]
    config: Option<PathBuf>,

    /// Document pool root (default: <workspace>/data)
    #[arg(long, global = true, env = "GROUNDED_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Build the knowledge base from the document pool
    Build(BuildCommand),

    /// Build from the pool, then answer a question
    Ask(AskCommand),

    /// Show document pool and configuration status
    Status(StatusCommand),

    /// Manage files in the document pool
    Files(FilesCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.workspace.clone(), cli.config.clone())?;
    let config = config.with_overrides(CliOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        data_dir: cli.data_dir,
        log_level: cli.log_level,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    logging::init_logging(
        config.log_level.as_deref(),
        config.no_color,
        LogFormat::parse(&config.log_format)?,
    )?;

    config.validate()?;

    tracing::info!("Grounded CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Data dir: {:?}", config.resolved_data_dir());
    tracing::debug!(
        "Embedding: provider={}, model={}",
        config.embedding.provider,
        config.embedding.model
    );

    let command_name = match &cli.command {
        Commands::Serve(_) => "serve",
        Commands::Build(_) => "build",
        Commands::Ask(_) => "ask",
        Commands::Status(_) => "status",
        Commands::Files(_) => "files",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Build(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
        Commands::Files(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
