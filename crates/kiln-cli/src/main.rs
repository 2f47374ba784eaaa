//! kiln CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;

use commands::Commands;
use config::CliContext;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about = "Check, package and publish zr releases", long_about = None)]
struct Cli {
    /// Pipeline configuration file, relative to the workspace
    #[arg(long, global = true, default_value = "kiln.yaml")]
    config: PathBuf,

    /// Workspace root (defaults to the current directory)
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// JSON file with secrets, consulted after the environment
    #[arg(long, global = true)]
    secrets_file: Option<PathBuf>,

    /// Echo the output of every build tool
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let ctx = CliContext::load(
        &cli.config,
        cli.workspace.clone(),
        cli.secrets_file.clone(),
        cli.verbose,
    )?;

    match cli.command {
        Commands::Run {
            event,
            git_ref,
            dry_run,
            format,
        } => handlers::run(&ctx, event, git_ref, dry_run, format).await?,
        Commands::Gate { event, git_ref } => handlers::gate(&ctx, event, git_ref)?,
        Commands::Matrix { format } => handlers::matrix(&ctx, format)?,
        Commands::Plan => handlers::plan()?,
        Commands::Check { platform } => handlers::check(&ctx, platform).await?,
        Commands::Release { platform } => handlers::release(&ctx, platform).await?,
        Commands::Publish { tag, dry_run } => handlers::publish(&ctx, &tag, dry_run).await?,
    }

    Ok(())
}
