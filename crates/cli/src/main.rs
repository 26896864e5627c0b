//! Threadline CLI entry point.
//!
//! Commands:
//! - `chat`    Interactive chat with the hosted assistant
//! - `ask`     Send one message (optionally with a file) and print the reply
//! - `doctor`  Check configuration and secrets

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "threadline",
    about = "Threadline — chat with a hosted assistant from your terminal",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to a secrets.toml (default: ./.threadline/secrets.toml, then ~/.threadline/secrets.toml)
    #[arg(long, global = true, env = "THREADLINE_SECRETS")]
    secrets: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat interactively with the assistant
    Chat,

    /// Send a single message and print the reply
    Ask {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Attach a file (image or document)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Diagnose configuration
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables still apply
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "Loaded .env");
    }

    let secrets = cli.secrets.as_deref();
    match cli.command {
        Commands::Chat => commands::chat::run(secrets).await?,
        Commands::Ask { message, file } => commands::ask::run(secrets, message, file).await?,
        Commands::Doctor => commands::doctor::run(secrets).await?,
    }

    Ok(())
}
