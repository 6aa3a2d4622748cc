//! sfb: command-line front-ends over the coordination core.
//!
//! This binary is intentionally thin: argument parsing and JSON printing
//! live here, every decision lives in the library crates. One compact JSON
//! object per invocation on stdout; exit codes mirror the deployment's
//! expectations (acquire timeout = 1, heartbeat loss = 2).

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sfb")]
#[command(about = "scfuzzbench run coordination", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Global benchmark lock operations
    Lock {
        #[command(subcommand)]
        cmd: commands::lock::LockCmd,
    },

    /// Shard queue operations
    Queue {
        #[command(subcommand)]
        cmd: commands::queue::QueueCmd,
    },

    /// Run the queue worker loop (configured entirely from SFB_* env vars)
    Worker {
        #[command(subcommand)]
        cmd: commands::worker::WorkerCmd,
    },

    /// Queue-aware run completion checks
    Completion {
        #[command(subcommand)]
        cmd: commands::completion::CompletionCmd,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Lock { cmd } => commands::lock::run(cmd).await,
        Commands::Queue { cmd } => commands::queue::run(cmd).await,
        Commands::Worker { cmd } => commands::worker::run(cmd).await,
        Commands::Completion { cmd } => commands::completion::run(cmd).await,
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
