//! Volley - Entry Point
//!
//! Deploys git branches as docker containers onto remote hosts over SSH.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use volley::config;
use volley::exec::{ShellExec, SshExec};
use volley::logs::{init_logging, LogOptions};
use volley::notify::Notifier;
use volley::orchestrator::{Options, Orchestrator};

#[derive(Parser)]
#[command(name = "volley", version, about = "Deploy git branches as containers onto remote hosts")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare every target host (remote log file and port counter)
    Setup {
        /// Path to the configuration file
        #[arg(short, long, default_value = "volley.yaml")]
        config: PathBuf,
    },
    /// Build, push and run every configured branch on every target
    Deploy {
        /// Path to the configuration file
        #[arg(short, long, default_value = "volley.yaml")]
        config: PathBuf,
    },
    /// Remove every configured branch's containers from every target
    Down {
        /// Path to the configuration file
        #[arg(short, long, default_value = "volley.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(LogOptions { debug: cli.debug }) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config_path = match &cli.command {
        Command::Setup { config } | Command::Deploy { config } | Command::Down { config } => {
            config.clone()
        }
    };

    let config = match config::load(&config_path).await {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(path = %config_path.display(), error = %e, "cannot load configuration");
            std::process::exit(1);
        }
    };

    let notifier = match Notifier::from_config(&config.notification) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            error!(error = %e, "cannot build notifier");
            std::process::exit(1);
        }
    };

    let orchestrator = Orchestrator::new(
        config,
        Arc::new(SshExec),
        Arc::new(ShellExec),
        notifier,
        Options::default(),
    );

    let summary = match cli.command {
        Command::Setup { .. } => orchestrator.setup().await,
        Command::Deploy { .. } => orchestrator.deploy().await,
        Command::Down { .. } => orchestrator.down().await,
    };

    if !summary.ok() {
        std::process::exit(1);
    }
}
