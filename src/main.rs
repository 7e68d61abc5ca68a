//! pr-phase-monitor CLI

mod cli;

use anstream::eprintln;
use clap::{Parser, Subcommand};
use cli::style::Stylize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "pr_phase_monitor=info";

/// Log filter used with `--verbose`
const VERBOSE_LOG_FILTER: &str = "pr_phase_monitor=debug";

#[derive(Parser)]
#[command(name = "pr-phase-monitor")]
#[command(about = "Watch pull requests, classify their review phase, and drive the next step")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll pull requests and act on their phases
    Watch {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Validate the configuration and print each repository's effective flags
    CheckConfig {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Classify a single pull request
    Classify {
        /// Pull request URL
        #[arg(long)]
        url: String,

        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Watch { config, once } => {
            cli::run_watch(config.as_deref(), cli::WatchOptions { once }).await
        }
        Commands::CheckConfig { config } => cli::run_check_config(config.as_deref()),
        Commands::Classify { url, config } => cli::run_classify(&url, config.as_deref()).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e}", "error:".failure());
            ExitCode::FAILURE
        }
    }
}
