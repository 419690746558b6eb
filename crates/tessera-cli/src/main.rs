//! Tessera workload runner.
//!
//! Runs tenant isolation workloads against the in-process reference store.
//!
//! # Quick Start
//!
//! ```bash
//! # List registered workloads
//! tessera list
//!
//! # Run the default workload with a fixed seed
//! tessera run --seed 7 -o tenantCount=200 -o testDuration=60
//!
//! # Show the merged configuration
//! tessera config
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Tessera - randomized tenant isolation testing.
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workload against the reference store.
    Run {
        /// Directory containing tessera.toml (defaults to the current directory).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Workload name (overrides workload.name).
        #[arg(short, long)]
        workload: Option<String>,

        /// Base seed (overrides workload.seed).
        #[arg(short, long)]
        seed: Option<u64>,

        /// Number of clients (overrides workload.clients).
        #[arg(long)]
        clients: Option<usize>,

        /// Workload option as key=value; may be repeated.
        #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
        options: Vec<String>,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List registered workloads.
    List,

    /// Show the effective configuration.
    Config {
        /// Directory containing tessera.toml (defaults to the current directory).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(default_level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { default_level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            workload,
            seed,
            clients,
            options,
            json,
        } => {
            let mut config = commands::load_config(config.as_deref())?;
            init_logging(&config.logging.level, cli.verbose);
            commands::run::apply_overrides(&mut config, workload, seed, clients, &options)?;
            commands::run::run(&config, json)
        }
        Commands::List => {
            init_logging("warn", cli.verbose);
            commands::list::run();
            Ok(())
        }
        Commands::Config { config } => {
            let config = commands::load_config(config.as_deref())?;
            init_logging(&config.logging.level, cli.verbose);
            commands::config::show(&config)
        }
    }
}
