//! topo: assemble, diff, and record deployment topologies.
//!
//! # Usage
//!
//! ```text
//! STAGE=pr-123 topo plan --format json
//! topo --config topology.toml diff --ledger .topo/plans.redb
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "topo",
    about = "Deployment topology assembler",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Optional topology.toml overriding endpoints and mapping defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the topology and print its plan in apply order.
    Plan {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Compare the assembled plan with the last recorded revision.
    Diff {
        /// Ledger database path.
        #[arg(short, long, default_value = ".topo/plans.redb")]
        ledger: PathBuf,
    },
    /// Record the assembled plan as the stack's next revision.
    Record {
        #[arg(short, long, default_value = ".topo/plans.redb")]
        ledger: PathBuf,
    },
    /// List recorded revisions of the current stack.
    History {
        #[arg(short, long, default_value = ".topo/plans.redb")]
        ledger: PathBuf,
    },
    /// Print the gate's route table.
    Routes,
    /// Write a topology.toml scaffold with the built-in endpoints.
    Init {
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_format)?;

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Plan { format } => commands::plan::plan(config, &format),
        Commands::Diff { ledger } => commands::ledger::diff(config, &ledger),
        Commands::Record { ledger } => commands::ledger::record(config, &ledger),
        Commands::History { ledger } => commands::ledger::history(config, &ledger),
        Commands::Routes => commands::plan::routes(config),
        Commands::Init { path } => commands::init::init(&path),
    }
}

/// Logs go to stderr so plan output on stdout stays machine-readable.
fn init_tracing(format: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,topo=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}
