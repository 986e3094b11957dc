// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Conclave CLI
//!
//! The `conclave` binary runs a research mission in the foreground or serves
//! the HTTP control surface for a UI.
//!
//! ## Commands
//!
//! - `conclave run [--cycles N]` - Start a fresh mission and follow its cycles
//! - `conclave resume [--cycles N]` - Continue from the persisted snapshot
//! - `conclave reset --yes` - Delete all mission state
//! - `conclave status` / `conclave graph` - Inspect the persisted mission
//! - `conclave serve` - HTTP API + SSE event stream
//! - `conclave config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use conclave_cli::commands::{self, ConfigCommand, MissionArgs};
use conclave_cli::telemetry::{init_logging, LogFormat};

/// Conclave - autonomous research team orchestrator
#[derive(Parser)]
#[command(name = "conclave")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CONCLAVE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CONCLAVE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, env = "CONCLAVE_LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a fresh mission and follow it in the foreground
    Run(MissionArgs),

    /// Resume the mission from its persisted snapshot
    Resume(MissionArgs),

    /// Clear the knowledge graph, agents, counters and the snapshot
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show the persisted mission status
    Status,

    /// Print the persisted knowledge graph
    Graph {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Serve the HTTP control surface
    Serve {
        /// Override the bind address from the configuration
        #[arg(long, env = "CONCLAVE_HOST")]
        host: Option<String>,

        /// Override the port from the configuration
        #[arg(long, env = "CONCLAVE_PORT")]
        port: Option<u16>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run(args) => commands::mission::run(cli.config, args).await,
        Commands::Resume(args) => commands::mission::resume(cli.config, args).await,
        Commands::Reset { yes } => commands::mission::reset(cli.config, yes).await,
        Commands::Status => commands::mission::status(cli.config).await,
        Commands::Graph { json } => commands::mission::graph(cli.config, json).await,
        Commands::Serve { host, port } => commands::serve::serve(cli.config, host, port).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
    }
}
