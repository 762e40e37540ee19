//! Command-line arguments.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, FleetConfig};
use crate::selector::{SelectionError, Target};

/// `--timeout-ms` default, in step with [`DEFAULT_TIMEOUT`].
const DEFAULT_TIMEOUT_MS: u64 = DEFAULT_TIMEOUT.as_millis() as u64;

#[derive(Parser, Debug)]
#[command(name = "vfleet")]
#[command(version, about = "Inspect a Valkey/Redis deployment and run commands across its nodes", long_about = None)]
pub struct Cli {
    /// Log level for this tool (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "VFLEET_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show every member with role, memory, clients and slots
    Status {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Print owned slot ranges for each primary
        #[arg(long)]
        show_slots: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one command on the selected nodes
    Exec {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Command line to run
        #[arg(short, long, default_value = "PING")]
        command: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show connected client sessions on the selected nodes
    Clients {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        target: TargetArgs,
    },
}

impl Command {
    pub fn connection(&self) -> &ConnectionArgs {
        match self {
            Command::Status { connection, .. }
            | Command::Exec { connection, .. }
            | Command::Clients { connection, .. } => connection,
        }
    }
}

/// Seed and connection settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Seed node address, host:port
    pub seed: String,

    /// Password for the default user
    #[arg(short = 'a', long, env = "VFLEET_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Per-connection timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// Maximum number of nodes contacted at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
}

impl ConnectionArgs {
    pub fn fleet_config(&self) -> FleetConfig {
        FleetConfig::new(self.seed.clone())
            .with_password(self.password.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_concurrency(self.concurrency)
    }
}

/// Node selection. Without either flag the seed node alone is used.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Comma-separated addresses or node IDs
    #[arg(short, long, conflicts_with = "role")]
    pub nodes: Option<String>,

    /// primary, replica or all
    #[arg(short, long)]
    pub role: Option<String>,
}

impl TargetArgs {
    pub fn target(&self) -> Result<Target, SelectionError> {
        Target::from_cli(self.nodes.as_deref(), self.role.as_deref())
    }
}
