//! The `vfleet` command-line surface.
//!
//! - `args`: clap definitions and their mapping onto [`FleetConfig`]
//! - `render`: text and JSON reports
//!
//! [`run`] checks the command line and target first, then discovers the
//! topology once, runs the subcommand against it and releases every member
//! connection before returning, whatever the outcome. A refused command or an
//! unknown role never opens a connection.

pub mod args;
pub mod render;

pub use args::{Cli, Command, ConnectionArgs, TargetArgs};

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::client::{Connector, NodeConnection, ValkeyConnector};
use crate::config::FleetConfig;
use crate::dispatch::{Outcome, dispatch_args, parse_command_line};
use crate::error::Result;
use crate::selector::{Target, select};
use crate::topology::{Discovery, Topology};

/// Run one subcommand against a live deployment, printing to stdout.
pub async fn run(command: &Command) -> Result<()> {
    let config = command.connection().fleet_config();
    let connector = ValkeyConnector::new(config.client_config());
    let output = run_with(&connector, &config, command).await?;
    print!("{}", output);
    Ok(())
}

/// Run one subcommand through any connector and return the report text.
pub async fn run_with<K: Connector>(
    connector: &K,
    config: &FleetConfig,
    command: &Command,
) -> Result<String> {
    let plan = Plan::from_command(command)?;
    let topology = Discovery::new(connector, config)
        .discover(&config.seed)
        .await?;
    let result = report(&topology, config, &plan).await;
    topology.release_all().await;
    result
}

/// A subcommand with its command line and target already validated.
enum Plan {
    Status {
        show_slots: bool,
        json: bool,
    },
    Exec {
        args: Vec<String>,
        target: Target,
        json: bool,
    },
    Clients {
        target: Target,
    },
}

impl Plan {
    fn from_command(command: &Command) -> Result<Self> {
        Ok(match command {
            Command::Status {
                show_slots, json, ..
            } => Plan::Status {
                show_slots: *show_slots,
                json: *json,
            },
            Command::Exec {
                command: command_line,
                target,
                json,
                ..
            } => Plan::Exec {
                args: parse_command_line(command_line)?,
                target: target.target()?,
                json: *json,
            },
            Command::Clients { target, .. } => Plan::Clients {
                target: target.target()?,
            },
        })
    }
}

async fn report<C: NodeConnection>(
    topology: &Topology<C>,
    config: &FleetConfig,
    plan: &Plan,
) -> Result<String> {
    match plan {
        Plan::Status { show_slots, json } => {
            if *json {
                to_json(&render::StatusReport::new(topology))
            } else {
                Ok(render::render_status(topology, *show_slots))
            }
        }
        Plan::Exec { args, target, json } => {
            let selection = select(&topology.members, target, &topology.seed_address)?;
            let results = dispatch_args(&selection, args, config.concurrency).await;
            if *json {
                to_json(&render::ExecReport {
                    results: &results,
                    warnings: &topology.warnings,
                })
            } else {
                let mut out = render::render_warnings(&topology.warnings);
                out.push_str(&render::render_outcomes(&results));
                Ok(out)
            }
        }
        Plan::Clients { target } => {
            let selection = select(&topology.members, target, &topology.seed_address)?;
            let selection = &selection;
            let reports: Vec<String> = stream::iter(selection.members.iter().copied())
                .map(|member| async move {
                    let key = selection.display_key(member);
                    match member.client_sessions().await {
                        Ok(sessions) => render::render_sessions(&key, &sessions),
                        Err(e) => {
                            warn!(node = %key, error = %e, "Failed to list clients");
                            let failed = BTreeMap::from([(key, Outcome::Failed(e.to_string()))]);
                            render::render_outcomes(&failed)
                        }
                    }
                })
                .buffered(config.concurrency.max(1))
                .collect()
                .await;
            Ok(reports.concat())
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}
