//! Command dispatch.
//!
//! Sends one command line to every selected member concurrently. A failing
//! node becomes an [`Outcome::Failed`] entry; it never aborts the batch.
//! Denylisted commands are refused before any node is contacted.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::client::{NodeConnection, Reply};
use crate::selector::Selection;

/// Commands that wipe data, stop the process or attach a blocking session.
pub const FORBIDDEN_COMMANDS: &[&str] = &[
    "DEBUG", "FLUSHALL", "FLUSHDB", "SHUTDOWN", "MONITOR", "SYNC", "PSYNC",
];

/// Errors that abort a dispatch before any node is contacted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Command {0} is forbidden")]
    Forbidden(String),

    #[error("Command line is empty")]
    EmptyCommand,
}

/// Result of running the command on one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Reply(Reply),
    Failed(String),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Reply(reply) => write!(f, "{}", reply),
            Outcome::Failed(error) => write!(f, "(error) {}", error),
        }
    }
}

/// Split a command line into tokens and check it against the denylist.
pub fn parse_command_line(command_line: &str) -> Result<Vec<String>, DispatchError> {
    let args: Vec<String> = command_line.split_whitespace().map(String::from).collect();
    let Some(name) = args.first() else {
        return Err(DispatchError::EmptyCommand);
    };
    let name = name.to_ascii_uppercase();
    if FORBIDDEN_COMMANDS.contains(&name.as_str()) {
        return Err(DispatchError::Forbidden(name));
    }
    Ok(args)
}

/// Run `command_line` on every selected member, at most `concurrency` at a
/// time. Every selected member appears in the result.
#[instrument(skip(selection), fields(targets = selection.len()))]
pub async fn dispatch<C: NodeConnection>(
    selection: &Selection<'_, C>,
    command_line: &str,
    concurrency: usize,
) -> Result<BTreeMap<String, Outcome>, DispatchError> {
    let args = parse_command_line(command_line)?;
    Ok(dispatch_args(selection, &args, concurrency).await)
}

/// Run already-validated `args` on every selected member, at most
/// `concurrency` at a time.
#[instrument(skip(selection, args), fields(targets = selection.len()))]
pub async fn dispatch_args<C: NodeConnection>(
    selection: &Selection<'_, C>,
    args: &[String],
    concurrency: usize,
) -> BTreeMap<String, Outcome> {
    let results: BTreeMap<String, Outcome> = stream::iter(selection.members.iter().copied())
        .map(|member| async move {
            let key = selection.display_key(member);
            let outcome = match member.run(args).await {
                Ok(reply) => Outcome::Reply(reply),
                Err(e) => {
                    warn!(node = %key, error = %e, "Command failed");
                    Outcome::Failed(e.to_string())
                }
            };
            (key, outcome)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let failed = results.values().filter(|o| o.is_failed()).count();
    info!(nodes = results.len(), failed, "Dispatch complete");
    results
}
