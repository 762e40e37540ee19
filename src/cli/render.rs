//! Text and JSON rendering of reports.
//!
//! Every function returns the finished text; the caller decides where it
//! goes. Colors come from `colored`, which honors `NO_COLOR` and non-TTY
//! output on its own.

use std::collections::BTreeMap;
use std::fmt::Write;

use colored::{ColoredString, Colorize};
use serde::Serialize;

use crate::client::{ClientSession, NodeConnection};
use crate::dispatch::Outcome;
use crate::instance::{Instance, Role};
use crate::topology::{Topology, TopologyHealthWarning, TopologySummary};

/// JSON shape of `vfleet status --json`.
#[derive(Serialize)]
#[serde(bound(serialize = ""))]
pub struct StatusReport<'a, C> {
    pub cluster_mode: bool,
    pub version: Option<&'a str>,
    pub members: Vec<&'a Instance<C>>,
    pub warnings: &'a BTreeMap<String, String>,
    pub health: &'a [TopologyHealthWarning],
    pub summary: TopologySummary,
}

impl<'a, C: NodeConnection> StatusReport<'a, C> {
    pub fn new(topology: &'a Topology<C>) -> Self {
        Self {
            cluster_mode: topology.cluster_mode,
            version: topology.version(),
            members: topology.ordered_members(),
            warnings: &topology.warnings,
            health: &topology.health,
            summary: topology.summary(),
        }
    }
}

/// JSON shape of `vfleet exec --json`.
#[derive(Serialize)]
pub struct ExecReport<'a> {
    pub results: &'a BTreeMap<String, Outcome>,
    pub warnings: &'a BTreeMap<String, String>,
}

fn role_label(role: &Role) -> ColoredString {
    let text = format!("{:<7}", role.to_string());
    match role {
        Role::Primary => text.green().bold(),
        Role::Replica => text.cyan(),
        Role::Unknown(_) => text.yellow(),
    }
}

/// Member table in report order, followed by failures and health warnings.
pub fn render_status<C: NodeConnection>(topology: &Topology<C>, show_slots: bool) -> String {
    let mut out = String::new();
    let mode = if topology.cluster_mode {
        "cluster"
    } else {
        "primary/replica"
    };
    let _ = writeln!(
        out,
        "{} {} (version {})",
        "Mode:".bold(),
        mode,
        topology.version().unwrap_or("unknown")
    );

    for member in topology.ordered_members() {
        let indent = if member.is_replica() { "  " } else { "" };
        let _ = write!(
            out,
            "{}{} {}",
            indent,
            role_label(&member.role),
            member.address.bold()
        );
        if !member.node_id.is_empty() {
            let _ = write!(out, " {}", member.node_id.dimmed());
        }
        let _ = write!(
            out,
            "  mem {:.2}/{:.2}GB  clients {}/{}  keys {}",
            member.used_memory_gb,
            member.max_memory_gb,
            member.connected_clients,
            member.max_clients,
            member.key_count_display()
        );
        if member.is_primary() && topology.cluster_mode {
            let _ = write!(out, "  slots {}", member.slot_count());
        }
        if member.replication_catching_up {
            let _ = write!(out, "  {}", "syncing".yellow());
        }
        out.push('\n');
        if show_slots && member.is_primary() && topology.cluster_mode {
            let _ = writeln!(out, "{}    {}", indent, member.slots_display());
        }
    }

    out.push_str(&render_warnings(&topology.warnings));
    for warning in &topology.health {
        let _ = writeln!(out, "{} {}", "WARNING:".yellow().bold(), warning);
    }

    let summary = topology.summary();
    let _ = write!(
        out,
        "{} primaries, {} members",
        summary.primaries, summary.members
    );
    if summary.failed > 0 {
        let _ = write!(out, ", {}", format!("{} unreachable", summary.failed).red());
    }
    if let Some(coverage) = summary.slot_coverage {
        let _ = write!(out, ", {} slots assigned", coverage.assigned);
    }
    out.push('\n');
    out
}

/// Members that could not be materialized.
pub fn render_warnings(warnings: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (member, cause) in warnings {
        let _ = writeln!(out, "{} {}: {}", "FAILED:".red().bold(), member, cause);
    }
    out
}

/// Per-node command results, one block per node.
pub fn render_outcomes(results: &BTreeMap<String, Outcome>) -> String {
    let mut out = String::new();
    for (node, outcome) in results {
        let _ = writeln!(out, "{}", format!("{}:", node).bold());
        let body = match outcome {
            Outcome::Reply(_) => outcome.to_string().normal(),
            Outcome::Failed(_) => outcome.to_string().red(),
        };
        let _ = writeln!(out, "{}", body);
    }
    out
}

/// Session counts grouped by peer host, replication links excluded.
pub fn render_sessions(node: &str, sessions: &[ClientSession]) -> String {
    let mut by_host: BTreeMap<&str, usize> = BTreeMap::new();
    for session in sessions.iter().filter(|s| !s.is_replication_link()) {
        *by_host.entry(session.peer_host()).or_default() += 1;
    }

    let mut out = String::new();
    let total: usize = by_host.values().sum();
    let _ = writeln!(out, "{} {} sessions", format!("{}:", node).bold(), total);
    for (host, count) in by_host {
        let _ = writeln!(out, "  {:<40} {}", host, count);
    }
    out
}
