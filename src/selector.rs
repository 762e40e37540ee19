//! Target selection.
//!
//! A [`Target`] names which discovered members a command should reach. The
//! variants are mutually exclusive, so a request can never carry both an
//! explicit list and a role keyword. Explicit lists are all-or-nothing: one
//! unmatched token fails the whole selection.

use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::client::NodeConnection;
use crate::instance::Instance;

/// Errors that can occur while resolving targets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Some targets not found: {}", .0.join(", "))]
    TargetsNotFound(Vec<String>),

    #[error("Invalid role '{0}': expected primary, replica or all")]
    InvalidRole(String),

    #[error("A node list and a role cannot be given together")]
    ConflictingTargets,

    #[error("Target list is empty")]
    EmptyTargetList,

    #[error("Seed node {0} is not among the discovered members")]
    SeedNotDiscovered(String),
}

/// Role keyword for role-based selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleFilter {
    Primary,
    Replica,
    All,
}

impl FromStr for RoleFilter {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "master" => Ok(RoleFilter::Primary),
            "replica" | "slave" => Ok(RoleFilter::Replica),
            "all" => Ok(RoleFilter::All),
            _ => Err(SelectionError::InvalidRole(s.to_string())),
        }
    }
}

/// Which members to address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Exact `host:port` addresses.
    Addresses(Vec<String>),
    /// Cluster node IDs.
    NodeIds(Vec<String>),
    Role(RoleFilter),
    /// The seed node alone.
    Seed,
}

impl Target {
    /// Parse a comma-separated target list.
    ///
    /// Only the first token decides whether the list holds addresses or node
    /// IDs. Duplicate tokens are collapsed.
    pub fn from_list(list: &str) -> Result<Self, SelectionError> {
        let mut tokens: Vec<String> = Vec::new();
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !tokens.iter().any(|t| t == token) {
                tokens.push(token.to_string());
            }
        }

        match tokens.first() {
            None => Err(SelectionError::EmptyTargetList),
            Some(first) if looks_like_address(first) => Ok(Target::Addresses(tokens)),
            Some(_) => Ok(Target::NodeIds(tokens)),
        }
    }

    /// Build a target from optional command-line inputs.
    pub fn from_cli(nodes: Option<&str>, role: Option<&str>) -> Result<Self, SelectionError> {
        match (nodes, role) {
            (Some(_), Some(_)) => Err(SelectionError::ConflictingTargets),
            (Some(list), None) => Self::from_list(list),
            (None, Some(role)) => Ok(Target::Role(role.parse()?)),
            (None, None) => Ok(Target::Seed),
        }
    }

    pub fn kind(&self) -> SelectorKind {
        match self {
            Target::Addresses(_) => SelectorKind::Address,
            Target::NodeIds(_) => SelectorKind::NodeId,
            Target::Role(_) => SelectorKind::Role,
            Target::Seed => SelectorKind::Seed,
        }
    }
}

/// How a selection was made; drives result display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    Address,
    NodeId,
    Role,
    Seed,
}

/// Resolved members, borrowed from the topology.
#[derive(Debug)]
pub struct Selection<'a, C> {
    pub kind: SelectorKind,
    pub members: Vec<&'a Instance<C>>,
}

impl<'a, C> Selection<'a, C> {
    /// Key used for this member in command results: `address(node_id)`
    /// for node-ID selections, otherwise the address.
    pub fn display_key(&self, instance: &Instance<C>) -> String {
        match self.kind {
            SelectorKind::NodeId => format!("{}({})", instance.address, instance.node_id),
            _ => instance.address.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Resolve `target` against the discovered members.
pub fn select<'a, C: NodeConnection>(
    members: &'a [Instance<C>],
    target: &Target,
    seed: &str,
) -> Result<Selection<'a, C>, SelectionError> {
    let selected: Vec<&Instance<C>> = match target {
        Target::Addresses(tokens) => match_all(members, tokens, |m| m.address.as_str())?,
        Target::NodeIds(tokens) => match_all(members, tokens, |m| m.node_id.as_str())?,
        Target::Role(RoleFilter::Primary) => members.iter().filter(|m| m.is_primary()).collect(),
        Target::Role(RoleFilter::Replica) => members.iter().filter(|m| m.is_replica()).collect(),
        Target::Role(RoleFilter::All) => members.iter().collect(),
        Target::Seed => {
            let seed_member = members
                .iter()
                .find(|m| m.address == seed)
                .ok_or_else(|| SelectionError::SeedNotDiscovered(seed.to_string()))?;
            vec![seed_member]
        }
    };

    debug!(kind = ?target.kind(), count = selected.len(), "Selected targets");
    Ok(Selection {
        kind: target.kind(),
        members: selected,
    })
}

fn match_all<'a, C>(
    members: &'a [Instance<C>],
    tokens: &[String],
    key: impl Fn(&Instance<C>) -> &str,
) -> Result<Vec<&'a Instance<C>>, SelectionError> {
    let mut selected = Vec::with_capacity(tokens.len());
    let mut missing = Vec::new();
    for token in tokens {
        match members.iter().find(|m| key(m) == token.as_str()) {
            Some(member) => selected.push(member),
            None => missing.push(token.clone()),
        }
    }
    if missing.is_empty() {
        Ok(selected)
    } else {
        Err(SelectionError::TargetsNotFound(missing))
    }
}

/// A token is an address when it has a host and a numeric port after the
/// last colon.
fn looks_like_address(token: &str) -> bool {
    token
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}
