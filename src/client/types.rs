//! Types for parsed diagnostic output.
//!
//! These types represent the parsed output of `CLUSTER NODES`,
//! `INFO REPLICATION` and `CLIENT LIST`.

use serde::Serialize;

use crate::error::ParseError;

/// One row of `CLUSTER NODES` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRow {
    /// Node ID assigned by the cluster (40 hex characters).
    pub node_id: String,
    /// Client address `host:port`, without the cluster bus port.
    pub address: String,
    /// Row describes the node that produced the listing.
    pub myself: bool,
    /// Node is flagged `fail` or `pfail`.
    pub failed: bool,
    /// Node ID of the primary if this row is a replica.
    pub primary_id: Option<String>,
    /// Raw slot spec, empty for replicas and slotless primaries.
    pub slot_spec: String,
}

/// Parsed `CLUSTER NODES` output, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberTable {
    pub rows: Vec<MemberRow>,
}

impl MemberTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the listing had no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row announcing `address`.
    pub fn row_for_address(&self, address: &str) -> Option<&MemberRow> {
        self.rows.iter().find(|row| row.address == address)
    }

    /// Find the row flagged `myself`.
    pub fn myself(&self) -> Option<&MemberRow> {
        self.rows.iter().find(|row| row.myself)
    }

    /// Find a row by node ID.
    pub fn row_for_node_id(&self, node_id: &str) -> Option<&MemberRow> {
        self.rows.iter().find(|row| row.node_id == node_id)
    }
}

/// A replica announced by a primary in `INFO REPLICATION`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaEntry {
    /// Info field name, e.g. `slave0`.
    pub field: String,
    /// Replica address `ip:port`.
    pub address: String,
    /// Replication state (`online`, `wait_bgsave`, ...), if reported.
    pub state: Option<String>,
}

/// Replica entries announced by a primary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaListing {
    /// Readable entries, sorted by field name.
    pub entries: Vec<ReplicaEntry>,
    /// Entries that could not be read, keyed by field name.
    pub invalid: Vec<(String, ParseError)>,
}

/// One connected client from `CLIENT LIST`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientSession {
    pub id: String,
    pub addr: String,
    pub name: String,
    pub flags: String,
    pub cmd: String,
}

impl ClientSession {
    /// Host part of the peer address.
    pub fn peer_host(&self) -> &str {
        self.addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.addr)
    }

    /// Session belongs to a replica or primary link rather than a user.
    pub fn is_replication_link(&self) -> bool {
        self.flags.contains('S') || self.flags.contains('M')
    }
}
