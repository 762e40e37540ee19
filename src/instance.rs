//! A single cluster member.
//!
//! An [`Instance`] is built in one step: open a connection, fetch `INFO ALL`,
//! and populate every field from it. Discovery later back-fills the node ID
//! and slot ownership from the member table. Numeric fields are best-effort:
//! a missing or unparsable value defaults to zero and is recorded in
//! [`Instance::diagnostics`] instead of failing the whole instance.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::client::parsing::{parse_client_list, parse_info_block};
use crate::client::{
    ClientError, ClientSession, Connector, InfoSection, MemberRow, MemberTable, NodeConnection,
    Reply,
};
use crate::slots::{SlotRange, format_slot_ranges, parse_slot_spec};

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Errors that can occur while building an instance.
#[derive(Error, Debug)]
pub enum InstanceInitError {
    /// The node could not be reached or rejected the connection.
    #[error(transparent)]
    Connect(#[from] ClientError),

    /// The node was reached but the diagnostics query failed.
    #[error("Failed to init instance {address}: {source}")]
    Diagnostics {
        address: String,
        #[source]
        source: ClientError,
    },
}

impl InstanceInitError {
    /// Address of the node that failed.
    pub fn address(&self) -> &str {
        match self {
            InstanceInitError::Connect(e) => e.address(),
            InstanceInitError::Diagnostics { address, .. } => address,
        }
    }
}

/// Replication role reported by the node itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Primary,
    Replica,
    /// Role field missing or not one of `master`/`slave`.
    Unknown(String),
}

impl Role {
    /// Parse the `role` INFO field.
    pub fn parse(s: &str) -> Self {
        match s {
            "master" => Role::Primary,
            "slave" => Role::Replica,
            other => Role::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Primary => write!(f, "master"),
            Role::Replica => write!(f, "slave"),
            Role::Unknown(raw) if raw.is_empty() => write!(f, "unknown"),
            Role::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Why a field fell back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldIssue {
    Missing,
    Invalid(String),
}

/// A field that could not be read from the node's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiagnostic {
    pub field: &'static str,
    pub issue: FieldIssue,
}

/// One live cluster member.
#[derive(Debug, Serialize)]
pub struct Instance<C> {
    /// `host:port`, unique within a discovery run.
    pub address: String,
    /// Cluster node ID, empty outside cluster mode.
    pub node_id: String,
    pub role: Role,
    /// Primary address for replicas.
    pub replication_source: Option<String>,
    /// Initial synchronization with the primary is in progress.
    pub replication_catching_up: bool,
    pub max_memory_gb: f64,
    pub used_memory_gb: f64,
    pub max_clients: u64,
    pub connected_clients: u64,
    pub cluster_enabled: bool,
    /// Owned slots, only for primaries in cluster mode.
    pub owned_slots: Vec<SlotRange>,
    /// Keys in db0; `None` when db0 is empty or absent.
    pub key_count: Option<u64>,
    pub version: String,
    /// Primary node ID from the member table, for cluster replicas.
    pub primary_id: Option<String>,
    pub diagnostics: Vec<FieldDiagnostic>,
    #[serde(skip)]
    conn: C,
}

impl<C: NodeConnection> Instance<C> {
    /// Connect to `address` and populate the instance from `INFO ALL`.
    ///
    /// The connection is released before returning if the diagnostics query
    /// fails.
    #[instrument(skip(connector))]
    pub async fn connect<K>(connector: &K, address: &str) -> Result<Self, InstanceInitError>
    where
        K: Connector<Connection = C>,
    {
        let conn = connector.connect(address).await?;
        match conn.info(InfoSection::All).await {
            Ok(info) => Ok(Self::from_info(address, conn, &info)),
            Err(source) => {
                conn.release().await;
                Err(InstanceInitError::Diagnostics {
                    address: address.to_string(),
                    source,
                })
            }
        }
    }

    /// Build an instance from an open connection and its `INFO ALL` text.
    pub fn from_info(address: &str, conn: C, info: &str) -> Self {
        let fields = parse_info_block(info);
        let mut reader = FieldReader::new(&fields);

        let role = match reader.text("role") {
            Some(role) => Role::parse(role),
            None => Role::Unknown(String::new()),
        };

        let mut replication_source = None;
        let mut replication_catching_up = false;
        if role == Role::Replica {
            let host = reader.text("master_host");
            let port = reader.text("master_port");
            if let (Some(host), Some(port)) = (host, port) {
                replication_source = Some(format!("{}:{}", host, port));
            }
            replication_catching_up = fields
                .get("master_sync_in_progress")
                .is_some_and(|v| v == "1");
        }

        let max_memory_gb = bytes_to_gb(reader.number("maxmemory"));
        let used_memory_gb = bytes_to_gb(reader.number("used_memory"));
        let max_clients = reader.number("maxclients");
        let connected_clients = reader.number("connected_clients");
        let cluster_enabled = reader.text("cluster_enabled") == Some("1");

        let version = fields
            .get("valkey_version")
            .or_else(|| fields.get("redis_version"))
            .cloned()
            .unwrap_or_else(|| {
                reader.missing("redis_version");
                String::new()
            });

        let key_count = fields
            .get("db0")
            .and_then(|db0| match parse_db_keys(db0) {
                Some(keys) => Some(keys),
                None => {
                    reader.invalid("db0", db0);
                    None
                }
            });

        let diagnostics = reader.finish();
        if !diagnostics.is_empty() {
            debug!(address, ?diagnostics, "Instance has degraded fields");
        }

        Self {
            address: address.to_string(),
            node_id: String::new(),
            role,
            replication_source,
            replication_catching_up,
            max_memory_gb,
            used_memory_gb,
            max_clients,
            connected_clients,
            cluster_enabled,
            owned_slots: Vec::new(),
            key_count,
            version,
            primary_id: None,
            diagnostics,
            conn,
        }
    }

    /// Back-fill identity and slot ownership from this node's member row.
    ///
    /// The row decides node ID and slots; the node's own report decides
    /// role, so slots are only taken when the node says it is a primary.
    pub fn assign_member_row(&mut self, row: &MemberRow) {
        self.node_id = row.node_id.clone();
        self.primary_id = row.primary_id.clone();
        if self.is_primary() && self.cluster_enabled {
            match parse_slot_spec(&row.slot_spec) {
                Ok(slots) => self.owned_slots = slots,
                Err(e) => {
                    self.owned_slots.clear();
                    self.diagnostics.push(FieldDiagnostic {
                        field: "slots",
                        issue: FieldIssue::Invalid(e.to_string()),
                    });
                }
            }
        }
    }

    /// Back-fill from the member table row that matches this address.
    ///
    /// Returns false when no row announces this address.
    pub fn apply_member_table(&mut self, table: &MemberTable) -> bool {
        match table.row_for_address(&self.address) {
            Some(row) => {
                self.assign_member_row(row);
                true
            }
            None => false,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }

    pub fn is_replica(&self) -> bool {
        self.role == Role::Replica
    }

    /// Total owned slots.
    pub fn slot_count(&self) -> u32 {
        self.owned_slots.iter().map(SlotRange::count).sum()
    }

    /// Owned slots rendered as `[a-b] [c-d]`.
    pub fn slots_display(&self) -> String {
        format_slot_ranges(&self.owned_slots)
    }

    /// Key count, or `"unknown"` when db0 reported nothing.
    pub fn key_count_display(&self) -> String {
        self.key_count
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Run one command on this node.
    pub async fn run(&self, args: &[String]) -> Result<Reply, ClientError> {
        self.conn.command(args).await
    }

    /// Sessions currently connected to this node.
    pub async fn client_sessions(&self) -> Result<Vec<ClientSession>, ClientError> {
        let args = ["CLIENT".to_string(), "LIST".to_string()];
        let reply = self.conn.command(&args).await?;
        Ok(reply.as_text().map(parse_client_list).unwrap_or_default())
    }

    /// Close the connection. Safe to call more than once.
    pub async fn release(&self) {
        self.conn.release().await;
    }
}

fn bytes_to_gb(bytes: f64) -> f64 {
    (bytes / BYTES_PER_GIB * 100.0).round() / 100.0
}

/// Extract `keys` from a keyspace entry like `keys=10,expires=0,avg_ttl=0`.
fn parse_db_keys(db: &str) -> Option<u64> {
    db.split(',')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "keys")
        .and_then(|(_, value)| value.parse().ok())
}

/// Reads INFO fields and collects a diagnostic for each one that falls back.
struct FieldReader<'a> {
    fields: &'a HashMap<String, String>,
    diagnostics: Vec<FieldDiagnostic>,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a HashMap<String, String>) -> Self {
        Self {
            fields,
            diagnostics: Vec::new(),
        }
    }

    fn text(&mut self, field: &'static str) -> Option<&'a str> {
        let fields = self.fields;
        let value = fields.get(field).map(String::as_str);
        if value.is_none() {
            self.missing(field);
        }
        value
    }

    fn number<T: FromStr + Default>(&mut self, field: &'static str) -> T {
        let Some(raw) = self.text(field) else {
            return T::default();
        };
        raw.parse().unwrap_or_else(|_| {
            self.invalid(field, raw);
            T::default()
        })
    }

    fn missing(&mut self, field: &'static str) {
        self.diagnostics.push(FieldDiagnostic {
            field,
            issue: FieldIssue::Missing,
        });
    }

    fn invalid(&mut self, field: &'static str, raw: &str) {
        self.diagnostics.push(FieldDiagnostic {
            field,
            issue: FieldIssue::Invalid(raw.to_string()),
        });
    }

    fn finish(self) -> Vec<FieldDiagnostic> {
        self.diagnostics
    }
}
