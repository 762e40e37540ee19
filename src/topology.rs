//! Topology discovery.
//!
//! Starting from one seed node, discovery decides between cluster mode and
//! primary/replica mode, enumerates every member address and materializes an
//! [`Instance`] per member with a bounded concurrent fan-out. A member that
//! cannot be reached becomes a warning; only a seed failure (or a broken
//! primary in replication mode) aborts the run.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::net::SocketAddr;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::client::parsing::{parse_member_table, parse_replica_entries};
use crate::client::{
    ClientError, Connector, InfoSection, MemberTable, NodeConnection, ReplicaListing,
};
use crate::config::FleetConfig;
use crate::error::ParseError;
use crate::instance::{Instance, InstanceInitError, Role};
use crate::slots::{SlotCoverage, TOTAL_SLOTS};

/// Errors that abort discovery.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Seed node unavailable: {0}")]
    Seed(#[source] InstanceInitError),

    #[error("Replica {replica} reports no primary address")]
    NoPrimary { replica: String },

    #[error("Primary of replica {replica} unavailable: {source}")]
    PrimaryUnreachable {
        replica: String,
        #[source]
        source: InstanceInitError,
    },

    #[error("Cascading replication is not supported: {primary} is itself a replica")]
    CascadingReplication { primary: String },

    #[error("Failed to query {address}: {source}")]
    Query {
        address: String,
        #[source]
        source: ClientError,
    },

    #[error("Failed to parse diagnostics from {address}: {source}")]
    Parse {
        address: String,
        #[source]
        source: ParseError,
    },
}

/// Non-fatal problems with the discovered topology as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TopologyHealthWarning {
    /// Primaries do not own every slot exactly once.
    IncompleteSlotCoverage(SlotCoverage),
}

impl std::fmt::Display for TopologyHealthWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyHealthWarning::IncompleteSlotCoverage(coverage) => write!(
                f,
                "Cluster slot count is {} (expected {}, {} missing, {} duplicated). \
                 Some slots may be missing or migrating.",
                coverage.assigned,
                TOTAL_SLOTS,
                coverage.missing(),
                coverage.duplicated()
            ),
        }
    }
}

/// Counts for a status report footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopologySummary {
    pub primaries: usize,
    pub members: usize,
    pub failed: usize,
    pub slot_coverage: Option<SlotCoverage>,
}

/// The discovered cluster.
#[derive(Debug, Serialize)]
#[serde(bound(serialize = ""))]
pub struct Topology<C> {
    /// Seed reported `cluster_enabled:1`.
    pub cluster_mode: bool,
    /// Seed address as given by the caller.
    pub seed_address: String,
    /// Reachable members, seed included. Unordered.
    pub members: Vec<Instance<C>>,
    /// Members that could not be materialized, keyed by `address` (or
    /// `address,node_id` in cluster mode). Unreadable replica entries are
    /// keyed by their info field name.
    pub warnings: BTreeMap<String, String>,
    pub health: Vec<TopologyHealthWarning>,
    /// Parsed member table, in cluster mode.
    #[serde(skip)]
    pub member_table: Option<MemberTable>,
}

impl<C: NodeConnection> Topology<C> {
    /// The seed instance.
    pub fn seed(&self) -> Option<&Instance<C>> {
        self.members.iter().find(|m| m.address == self.seed_address)
    }

    /// Version reported by the seed.
    pub fn version(&self) -> Option<&str> {
        self.seed().map(|s| s.version.as_str())
    }

    /// All primaries, unordered.
    pub fn primaries(&self) -> impl Iterator<Item = &Instance<C>> {
        self.members.iter().filter(|m| m.is_primary())
    }

    /// Replicas linked to `primary` by replication source or member table.
    pub fn replicas_of(&self, primary: &Instance<C>) -> Vec<&Instance<C>> {
        self.members
            .iter()
            .filter(|m| m.is_replica())
            .filter(|m| {
                m.replication_source.as_deref() == Some(primary.address.as_str())
                    || (!primary.node_id.is_empty()
                        && m.primary_id.as_deref() == Some(primary.node_id.as_str()))
            })
            .collect()
    }

    /// Members in report order: each primary ascending by address followed
    /// by its replicas ascending by address, then everything unlinked.
    pub fn ordered_members(&self) -> Vec<&Instance<C>> {
        let mut primaries: Vec<&Instance<C>> = self.primaries().collect();
        primaries.sort_by(|a, b| compare_addresses(&a.address, &b.address));

        let mut ordered: Vec<&Instance<C>> = Vec::with_capacity(self.members.len());
        for primary in primaries {
            ordered.push(primary);
            let mut replicas = self.replicas_of(primary);
            replicas.sort_by(|a, b| compare_addresses(&a.address, &b.address));
            for replica in replicas {
                if !ordered.iter().any(|o| o.address == replica.address) {
                    ordered.push(replica);
                }
            }
        }

        let mut rest: Vec<&Instance<C>> = self
            .members
            .iter()
            .filter(|m| !ordered.iter().any(|o| o.address == m.address))
            .collect();
        rest.sort_by(|a, b| compare_addresses(&a.address, &b.address));
        ordered.extend(rest);
        ordered
    }

    /// Slot coverage over discovered primaries, in cluster mode.
    pub fn slot_coverage(&self) -> Option<SlotCoverage> {
        self.cluster_mode.then(|| {
            SlotCoverage::from_ranges(self.primaries().flat_map(|p| p.owned_slots.iter()))
        })
    }

    pub fn summary(&self) -> TopologySummary {
        TopologySummary {
            primaries: self.primaries().count(),
            members: self.members.len(),
            failed: self.warnings.len(),
            slot_coverage: self.slot_coverage(),
        }
    }

    /// Release every member connection.
    pub async fn release_all(&self) {
        join_all(self.members.iter().map(|m| m.release())).await;
    }

    fn check_health(&mut self) {
        if let Some(coverage) = self.slot_coverage()
            && !coverage.is_complete()
        {
            warn!(
                assigned = coverage.assigned,
                missing = coverage.missing(),
                "Slot coverage is incomplete"
            );
            self.health
                .push(TopologyHealthWarning::IncompleteSlotCoverage(coverage));
        }
    }
}

/// Order `host:port` strings by socket address, falling back to text.
pub fn compare_addresses(a: &str, b: &str) -> Ordering {
    match (a.parse::<SocketAddr>(), b.parse::<SocketAddr>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Discovers a topology through a connector.
pub struct Discovery<'a, K> {
    connector: &'a K,
    concurrency: usize,
}

impl<'a, K: Connector> Discovery<'a, K> {
    pub fn new(connector: &'a K, config: &FleetConfig) -> Self {
        Self {
            connector,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Discover every member reachable from `seed`.
    #[instrument(skip(self))]
    pub async fn discover(&self, seed: &str) -> Result<Topology<K::Connection>, DiscoveryError> {
        let seed_instance = Instance::connect(self.connector, seed)
            .await
            .map_err(DiscoveryError::Seed)?;

        let mut topology = if seed_instance.cluster_enabled {
            debug!("Seed is in cluster mode");
            self.discover_cluster(seed_instance).await?
        } else {
            debug!("Seed is in primary/replica mode");
            self.discover_replication(seed_instance).await?
        };

        topology.check_health();
        info!(
            members = topology.members.len(),
            warnings = topology.warnings.len(),
            cluster_mode = topology.cluster_mode,
            "Discovery complete"
        );
        Ok(topology)
    }

    async fn discover_cluster(
        &self,
        mut seed: Instance<K::Connection>,
    ) -> Result<Topology<K::Connection>, DiscoveryError> {
        let table = match self.member_table(&seed).await {
            Ok(table) => table,
            Err(e) => {
                seed.release().await;
                return Err(e);
            }
        };

        let seed_row = table
            .row_for_address(&seed.address)
            .or_else(|| table.myself())
            .cloned();
        if let Some(ref row) = seed_row {
            seed.assign_member_row(row);
        }

        let targets = table
            .rows
            .iter()
            .filter(|row| row.address != seed.address)
            .filter(|row| seed_row.as_ref().is_none_or(|s| s.address != row.address))
            .map(|row| {
                (
                    format!("{},{}", row.address, row.node_id),
                    row.address.clone(),
                )
            })
            .collect();

        let (mut members, warnings) = self.materialize(targets).await;
        for member in &mut members {
            member.apply_member_table(&table);
        }
        let seed_address = seed.address.clone();
        members.insert(0, seed);

        Ok(Topology {
            cluster_mode: true,
            seed_address,
            members,
            warnings,
            health: Vec::new(),
            member_table: Some(table),
        })
    }

    async fn member_table(
        &self,
        seed: &Instance<K::Connection>,
    ) -> Result<MemberTable, DiscoveryError> {
        let raw = seed
            .connection()
            .cluster_nodes()
            .await
            .map_err(|source| DiscoveryError::Query {
                address: seed.address.clone(),
                source,
            })?;
        parse_member_table(&raw).map_err(|source| DiscoveryError::Parse {
            address: seed.address.clone(),
            source,
        })
    }

    async fn discover_replication(
        &self,
        seed: Instance<K::Connection>,
    ) -> Result<Topology<K::Connection>, DiscoveryError> {
        let seed_address = seed.address.clone();

        // Enumerate from the primary; a replica seed leads us to it.
        let (primary, seed) = if seed.role == Role::Replica {
            let Some(source) = seed.replication_source.clone() else {
                seed.release().await;
                return Err(DiscoveryError::NoPrimary {
                    replica: seed_address,
                });
            };
            let primary = match Instance::connect(self.connector, &source).await {
                Ok(primary) => primary,
                Err(source) => {
                    seed.release().await;
                    return Err(DiscoveryError::PrimaryUnreachable {
                        replica: seed_address,
                        source,
                    });
                }
            };
            if !primary.is_primary() {
                primary.release().await;
                seed.release().await;
                return Err(DiscoveryError::CascadingReplication { primary: source });
            }
            (primary, Some(seed))
        } else {
            (seed, None)
        };

        let listing = match self.replica_entries(&primary).await {
            Ok(listing) => listing,
            Err(e) => {
                primary.release().await;
                if let Some(seed) = seed {
                    seed.release().await;
                }
                return Err(e);
            }
        };

        let targets = listing
            .entries
            .into_iter()
            .filter(|entry| entry.address != seed_address && entry.address != primary.address)
            .map(|entry| (entry.address.clone(), entry.address))
            .collect();

        let (replicas, mut warnings) = self.materialize(targets).await;
        for (field, e) in listing.invalid {
            warn!(primary = %primary.address, field = %field, error = %e, "Skipping replica entry");
            warnings.insert(field, e.to_string());
        }

        let mut members = Vec::with_capacity(replicas.len() + 2);
        members.push(primary);
        members.extend(seed);
        members.extend(replicas);

        Ok(Topology {
            cluster_mode: false,
            seed_address,
            members,
            warnings,
            health: Vec::new(),
            member_table: None,
        })
    }

    async fn replica_entries(
        &self,
        primary: &Instance<K::Connection>,
    ) -> Result<ReplicaListing, DiscoveryError> {
        let raw = primary
            .connection()
            .info(InfoSection::Replication)
            .await
            .map_err(|source| DiscoveryError::Query {
                address: primary.address.clone(),
                source,
            })?;
        parse_replica_entries(&raw).map_err(|source| DiscoveryError::Parse {
            address: primary.address.clone(),
            source,
        })
    }

    /// Connect to every `(warning_key, address)` target with bounded
    /// concurrency. Failures become warnings.
    async fn materialize(
        &self,
        targets: Vec<(String, String)>,
    ) -> (Vec<Instance<K::Connection>>, BTreeMap<String, String>) {
        let connector = self.connector;
        let outcomes: Vec<_> = stream::iter(targets)
            .map(|(key, address)| async move {
                let outcome = Instance::connect(connector, &address).await;
                (key, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut members = Vec::with_capacity(outcomes.len());
        let mut warnings = BTreeMap::new();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(instance) => members.push(instance),
                Err(e) => {
                    warn!(member = %key, error = %e, "Failed to create instance");
                    warnings.insert(key, e.to_string());
                }
            }
        }
        (members, warnings)
    }
}
