//! Discovery tests: cluster mode, primary/replica mode, partial failure and
//! connection release accounting.

use valkey_fleet::config::FleetConfig;
use valkey_fleet::instance::Role;
use valkey_fleet::topology::{Discovery, DiscoveryError, TopologyHealthWarning};

use crate::mock_cluster::*;

fn config(seed: &str) -> FleetConfig {
    FleetConfig::new(seed)
}

// ============================================================================
// Cluster mode
// ============================================================================

#[tokio::test]
async fn test_cluster_discovery_finds_every_member() {
    let connector = healthy_cluster();
    let config = config(PRIMARIES[0]);

    let topology = Discovery::new(&connector, &config)
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert!(topology.cluster_mode);
    assert_eq!(topology.members.len(), 6);
    assert!(topology.warnings.is_empty());
    assert!(topology.health.is_empty());
    assert_eq!(topology.seed_address, PRIMARIES[0]);

    for (idx, address) in PRIMARIES.iter().enumerate() {
        let member = topology
            .members
            .iter()
            .find(|m| m.address == *address)
            .unwrap();
        assert_eq!(member.role, Role::Primary);
        assert_eq!(member.node_id, primary_id(idx));
        assert!(member.slot_count() > 5000);
    }
    for (idx, address) in REPLICAS.iter().enumerate() {
        let member = topology
            .members
            .iter()
            .find(|m| m.address == *address)
            .unwrap();
        assert_eq!(member.role, Role::Replica);
        assert_eq!(member.node_id, replica_id(idx));
        assert_eq!(member.primary_id, Some(primary_id(idx)));
        assert!(member.owned_slots.is_empty());
    }

    let summary = topology.summary();
    assert_eq!(summary.primaries, 3);
    assert_eq!(summary.slot_coverage.unwrap().assigned, 16384);
}

#[tokio::test]
async fn test_cluster_discovery_connects_to_each_node_once() {
    let connector = healthy_cluster();
    let counters = connector.counters();

    let topology = Discovery::new(&connector, &config(PRIMARIES[0]))
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert_eq!(counters.connects(), 6);
    assert_eq!(counters.releases(), 0);

    topology.release_all().await;
    assert_eq!(counters.releases(), 6);
    let mut expected: Vec<String> = PRIMARIES
        .iter()
        .chain(REPLICAS.iter())
        .map(|a| a.to_string())
        .collect();
    expected.sort();
    assert_eq!(counters.released(), expected);
}

#[tokio::test]
async fn test_unreachable_member_becomes_warning() {
    let mut connector = healthy_cluster();
    connector.node_mut(REPLICAS[1]).unreachable = true;

    let topology = Discovery::new(&connector, &config(PRIMARIES[0]))
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 5);
    assert!(!topology.members.iter().any(|m| m.address == REPLICAS[1]));
    let key = format!("{},{}", REPLICAS[1], replica_id(1));
    assert!(topology.warnings[&key].contains("connection refused"));
    assert_eq!(topology.summary().failed, 1);
}

#[tokio::test]
async fn test_member_with_failing_diagnostics_is_released() {
    let mut connector = healthy_cluster();
    connector.node_mut(REPLICAS[2]).info_fails = true;
    let counters = connector.counters();

    let topology = Discovery::new(&connector, &config(PRIMARIES[0]))
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 5);
    assert_eq!(topology.warnings.len(), 1);
    // The failed member's connection is closed during discovery
    assert_eq!(counters.releases(), 1);
    assert_eq!(counters.released(), vec![REPLICAS[2].to_string()]);

    topology.release_all().await;
    assert_eq!(counters.releases(), counters.connects());
}

#[tokio::test]
async fn test_unreachable_seed_aborts_discovery() {
    let mut connector = healthy_cluster();
    connector.node_mut(PRIMARIES[0]).unreachable = true;
    let counters = connector.counters();

    let result = Discovery::new(&connector, &config(PRIMARIES[0]))
        .discover(PRIMARIES[0])
        .await;

    assert!(matches!(result, Err(DiscoveryError::Seed(_))));
    assert_eq!(counters.connects(), 0);
}

#[tokio::test]
async fn test_incomplete_slot_coverage_warns_but_completes() {
    let connector = cluster(SHORT_SLOTS);

    let topology = Discovery::new(&connector, &config(PRIMARIES[0]))
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 6);
    assert_eq!(topology.health.len(), 1);
    let TopologyHealthWarning::IncompleteSlotCoverage(coverage) = topology.health[0];
    assert_eq!(coverage.assigned, 16000);
    assert_eq!(coverage.missing(), 384);
}

#[tokio::test]
async fn test_unreachable_primary_shrinks_coverage() {
    let mut connector = healthy_cluster();
    connector.node_mut(PRIMARIES[2]).unreachable = true;

    let topology = Discovery::new(&connector, &config(PRIMARIES[0]))
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert_eq!(topology.health.len(), 1);
    assert_eq!(topology.summary().primaries, 2);
}

#[tokio::test]
async fn test_seed_by_unannounced_name_uses_myself_row() {
    let connector = healthy_cluster();
    let seed_node = connector.nodes[PRIMARIES[0]].clone();
    let connector = connector.node("seed.example:6379", seed_node);
    let counters = connector.counters();

    let topology = Discovery::new(&connector, &config("seed.example:6379"))
        .discover("seed.example:6379")
        .await
        .unwrap();

    // The seed stands in for its own row; PRIMARIES[0] is not dialed again
    assert_eq!(counters.connects(), 6);
    assert_eq!(topology.members.len(), 6);
    let seed = topology.seed().unwrap();
    assert_eq!(seed.node_id, primary_id(0));
    assert_eq!(seed.slot_count(), 5461);
    assert!(topology.health.is_empty());
}

#[tokio::test]
async fn test_ordered_members_groups_replicas_under_primaries() {
    let connector = healthy_cluster();

    let topology = Discovery::new(&connector, &config(PRIMARIES[1]))
        .discover(PRIMARIES[1])
        .await
        .unwrap();

    let order: Vec<&str> = topology
        .ordered_members()
        .iter()
        .map(|m| m.address.as_str())
        .collect();
    assert_eq!(
        order,
        vec![
            PRIMARIES[0],
            REPLICAS[0],
            PRIMARIES[1],
            REPLICAS[1],
            PRIMARIES[2],
            REPLICAS[2]
        ]
    );
}

#[tokio::test]
async fn test_bounded_concurrency_still_reaches_everyone() {
    let connector = healthy_cluster();
    let config = config(PRIMARIES[0]).with_concurrency(1);

    let topology = Discovery::new(&connector, &config)
        .discover(PRIMARIES[0])
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 6);
}

// ============================================================================
// Primary/replica mode
// ============================================================================

#[tokio::test]
async fn test_replication_discovery_from_primary() {
    let connector = replication_group();
    let counters = connector.counters();

    let topology = Discovery::new(&connector, &config(REPLICATION_PRIMARY))
        .discover(REPLICATION_PRIMARY)
        .await
        .unwrap();

    assert!(!topology.cluster_mode);
    assert_eq!(topology.members.len(), 3);
    assert!(topology.health.is_empty());
    assert!(topology.summary().slot_coverage.is_none());
    assert_eq!(counters.connects(), 3);

    let replicas: Vec<&str> = topology
        .ordered_members()
        .iter()
        .skip(1)
        .map(|m| m.address.as_str())
        .collect();
    assert_eq!(replicas, REPLICATION_REPLICAS.to_vec());
}

#[tokio::test]
async fn test_replication_discovery_from_replica_seed() {
    let connector = replication_group();
    let counters = connector.counters();
    let seed = REPLICATION_REPLICAS[0];

    let topology = Discovery::new(&connector, &config(seed))
        .discover(seed)
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 3);
    // Seed, its primary, the other replica; the seed is not dialed twice
    assert_eq!(counters.connects(), 3);
    assert_eq!(topology.seed().unwrap().role, Role::Replica);
    assert_eq!(
        topology.seed().unwrap().replication_source.as_deref(),
        Some(REPLICATION_PRIMARY)
    );
}

#[tokio::test]
async fn test_unreachable_replica_becomes_warning() {
    let mut connector = replication_group();
    connector.node_mut(REPLICATION_REPLICAS[1]).unreachable = true;

    let topology = Discovery::new(&connector, &config(REPLICATION_PRIMARY))
        .discover(REPLICATION_PRIMARY)
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 2);
    assert!(topology.warnings.contains_key(REPLICATION_REPLICAS[1]));
}

#[tokio::test]
async fn test_unreadable_replica_entry_becomes_warning() {
    let mut connector = replication_group();
    connector
        .node_mut(REPLICATION_PRIMARY)
        .replication
        .push_str("slave2:ip=10.0.1.9,state=online\r\n");

    let topology = Discovery::new(&connector, &config(REPLICATION_PRIMARY))
        .discover(REPLICATION_PRIMARY)
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 3);
    for replica in REPLICATION_REPLICAS {
        assert!(topology.members.iter().any(|m| m.address == replica));
    }
    assert_eq!(topology.warnings.len(), 1);
    assert!(topology.warnings["slave2"].contains("no ip/port"));
}

#[tokio::test]
async fn test_cascading_replication_is_rejected() {
    let middle = "10.0.2.2:6379";
    let leaf = "10.0.2.3:6379";
    let connector = MockConnector::default()
        .node("10.0.2.1:6379", MockNode::primary(false))
        .node(middle, MockNode::replica("10.0.2.1:6379", false))
        .node(leaf, MockNode::replica(middle, false));
    let counters = connector.counters();

    let result = Discovery::new(&connector, &config(leaf)).discover(leaf).await;

    match result {
        Err(DiscoveryError::CascadingReplication { primary }) => assert_eq!(primary, middle),
        other => panic!("expected cascading replication error, got {:?}", other.map(|_| ())),
    }
    assert_eq!(counters.connects(), 2);
    assert_eq!(counters.releases(), 2);
}

#[tokio::test]
async fn test_replica_seed_with_unreachable_primary_fails() {
    let mut connector = replication_group();
    connector.node_mut(REPLICATION_PRIMARY).unreachable = true;
    let counters = connector.counters();

    let result = Discovery::new(&connector, &config(REPLICATION_REPLICAS[0]))
        .discover(REPLICATION_REPLICAS[0])
        .await;

    assert!(matches!(
        result,
        Err(DiscoveryError::PrimaryUnreachable { .. })
    ));
    assert_eq!(counters.releases(), counters.connects());
}
