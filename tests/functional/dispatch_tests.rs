//! Dispatch tests: denylist, per-node failures and result keys.

use valkey_fleet::client::Reply;
use valkey_fleet::config::FleetConfig;
use valkey_fleet::dispatch::{DispatchError, Outcome, dispatch};
use valkey_fleet::selector::{RoleFilter, Target, select};
use valkey_fleet::topology::Discovery;

use crate::mock_cluster::*;

#[tokio::test]
async fn test_forbidden_command_makes_no_network_calls() {
    let connector = healthy_cluster();
    let counters = connector.counters();
    let config = FleetConfig::new(PRIMARIES[0]);
    let topology = Discovery::new(&connector, &config)
        .discover(PRIMARIES[0])
        .await
        .unwrap();
    let selection = select(&topology.members, &Target::Role(RoleFilter::All), PRIMARIES[0]).unwrap();

    for command in ["FLUSHALL", "flushdb ASYNC", "shutdown nosave", "MONITOR", "debug sleep 1"] {
        let result = dispatch(&selection, command, config.concurrency).await;
        assert!(
            matches!(result, Err(DispatchError::Forbidden(_))),
            "{} should be refused",
            command
        );
    }
    assert_eq!(counters.commands(), 0);
}

#[tokio::test]
async fn test_every_target_appears_in_results() {
    let mut connector = healthy_cluster();
    connector.node_mut(REPLICAS[0]).command_fails = true;
    connector.node_mut(PRIMARIES[2]).command_fails = true;
    let counters = connector.counters();
    let config = FleetConfig::new(PRIMARIES[0]);
    let topology = Discovery::new(&connector, &config)
        .discover(PRIMARIES[0])
        .await
        .unwrap();
    let selection = select(&topology.members, &Target::Role(RoleFilter::All), PRIMARIES[0]).unwrap();

    let results = dispatch(&selection, "PING", config.concurrency).await.unwrap();

    assert_eq!(results.len(), 6);
    assert_eq!(counters.commands(), 6);
    assert!(results[REPLICAS[0]].is_failed());
    assert!(results[PRIMARIES[2]].is_failed());
    assert_eq!(results.values().filter(|o| o.is_failed()).count(), 2);
    assert_eq!(results[PRIMARIES[0]], Outcome::Reply(Reply::from("PONG")));
    match &results[REPLICAS[0]] {
        Outcome::Failed(message) => assert!(message.contains("broken pipe")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_node_id_results_are_keyed_by_address_and_id() {
    let connector = healthy_cluster();
    let config = FleetConfig::new(PRIMARIES[0]);
    let topology = Discovery::new(&connector, &config)
        .discover(PRIMARIES[0])
        .await
        .unwrap();
    let target = Target::from_list(&primary_id(1)).unwrap();
    let selection = select(&topology.members, &target, PRIMARIES[0]).unwrap();

    let results = dispatch(&selection, "PING", 1).await.unwrap();

    let key = format!("{}({})", PRIMARIES[1], primary_id(1));
    assert_eq!(results.keys().collect::<Vec<_>>(), vec![&key]);
}

#[tokio::test]
async fn test_dispatch_returns_reply_verbatim() {
    let mut connector = replication_group();
    connector.node_mut(REPLICATION_PRIMARY).reply =
        Reply::Array(vec![Reply::from("maxmemory"), Reply::from("0")]);
    let config = FleetConfig::new(REPLICATION_PRIMARY);
    let topology = Discovery::new(&connector, &config)
        .discover(REPLICATION_PRIMARY)
        .await
        .unwrap();
    let selection = select(&topology.members, &Target::Seed, REPLICATION_PRIMARY).unwrap();

    let results = dispatch(&selection, "CONFIG GET maxmemory", 4).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(
        results[REPLICATION_PRIMARY].to_string(),
        "1) maxmemory\n2) 0"
    );
}

#[tokio::test]
async fn test_empty_command_is_rejected() {
    let connector = replication_group();
    let counters = connector.counters();
    let config = FleetConfig::new(REPLICATION_PRIMARY);
    let topology = Discovery::new(&connector, &config)
        .discover(REPLICATION_PRIMARY)
        .await
        .unwrap();
    let selection = select(&topology.members, &Target::Seed, REPLICATION_PRIMARY).unwrap();

    let result = dispatch(&selection, "   ", 4).await;

    assert_eq!(result, Err(DispatchError::EmptyCommand));
    assert_eq!(counters.commands(), 0);
}
