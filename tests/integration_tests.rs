//! Routing table scenarios across the public API.

use skein_discovery::config::{DiscoveryConfig, RoutingConfig};
use skein_discovery::dht::{DhtError, NodeId, RoutingTable, SharedRoutingTable};
use skein_integration_tests::{id_in_bucket, peer_with_id, seeded_table, zero_id};
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================================================
// Lookup Scenarios
// ============================================================================

/// An empty table has nothing to return for any target.
#[test]
fn test_empty_table_closest_is_empty() {
    let table = RoutingTable::new(zero_id());
    for target in [zero_id(), NodeId::random(), id_in_bucket(3, 9)] {
        assert!(table.find_closest_nodes(&target, 20).unwrap().is_empty());
        assert!(table.find_closest(&target).unwrap().is_empty());
    }
    assert!(table.to_vec().is_empty());
    assert!(table.random_node().is_none());
}

/// The 21st peer in one bucket is refused and the count stays at 20.
#[test]
fn test_full_bucket_refuses_insertion() {
    let mut table = RoutingTable::with_bucket_size(zero_id(), 20);
    for tag in 0..20u8 {
        let peer = peer_with_id(id_in_bucket(12, tag), u16::from(tag));
        assert!(table.add_node(peer).unwrap());
    }
    assert_eq!(table.len(), 20);

    let extra = peer_with_id(id_in_bucket(12, 200), 200);
    assert!(!table.add_node(extra.clone()).unwrap());
    assert_eq!(table.len(), 20);
    assert!(!table.has_node(&extra.id).unwrap());

    // Other buckets are unaffected
    assert!(table.add_node(peer_with_id(id_in_bucket(13, 0), 300)).unwrap());
    assert_eq!(table.len(), 21);
}

/// Lookups walk down from the target bucket first, then up.
#[test]
fn test_closest_walk_order() {
    let mut table = RoutingTable::new(zero_id());
    for (tag, bit) in [(1u8, 2usize), (2, 5), (3, 7), (4, 10)] {
        table
            .add_node(peer_with_id(id_in_bucket(bit, tag), u16::from(tag)))
            .unwrap();
    }

    let closest = table.find_closest_nodes(&id_in_bucket(6, 0), 3).unwrap();
    let tags: Vec<u8> = closest.iter().map(|p| p.id.as_bytes()[31]).collect();
    assert_eq!(tags, vec![2, 1, 3]);
}

/// Removing frees room in a full bucket.
#[test]
fn test_remove_then_reinsert() {
    let mut table = RoutingTable::with_bucket_size(zero_id(), 2);
    let a = peer_with_id(id_in_bucket(40, 1), 1);
    let b = peer_with_id(id_in_bucket(40, 2), 2);
    let c = peer_with_id(id_in_bucket(40, 3), 3);

    assert!(table.add_node(a.clone()).unwrap());
    assert!(table.add_node(b).unwrap());
    assert!(!table.add_node(c.clone()).unwrap());

    assert!(table.remove_node(&a.id).unwrap());
    assert!(!table.remove_node(&a.id).unwrap());
    assert!(table.add_node(c).unwrap());
    assert_eq!(table.len(), 2);
}

/// Identifiers of the wrong length are rejected everywhere.
#[test]
fn test_wrong_length_fails_fast() {
    let mut table = RoutingTable::new(zero_id());
    let short = NodeId::from_bytes(vec![1u8; 8]);
    let expected = DhtError::IdLength {
        expected: 32,
        actual: 8,
    };

    assert_eq!(
        table.add_node(peer_with_id(short.clone(), 1)).unwrap_err(),
        expected
    );
    assert_eq!(table.get_node(&short).unwrap_err(), expected);
    assert_eq!(table.remove_node(&short).unwrap_err(), expected);
    assert_eq!(table.find_closest(&short).unwrap_err(), expected);
    assert!(table.is_empty());
}

// ============================================================================
// Recency Scenarios
// ============================================================================

/// Recent peers follow insertion and touch order, and forget removed peers.
#[test]
fn test_recent_peers_tracking() {
    let (mut table, peers) = seeded_table(42, 10);
    assert_eq!(peers.len(), table.len());

    let recent = table.recent_peers(3);
    let expected: Vec<_> = peers.iter().rev().take(3).map(|p| p.id.clone()).collect();
    assert_eq!(recent.iter().map(|p| p.id.clone()).collect::<Vec<_>>(), expected);

    // Touching the oldest moves it to the front
    assert!(table.touch(&peers[0].id).unwrap());
    assert_eq!(table.recent_peers(1)[0].id, peers[0].id);

    // Re-adding refreshes recency without duplicating
    assert!(table.add_node(peers[1].clone()).unwrap());
    assert_eq!(table.recent_peers(1)[0].id, peers[1].id);
    assert_eq!(table.len(), peers.len());

    assert!(table.remove_node(&peers[1].id).unwrap());
    assert!(table.recent_peers(peers.len()).iter().all(|p| p.id != peers[1].id));
    assert_eq!(table.recent_peers(usize::MAX).len(), table.len());
}

// ============================================================================
// Configuration and Sharing
// ============================================================================

#[test]
fn test_table_from_config() {
    let config = DiscoveryConfig::from_toml_str(
        r#"
        [routing]
        id_len = 20
        bucket_size = 8
        "#,
    )
    .unwrap();
    config.validate().unwrap();

    let table = RoutingTable::from_config(NodeId::random_with_len(20), &config.routing).unwrap();
    assert_eq!(table.num_buckets(), 160);
    assert_eq!(table.bucket_size(), 8);

    let mismatch = RoutingTable::from_config(NodeId::random(), &RoutingConfig {
        id_len: 20,
        bucket_size: 8,
    });
    assert!(mismatch.is_err());
}

#[tokio::test]
async fn test_shared_table_concurrent_writers() {
    let table: SharedRoutingTable = Arc::new(RwLock::new(RoutingTable::new(zero_id())));

    let mut handles = Vec::new();
    for bit in 0..8usize {
        let table = Arc::clone(&table);
        handles.push(tokio::spawn(async move {
            for tag in 0..5u8 {
                let peer = peer_with_id(id_in_bucket(bit * 8, tag), (bit * 10) as u16 + u16::from(tag));
                table.write().await.add_node(peer).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let table = table.read().await;
    assert_eq!(table.len(), 40);
    assert_eq!(table.to_vec().len(), 40);
    assert_eq!(table.buckets().count(), 8);
}
