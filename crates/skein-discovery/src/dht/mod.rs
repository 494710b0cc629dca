//! Kademlia Routing Table
//!
//! This module provides the storage, indexing and lookup primitives of the
//! Skein DHT:
//!
//! - Fixed-length node identifiers (BLAKE3 of the public key by default)
//! - XOR distance metric and first-differing-bit bucket index
//! - K-bucket routing (k=20) with a fail-closed full-bucket policy
//! - Most-recently-seen ordering for picking probe targets
//! - Message kinds and the PING_NAT port payload
//!
//! Bucket refresh scheduling and iterative lookups live outside this crate.
//!
//! # Example Usage
//!
//! ```rust
//! use skein_discovery::dht::{NodeId, PeerRecord, RoutingTable};
//!
//! let mut table = RoutingTable::new(NodeId::random());
//!
//! let peer = PeerRecord::new(NodeId::random(), "127.0.0.1:8000".parse().unwrap());
//! assert!(table.add_node(peer.clone()).unwrap());
//! assert!(table.has_node(&peer.id).unwrap());
//!
//! let closest = table.find_closest(&NodeId::random()).unwrap();
//! assert_eq!(closest.len(), 1);
//! ```

pub mod bucket;
pub mod messages;
pub mod node_id;
pub mod peer;
pub mod recency;
pub mod routing;

pub use bucket::{Bucket, Insertion};
pub use messages::{MessageError, MessageKind, decode_port, encode_port, nat_probe_target};
pub use node_id::NodeId;
pub use peer::PeerRecord;
pub use recency::RecencyList;
pub use routing::{DhtError, K, RoutingTable, SharedRoutingTable};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _id = NodeId::random();
        let _table = RoutingTable::new(NodeId::random());
        let _recency = RecencyList::new();

        assert_eq!(K, 20);
        assert_eq!(NodeId::DEFAULT_LEN, 32);
        assert_eq!(u8::from(MessageKind::PingNat), 1);
    }
}
