//! Peer records stored in the routing table.

use super::node_id::NodeId;
use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

/// A known peer: identifier, network address and liveness metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Peer identifier
    pub id: NodeId,
    /// Address the peer is reachable on
    pub addr: SocketAddr,
    /// When the peer was last inserted or heard from
    pub last_seen: Instant,
}

impl PeerRecord {
    /// Create a record seen now
    #[must_use]
    pub fn new(id: NodeId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Peer host
    #[must_use]
    pub fn host(&self) -> IpAddr {
        self.addr.ip()
    }

    /// Peer port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Mark the peer as seen now
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port() {
        let peer = PeerRecord::new(NodeId::random(), "10.0.0.7:4040".parse().unwrap());
        assert_eq!(peer.host(), "10.0.0.7".parse::<IpAddr>().unwrap());
        assert_eq!(peer.port(), 4040);
    }

    #[test]
    fn test_touch_advances_last_seen() {
        let mut peer = PeerRecord::new(NodeId::random(), "10.0.0.7:4040".parse().unwrap());
        let before = peer.last_seen;
        peer.touch();
        assert!(peer.last_seen >= before);
    }
}
