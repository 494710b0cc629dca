//! K-bucket storage.
//!
//! A bucket holds up to `capacity` peers that share the same bit-prefix
//! distance from the local identifier. Records are kept sorted by id so that
//! lookups are a binary search. A full bucket refuses new peers; there is no
//! eviction or replacement cache.

use super::node_id::NodeId;
use super::peer::PeerRecord;

/// Outcome of [`Bucket::insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The peer was stored
    Added,
    /// A record with this id was already stored; nothing changed
    AlreadyPresent,
    /// The bucket is at capacity
    Full,
}

impl Insertion {
    /// Whether the insertion counts as a success
    #[must_use]
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Full)
    }
}

/// Fixed-capacity group of peers sharing a distance prefix
#[derive(Debug, Clone)]
pub struct Bucket {
    index: usize,
    capacity: usize,
    nodes: Vec<PeerRecord>,
}

impl Bucket {
    /// Create an empty bucket at `index`
    #[must_use]
    pub fn new(index: usize, capacity: usize) -> Self {
        Self {
            index,
            capacity,
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Insert a peer, keeping records ordered by id
    pub fn insert(&mut self, peer: PeerRecord) -> Insertion {
        match self.position(&peer.id) {
            Ok(_) => Insertion::AlreadyPresent,
            Err(_) if self.is_full() => Insertion::Full,
            Err(pos) => {
                self.nodes.insert(pos, peer);
                Insertion::Added
            }
        }
    }

    /// Remove the peer with `id`, returning it if it was stored
    pub fn remove(&mut self, id: &NodeId) -> Option<PeerRecord> {
        let pos = self.position(id).ok()?;
        Some(self.nodes.remove(pos))
    }

    /// Look up a peer by exact id
    #[must_use]
    pub fn get(&self, id: &NodeId) -> Option<&PeerRecord> {
        self.position(id).ok().map(|pos| &self.nodes[pos])
    }

    /// Mutable lookup by exact id
    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut PeerRecord> {
        let pos = self.position(id).ok()?;
        Some(&mut self.nodes[pos])
    }

    /// Whether a record with `id` is stored
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.position(id).is_ok()
    }

    /// Records in bucket order
    #[must_use]
    pub fn nodes(&self) -> &[PeerRecord] {
        &self.nodes
    }

    /// Bucket index within the routing table
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Maximum number of records
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the bucket holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the bucket is at capacity
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.nodes.len() >= self.capacity
    }

    fn position(&self, id: &NodeId) -> Result<usize, usize> {
        self.nodes.binary_search_by(|node| node.id.cmp(id))
    }
}
