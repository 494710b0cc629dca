//! Kademlia Routing Table
//!
//! Peers are grouped into buckets indexed by the position of the first bit
//! where their identifier differs from the local identifier. The table holds
//! `8 * L` bucket slots for `L`-byte identifiers; buckets are created lazily
//! and never destroyed.
//!
//! Closest-node queries walk buckets outward from the target's bucket and
//! return records in bucket-array order. This is a cheap approximation of a
//! nearest-neighbour query, not an exact XOR sort.
//!
//! The table is not internally synchronised. Share it behind a single
//! [`SharedRoutingTable`] lock rather than locking buckets individually.

use super::bucket::{Bucket, Insertion};
use super::node_id::NodeId;
use super::peer::PeerRecord;
use super::recency::RecencyList;
use crate::config::RoutingConfig;
use rand::Rng;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

/// Default bucket capacity (Kademlia's k)
pub const K: usize = 20;

/// Routing table shared between tasks
pub type SharedRoutingTable = Arc<RwLock<RoutingTable>>;

/// Routing table errors
///
/// These signal a configuration mismatch between an identifier and the
/// table's local identifier, never a transient condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DhtError {
    /// Identifier length differs from the local identifier's length
    #[error("node id length mismatch: expected {expected} bytes, got {actual}")]
    IdLength {
        /// Length of the local identifier
        expected: usize,
        /// Length of the supplied identifier
        actual: usize,
    },

    /// Computed bucket index lies outside the table
    #[error("bucket index {index} out of range (table has {buckets} buckets)")]
    BucketOutOfRange {
        /// Offending index
        index: usize,
        /// Number of bucket slots
        buckets: usize,
    },
}

/// Kademlia routing table keyed by XOR distance from the local id
#[derive(Debug, Clone)]
pub struct RoutingTable {
    local_id: NodeId,
    bucket_size: usize,
    buckets: Vec<Option<Bucket>>,
    total_nodes: usize,
    recency: RecencyList,
}

impl RoutingTable {
    /// Create a table with the default bucket size
    #[must_use]
    pub fn new(local_id: NodeId) -> Self {
        Self::with_bucket_size(local_id, K)
    }

    /// Create a table with a custom bucket size
    #[must_use]
    pub fn with_bucket_size(local_id: NodeId, bucket_size: usize) -> Self {
        let num_buckets = local_id.bits();
        Self {
            local_id,
            bucket_size,
            buckets: vec![None; num_buckets],
            total_nodes: 0,
            recency: RecencyList::new(),
        }
    }

    /// Create a table from configuration
    ///
    /// # Errors
    ///
    /// Returns [`DhtError::IdLength`] if `local_id` does not have the
    /// configured identifier length.
    pub fn from_config(local_id: NodeId, config: &RoutingConfig) -> Result<Self, DhtError> {
        if local_id.len() != config.id_len {
            return Err(DhtError::IdLength {
                expected: config.id_len,
                actual: local_id.len(),
            });
        }
        Ok(Self::with_bucket_size(local_id, config.bucket_size))
    }

    /// Local node identifier
    #[must_use]
    pub fn local_id(&self) -> &NodeId {
        &self.local_id
    }

    /// Bucket capacity
    #[must_use]
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Number of bucket slots (`8 * L`)
    #[must_use]
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of stored peers
    #[must_use]
    pub fn len(&self) -> usize {
        self.total_nodes
    }

    /// Whether the table holds no peers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_nodes == 0
    }

    /// Buckets that have been created, in index order
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter().flatten()
    }

    /// Bucket index for `id`
    ///
    /// The position of the first bit where `id` differs from the local id,
    /// or the last index when they are equal.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError::IdLength`] if `id` has the wrong length.
    pub fn bucket_index(&self, id: &NodeId) -> Result<usize, DhtError> {
        let index = self
            .local_id
            .first_differing_bit(id)?
            .unwrap_or(self.buckets.len().saturating_sub(1));
        if index >= self.buckets.len() {
            return Err(DhtError::BucketOutOfRange {
                index,
                buckets: self.buckets.len(),
            });
        }
        Ok(index)
    }

    /// Insert a peer
    ///
    /// Returns `Ok(false)` if the target bucket is full. Re-adding an id that
    /// is already stored succeeds without changing the stored record or the
    /// bucket order; it does refresh the peer's recency.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if the peer id has the wrong length.
    pub fn add_node(&mut self, peer: PeerRecord) -> Result<bool, DhtError> {
        let index = self.bucket_index(&peer.id)?;
        let bucket_size = self.bucket_size;
        let bucket = self.buckets[index].get_or_insert_with(|| Bucket::new(index, bucket_size));

        let id = peer.id.clone();
        let outcome = bucket.insert(peer);
        if outcome == Insertion::Added {
            self.total_nodes += 1;
            tracing::trace!("Added peer {} to bucket {}", id, index);
        }

        if outcome.is_success() {
            self.recency.touch(&id);
        } else {
            tracing::debug!("Bucket {} full, rejected peer {}", index, id);
        }
        Ok(outcome.is_success())
    }

    /// Remove a peer by id
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if `id` has the wrong length.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<bool, DhtError> {
        let index = self.bucket_index(id)?;
        let Some(bucket) = self.buckets[index].as_mut() else {
            return Ok(false);
        };
        if bucket.remove(id).is_none() {
            return Ok(false);
        }

        self.total_nodes -= 1;
        self.recency.remove(id);
        tracing::trace!("Removed peer {} from bucket {}", id, index);
        Ok(true)
    }

    /// Look up a peer by exact id
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if `id` has the wrong length.
    pub fn get_node(&self, id: &NodeId) -> Result<Option<&PeerRecord>, DhtError> {
        let index = self.bucket_index(id)?;
        Ok(self.buckets[index].as_ref().and_then(|b| b.get(id)))
    }

    /// Whether a peer with `id` is stored
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if `id` has the wrong length.
    pub fn has_node(&self, id: &NodeId) -> Result<bool, DhtError> {
        Ok(self.get_node(id)?.is_some())
    }

    /// Mark a stored peer as just seen
    ///
    /// Refreshes `last_seen` and moves the peer to the front of the recency
    /// ordering. Returns `Ok(false)` if the peer is not stored.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if `id` has the wrong length.
    pub fn touch(&mut self, id: &NodeId) -> Result<bool, DhtError> {
        let index = self.bucket_index(id)?;
        let Some(peer) = self.buckets[index].as_mut().and_then(|b| b.get_mut(id)) else {
            return Ok(false);
        };
        peer.touch();
        self.recency.touch(id);
        Ok(true)
    }

    /// Pick a stored peer uniformly at random
    #[must_use]
    pub fn random_node(&self) -> Option<&PeerRecord> {
        self.random_node_with(&mut rand::thread_rng())
    }

    /// Pick a stored peer uniformly at random using `rng`
    pub fn random_node_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&PeerRecord> {
        if self.total_nodes == 0 {
            return None;
        }

        let mut offset = rng.gen_range(0..self.total_nodes);
        for bucket in self.buckets() {
            if offset < bucket.len() {
                return bucket.nodes().get(offset);
            }
            offset -= bucket.len();
        }
        None
    }

    /// Approximate closest peers to `target`, up to `count`
    ///
    /// Scans from the target's bucket down to bucket 0, then upward from the
    /// bucket after the target's. Records come back in bucket-array order.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if `target` has the wrong length.
    pub fn find_closest_nodes(
        &self,
        target: &NodeId,
        count: usize,
    ) -> Result<Vec<PeerRecord>, DhtError> {
        let index = self.bucket_index(target)?;
        Ok(self.collect_from(index, count))
    }

    /// Approximate closest peers to `target`, up to one bucket's worth
    ///
    /// # Errors
    ///
    /// Returns [`DhtError`] if `target` has the wrong length.
    pub fn find_closest(&self, target: &NodeId) -> Result<Vec<PeerRecord>, DhtError> {
        self.find_closest_nodes(target, self.bucket_size)
    }

    /// Every stored peer, in the order `find_closest_nodes(local_id, ∞)`
    /// returns them
    #[must_use]
    pub fn to_vec(&self) -> Vec<PeerRecord> {
        self.collect_from(self.buckets.len().saturating_sub(1), usize::MAX)
    }

    /// Up to `count` peers, most recently inserted or touched first
    #[must_use]
    pub fn recent_peers(&self, count: usize) -> Vec<PeerRecord> {
        self.recency
            .iter()
            .filter_map(|id| self.get_node(id).ok().flatten())
            .take(count)
            .cloned()
            .collect()
    }

    fn collect_from(&self, start: usize, count: usize) -> Vec<PeerRecord> {
        let mut result = Vec::new();
        if self.buckets.is_empty() {
            return result;
        }

        let downward = (0..=start).rev();
        let upward = start + 1..self.buckets.len();
        for index in downward.chain(upward) {
            if result.len() >= count {
                break;
            }
            if let Some(bucket) = &self.buckets[index] {
                let take = (count - result.len()).min(bucket.len());
                result.extend_from_slice(&bucket.nodes()[..take]);
            }
        }
        result
    }
}
