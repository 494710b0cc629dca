//! DHT Node Identity and Distance Metric
//!
//! This module provides the NodeId type, a fixed-length opaque identifier used
//! by the routing table. Identifiers are compared byte-by-byte and use the XOR
//! distance metric for routing. The default length is 32 bytes (256 bits),
//! but a table may be configured for any length as long as every identifier
//! it sees has that same length.

use super::routing::DhtError;
use blake3::Hasher;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier for the Kademlia routing table
///
/// Identifiers derived from public keys use BLAKE3, so a peer's NodeId is
/// tied to its cryptographic identity. Ordering is lexicographic over the raw
/// bytes, which is the order buckets keep their records in.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(Box<[u8]>);

impl NodeId {
    /// Default identifier length in bytes
    pub const DEFAULT_LEN: usize = 32;

    /// Generate a random NodeId of the default length
    ///
    /// # Examples
    ///
    /// ```
    /// use skein_discovery::dht::NodeId;
    ///
    /// let id = NodeId::random();
    /// assert_eq!(id.len(), 32);
    /// ```
    #[must_use]
    pub fn random() -> Self {
        Self::random_with_len(Self::DEFAULT_LEN)
    }

    /// Generate a random NodeId of `len` bytes
    #[must_use]
    pub fn random_with_len(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill(&mut bytes[..]);
        Self(bytes.into_boxed_slice())
    }

    /// Derive a NodeId from a 32-byte public key
    ///
    /// # Examples
    ///
    /// ```
    /// use skein_discovery::dht::NodeId;
    ///
    /// let a = NodeId::from_public_key(&[42u8; 32]);
    /// let b = NodeId::from_public_key(&[42u8; 32]);
    /// assert_eq!(a, b);
    /// ```
    #[must_use]
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(public_key);
        hasher.update(b"skein-dht-node-id");
        let hash = hasher.finalize();
        Self(Box::new(*hash.as_bytes()))
    }

    /// Create a NodeId from raw bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use skein_discovery::dht::NodeId;
    ///
    /// let id = NodeId::from_bytes([1u8; 4]);
    /// assert_eq!(id.as_bytes(), &[1, 1, 1, 1]);
    /// ```
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into().into_boxed_slice())
    }

    /// Get the raw bytes of the NodeId
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is a zero-length identifier
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bits
    #[must_use]
    pub fn bits(&self) -> usize {
        self.0.len() * 8
    }

    /// Calculate XOR distance to another NodeId
    ///
    /// # Errors
    ///
    /// Returns [`DhtError::IdLength`] if the identifiers differ in length.
    ///
    /// # Examples
    ///
    /// ```
    /// use skein_discovery::dht::NodeId;
    ///
    /// let id1 = NodeId::from_bytes([1u8; 32]);
    /// let id2 = NodeId::from_bytes([2u8; 32]);
    /// let distance = id1.distance(&id2).unwrap();
    /// assert_eq!(distance.as_bytes()[0], 3); // 1 XOR 2 = 3
    /// ```
    pub fn distance(&self, other: &NodeId) -> Result<NodeId, DhtError> {
        self.check_len(other)?;
        let bytes: Vec<u8> = self.0.iter().zip(other.0.iter()).map(|(a, b)| a ^ b).collect();
        Ok(Self(bytes.into_boxed_slice()))
    }

    /// Count leading zero bits in the NodeId
    ///
    /// Returns [`bits`](Self::bits) for an all-zero identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use skein_discovery::dht::NodeId;
    ///
    /// let mut bytes = [0u8; 32];
    /// bytes[0] = 0b00001000; // 4 leading zeros
    /// let id = NodeId::from_bytes(bytes);
    /// assert_eq!(id.leading_zeros(), 4);
    /// ```
    #[must_use]
    pub fn leading_zeros(&self) -> usize {
        let mut count = 0;
        for byte in self.0.iter() {
            if *byte == 0 {
                count += 8;
            } else {
                count += byte.leading_zeros() as usize;
                break;
            }
        }
        count
    }

    /// Position of the first bit where `self` and `other` differ
    ///
    /// Scans byte-by-byte; within the first differing byte the position is
    /// `8 * byte_index + leading_zeros(a ^ b)` over the 8-bit width. Returns
    /// `None` for identical identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`DhtError::IdLength`] if the identifiers differ in length.
    ///
    /// # Examples
    ///
    /// ```
    /// use skein_discovery::dht::NodeId;
    ///
    /// let local = NodeId::from_bytes([0u8; 32]);
    /// let mut bytes = [0u8; 32];
    /// bytes[1] = 0b0010_0000;
    /// let remote = NodeId::from_bytes(bytes);
    /// assert_eq!(remote.first_differing_bit(&local).unwrap(), Some(10));
    /// ```
    pub fn first_differing_bit(&self, other: &NodeId) -> Result<Option<usize>, DhtError> {
        let zeros = self.distance(other)?.leading_zeros();
        Ok((zeros < self.bits()).then_some(zeros))
    }

    fn check_len(&self, other: &NodeId) -> Result<(), DhtError> {
        if self.len() == other.len() {
            Ok(())
        } else {
            Err(DhtError::IdLength {
                expected: self.len(),
                actual: other.len(),
            })
        }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.len().min(8);
        write!(f, "{}", hex::encode(&self.0[..shown]))
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_from_public_key() {
        let pubkey = [42u8; 32];
        let id1 = NodeId::from_public_key(&pubkey);
        let id2 = NodeId::from_public_key(&pubkey);
        assert_eq!(id1, id2, "Same pubkey should produce same NodeId");
        assert_eq!(id1.len(), 32);
    }

    #[test]
    fn test_node_id_random_unique() {
        let id1 = NodeId::random();
        let id2 = NodeId::random();
        assert_ne!(id1, id2, "Random NodeIds should be unique");
    }

    #[test]
    fn test_random_with_len() {
        let id = NodeId::random_with_len(20);
        assert_eq!(id.len(), 20);
        assert_eq!(id.bits(), 160);
    }

    #[test]
    fn test_xor_distance() {
        let id1 = NodeId::from_bytes([1u8; 32]);
        let id2 = NodeId::from_bytes([2u8; 32]);
        let distance = id1.distance(&id2).unwrap();
        assert!(distance.as_bytes().iter().all(|b| *b == 3));
    }

    #[test]
    fn test_xor_distance_symmetry() {
        let id1 = NodeId::random();
        let id2 = NodeId::random();
        assert_eq!(id1.distance(&id2).unwrap(), id2.distance(&id1).unwrap());
    }

    #[test]
    fn test_xor_distance_identity() {
        let id = NodeId::random();
        let zero = NodeId::from_bytes([0u8; 32]);
        assert_eq!(id.distance(&id).unwrap(), zero);
    }

    #[test]
    fn test_distance_length_mismatch() {
        let a = NodeId::from_bytes([0u8; 32]);
        let b = NodeId::from_bytes([0u8; 20]);
        assert!(matches!(
            a.distance(&b),
            Err(DhtError::IdLength {
                expected: 32,
                actual: 20
            })
        ));
    }

    #[test]
    fn test_leading_zeros() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0b10000000;
        assert_eq!(NodeId::from_bytes(bytes).leading_zeros(), 0);

        let mut bytes = [0u8; 32];
        bytes[0] = 0b00000001;
        assert_eq!(NodeId::from_bytes(bytes).leading_zeros(), 7);

        let mut bytes = [0u8; 32];
        bytes[1] = 0b10000000;
        assert_eq!(NodeId::from_bytes(bytes).leading_zeros(), 8);

        assert_eq!(NodeId::from_bytes([0u8; 32]).leading_zeros(), 256);
    }

    #[test]
    fn test_first_differing_bit() {
        let local = NodeId::from_bytes([0u8; 32]);

        let mut bytes = [0u8; 32];
        bytes[0] = 0b10000000;
        assert_eq!(
            NodeId::from_bytes(bytes).first_differing_bit(&local).unwrap(),
            Some(0)
        );

        let mut bytes = [0u8; 32];
        bytes[0] = 0b01000000;
        assert_eq!(
            NodeId::from_bytes(bytes).first_differing_bit(&local).unwrap(),
            Some(1)
        );

        let mut bytes = [0u8; 32];
        bytes[31] = 0b00000001;
        assert_eq!(
            NodeId::from_bytes(bytes).first_differing_bit(&local).unwrap(),
            Some(255)
        );

        assert_eq!(local.first_differing_bit(&local).unwrap(), None);
    }

    #[test]
    fn test_first_differing_bit_matches_distance() {
        for _ in 0..64 {
            let a = NodeId::random();
            let b = NodeId::random();
            let bit = a.first_differing_bit(&b).unwrap();
            let zeros = a.distance(&b).unwrap().leading_zeros();
            assert_eq!(bit.unwrap_or(256), zeros);
        }
    }

    #[test]
    fn test_ordering() {
        let id1 = NodeId::from_bytes([1u8; 32]);
        let id2 = NodeId::from_bytes([2u8; 32]);
        assert!(id1 < id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_debug_display() {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&[0xAB, 0xCD, 0xEF, 0x01, 0x23, 0x45, 0x67, 0x89]);
        let id = NodeId::from_bytes(bytes);
        assert_eq!(id.to_string(), "abcdef0123456789");
        assert_eq!(format!("{:?}", id), "NodeId(abcdef0123456789)");

        let short = NodeId::from_bytes([0xFFu8; 2]);
        assert_eq!(short.to_string(), "ffff");
    }
}
