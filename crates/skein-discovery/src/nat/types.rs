//! NAT classification and errors.

use crate::dht::MessageError;
use thiserror::Error;

/// NAT type classification
///
/// Derived from the consensus of external addresses reported by peers:
/// - Open: the server socket is reachable at its own port
/// - Consistent: peers agree on one external address, but it is not ours
/// - Symmetric: peers agree on the host only, the port varies per peer
/// - Unknown: not enough evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NatType {
    /// Directly reachable on the bound server port
    Open,
    /// Stable host and port mapping that differs from the local identity
    Consistent,
    /// Stable host, unpredictable port
    Symmetric,
    /// Insufficient evidence to classify
    Unknown,
}

impl NatType {
    /// Whether inbound connections need traversal assistance
    #[must_use]
    pub fn needs_traversal(self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl std::fmt::Display for NatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Consistent => write!(f, "Consistent NAT"),
            Self::Symmetric => write!(f, "Symmetric NAT"),
            Self::Unknown => write!(f, "Unknown NAT Type"),
        }
    }
}

/// Firewall probe error
///
/// Missing replies and insufficient evidence are verdicts, not errors.
#[derive(Debug, Error)]
pub enum NatError {
    /// Probe payload could not be built
    #[error("probe payload error: {0}")]
    Payload(#[from] MessageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nat_type_display() {
        assert_eq!(NatType::Open.to_string(), "Open");
        assert_eq!(NatType::Consistent.to_string(), "Consistent NAT");
        assert_eq!(NatType::Symmetric.to_string(), "Symmetric NAT");
        assert_eq!(NatType::Unknown.to_string(), "Unknown NAT Type");
    }

    #[test]
    fn test_needs_traversal() {
        assert!(!NatType::Open.needs_traversal());
        assert!(NatType::Consistent.needs_traversal());
        assert!(NatType::Symmetric.needs_traversal());
        assert!(NatType::Unknown.needs_traversal());
    }

    #[test]
    fn test_nat_error_display() {
        let err = NatError::from(MessageError::InvalidLength(3));
        assert_eq!(
            err.to_string(),
            "probe payload error: invalid payload length: expected 2 bytes, got 3"
        );
    }
}
