//! DHT message kinds and the NAT probe payload.
//!
//! Full message framing belongs to the transport. This module only defines
//! the command identifiers shared with the wire protocol and the two-byte
//! payload carried by a `PING_NAT` request: the requester's server-socket
//! port, little-endian.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;

/// Size of an encoded PING_NAT payload
pub const PORT_PAYLOAD_LEN: usize = 2;

/// Message payload errors
#[derive(Debug, Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("payload encoding failed: {0}")]
    Encode(#[from] bincode::Error),

    /// Payload has the wrong size
    #[error("invalid payload length: expected 2 bytes, got {0}")]
    InvalidLength(usize),

    /// Command byte is not a known message kind
    #[error("unknown message kind: {0}")]
    UnknownKind(u8),
}

/// Command identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageKind {
    /// Liveness check
    Ping = 0,
    /// Reachability probe: the responder pings back to the port in the payload
    PingNat = 1,
    /// Closest-node query
    FindNode = 2,
    /// Hint that a peer appears to be down
    DownHint = 3,
}

impl TryFrom<u8> for MessageKind {
    type Error = MessageError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ping),
            1 => Ok(Self::PingNat),
            2 => Ok(Self::FindNode),
            3 => Ok(Self::DownHint),
            other => Err(MessageError::UnknownKind(other)),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        kind as u8
    }
}

/// Encode a server-socket port as a PING_NAT payload
///
/// # Errors
///
/// Returns [`MessageError::Encode`] if serialization fails.
pub fn encode_port(port: u16) -> Result<Vec<u8>, MessageError> {
    Ok(bincode::serialize(&port)?)
}

/// Decode a PING_NAT payload
///
/// # Errors
///
/// Returns [`MessageError::InvalidLength`] unless the payload is exactly
/// [`PORT_PAYLOAD_LEN`] bytes.
pub fn decode_port(payload: &[u8]) -> Result<u16, MessageError> {
    if payload.len() != PORT_PAYLOAD_LEN {
        return Err(MessageError::InvalidLength(payload.len()));
    }
    Ok(bincode::deserialize(payload)?)
}

/// Address a PING_NAT responder should ping back
///
/// The requester's host as observed by the responder, combined with the
/// server port it asked to be probed on.
///
/// # Errors
///
/// Returns [`MessageError`] if the payload is malformed.
pub fn nat_probe_target(payload: &[u8], from: SocketAddr) -> Result<SocketAddr, MessageError> {
    let port = decode_port(payload)?;
    Ok(SocketAddr::new(from.ip(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_values() {
        assert_eq!(u8::from(MessageKind::Ping), 0);
        assert_eq!(u8::from(MessageKind::PingNat), 1);
        assert_eq!(u8::from(MessageKind::FindNode), 2);
        assert_eq!(u8::from(MessageKind::DownHint), 3);

        assert_eq!(MessageKind::try_from(1).unwrap(), MessageKind::PingNat);
        assert!(matches!(
            MessageKind::try_from(9),
            Err(MessageError::UnknownKind(9))
        ));
    }

    #[test]
    fn test_port_payload_is_little_endian() {
        let payload = encode_port(0x1234).unwrap();
        assert_eq!(payload, vec![0x34, 0x12]);
        assert_eq!(decode_port(&payload).unwrap(), 0x1234);
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        assert!(matches!(
            decode_port(&[1]),
            Err(MessageError::InvalidLength(1))
        ));
        assert!(matches!(
            decode_port(&[1, 2, 3]),
            Err(MessageError::InvalidLength(3))
        ));
    }

    #[test]
    fn test_nat_probe_target() {
        let payload = encode_port(49737).unwrap();
        let from: SocketAddr = "203.0.113.9:61000".parse().unwrap();
        let target = nat_probe_target(&payload, from).unwrap();
        assert_eq!(target, "203.0.113.9:49737".parse::<SocketAddr>().unwrap());
    }
}
