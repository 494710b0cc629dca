//! # Skein Discovery
//!
//! Peer discovery core for the Skein overlay.
//!
//! This crate provides:
//! - Kademlia routing table keyed by fixed-length node identifiers
//! - Most-recently-seen tracking for picking probe targets
//! - External address consensus from peer reports
//! - Firewall self-diagnosis over pluggable network collaborators
//!
//! ## Kademlia Routing
//!
//! - 256-bit node identifiers by default (BLAKE3 hash of public keys)
//! - XOR distance metric, bucket index = first differing bit
//! - K-bucket routing (k=20), full buckets refuse new peers
//!
//! Message framing, retries and sockets belong to the embedding node.
//!
//! ## Example
//!
//! ```rust,no_run
//! use skein_discovery::dht::{NodeId, RoutingTable};
//! use skein_discovery::nat::{FirewallProbe, LocalIdentity, StaticBootstrap};
//! use skein_discovery::DiscoveryConfig;
//! # use skein_discovery::nat::{ProbeReply, RequestDispatcher};
//! # use skein_discovery::dht::{MessageKind, PeerRecord};
//! # struct Rpc;
//! # impl RequestDispatcher for Rpc {
//! #     fn send_to_many(&self, _: MessageKind, _: &[u8], _: &[PeerRecord])
//! #         -> impl std::future::Future<Output = Vec<ProbeReply>> + Send { async { Vec::new() } }
//! # }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DiscoveryConfig::load("skein.toml")?;
//! config.validate()?;
//! skein_discovery::logging::init(&config.logging);
//!
//! let table = RoutingTable::from_config(NodeId::random(), &config.routing)?;
//! let table = tokio::sync::RwLock::new(table);
//!
//! let (server_feed, _) = tokio::sync::broadcast::channel::<std::net::SocketAddr>(64);
//! let probe = FirewallProbe::with_config(
//!     Rpc,
//!     StaticBootstrap::default(),
//!     server_feed,
//!     config.firewall.clone(),
//! );
//!
//! let identity = LocalIdentity::new(49737, Some("203.0.113.5".parse()?));
//! let report = probe.check(&table, &identity).await?;
//! println!("firewalled: {} ({})", report.firewalled, report.nat_type);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dht;
pub mod logging;
pub mod nat;

// Re-export commonly used types
pub use config::{ConfigError, DiscoveryConfig, FirewallConfig, LoggingConfig, RoutingConfig};
pub use dht::{DhtError, NodeId, PeerRecord, RoutingTable, SharedRoutingTable};
pub use nat::{FirewallProbe, FirewallReport, LocalIdentity, NatError, NatSampler, NatType};
