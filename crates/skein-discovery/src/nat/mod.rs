//! NAT Detection Module
//!
//! Determines whether this node is reachable from the outside by asking peers
//! what address they see it from.
//!
//! # Components
//!
//! - **NatSampler**: recency-weighted consensus over reported external addresses
//! - **FirewallProbe**: probes recent peers with `PING_NAT` and renders a verdict
//! - **NatType**: classification of the observed mapping
//!
//! # Example
//!
//! ```rust
//! use skein_discovery::nat::{NatSampler, NatType};
//!
//! let mut sampler = NatSampler::new();
//! for _ in 0..4 {
//!     sampler.add("203.0.113.5".parse().unwrap(), 49737);
//! }
//! assert_eq!(sampler.external_addr(), Some("203.0.113.5:49737".parse().unwrap()));
//! assert_eq!(sampler.nat_type(), NatType::Consistent);
//! ```

pub mod firewall;
pub mod sampler;
pub mod types;

// Re-exports
pub use firewall::{
    BootstrapSource, DatagramObserver, FirewallProbe, FirewallReport, LocalIdentity, ProbeReply,
    RequestDispatcher, StaticBootstrap,
};
pub use sampler::{NatSampler, RING_SIZE};
pub use types::{NatError, NatType};
