//! Firewall self-diagnosis.
//!
//! Asks a handful of peers to ping our server socket back (`PING_NAT`) and
//! checks whether the address they report seeing us from matches what we
//! believe our public address to be.
//!
//! Networking is supplied by the embedding node through three collaborators:
//! [`RequestDispatcher`] sends the probes, [`DatagramObserver`] reports which
//! hosts reached the server socket, and [`BootstrapSource`] tops up the
//! candidate list when the routing table is sparse.

use super::sampler::NatSampler;
use super::types::{NatError, NatType};
use crate::config::FirewallConfig;
use crate::dht::{MessageKind, PeerRecord, RoutingTable, encode_port};
use std::collections::HashSet;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

/// Reply to a probe request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReply {
    /// Address the reply came from
    pub from: SocketAddr,
    /// Address the responder saw our request come from
    pub to: SocketAddr,
}

/// Sends requests to several peers at once
pub trait RequestDispatcher {
    /// Send `payload` to every peer and collect the replies
    ///
    /// Peers that do not answer within the dispatcher's own retry policy are
    /// simply absent from the result.
    fn send_to_many(
        &self,
        kind: MessageKind,
        payload: &[u8],
        peers: &[PeerRecord],
    ) -> impl Future<Output = Vec<ProbeReply>> + Send;
}

/// Supplies well-known peers when the routing table is sparse
pub trait BootstrapSource {
    /// Fetch up to `count` peers
    fn fetch(&self, count: usize) -> impl Future<Output = Vec<PeerRecord>> + Send;
}

/// Feed of remote addresses that sent datagrams to the server socket
pub trait DatagramObserver {
    /// Start observing
    ///
    /// Only datagrams received after this call are reported.
    fn subscribe(&self) -> broadcast::Receiver<SocketAddr>;
}

impl DatagramObserver for broadcast::Sender<SocketAddr> {
    fn subscribe(&self) -> broadcast::Receiver<SocketAddr> {
        broadcast::Sender::subscribe(self)
    }
}

/// Fixed list of bootstrap peers
#[derive(Debug, Clone, Default)]
pub struct StaticBootstrap {
    peers: Vec<PeerRecord>,
}

impl StaticBootstrap {
    /// Create from a list of peers
    #[must_use]
    pub fn new(peers: Vec<PeerRecord>) -> Self {
        Self { peers }
    }
}

impl BootstrapSource for StaticBootstrap {
    fn fetch(&self, count: usize) -> impl Future<Output = Vec<PeerRecord>> + Send {
        let peers: Vec<PeerRecord> = self.peers.iter().take(count).cloned().collect();
        async move { peers }
    }
}

/// What this node believes about its own addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    /// Port the server socket is bound to
    pub server_port: u16,
    /// Public host learned through the client socket, if known
    pub client_nat_host: Option<IpAddr>,
}

impl LocalIdentity {
    /// Create a local identity
    #[must_use]
    pub fn new(server_port: u16, client_nat_host: Option<IpAddr>) -> Self {
        Self {
            server_port,
            client_nat_host,
        }
    }
}

/// Outcome of a firewall check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirewallReport {
    /// Whether inbound connections need traversal assistance
    pub firewalled: bool,
    /// Classification of the observed mapping
    pub nat_type: NatType,
    /// Number of peers probed
    pub candidates: usize,
    /// Replies confirmed to have arrived on the server socket
    pub confirmations: usize,
    /// Consensus external address, if host and port agreed
    pub external: Option<SocketAddr>,
}

impl FirewallReport {
    fn inconclusive(candidates: usize, confirmations: usize) -> Self {
        Self {
            firewalled: true,
            nat_type: NatType::Unknown,
            candidates,
            confirmations,
            external: None,
        }
    }
}

/// Firewall probe over a routing table and network collaborators
#[derive(Debug)]
pub struct FirewallProbe<D, B, O> {
    dispatcher: D,
    bootstrap: B,
    observer: O,
    config: FirewallConfig,
}

impl<D, B, O> FirewallProbe<D, B, O>
where
    D: RequestDispatcher,
    B: BootstrapSource,
    O: DatagramObserver,
{
    /// Create a probe with default configuration
    pub fn new(dispatcher: D, bootstrap: B, observer: O) -> Self {
        Self::with_config(dispatcher, bootstrap, observer, FirewallConfig::default())
    }

    /// Create a probe with custom configuration
    pub fn with_config(dispatcher: D, bootstrap: B, observer: O, config: FirewallConfig) -> Self {
        Self {
            dispatcher,
            bootstrap,
            observer,
            config,
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &FirewallConfig {
        &self.config
    }

    /// Pick the peers to probe
    ///
    /// Most recently seen routing table entries first, then bootstrap peers
    /// whose address is not already selected. The table lock is released
    /// before the bootstrap source is consulted.
    pub async fn select_candidates(&self, table: &RwLock<RoutingTable>) -> Vec<PeerRecord> {
        let wanted = self.config.candidate_count;
        let mut candidates = table.read().await.recent_peers(wanted);

        if candidates.len() < wanted {
            let missing = wanted - candidates.len();
            let extra = self.bootstrap.fetch(missing).await;
            debug!(
                from_table = candidates.len(),
                from_bootstrap = extra.len(),
                "Supplementing probe candidates"
            );

            for peer in extra {
                if candidates.len() >= wanted {
                    break;
                }
                if candidates.iter().any(|c| c.addr == peer.addr) {
                    continue;
                }
                candidates.push(peer);
            }
        }

        candidates
    }

    /// Run a check with a fresh sampler
    ///
    /// # Errors
    ///
    /// Returns [`NatError::Payload`] if the probe payload cannot be encoded.
    pub async fn check(
        &self,
        table: &RwLock<RoutingTable>,
        identity: &LocalIdentity,
    ) -> Result<FirewallReport, NatError> {
        let mut sampler = NatSampler::new();
        self.check_with_sampler(table, identity, &mut sampler).await
    }

    /// Run a check, accumulating evidence into a caller-owned sampler
    ///
    /// # Errors
    ///
    /// Returns [`NatError::Payload`] if the probe payload cannot be encoded.
    pub async fn check_with_sampler(
        &self,
        table: &RwLock<RoutingTable>,
        identity: &LocalIdentity,
        sampler: &mut NatSampler,
    ) -> Result<FirewallReport, NatError> {
        let candidates = self.select_candidates(table).await;
        if candidates.is_empty() {
            info!("No peers available to probe, assuming firewalled");
            return Ok(FirewallReport::inconclusive(0, 0));
        }

        let payload = encode_port(identity.server_port)?;

        // Subscribe first so ping-backs racing the replies are not missed
        let mut datagrams = self.observer.subscribe();

        debug!(
            candidates = candidates.len(),
            server_port = identity.server_port,
            "Sending NAT probes"
        );

        let probes = self
            .dispatcher
            .send_to_many(MessageKind::PingNat, &payload, &candidates);
        let replies = match tokio::time::timeout(self.config.probe_timeout(), probes).await {
            Ok(replies) => replies,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.probe_timeout_ms,
                    "NAT probe round timed out"
                );
                Vec::new()
            }
        };

        let seen = drain_hosts(&mut datagrams);

        let mut confirmations = 0;
        for reply in &replies {
            if seen.contains(&reply.from.ip()) {
                sampler.add(reply.to.ip(), reply.to.port());
                confirmations += 1;
            } else {
                debug!(from = %reply.from, "Reply did not arrive on the server socket");
            }
        }

        let report = self.verdict(candidates.len(), confirmations, sampler, identity);
        info!(
            firewalled = report.firewalled,
            nat_type = %report.nat_type,
            candidates = report.candidates,
            confirmations = report.confirmations,
            "Firewall check complete"
        );

        Ok(report)
    }

    /// Run a check and return only the verdict
    ///
    /// # Errors
    ///
    /// Returns [`NatError::Payload`] if the probe payload cannot be encoded.
    pub async fn is_firewalled(
        &self,
        table: &RwLock<RoutingTable>,
        identity: &LocalIdentity,
    ) -> Result<bool, NatError> {
        Ok(self.check(table, identity).await?.firewalled)
    }

    fn verdict(
        &self,
        candidates: usize,
        confirmations: usize,
        sampler: &NatSampler,
        identity: &LocalIdentity,
    ) -> FirewallReport {
        let required = if candidates >= self.config.candidate_count {
            self.config.min_confirmations
        } else {
            self.config.min_confirmations_few
        };

        if confirmations < required {
            debug!(confirmations, required, "Not enough confirmations");
            return FirewallReport::inconclusive(candidates, confirmations);
        }

        let host_matches = sampler.host().is_some() && sampler.host() == identity.client_nat_host;
        let port_matches = sampler.port() != 0 && sampler.port() == identity.server_port;
        let nat_type = if host_matches && port_matches {
            NatType::Open
        } else {
            sampler.nat_type()
        };

        FirewallReport {
            firewalled: nat_type.needs_traversal(),
            nat_type,
            candidates,
            confirmations,
            external: sampler.external_addr(),
        }
    }
}

/// Hosts that reached the server socket since subscribing
fn drain_hosts(datagrams: &mut broadcast::Receiver<SocketAddr>) -> HashSet<IpAddr> {
    let mut hosts = HashSet::new();
    loop {
        match datagrams.try_recv() {
            Ok(addr) => {
                hosts.insert(addr.ip());
            }
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "Server socket feed lagged");
            }
            Err(broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed) => {
                break;
            }
        }
    }
    hosts
}
