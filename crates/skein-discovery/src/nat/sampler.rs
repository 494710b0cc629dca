//! External address consensus.
//!
//! Peers report the address our probes arrived from. [`NatSampler`] keeps a
//! bounded, recency-weighted count of those reports and exposes the current
//! best guess once enough reports agree.
//!
//! Each [`NatSampler::add`] writes two slots into a 32-slot ring: a full
//! sample keyed by `(host, port)` at the even position and a host-only
//! sample keyed by `(host, 0)` at the odd position. A sample's hit count is
//! the number of ring slots currently referencing it.

use super::types::NatType;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

/// Ring capacity in slots
pub const RING_SIZE: usize = 32;

/// Same-kind slots inspected before creating a new sample
const LOOKBACK: usize = 4;

type SampleId = u64;

#[derive(Debug, Clone)]
struct Sample {
    host: IpAddr,
    port: u16,
    hits: u32,
}

/// Bounded frequency counter over observed external addresses
#[derive(Debug, Clone, Default)]
pub struct NatSampler {
    host: Option<IpAddr>,
    port: u16,
    top: usize,
    threshold: u32,
    slots: Vec<SampleId>,
    samples: HashMap<SampleId, Sample>,
    next_id: SampleId,
    best_full: Option<SampleId>,
    best_host: Option<SampleId>,
}

impl NatSampler {
    /// Create an empty sampler
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an externally observed address
    ///
    /// Returns the hit count of the `(host, port)` sample after this report.
    pub fn add(&mut self, host: IpAddr, port: u16) -> u32 {
        let full = self.bump(host, port, 2);
        let host_only = self.bump(host, 0, 1);

        if self.slots.len() < RING_SIZE {
            self.slots.push(full);
            self.slots.push(host_only);
            self.top += 2;
            self.threshold = threshold_for(self.slots.len());
        } else {
            if self.top == RING_SIZE {
                self.top = 0;
            }
            self.overwrite(full);
            self.overwrite(host_only);
        }

        let full_hits = self.hits(full);
        if self.best_full.is_none_or(|best| self.hits(best) <= full_hits) {
            self.best_full = Some(full);
        }
        let host_hits = self.hits(host_only);
        if self.best_host.is_none_or(|best| self.hits(best) <= host_hits) {
            self.best_host = Some(host_only);
        }

        self.collect_garbage();
        self.update_guess();

        tracing::trace!(
            %host,
            port,
            hits = full_hits,
            threshold = self.threshold,
            "NAT sample recorded"
        );

        full_hits
    }

    /// Consensus host, if any
    #[must_use]
    pub fn host(&self) -> Option<IpAddr> {
        self.host
    }

    /// Consensus port, `0` when only the host is agreed on
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Consensus address when both host and port are agreed on
    #[must_use]
    pub fn external_addr(&self) -> Option<SocketAddr> {
        match self.host {
            Some(host) if self.port != 0 => Some(SocketAddr::new(host, self.port)),
            _ => None,
        }
    }

    /// Number of occupied ring slots
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Hits a sample needs to become the consensus
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Classification from the consensus alone
    ///
    /// Never returns [`NatType::Open`]; that requires comparing the consensus
    /// against the local identity.
    #[must_use]
    pub fn nat_type(&self) -> NatType {
        match (self.host, self.port) {
            (None, _) => NatType::Unknown,
            (Some(_), 0) => NatType::Symmetric,
            (Some(_), _) => NatType::Consistent,
        }
    }

    /// Reuse a matching recent sample or create a new one
    ///
    /// `back` is the distance from the cursor to the newest slot of the same
    /// kind.
    fn bump(&mut self, host: IpAddr, port: u16, back: usize) -> SampleId {
        for i in 0..LOOKBACK {
            let pos = (self.top + 2 * RING_SIZE - back - 2 * i) % RING_SIZE;
            let Some(&id) = self.slots.get(pos) else {
                break;
            };
            if let Some(sample) = self.samples.get_mut(&id) {
                if sample.host == host && sample.port == port {
                    sample.hits += 1;
                    return id;
                }
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.samples.insert(id, Sample { host, port, hits: 1 });
        id
    }

    /// Write `id` at the cursor and release the evicted sample's slot
    fn overwrite(&mut self, id: SampleId) {
        let Some(slot) = self.slots.get_mut(self.top) else {
            return;
        };
        let evicted = std::mem::replace(slot, id);
        self.top += 1;

        if let Some(sample) = self.samples.get_mut(&evicted) {
            sample.hits = sample.hits.saturating_sub(1);
        }
    }

    fn hits(&self, id: SampleId) -> u32 {
        self.samples.get(&id).map_or(0, |s| s.hits)
    }

    /// Drop samples no longer referenced by a slot or a best pointer
    fn collect_garbage(&mut self) {
        let slots = &self.slots;
        let (best_full, best_host) = (self.best_full, self.best_host);
        self.samples.retain(|id, _| {
            slots.contains(id) || best_full == Some(*id) || best_host == Some(*id)
        });
    }

    fn update_guess(&mut self) {
        let threshold = self.threshold;
        let winner = |best: Option<SampleId>| {
            best.and_then(|id| self.samples.get(&id))
                .filter(|s| s.hits >= threshold)
        };

        let (host, port) = if let Some(s) = winner(self.best_full) {
            (Some(s.host), s.port)
        } else if let Some(s) = winner(self.best_host) {
            (Some(s.host), 0)
        } else {
            (None, 0)
        };

        self.host = host;
        self.port = port;
    }
}

/// Consensus threshold for the number of occupied slots
fn threshold_for(size: usize) -> u32 {
    match size {
        0..4 => 0,
        4..8 => 1,
        8..12 => 2,
        _ => 3,
    }
}
