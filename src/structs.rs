use pnet::util::MacAddr;
use std::net::Ipv4Addr;
use std::time::Duration;

// Addressing structures

/// A synthetic host: one link-layer address and one IPv4 address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Host {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    InternalToExternal, // the internal host is the source
    ExternalToInternal, // the external host is the source
}

impl Direction {
    /// Direction encoded by a single random bit
    pub fn from_bit(internal_as_source: bool) -> Self {
        if internal_as_source {
            Direction::InternalToExternal
        } else {
            Direction::ExternalToInternal
        }
    }

    /// Order a pair of hosts as (source, destination)
    pub fn orient<'a>(&self, internal: &'a Host, external: &'a Host) -> (&'a Host, &'a Host) {
        match self {
            Direction::InternalToExternal => (internal, external),
            Direction::ExternalToInternal => (external, internal),
        }
    }
}

/// One flow of the fixed-flow mode: indices into the internal and external pools, plus the
/// direction. Both directions of a host pair are distinct flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId {
    pub internal: usize,
    pub external: usize,
    pub direction: Direction,
}

// Capture structures

/// A timestamped frame, as stored in a capture file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Time since the Unix epoch
    pub timestamp: Duration,
    pub data: Vec<u8>,
}

impl CaptureRecord {
    pub fn bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }
}
