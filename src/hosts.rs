use crate::error::CapacityError;
use crate::structs::Host;
use pnet::util::MacAddr;
use rand::Rng;
use std::net::Ipv4Addr;

/// Number of addresses in 192.168.0.0/16
pub const INTERNAL_CAPACITY: usize = 1 << 16;
/// Number of addresses in 10.0.0.0/8
pub const EXTERNAL_CAPACITY: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// Sequential addresses: no two hosts of a pool share an IP address
    CapacityUnique,
    /// Independent random addresses, collisions are possible
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Internal,
    External,
}

impl PoolKind {
    pub fn capacity(&self) -> usize {
        match self {
            PoolKind::Internal => INTERNAL_CAPACITY,
            PoolKind::External => EXTERNAL_CAPACITY,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PoolKind::Internal => "internal",
            PoolKind::External => "external",
        }
    }

    fn range(&self) -> &'static str {
        match self {
            PoolKind::Internal => "192.168.0.0/16",
            PoolKind::External => "10.0.0.0/8",
        }
    }

    /// Bijection between [0, capacity) and the pool address range
    pub fn unique_ip(&self, idx: usize) -> Ipv4Addr {
        match self {
            PoolKind::Internal => Ipv4Addr::new(192, 168, (idx >> 8) as u8, idx as u8),
            PoolKind::External => {
                Ipv4Addr::new(10, (idx >> 16) as u8, (idx >> 8) as u8, idx as u8)
            }
        }
    }

    fn random_ip(&self, rng: &mut impl Rng) -> Ipv4Addr {
        match self {
            PoolKind::Internal => Ipv4Addr::new(192, 168, rng.gen(), rng.gen()),
            PoolKind::External => {
                Ipv4Addr::new(rng.gen_range(1..=255), rng.gen(), rng.gen(), rng.gen())
            }
        }
    }
}

fn random_mac(rng: &mut impl Rng) -> MacAddr {
    MacAddr::new(
        rng.gen(),
        rng.gen(),
        rng.gen(),
        rng.gen(),
        rng.gen(),
        rng.gen(),
    )
}

/// An ordered set of hosts. Flows refer to hosts by their index in the pool.
#[derive(Debug, Clone)]
pub struct HostPool {
    hosts: Vec<Host>,
}

impl HostPool {
    /// Build a pool of `count` hosts. The MAC addresses are always random; with
    /// `AllocationMode::CapacityUnique`, the IP address only depends on the index of the host.
    pub fn build(
        kind: PoolKind,
        count: usize,
        mode: AllocationMode,
        rng: &mut impl Rng,
    ) -> Result<Self, CapacityError> {
        if mode == AllocationMode::CapacityUnique && count > kind.capacity() {
            return Err(CapacityError {
                pool: kind.name(),
                range: kind.range(),
                requested: count,
                capacity: kind.capacity(),
            });
        }
        let hosts = (0..count)
            .map(|idx| {
                let mac = random_mac(rng);
                let ip = match mode {
                    AllocationMode::CapacityUnique => kind.unique_ip(idx),
                    AllocationMode::Random => kind.random_ip(rng),
                };
                Host { mac, ip }
            })
            .collect();
        log::debug!("{} {} hosts created", count, kind.name());
        Ok(HostPool { hosts })
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Host {
        &self.hosts[idx]
    }

    /// Uniform draw of one host
    pub fn sample(&self, rng: &mut impl Rng) -> &Host {
        &self.hosts[rng.gen_range(0..self.hosts.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }
}
