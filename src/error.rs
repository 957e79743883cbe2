use std::io;
use std::time::Duration;
use thiserror::Error;

/// Invalid or inconsistent configuration, detected before any file is written or any socket is
/// opened.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },

    #[error("{0}")]
    Conflict(&'static str),

    #[error("invalid duration range (min={min:?}, max={max:?})")]
    DurationRange { min: Duration, max: Duration },

    #[error("{field} is required when {when}")]
    Missing {
        field: &'static str,
        when: &'static str,
    },

    #[error("invalid {field} \"{value}\": {reason}")]
    Parse {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("flow-count exceeds capacity: flow-count={requested} max={capacity} (2*internal*external)")]
    FlowCapacity { requested: u64, capacity: u64 },

    #[error("cannot read configuration file {path}: {reason}")]
    File { path: String, reason: String },
}

/// The host counts do not fit the address ranges used for collision-free allocation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{pool}-hosts exceeds {range} capacity ({capacity}): {requested} requested")]
pub struct CapacityError {
    pub pool: &'static str,
    pub range: &'static str,
    pub requested: usize,
    pub capacity: usize,
}

/// The requested file size cannot be reached with the requested traffic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BudgetError {
    #[error("exact-size {target} < base size {required}; increase exact-size or reduce flow-count/packets-per-flow (flow-count={flow_count}, packets-per-flow={packets_per_flow})")]
    BelowFlowMinimum {
        target: u64,
        required: u64,
        flow_count: u64,
        packets_per_flow: u64,
    },

    #[error("estimated size {required} > max-size {max_size}; increase max-size or reduce flow-count/packets-per-flow")]
    AboveCeiling { required: u64, max_size: u64 },

    #[error("{field} {size} too small for packet generation (minimum {minimum})")]
    TooSmall {
        field: &'static str,
        size: u64,
        minimum: u64,
    },

    #[error("flow-count={flow_count} and packets-per-flow={packets_per_flow} exceed any file size")]
    SizeOverflow {
        flow_count: u64,
        packets_per_flow: u64,
    },

    #[error("padding of {padding} bytes does not fit in a single frame (at most {max} bytes of payload)")]
    PaddingOverflow { padding: u64, max: u64 },
}

/// Any error that aborts a generation or a replay
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("capacity error: {0}")]
    Capacity(#[from] CapacityError),

    #[error("budget error: {0}")]
    Budget(#[from] BudgetError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("pcap error: {0}")]
    Pcap(#[from] pcap_file::PcapError),

    #[error("interface error: {0}")]
    Interface(String),

    #[error("failed to send frame: {0}")]
    Transport(io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
