/// Configuration of the generation and of the replay
pub mod config;
/// Error types
pub mod error;
pub mod structs;

/// Day/night activity model
pub mod diurnal;
/// Synthetic hosts
pub mod hosts;
/// Frame synthesis
pub mod tcp;

/// Pcap output
pub mod export;
/// Generation of the pcap files
pub mod planner;

/// Replay of a pcap file on an interface
pub mod replay;
pub mod stats;
