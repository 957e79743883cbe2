use crate::config::DurationValue;
use crate::error::ConfigError;

use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(1);

/// How the send times are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    /// Reproduce the inter-arrival times of the capture
    #[default]
    Timestamp,
    /// Constant bit rate
    Mbps,
    /// Constant packet rate
    Pps,
}

/// A pacing mode with its rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    Timestamp,
    Mbps(f64),
    Pps(f64),
}

fn positive_rate(field: &'static str, value: Option<f64>) -> Result<f64, ConfigError> {
    match value {
        None => Err(ConfigError::Missing {
            field,
            when: if field == "mbps" {
                "mode is mbps"
            } else {
                "mode is pps"
            },
        }),
        Some(v) if v.is_finite() && v > 0. => Ok(v),
        Some(_) => Err(ConfigError::NotPositive { field }),
    }
}

impl Pacing {
    /// Associate a mode with its rate. The rate of the other modes is ignored.
    pub fn new(mode: PacingMode, mbps: Option<f64>, pps: Option<f64>) -> Result<Self, ConfigError> {
        Ok(match mode {
            PacingMode::Timestamp => Pacing::Timestamp,
            PacingMode::Mbps => Pacing::Mbps(positive_rate("mbps", mbps)?),
            PacingMode::Pps => Pacing::Pps(positive_rate("pps", pps)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub input: PathBuf,
    /// Name of the network interface
    pub interface: String,
    pub pacing: Pacing,
    /// 0 means forever
    pub loop_count: u32,
    /// Maximum number of packets over all the loops, 0 means no limit
    pub limit: u64,
    pub stats_interval: Duration,
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "input",
                when: "replaying",
            });
        }
        if self.interface.is_empty() {
            return Err(ConfigError::Missing {
                field: "iface",
                when: "replaying",
            });
        }
        if self.stats_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "stats-interval",
            });
        }
        Ok(())
    }
}

/// The [replay] table of the configuration file
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ReplayFile {
    pub input: Option<PathBuf>,
    pub iface: Option<String>,
    pub mode: Option<PacingMode>,
    pub mbps: Option<f64>,
    pub pps: Option<f64>,
    pub loop_count: Option<u32>,
    pub limit: Option<u64>,
    pub stats_interval: Option<DurationValue>,
}
