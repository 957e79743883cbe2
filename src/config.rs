use crate::error::ConfigError;
use crate::replay::config::ReplayFile;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Fallback format of the start time, tried after RFC3339 ("Sun Oct 2 00:00:00 2016")
pub const START_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";
pub const DEFAULT_START_TIME: &str = "Sun Oct 2 00:00:00 2016";
/// Name of the output file when a single file is generated in a directory
pub const SINGLE_FILE_NAME: &str = "generated_0000.pcap";

/// Where the generated pcap files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// One or several files named after their sequence number
    Directory(PathBuf),
    /// Exactly one file
    File(PathBuf),
}

impl Output {
    /// Path of the `index`-th file among `file_count`
    pub fn file_path(&self, index: usize, file_count: usize) -> PathBuf {
        match self {
            Output::File(path) => path.clone(),
            Output::Directory(dir) if file_count > 1 => {
                dir.join(format!("generated_{index:06}.pcap"))
            }
            Output::Directory(dir) => dir.join(SINGLE_FILE_NAME),
        }
    }
}

/// Parameters of a generation. Use `validate` before generating.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub internal_hosts: usize,
    pub external_hosts: usize,
    pub min_duration: Duration,
    pub max_duration: Duration,
    pub file_count: usize,
    pub output: Output,
    pub start_time: DateTime<FixedOffset>,
    /// Size ceiling, used when no exact size is requested
    pub max_size: u64,
    pub exact_size: Option<u64>,
    pub seed: u64,
    /// 0 disables the fixed-flow mode
    pub flow_count: u64,
    pub packets_per_flow: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            internal_hosts: 50,
            external_hosts: 500,
            min_duration: Duration::from_secs(60),
            max_duration: Duration::from_secs(120),
            file_count: 1,
            output: Output::Directory(PathBuf::from(".")),
            start_time: default_start_time(),
            max_size: 300_000_000,
            exact_size: None,
            seed: seed_from_clock(),
            flow_count: 0,
            packets_per_flow: Some(2),
        }
    }
}

fn default_start_time() -> DateTime<FixedOffset> {
    // the fallback format is always parseable; only a timezone without that local time could
    // make it fail
    parse_start_time(DEFAULT_START_TIME).unwrap_or_else(|_| {
        DateTime::from_timestamp(1_475_366_400, 0)
            .unwrap_or_default()
            .fixed_offset()
    })
}

/// A seed derived from the current time
pub fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

impl GenerationConfig {
    pub fn flow_mode(&self) -> bool {
        self.flow_count > 0
    }

    /// Number of distinct flows, both directions counted. Saturates at `u64::MAX`, which no
    /// flow count can exceed anyway.
    pub fn flow_capacity(&self) -> u64 {
        (self.internal_hosts as u64)
            .saturating_mul(self.external_hosts as u64)
            .saturating_mul(2)
    }

    /// Check the consistency of the parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.internal_hosts == 0 {
            return Err(ConfigError::NotPositive {
                field: "internal-hosts",
            });
        }
        if self.external_hosts == 0 {
            return Err(ConfigError::NotPositive {
                field: "external-hosts",
            });
        }
        if self.file_count == 0 {
            return Err(ConfigError::NotPositive {
                field: "file-count",
            });
        }
        if matches!(self.output, Output::File(_)) && self.file_count != 1 {
            return Err(ConfigError::Conflict("out-file requires file-count=1"));
        }
        if self.exact_size.is_some() && self.file_count != 1 {
            return Err(ConfigError::Conflict("exact-size requires file-count=1"));
        }
        if self.min_duration.is_zero()
            || self.max_duration.is_zero()
            || self.max_duration < self.min_duration
        {
            return Err(ConfigError::DurationRange {
                min: self.min_duration,
                max: self.max_duration,
            });
        }
        if self.exact_size == Some(0) {
            return Err(ConfigError::NotPositive {
                field: "exact-size",
            });
        }
        if self.exact_size.is_none() && self.max_size == 0 {
            return Err(ConfigError::NotPositive { field: "max-size" });
        }
        if self.flow_mode() {
            match self.packets_per_flow {
                None => {
                    return Err(ConfigError::Missing {
                        field: "packets-per-flow",
                        when: "flow-count is set",
                    })
                }
                Some(0) => {
                    return Err(ConfigError::NotPositive {
                        field: "packets-per-flow",
                    })
                }
                Some(_) => (),
            }
            if self.flow_count > self.flow_capacity() {
                return Err(ConfigError::FlowCapacity {
                    requested: self.flow_count,
                    capacity: self.flow_capacity(),
                });
            }
        }
        if self.start_time.timestamp() < 0 {
            return Err(ConfigError::Parse {
                field: "start-time",
                value: self.start_time.to_rfc3339(),
                reason: "must not be before 1970-01-01".to_string(),
            });
        }
        Ok(())
    }
}

// Grammars

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

// longest suffixes first
const SIZE_UNITS: [(&str, u64); 13] = [
    ("tib", TIB),
    ("tb", TIB),
    ("t", TIB),
    ("gib", GIB),
    ("gb", GIB),
    ("g", GIB),
    ("mib", MIB),
    ("mb", MIB),
    ("m", MIB),
    ("kib", KIB),
    ("kb", KIB),
    ("k", KIB),
    ("b", 1),
];

/// Parse a size such as "1g", "0.5gb" or "200MiB". Units are 1024-based and case-insensitive;
/// the result is rounded to the nearest byte.
pub fn parse_size(value: &str) -> Result<u64, ConfigError> {
    let error = |reason: &str| ConfigError::Parse {
        field: "size",
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        return Err(error("empty size"));
    }
    let (number, multiplier) = SIZE_UNITS
        .iter()
        .find_map(|(suffix, m)| v.strip_suffix(suffix).map(|n| (n, *m)))
        .unwrap_or((v.as_str(), 1));
    let number = number.trim();
    if number.is_empty() {
        return Err(error("missing numeric value"));
    }
    let number: f64 = number.parse().map_err(|e| error(&format!("{e}")))?;
    if number.is_nan() || number <= 0. {
        return Err(error("size must be > 0"));
    }
    let bytes = (number * multiplier as f64).round();
    if !bytes.is_finite() || bytes >= u64::MAX as f64 {
        return Err(error("size is too large"));
    }
    if bytes < 1. {
        return Err(error("size must be > 0"));
    }
    Ok(bytes as u64)
}

/// Parse a start time, either in RFC3339 or in the fallback format (local time zone)
pub fn parse_start_time(value: &str) -> Result<DateTime<FixedOffset>, ConfigError> {
    let error = |reason: String| ConfigError::Parse {
        field: "start-time",
        value: value.to_string(),
        reason,
    };
    let v = value.trim();
    if v.is_empty() {
        return Err(error("empty time".to_string()));
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(v) {
        return Ok(t);
    }
    let naive =
        NaiveDateTime::parse_from_str(v, START_TIME_FORMAT).map_err(|e| error(e.to_string()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.fixed_offset())
        .ok_or_else(|| error("this local time does not exist".to_string()))
}

/// Parse a duration given either as a number of seconds ("90") or in a human-friendly way
/// ("1min 30s")
pub fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let v = value.trim();
    if let Ok(secs) = v.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(v).map_err(|e| ConfigError::Parse {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

// Configuration file

/// A duration in a configuration file: seconds, or a human-friendly string
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum DurationValue {
    Secs(u64),
    Text(String),
}

impl DurationValue {
    pub fn resolve(&self, field: &'static str) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Secs(s) => Ok(Duration::from_secs(*s)),
            DurationValue::Text(s) => parse_duration(field, s),
        }
    }
}

/// The [generation] table of the configuration file
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GenerationFile {
    pub internal_hosts: Option<usize>,
    pub external_hosts: Option<usize>,
    pub min_duration: Option<DurationValue>,
    pub max_duration: Option<DurationValue>,
    pub file_count: Option<usize>,
    pub out_dir: Option<PathBuf>,
    pub out_file: Option<PathBuf>,
    pub start_time: Option<String>,
    pub exact_size: Option<String>,
    pub max_size: Option<String>,
    pub seed: Option<u64>,
    pub flow_count: Option<u64>,
    pub packets_per_flow: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub generation: GenerationFile,
    #[serde(default)]
    pub replay: ReplayFile,
}

/// Import a configuration from a TOML string
pub fn import_config(config_str: &str) -> Result<ConfigFile, ConfigError> {
    toml::from_str(config_str).map_err(|e| ConfigError::File {
        path: "<string>".to_string(),
        reason: e.to_string(),
    })
}

/// Load a TOML configuration file
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let file_error = |reason: String| ConfigError::File {
        path: path.display().to_string(),
        reason,
    };
    let config_str = fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    let config = toml::from_str(&config_str).map_err(|e| file_error(e.to_string()))?;
    log::info!("\"{}\" successfully loaded", path.display());
    log::trace!("Configuration: {config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1g"), Ok(1_073_741_824));
        assert_eq!(parse_size("0.5gb"), Ok(536_870_912));
        assert_eq!(parse_size("200m"), Ok(209_715_200));
        assert_eq!(parse_size("1.5K"), Ok(1536));
        assert_eq!(parse_size("3KiB"), Ok(3072));
        assert_eq!(parse_size("2 TB"), Ok(2 * TIB));
        assert_eq!(parse_size("10"), Ok(10));
        assert_eq!(parse_size("10b"), Ok(10));
        assert_eq!(parse_size("1.4b"), Ok(1));
    }

    #[test]
    fn test_parse_size_rejects() {
        for s in ["", "abc", "gb", "0", "-1g", "0.0m", "nan", "0.2b"] {
            assert!(
                matches!(parse_size(s), Err(ConfigError::Parse { .. })),
                "{s} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_start_time_rfc3339() {
        let t = parse_start_time("2016-10-02T10:30:00+02:00").unwrap();
        assert_eq!(t.hour(), 10);
        assert_eq!(t.minute(), 30);
        assert_eq!(t.weekday(), Weekday::Sun);
        assert_eq!(t.timestamp(), 1_475_397_000);
    }

    #[test]
    fn test_parse_start_time_fallback() {
        let t = parse_start_time("Mon Jan 2 15:04:05 2006").unwrap();
        assert_eq!(t.naive_local().to_string(), "2006-01-02 15:04:05");
        assert_eq!(t.weekday(), Weekday::Mon);
        assert!(parse_start_time("yesterday").is_err());
        assert!(parse_start_time("").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("d", "90"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("d", "2min"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("d", "500ms"), Ok(Duration::from_millis(500)));
        assert!(parse_duration("d", "soon").is_err());
    }

    #[test]
    fn test_output_naming() {
        let dir = Output::Directory(PathBuf::from("out"));
        assert_eq!(dir.file_path(0, 1), PathBuf::from("out/generated_0000.pcap"));
        assert_eq!(dir.file_path(12, 20), PathBuf::from("out/generated_000012.pcap"));
        let file = Output::File(PathBuf::from("a.pcap"));
        assert_eq!(file.file_path(0, 1), PathBuf::from("a.pcap"));
    }

    #[test]
    fn test_validate() {
        let valid = GenerationConfig {
            exact_size: Some(1_000),
            ..Default::default()
        };
        assert_eq!(valid.validate(), Ok(()));

        let c = GenerationConfig {
            file_count: 2,
            output: Output::File(PathBuf::from("a.pcap")),
            ..Default::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::Conflict("out-file requires file-count=1"))
        );

        let c = GenerationConfig {
            file_count: 2,
            exact_size: Some(1_000),
            ..Default::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::Conflict("exact-size requires file-count=1"))
        );

        let c = GenerationConfig {
            min_duration: Duration::from_secs(10),
            max_duration: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::DurationRange { .. })));

        let c = GenerationConfig {
            internal_hosts: 0,
            ..Default::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::NotPositive {
                field: "internal-hosts"
            })
        );
    }

    #[test]
    fn test_validate_flows() {
        let c = GenerationConfig {
            internal_hosts: 2,
            external_hosts: 3,
            flow_count: 13,
            ..Default::default()
        };
        assert_eq!(
            c.validate(),
            Err(ConfigError::FlowCapacity {
                requested: 13,
                capacity: 12
            })
        );

        // the capacity saturates instead of wrapping around
        let c = GenerationConfig {
            internal_hosts: 1 << 40,
            external_hosts: 1 << 40,
            flow_count: 1,
            packets_per_flow: Some(1),
            ..Default::default()
        };
        assert_eq!(c.flow_capacity(), u64::MAX);
        assert_eq!(c.validate(), Ok(()));

        let c = GenerationConfig {
            flow_count: 5,
            packets_per_flow: None,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::Missing { .. })));

        let c = GenerationConfig {
            flow_count: 5,
            packets_per_flow: Some(0),
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::NotPositive { .. })));
    }

    #[test]
    fn test_config_file() {
        let config = import_config(
            r#"
[generation]
internal_hosts = 10
min_duration = 30
max_duration = "1min"
exact_size = "1m"
flow_count = 50

[replay]
input = "capture.pcap"
iface = "eth0"
mode = "pps"
pps = 1000.0
stats_interval = "500ms"
"#,
        )
        .unwrap();
        assert_eq!(config.generation.internal_hosts, Some(10));
        assert_eq!(
            config.generation.min_duration.unwrap().resolve("min-duration"),
            Ok(Duration::from_secs(30))
        );
        assert_eq!(
            config.generation.max_duration.unwrap().resolve("max-duration"),
            Ok(Duration::from_secs(60))
        );
        assert_eq!(config.generation.exact_size.as_deref(), Some("1m"));
        assert_eq!(config.replay.iface.as_deref(), Some("eth0"));
        assert_eq!(config.replay.pps, Some(1000.));
    }

    #[test]
    fn test_example_config_file() {
        let config = import_config(include_str!("../genflux.example.toml")).unwrap();
        assert_eq!(config.generation.out_dir, Some(PathBuf::from("captures")));
        assert_eq!(
            parse_size(config.generation.max_size.as_deref().unwrap()),
            Ok(300 * MIB)
        );
        assert_eq!(config.replay.mbps, Some(100.));
    }

    #[test]
    fn test_config_file_unknown_key() {
        assert!(matches!(
            import_config("[generation]\ninternal = 3\n"),
            Err(ConfigError::File { .. })
        ));
    }
}
