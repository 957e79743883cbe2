use clap::{Args as ClapArgs, Parser, Subcommand};
use genflux::config::{self, GenerationConfig, GenerationFile, Output};
use genflux::error::ConfigError;
use genflux::replay::config::{
    Pacing, PacingMode, ReplayConfig, ReplayFile, DEFAULT_STATS_INTERVAL,
};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(author, version, about = "Synthetic pcap generation and rate-controlled replay", long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, help = "TOML configuration file. Command-line values take precedence")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Capture file tools
    Pcap {
        #[clap(subcommand)]
        command: PcapCommand,
    },
    /// Send a pcap file on a network interface
    Replay(ReplayArgs),
}

#[derive(Debug, Subcommand, Clone)]
pub enum PcapCommand {
    /// Generate synthetic pcap files
    Gen(GenArgs),
}

#[derive(Debug, ClapArgs, Clone, Default)]
pub struct GenArgs {
    #[arg(long, help = "Number of internal hosts [default: 50]")]
    pub internal_hosts: Option<usize>,
    #[arg(long, help = "Number of external hosts [default: 500]")]
    pub external_hosts: Option<usize>,
    #[arg(long, help = "Minimum duration of a file, in seconds or such as \"90s\" [default: 60]")]
    pub min_duration: Option<String>,
    #[arg(long, help = "Maximum duration of a file [default: 120]")]
    pub max_duration: Option<String>,
    #[arg(long, help = "Number of files to generate [default: 1]")]
    pub file_count: Option<usize>,
    #[arg(long, help = "Output directory [default: .]")]
    pub out_dir: Option<PathBuf>,
    #[arg(long, help = "Output file (requires file-count=1)")]
    pub out_file: Option<PathBuf>,
    #[arg(long, help = "Start time, RFC3339 or \"Sun Oct 2 00:00:00 2016\" [default: Sun Oct 2 00:00:00 2016]")]
    pub start_time: Option<String>,
    #[arg(long, help = "Exact file size with a 1024-based unit (e.g. 1g, 0.5gb, 1024m)")]
    pub exact_size: Option<String>,
    #[arg(long, help = "Maximum file size when no exact size is given [default: 300000000]")]
    pub max_size: Option<String>,
    #[arg(short, long, help = "Seed for random number generation [default: current time]")]
    pub seed: Option<u64>,
    #[arg(long, help = "Number of distinct flows to generate (0 disables the fixed-flow mode)")]
    pub flow_count: Option<u64>,
    #[arg(long, help = "Packets per flow when flow-count is set [default: 2]")]
    pub packets_per_flow: Option<u64>,
}

#[derive(Debug, ClapArgs, Clone, Default)]
pub struct ReplayArgs {
    #[arg(long = "in", help = "Input pcap file")]
    pub input: Option<PathBuf>,
    #[arg(long, help = "Network interface (e.g. eth0)")]
    pub iface: Option<String>,
    #[arg(long, value_enum, help = "Pacing mode [default: timestamp]")]
    pub mode: Option<PacingMode>,
    #[arg(long, help = "Rate in Mbps (mode=mbps)")]
    pub mbps: Option<f64>,
    #[arg(long, help = "Rate in packets per second (mode=pps)")]
    pub pps: Option<f64>,
    #[arg(long = "loop", help = "Number of loops, 0 for infinite [default: 1]")]
    pub loop_count: Option<u32>,
    #[arg(long, help = "Packet limit over all the loops, 0 for unlimited [default: 0]")]
    pub limit: Option<u64>,
    #[arg(long, help = "Statistics interval, in seconds or such as \"500ms\" [default: 1]")]
    pub stats_interval: Option<String>,
}

/// Rename the field of a parse error
fn for_field(field: &'static str) -> impl Fn(ConfigError) -> ConfigError {
    move |e| match e {
        ConfigError::Parse { value, reason, .. } => ConfigError::Parse {
            field,
            value,
            reason,
        },
        e => e,
    }
}

impl GenArgs {
    /// Merge with the configuration file: the command line wins over the file, which wins over
    /// the defaults
    pub fn into_config(self, file: GenerationFile) -> Result<GenerationConfig, ConfigError> {
        let mut c = GenerationConfig::default();
        if let Some(v) = self.internal_hosts.or(file.internal_hosts) {
            c.internal_hosts = v;
        }
        if let Some(v) = self.external_hosts.or(file.external_hosts) {
            c.external_hosts = v;
        }
        match self.min_duration {
            Some(s) => c.min_duration = config::parse_duration("min-duration", &s)?,
            None => {
                if let Some(v) = file.min_duration {
                    c.min_duration = v.resolve("min-duration")?;
                }
            }
        }
        match self.max_duration {
            Some(s) => c.max_duration = config::parse_duration("max-duration", &s)?,
            None => {
                if let Some(v) = file.max_duration {
                    c.max_duration = v.resolve("max-duration")?;
                }
            }
        }
        if let Some(v) = self.file_count.or(file.file_count) {
            c.file_count = v;
        }
        c.output = match (self.out_file, self.out_dir, file.out_file, file.out_dir) {
            (Some(f), _, _, _) => Output::File(f),
            (None, Some(d), _, _) => Output::Directory(d),
            (None, None, Some(f), _) => Output::File(f),
            (None, None, None, Some(d)) => Output::Directory(d),
            (None, None, None, None) => c.output,
        };
        if let Some(s) = self.start_time.or(file.start_time) {
            c.start_time = config::parse_start_time(&s)?;
        }
        if let Some(s) = self.exact_size.or(file.exact_size) {
            c.exact_size = Some(config::parse_size(&s).map_err(for_field("exact-size"))?);
        }
        if let Some(s) = self.max_size.or(file.max_size) {
            c.max_size = config::parse_size(&s).map_err(for_field("max-size"))?;
        }
        if let Some(v) = self.seed.or(file.seed) {
            c.seed = v;
        }
        if let Some(v) = self.flow_count.or(file.flow_count) {
            c.flow_count = v;
        }
        if let Some(v) = self.packets_per_flow.or(file.packets_per_flow) {
            c.packets_per_flow = Some(v);
        }
        Ok(c)
    }
}

impl ReplayArgs {
    /// Same precedence as `GenArgs::into_config`
    pub fn into_config(self, file: ReplayFile) -> Result<ReplayConfig, ConfigError> {
        let mode = self.mode.or(file.mode).unwrap_or_default();
        let pacing = Pacing::new(mode, self.mbps.or(file.mbps), self.pps.or(file.pps))?;
        let stats_interval = match (self.stats_interval, file.stats_interval) {
            (Some(s), _) => config::parse_duration("stats-interval", &s)?,
            (None, Some(v)) => v.resolve("stats-interval")?,
            (None, None) => DEFAULT_STATS_INTERVAL,
        };
        Ok(ReplayConfig {
            input: self.input.or(file.input).unwrap_or_default(),
            interface: self.iface.or(file.iface).unwrap_or_default(),
            pacing,
            loop_count: self.loop_count.or(file.loop_count).unwrap_or(1),
            limit: self.limit.or(file.limit).unwrap_or(0),
            stats_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_gen_defaults() {
        let c = GenArgs::default()
            .into_config(GenerationFile::default())
            .unwrap();
        assert_eq!(c.internal_hosts, 50);
        assert_eq!(c.external_hosts, 500);
        assert_eq!(c.min_duration, Duration::from_secs(60));
        assert_eq!(c.max_duration, Duration::from_secs(120));
        assert_eq!(c.output, Output::Directory(PathBuf::from(".")));
        assert_eq!(c.max_size, 300_000_000);
        assert_eq!(c.exact_size, None);
        assert_eq!(c.packets_per_flow, Some(2));
        assert!(!c.flow_mode());
    }

    #[test]
    fn test_command_line_wins() {
        let file = config::import_config(
            "[generation]\ninternal_hosts = 7\nexternal_hosts = 9\nout_file = \"from_file.pcap\"\nseed = 1\n",
        )
        .unwrap()
        .generation;
        let args = Args::parse_from([
            "genflux",
            "pcap",
            "gen",
            "--internal-hosts",
            "3",
            "--out-dir",
            "cli",
            "--exact-size",
            "1k",
        ]);
        let Command::Pcap {
            command: PcapCommand::Gen(gen),
        } = args.command
        else {
            panic!("wrong subcommand");
        };
        let c = gen.into_config(file).unwrap();
        assert_eq!(c.internal_hosts, 3);
        assert_eq!(c.external_hosts, 9);
        assert_eq!(c.seed, 1);
        assert_eq!(c.output, Output::Directory(PathBuf::from("cli")));
        assert_eq!(c.exact_size, Some(1024));
    }

    #[test]
    fn test_bad_size_names_its_field() {
        let args = GenArgs {
            max_size: Some("lots".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            args.into_config(GenerationFile::default()),
            Err(ConfigError::Parse {
                field: "max-size",
                ..
            })
        ));
    }

    #[test]
    fn test_replay_args() {
        let args = Args::parse_from([
            "genflux", "replay", "--in", "a.pcap", "--iface", "eth0", "--mode", "pps", "--pps",
            "500", "--loop", "0", "--limit", "10",
        ]);
        let Command::Replay(replay) = args.command else {
            panic!("wrong subcommand");
        };
        let c = replay.into_config(ReplayFile::default()).unwrap();
        assert_eq!(c.input, PathBuf::from("a.pcap"));
        assert_eq!(c.interface, "eth0");
        assert_eq!(c.pacing, Pacing::Pps(500.));
        assert_eq!(c.loop_count, 0);
        assert_eq!(c.limit, 10);
        assert_eq!(c.stats_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_replay_file_values() {
        let file = config::import_config(
            "[replay]\ninput = \"b.pcap\"\niface = \"lo\"\nmode = \"mbps\"\nmbps = 20.0\nstats_interval = \"250ms\"\n",
        )
        .unwrap()
        .replay;
        let c = ReplayArgs::default().into_config(file).unwrap();
        assert_eq!(c.pacing, Pacing::Mbps(20.));
        assert_eq!(c.interface, "lo");
        assert_eq!(c.loop_count, 1);
        assert_eq!(c.stats_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_replay_missing_rate() {
        let args = ReplayArgs {
            mode: Some(PacingMode::Mbps),
            ..Default::default()
        };
        assert!(matches!(
            args.into_config(ReplayFile::default()),
            Err(ConfigError::Missing { field: "mbps", .. })
        ));
    }
}
