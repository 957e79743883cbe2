use crate::config::GenerationConfig;
use crate::diurnal::DiurnalProfile;
use crate::error::{BudgetError, ConfigError, Result};
use crate::export::{CaptureSink, PcapSink, FILE_HEADER_LEN, RECORD_HEADER_LEN};
use crate::hosts::{AllocationMode, HostPool, PoolKind};
use crate::tcp::{MAX_PAYLOAD_LEN, SYN_FRAME_LEN};

use chrono::{DateTime, Datelike, FixedOffset, TimeDelta, Timelike, Weekday};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::path::PathBuf;
use std::time::Duration;

/// Fixed-flow mode
pub mod flows;
/// Random-pair mode
pub mod random;

/// Size of a record holding a frame without payload
pub const RECORD_LEN: u64 = RECORD_HEADER_LEN + SYN_FRAME_LEN as u64;

/// Number of packets of a file, and the payload padding carried by its last packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub packets: u64,
    pub padding: u64,
}

impl Budget {
    /// Random mode with an exact file size
    pub fn random_exact(target: u64) -> std::result::Result<Self, BudgetError> {
        let minimum = FILE_HEADER_LEN + RECORD_LEN;
        if target < minimum {
            return Err(BudgetError::TooSmall {
                field: "exact-size",
                size: target,
                minimum,
            });
        }
        Ok(Budget {
            packets: (target - FILE_HEADER_LEN) / RECORD_LEN,
            padding: (target - FILE_HEADER_LEN) % RECORD_LEN,
        })
    }

    /// Random mode bounded by a maximum file size
    pub fn random_ceiling(max_size: u64) -> std::result::Result<Self, BudgetError> {
        let packets = max_size.saturating_sub(FILE_HEADER_LEN) / RECORD_LEN;
        if packets == 0 {
            return Err(BudgetError::TooSmall {
                field: "max-size",
                size: max_size,
                minimum: FILE_HEADER_LEN + RECORD_LEN,
            });
        }
        Ok(Budget {
            packets,
            padding: 0,
        })
    }

    /// Fixed-flow mode. With an exact size, the difference with the base size is padded on the
    /// very last packet.
    pub fn flows(
        flow_count: u64,
        packets_per_flow: u64,
        exact_size: Option<u64>,
        max_size: u64,
    ) -> std::result::Result<Self, BudgetError> {
        let required = flow_count
            .checked_mul(packets_per_flow)
            .and_then(|packets| packets.checked_mul(RECORD_LEN))
            .and_then(|bytes| bytes.checked_add(FILE_HEADER_LEN))
            .ok_or(BudgetError::SizeOverflow {
                flow_count,
                packets_per_flow,
            })?;
        // cannot overflow, the size did not
        let packets = flow_count * packets_per_flow;
        match exact_size {
            Some(target) if target < required => Err(BudgetError::BelowFlowMinimum {
                target,
                required,
                flow_count,
                packets_per_flow,
            }),
            Some(target) if target - required > MAX_PAYLOAD_LEN as u64 => {
                Err(BudgetError::PaddingOverflow {
                    padding: target - required,
                    max: MAX_PAYLOAD_LEN as u64,
                })
            }
            Some(target) => Ok(Budget {
                packets,
                padding: target - required,
            }),
            None if required > max_size => Err(BudgetError::AboveCeiling { required, max_size }),
            None => Ok(Budget {
                packets,
                padding: 0,
            }),
        }
    }
}

/// What has been written into one file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub start_time: DateTime<FixedOffset>,
    pub duration: Duration,
    pub packets: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub seed: u64,
    pub files: Vec<FileReport>,
}

impl GenerationReport {
    pub fn total_packets(&self) -> u64 {
        self.files.iter().map(|f| f.packets).sum()
    }
}

/// Uniform duration in [min, max)
fn random_duration(rng: &mut impl Rng, min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let delta = (max - min).as_nanos() as u64;
    min + Duration::from_nanos(rng.gen_range(0..delta))
}

fn since_epoch(t: &DateTime<FixedOffset>) -> Duration {
    Duration::new(t.timestamp() as u64, t.timestamp_subsec_nanos())
}

fn decimal_hour(t: &DateTime<FixedOffset>) -> f64 {
    t.hour() as f64 + t.minute() as f64 / 60. + t.second() as f64 / 3600.
}

/// Generate all the pcap files described by the configuration.
///
/// All the randomness comes from a single generator seeded by `config.seed`, so the same
/// configuration always produces the same files. A file that is being written when an error
/// occurs is left on disk.
pub fn generate(config: &GenerationConfig) -> Result<GenerationReport> {
    config.validate()?;
    log::info!("Generating with seed {}", config.seed);
    let mut rng = Pcg32::seed_from_u64(config.seed);

    let mode = if config.flow_mode() {
        AllocationMode::CapacityUnique
    } else {
        AllocationMode::Random
    };
    let internal = HostPool::build(PoolKind::Internal, config.internal_hosts, mode, &mut rng)?;
    let external = HostPool::build(PoolKind::External, config.external_hosts, mode, &mut rng)?;

    // checked once, before anything is written
    let packets_per_flow = config.packets_per_flow.unwrap_or_default();
    let budget = if config.flow_mode() {
        Budget::flows(
            config.flow_count,
            packets_per_flow,
            config.exact_size,
            config.max_size,
        )?
    } else if let Some(exact) = config.exact_size {
        Budget::random_exact(exact)?
    } else {
        Budget::random_ceiling(config.max_size)?
    };
    log::debug!("Budget: {budget:?}");

    let profile = DiurnalProfile::default();
    let mut start_time = config.start_time;
    let mut files = Vec::with_capacity(config.file_count);
    for index in 0..config.file_count {
        let path = config.output.file_path(index, config.file_count);

        let mut duration = random_duration(&mut rng, config.min_duration, config.max_duration);
        if config.file_count > 1 {
            let weekend = matches!(start_time.weekday(), Weekday::Sat | Weekday::Sun);
            let hour = decimal_hour(&start_time);
            let scale = profile.activity(hour, weekend);
            duration = Duration::from_secs(profile.scaled_duration_secs(hour, weekend));
            log::info!(
                "{} - duration={:?} (scale={:.3})",
                start_time.to_rfc3339(),
                duration,
                scale
            );
        }

        let mut sink = PcapSink::create(&path)?;
        if config.flow_mode() {
            log::info!(
                "Creating {} flows={} packetsPerFlow={} duration={:?}",
                path.display(),
                config.flow_count,
                packets_per_flow,
                duration
            );
            flows::write_flows(
                &mut sink,
                &mut rng,
                &internal,
                &external,
                since_epoch(&start_time),
                duration,
                config.flow_count,
                packets_per_flow,
                budget,
            )?;
        } else {
            log::info!("Creating {} duration={:?}", path.display(), duration);
            random::write_random(
                &mut sink,
                &mut rng,
                &internal,
                &external,
                since_epoch(&start_time),
                duration,
                budget,
            )?;
        }
        let (packets, bytes) = (sink.packets(), sink.bytes());
        sink.finish()?;
        log::debug!("{}: {} packets, {} bytes", path.display(), packets, bytes);

        files.push(FileReport {
            path,
            start_time,
            duration,
            packets,
            bytes,
        });

        let delta = TimeDelta::from_std(duration).map_err(|_| ConfigError::DurationRange {
            min: config.min_duration,
            max: config.max_duration,
        })?;
        start_time += delta;
    }

    Ok(GenerationReport {
        seed: config.seed,
        files,
    })
}

/// Write a frame into the sink, logging the progression
fn write_frame(sink: &mut impl CaptureSink, index: u64, ts: Duration, frame: &[u8]) -> Result<()> {
    if index % 100_000 == 0 && index > 0 {
        log::info!("Creating packet {index}");
    }
    log::trace!("Packet {index} at {ts:?} ({} bytes)", frame.len());
    sink.write_record(ts, frame)
}
