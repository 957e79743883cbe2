use crate::error::Result;
use crate::export::open_capture;
use crate::stats::{format_throughput, ReplayStats};

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Replay parameters
pub mod config;
/// Network interface access
pub mod link;
/// Send times and waiting
pub mod pacing;

use config::ReplayConfig;
use link::FrameSender;
use pacing::{LoopProgress, WaitStrategy};

/// Number of packets that can still be sent, over all the loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketBudget {
    remaining: Option<u64>,
}

impl PacketBudget {
    /// A limit of 0 means no limit
    pub fn new(limit: u64) -> Self {
        PacketBudget {
            remaining: (limit > 0).then_some(limit),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    fn consume(&mut self) {
        if let Some(r) = self.remaining.as_mut() {
            *r = r.saturating_sub(1);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub packets: u64,
    pub bytes: u64,
    /// Loops that went through the whole capture
    pub loops: u32,
    /// Whether the replay has been interrupted
    pub cancelled: bool,
}

enum LoopEnd {
    /// End of the capture, with the number of packets sent
    Eof(u64),
    LimitReached,
    Cancelled,
}

/// Send the content of a capture, once or several times, paced as configured.
///
/// `running` is checked before each packet: once it is false, the replay stops.
pub fn replay(
    config: &ReplayConfig,
    sender: &mut impl FrameSender,
    strategy: &impl WaitStrategy,
    running: &AtomicBool,
) -> Result<ReplaySummary> {
    config.validate()?;
    log::info!(
        "Replaying {} on {} ({:?}, loop={}, limit={})",
        config.input.display(),
        config.interface,
        config.pacing,
        config.loop_count,
        config.limit
    );
    let mut budget = PacketBudget::new(config.limit);
    let mut summary = ReplaySummary::default();
    // only used for the final summary, never ticked
    let mut session = ReplayStats::new(Duration::ZERO, Instant::now());

    while config.loop_count == 0 || summary.loops < config.loop_count {
        if budget.exhausted() {
            break;
        }
        let number = summary.loops + 1;
        match budget.remaining() {
            Some(left) => log::debug!("Starting loop {number} ({left} packets left)"),
            None => log::debug!("Starting loop {number}"),
        }
        let end = replay_once(
            config,
            sender,
            strategy,
            &mut budget,
            running,
            &mut session,
            &mut summary,
        )?;
        match end {
            LoopEnd::Eof(0) if config.loop_count == 0 => {
                log::warn!("{} contains no packet", config.input.display());
                summary.loops += 1;
                break;
            }
            LoopEnd::Eof(_) => summary.loops += 1,
            LoopEnd::LimitReached => {
                log::debug!("Packet limit reached");
                break;
            }
            LoopEnd::Cancelled => {
                log::warn!("Replay interrupted");
                summary.cancelled = true;
                break;
            }
        }
    }

    let now = Instant::now();
    log::info!(
        "{} packets sent in {:.2}s ({}), {} complete loop(s)",
        session.packets(),
        session.elapsed(now).as_secs_f64(),
        format_throughput(session.average_mbps(now)),
        summary.loops
    );
    Ok(summary)
}

/// Go through the capture once. Pacing and statistics are anchored on the first packet.
fn replay_once(
    config: &ReplayConfig,
    sender: &mut impl FrameSender,
    strategy: &impl WaitStrategy,
    budget: &mut PacketBudget,
    running: &AtomicBool,
    session: &mut ReplayStats,
    summary: &mut ReplaySummary,
) -> Result<LoopEnd> {
    // the file is opened again for each loop
    let reader = open_capture(&config.input)?;
    let mut state: Option<(LoopProgress, ReplayStats)> = None;

    for record in reader {
        let record = record?;
        if !running.load(Ordering::Relaxed) {
            return Ok(LoopEnd::Cancelled);
        }
        let (progress, stats) = state.get_or_insert_with(|| {
            let now = Instant::now();
            (
                LoopProgress::new(now, record.timestamp),
                ReplayStats::new(config.stats_interval, now),
            )
        });

        let deadline = config.pacing.deadline(progress, record.timestamp);
        log::trace!("Packet {} due at {:?}", progress.packets, deadline - progress.loop_start);
        strategy.wait_until(deadline);
        sender.send(&record.data)?;

        progress.sent(record.data.len());
        stats.increase(record.bits());
        session.increase(record.bits());
        budget.consume();
        summary.packets += 1;
        summary.bytes += record.data.len() as u64;

        if let Some(report) = stats.tick(Instant::now()) {
            log::info!("{report}");
        }
        // stop right away, the next record may not even be readable
        if budget.exhausted() {
            return Ok(LoopEnd::LimitReached);
        }
    }
    Ok(LoopEnd::Eof(
        state.map(|(progress, _)| progress.packets).unwrap_or_default(),
    ))
}
