use std::fmt;
use std::time::{Duration, Instant};

/// Throughput in a human-friendly unit
pub fn format_throughput(mbps: f64) -> String {
    if mbps < 1. {
        format!("{:.2} kbps", mbps * 1000.)
    } else if mbps < 1000. {
        format!("{:.2} Mbps", mbps)
    } else {
        format!("{:.2} Gbps", mbps / 1000.)
    }
}

/// Activity over one reporting interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalReport {
    pub mbps: f64,
    pub pps: f64,
    pub total_packets: u64,
    pub elapsed: Duration,
}

impl fmt::Display for IntervalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:.0} pps | total packets: {} | elapsed: {:.1}s",
            format_throughput(self.mbps),
            self.pps,
            self.total_packets,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Counters of a replay session. Reports are produced by `tick` once per interval.
#[derive(Debug)]
pub struct ReplayStats {
    start_time: Instant,
    interval: Duration,
    last_report: Instant,
    packets_counter: u64,
    bits_counter: u64,
    interval_packets: u64,
    interval_bits: u64,
}

impl ReplayStats {
    pub fn new(interval: Duration, now: Instant) -> Self {
        ReplayStats {
            start_time: now,
            interval,
            last_report: now,
            packets_counter: 0,
            bits_counter: 0,
            interval_packets: 0,
            interval_bits: 0,
        }
    }

    pub fn increase(&mut self, bits: u64) {
        self.packets_counter += 1;
        self.bits_counter += bits;
        self.interval_packets += 1;
        self.interval_bits += bits;
    }

    pub fn packets(&self) -> u64 {
        self.packets_counter
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start_time)
    }

    /// Produce a report if the interval has elapsed since the last one, and reset the interval
    /// counters
    pub fn tick(&mut self, now: Instant) -> Option<IntervalReport> {
        let span = now.saturating_duration_since(self.last_report);
        if self.interval.is_zero() || span < self.interval {
            return None;
        }
        let secs = span.as_secs_f64();
        let report = IntervalReport {
            mbps: self.interval_bits as f64 / secs / 1_000_000.,
            pps: self.interval_packets as f64 / secs,
            total_packets: self.packets_counter,
            elapsed: self.elapsed(now),
        };
        self.last_report = now;
        self.interval_packets = 0;
        self.interval_bits = 0;
        Some(report)
    }

    /// Average throughput since the beginning, in Mbps
    pub fn average_mbps(&self, now: Instant) -> f64 {
        let secs = self.elapsed(now).as_secs_f64();
        if secs > 0. {
            self.bits_counter as f64 / secs / 1_000_000.
        } else {
            0.
        }
    }
}
