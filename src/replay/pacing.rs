use super::config::Pacing;

use std::thread;
use std::time::{Duration, Instant};

// keeps absurdly low rates from overflowing the deadline
const MAX_OFFSET_SECS: f64 = u32::MAX as f64;

/// What has been sent since the current loop started
#[derive(Debug, Clone, Copy)]
pub struct LoopProgress {
    pub loop_start: Instant,
    /// Capture timestamp of the first packet of the loop
    pub base_ts: Duration,
    pub bits: u64,
    pub packets: u64,
}

impl LoopProgress {
    pub fn new(loop_start: Instant, base_ts: Duration) -> Self {
        LoopProgress {
            loop_start,
            base_ts,
            bits: 0,
            packets: 0,
        }
    }

    pub fn sent(&mut self, bytes: usize) {
        self.bits += bytes as u64 * 8;
        self.packets += 1;
    }
}

fn after(start: Instant, secs: f64) -> Instant {
    start + Duration::from_secs_f64(secs.clamp(0., MAX_OFFSET_SECS))
}

impl Pacing {
    /// When the packet captured at `ts` is due. Only depends on the progress of the loop, so late
    /// sends are caught up on the following packets.
    pub fn deadline(&self, progress: &LoopProgress, ts: Duration) -> Instant {
        match self {
            // timestamps going backwards are due immediately
            Pacing::Timestamp => progress.loop_start + ts.saturating_sub(progress.base_ts),
            Pacing::Mbps(mbps) => after(progress.loop_start, progress.bits as f64 / (mbps * 1e6)),
            Pacing::Pps(pps) => after(progress.loop_start, progress.packets as f64 / pps),
        }
    }
}

/// How to wait until a deadline
pub trait WaitStrategy {
    fn wait_until(&self, deadline: Instant);
}

/// Sleep while the deadline is far, then spin. Sleeping is cheap but imprecise, spinning is
/// precise but burns a core.
#[derive(Debug, Clone, Copy)]
pub struct HybridSpin {
    /// Above this remaining time, the thread sleeps
    pub spin_threshold: Duration,
    /// How early to wake up before the deadline
    pub wake_margin: Duration,
}

impl Default for HybridSpin {
    fn default() -> Self {
        HybridSpin {
            spin_threshold: Duration::from_micros(150),
            wake_margin: Duration::from_micros(100),
        }
    }
}

impl WaitStrategy for HybridSpin {
    fn wait_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            let remaining = deadline - now;
            if remaining > self.spin_threshold {
                thread::sleep(remaining.saturating_sub(self.wake_margin));
            } else {
                std::hint::spin_loop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_deadline() {
        let t0 = Instant::now();
        let progress = LoopProgress::new(t0, Duration::from_secs(100));
        assert_eq!(
            Pacing::Timestamp.deadline(&progress, Duration::from_millis(100_250)),
            t0 + Duration::from_millis(250)
        );
        assert_eq!(Pacing::Timestamp.deadline(&progress, Duration::from_secs(99)), t0);
    }

    #[test]
    fn test_rate_deadlines() {
        let t0 = Instant::now();
        let mut progress = LoopProgress::new(t0, Duration::ZERO);
        assert_eq!(Pacing::Pps(10.).deadline(&progress, Duration::ZERO), t0);
        for _ in 0..5 {
            progress.sent(1250);
        }
        // 5 packets of 10 kbit
        assert_eq!(
            Pacing::Pps(10.).deadline(&progress, Duration::ZERO),
            t0 + Duration::from_millis(500)
        );
        let offset = |ts| Pacing::Mbps(1.).deadline(&progress, ts).duration_since(t0);
        assert!((offset(Duration::ZERO).as_secs_f64() - 0.05).abs() < 1e-6);
        // the capture timestamps are ignored
        assert_eq!(offset(Duration::from_secs(1000)), offset(Duration::ZERO));
    }

    #[test]
    fn test_hybrid_spin_reaches_deadline() {
        let strategy = HybridSpin::default();
        for wait in [Duration::ZERO, Duration::from_micros(50), Duration::from_millis(3)] {
            let deadline = Instant::now() + wait;
            strategy.wait_until(deadline);
            assert!(Instant::now() >= deadline);
        }
    }
}
