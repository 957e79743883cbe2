use super::{write_frame, Budget};
use crate::error::Result;
use crate::export::CaptureSink;
use crate::hosts::HostPool;
use crate::structs::Direction;
use crate::tcp;

use rand::Rng;
use std::time::Duration;

const USEC_PER_SEC: u64 = 1_000_000;

/// Timestamps of the random mode: a whole second plus a microsecond offset.
///
/// The gap before the next packet is drawn uniformly in [0, inter], where inter spreads the
/// seconds left before the end of the window over the packets left to write. The window being
/// counted in whole seconds, the packets tend to gather at its beginning.
struct Clock {
    sec: u64,
    usec: u64,
    end_sec: u64,
}

impl Clock {
    fn new(start: Duration, duration: Duration) -> Self {
        let sec = start.as_secs();
        Clock {
            sec,
            usec: 0,
            end_sec: (sec + duration.as_secs()).saturating_sub(1),
        }
    }

    fn now(&self) -> Duration {
        Duration::from_secs(self.sec) + Duration::from_micros(self.usec)
    }

    /// Move forward, knowing `left` packets are still to be written (the current one included)
    fn advance(&mut self, rng: &mut impl Rng, left: u64) {
        let remaining = self.end_sec.saturating_sub(self.sec).max(1);
        let inter = ((remaining as f64 / left as f64) * USEC_PER_SEC as f64) as u64;
        self.usec += rng.gen_range(0..=inter.max(1));
        self.sec += self.usec / USEC_PER_SEC;
        self.usec %= USEC_PER_SEC;
    }
}

/// Write `budget.packets` SYN frames between random pairs of hosts, in either direction. The
/// last frame carries the padding of the budget.
pub fn write_random<S: CaptureSink, R: Rng>(
    sink: &mut S,
    rng: &mut R,
    internal: &HostPool,
    external: &HostPool,
    start: Duration,
    duration: Duration,
    budget: Budget,
) -> Result<()> {
    let mut clock = Clock::new(start, duration);
    for i in 0..budget.packets {
        let payload_len = if i + 1 == budget.packets {
            budget.padding as usize
        } else {
            0
        };
        let direction = Direction::from_bit(rng.gen_bool(0.5));
        let (src, dst) = match direction {
            Direction::InternalToExternal => (*internal.sample(rng), *external.sample(rng)),
            Direction::ExternalToInternal => (*external.sample(rng), *internal.sample(rng)),
        };
        let frame = tcp::build_syn_frame(rng, &src, &dst, payload_len)?;
        write_frame(sink, i, clock.now(), &frame)?;
        clock.advance(rng, budget.packets - i);
    }
    Ok(())
}
