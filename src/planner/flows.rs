use super::{write_frame, Budget};
use crate::error::Result;
use crate::export::CaptureSink;
use crate::hosts::HostPool;
use crate::structs::{Direction, FlowId};
use crate::tcp;

use rand::Rng;
use std::time::Duration;

/// Window used when the duration of a file is zero
const FALLBACK_DURATION: Duration = Duration::from_secs(10);

/// Map a flow index onto a (internal host, external host, direction) triple.
///
/// This is a bijection between [0, 2 * internal_count * external_count) and all the triples:
/// the first half enumerates the host pairs with the internal host as source, the second half
/// enumerates them again in the other direction.
pub fn flow_index_to_hosts(idx: u64, internal_count: usize, external_count: usize) -> FlowId {
    let pairs = internal_count as u64 * external_count as u64;
    let (direction, pair) = if idx < pairs {
        (Direction::InternalToExternal, idx)
    } else {
        (Direction::ExternalToInternal, idx - pairs)
    };
    FlowId {
        internal: (pair / external_count as u64) as usize,
        external: (pair % external_count as u64) as usize,
        direction,
    }
}

/// Write `flow_count` distinct flows of `packets_per_flow` packets each, flow after flow.
/// Packets are evenly spaced over the window and the very last one carries the padding.
#[allow(clippy::too_many_arguments)]
pub fn write_flows<S: CaptureSink, R: Rng>(
    sink: &mut S,
    rng: &mut R,
    internal: &HostPool,
    external: &HostPool,
    start: Duration,
    duration: Duration,
    flow_count: u64,
    packets_per_flow: u64,
    budget: Budget,
) -> Result<()> {
    let total_packets = budget.packets;
    let window = if duration.is_zero() {
        FALLBACK_DURATION
    } else {
        duration
    };
    let step = (window.as_micros() as u64 / total_packets.max(1)).max(1);
    log::debug!("{total_packets} packets, one every {step}µs");

    let mut packet_idx = 0;
    for flow_idx in 0..flow_count {
        let flow = flow_index_to_hosts(flow_idx, internal.len(), external.len());
        log::trace!("Flow {flow_idx}: {flow:?}");
        for _ in 0..packets_per_flow {
            let payload_len = if packet_idx + 1 == total_packets {
                budget.padding as usize
            } else {
                0
            };
            let frame = tcp::build_flow_frame(
                rng,
                internal.get(flow.internal),
                external.get(flow.external),
                flow.direction,
                payload_len,
            )?;
            let ts = start + Duration::from_micros(packet_idx * step);
            write_frame(sink, packet_idx, ts, &frame)?;
            packet_idx += 1;
        }
    }
    Ok(())
}
