use crate::error::BudgetError;
use crate::structs::*;

use pnet_packet::ethernet::{EtherTypes, MutableEthernetPacket};
use pnet_packet::ip::IpNextHeaderProtocols;
use pnet_packet::ipv4::{self, MutableIpv4Packet};
use pnet_packet::tcp::{self, MutableTcpPacket, TcpFlags, TcpOption};
use rand_core::RngCore;

pub const SRC_PORT: u16 = 3372;
pub const DST_PORT: u16 = 80;
pub const SEQUENCE: u32 = 0x38affe13;
pub const WINDOW: u16 = 8760;
pub const TTL: u8 = 128;
pub const MSS: u16 = 1460;

const ETHERNET_HEADER_LEN: usize = 14;
const IPV4_HEADER_LEN: usize = 20;
// MSS (4) + NOP (1) + NOP (1) + SACK permitted (2)
const TCP_OPTIONS_LEN: usize = 8;
const TCP_HEADER_LEN: usize = 20 + TCP_OPTIONS_LEN;

/// Length of a SYN frame without payload
pub const SYN_FRAME_LEN: usize = ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + TCP_HEADER_LEN;

/// Largest payload such that the frame fits in the snapshot length and in the IPv4 total length
pub const MAX_PAYLOAD_LEN: usize = crate::export::SNAPLEN as usize - SYN_FRAME_LEN;

fn setup_ethernet_frame(packet: &mut [u8], src: &Host, dst: &Host) {
    // the size is already computed, it cannot fail
    let mut eth_packet = MutableEthernetPacket::new(packet).unwrap();
    eth_packet.set_ethertype(EtherTypes::Ipv4);
    eth_packet.set_source(src.mac);
    eth_packet.set_destination(dst.mac);
}

fn setup_ip_packet(packet: &mut [u8], src: &Host, dst: &Host) {
    let len = packet.len();
    let mut ipv4_packet = MutableIpv4Packet::new(packet).unwrap();
    ipv4_packet.set_version(4);
    ipv4_packet.set_header_length((IPV4_HEADER_LEN / 4) as u8);
    ipv4_packet.set_total_length(len as u16);
    ipv4_packet.set_ttl(TTL);
    ipv4_packet.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
    ipv4_packet.set_source(src.ip);
    ipv4_packet.set_destination(dst.ip);
    ipv4_packet.set_checksum(ipv4::checksum(&ipv4_packet.to_immutable()));
}

fn setup_tcp_packet(packet: &mut [u8], src: &Host, dst: &Host, payload: &[u8]) {
    let mut tcp_packet = MutableTcpPacket::new(packet).unwrap();
    tcp_packet.set_source(SRC_PORT);
    tcp_packet.set_destination(DST_PORT);
    tcp_packet.set_sequence(SEQUENCE);
    tcp_packet.set_acknowledgement(0);
    tcp_packet.set_flags(TcpFlags::SYN);
    tcp_packet.set_window(WINDOW);
    // the data offset must be set before the options so the payload lands after them
    tcp_packet.set_data_offset((TCP_HEADER_LEN / 4) as u8);
    tcp_packet.set_options(&[
        TcpOption::mss(MSS),
        TcpOption::nop(),
        TcpOption::nop(),
        TcpOption::sack_perm(),
    ]);
    if !payload.is_empty() {
        tcp_packet.set_payload(payload);
    }
    tcp_packet.set_checksum(tcp::ipv4_checksum(
        &tcp_packet.to_immutable(),
        &src.ip,
        &dst.ip,
    ));
}

/// Build one Ethernet/IPv4/TCP SYN frame from `src` to `dst`, followed by `payload_len` random
/// bytes. Checksums are computed over the assembled frame.
pub fn build_syn_frame(
    rng: &mut impl RngCore,
    src: &Host,
    dst: &Host,
    payload_len: usize,
) -> Result<Vec<u8>, BudgetError> {
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(BudgetError::PaddingOverflow {
            padding: payload_len as u64,
            max: MAX_PAYLOAD_LEN as u64,
        });
    }
    let mut payload = vec![0; payload_len];
    rng.fill_bytes(&mut payload);

    let ip_start = ETHERNET_HEADER_LEN;
    let tcp_start = ip_start + IPV4_HEADER_LEN;
    let mut frame = vec![0; SYN_FRAME_LEN + payload_len];
    setup_ethernet_frame(&mut frame, src, dst);
    setup_ip_packet(&mut frame[ip_start..], src, dst);
    setup_tcp_packet(&mut frame[tcp_start..], src, dst, &payload);
    Ok(frame)
}

/// Build the frame of a flow, oriented according to its direction
pub fn build_flow_frame(
    rng: &mut impl RngCore,
    internal: &Host,
    external: &Host,
    direction: Direction,
    payload_len: usize,
) -> Result<Vec<u8>, BudgetError> {
    let (src, dst) = direction.orient(internal, external);
    build_syn_frame(rng, src, dst, payload_len)
}
