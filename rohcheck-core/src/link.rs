//! Link-layer framing: header lengths, Ethernet padding, harness tagging

use crate::constants::{
    ETHER_FRAME_MIN_LEN, ETHER_HDR_LEN, HARNESS_LINK_TAG, IPV4_MIN_HDR_LEN, IPV6_HDR_LEN,
    LINUX_COOKED_HDR_LEN,
};
use crate::types::LinkType;
use bytes::{BufMut, Bytes, BytesMut};

/// Number of bytes to strip before the IP packet
pub const fn header_length(link_type: LinkType) -> usize {
    match link_type {
        LinkType::Ethernet => ETHER_HDR_LEN,
        LinkType::LinuxCooked => LINUX_COOKED_HDR_LEN,
        LinkType::Raw => 0,
    }
}

/// Length of the IP packet carried by `raw`, padding excluded
///
/// Only minimum-size Ethernet frames can carry padding. For those the IP
/// length fields decide where the packet ends; any other frame keeps its
/// whole captured payload.
pub fn effective_payload_length(link_type: LinkType, raw: &[u8]) -> usize {
    let link_len = header_length(link_type);
    let captured = raw.len().saturating_sub(link_len);

    if link_type != LinkType::Ethernet || raw.len() != ETHER_FRAME_MIN_LEN {
        return captured;
    }

    match ip_total_length(&raw[link_len..]) {
        Some(total) if total < captured => total,
        _ => captured,
    }
}

/// Total length announced by an IPv4 or IPv6 header
fn ip_total_length(packet: &[u8]) -> Option<usize> {
    let version = packet.first()? >> 4;
    match version {
        4 if packet.len() >= IPV4_MIN_HDR_LEN => {
            Some(u16::from_be_bytes([packet[2], packet[3]]) as usize)
        }
        6 if packet.len() >= 6 => {
            Some(IPV6_HDR_LEN + u16::from_be_bytes([packet[4], packet[5]]) as usize)
        }
        _ => None,
    }
}

/// Build an output frame carrying `packet` behind a copy of `source_header`
///
/// The protocol field of Ethernet and cooked headers is replaced by the
/// harness tag so the written capture is never decoded as IP.
pub fn encapsulate(link_type: LinkType, source_header: &[u8], packet: &[u8]) -> Bytes {
    let link_len = header_length(link_type);
    let mut buf = BytesMut::with_capacity(link_len + packet.len());
    buf.put_slice(&source_header[..link_len.min(source_header.len())]);
    buf.resize(link_len, 0);

    if link_len >= 2 {
        buf[link_len - 2..link_len].copy_from_slice(&HARNESS_LINK_TAG);
    }

    buf.put_slice(packet);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethernet_frame(ip: &[u8], total: usize) -> Vec<u8> {
        let mut frame = vec![0u8; ETHER_HDR_LEN];
        frame[12] = 0x08;
        frame.extend_from_slice(ip);
        frame.resize(total, 0);
        frame
    }

    fn ipv4_header(total_len: u16) -> Vec<u8> {
        let mut ip = vec![0u8; 20];
        ip[0] = 0x45;
        ip[2..4].copy_from_slice(&total_len.to_be_bytes());
        ip
    }

    #[test]
    fn header_lengths() {
        assert_eq!(header_length(LinkType::Ethernet), 14);
        assert_eq!(header_length(LinkType::LinuxCooked), 16);
        assert_eq!(header_length(LinkType::Raw), 0);
    }

    #[test]
    fn trims_ipv4_padding_on_minimum_frames() {
        let frame = ethernet_frame(&ipv4_header(28), 60);
        assert_eq!(effective_payload_length(LinkType::Ethernet, &frame), 28);
    }

    #[test]
    fn trims_ipv6_padding_on_minimum_frames() {
        let mut ip = vec![0u8; 40];
        ip[0] = 0x60;
        ip[4..6].copy_from_slice(&2u16.to_be_bytes());
        let frame = ethernet_frame(&ip, 60);
        assert_eq!(effective_payload_length(LinkType::Ethernet, &frame), 42);
    }

    #[test]
    fn keeps_payload_of_larger_frames() {
        let frame = ethernet_frame(&ipv4_header(28), 61);
        assert_eq!(effective_payload_length(LinkType::Ethernet, &frame), 47);
    }

    #[test]
    fn keeps_payload_when_ip_length_is_larger() {
        let frame = ethernet_frame(&ipv4_header(100), 60);
        assert_eq!(effective_payload_length(LinkType::Ethernet, &frame), 46);
    }

    #[test]
    fn raw_links_never_trim() {
        let mut frame = ipv4_header(20);
        frame.resize(60, 0);
        assert_eq!(effective_payload_length(LinkType::Raw, &frame), 60);
    }

    #[test]
    fn encapsulate_tags_ethernet_type() {
        let header = [0xAAu8; ETHER_HDR_LEN];
        let out = encapsulate(LinkType::Ethernet, &header, &[1, 2, 3]);
        assert_eq!(out.len(), 17);
        assert_eq!(&out[..12], &[0xAA; 12]);
        assert_eq!(&out[12..14], &HARNESS_LINK_TAG);
        assert_eq!(&out[14..], &[1, 2, 3]);
    }

    #[test]
    fn encapsulate_tags_cooked_protocol() {
        let header = [0x11u8; LINUX_COOKED_HDR_LEN];
        let out = encapsulate(LinkType::LinuxCooked, &header, &[9]);
        assert_eq!(&out[14..16], &HARNESS_LINK_TAG);
        assert_eq!(out[16], 9);
    }

    #[test]
    fn encapsulate_raw_is_packet_only() {
        let out = encapsulate(LinkType::Raw, &[], &[7, 8]);
        assert_eq!(&out[..], &[7, 8]);
    }
}
