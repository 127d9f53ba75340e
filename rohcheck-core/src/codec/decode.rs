//! ROHC packet type discrimination
//!
//! Helpers that look at the leading octets of a ROHC packet and tell what
//! kind of packet it is. They are profile-agnostic: an Uncompressed-profile
//! normal packet carrying IPv4 (first octet 0x45) classifies as UO-0.

use super::cid::{is_add_cid, read_large_cid};
use super::CodecError;
use crate::constants::rohc::{FEEDBACK, IR, IR_DYN, PADDING, SEGMENT};
use crate::types::CidMode;
use serde::Serialize;
use std::fmt;

/// Whether the octet starts a segment
pub const fn is_segment(byte: u8) -> bool {
    byte >> 1 == SEGMENT
}

/// Whether the octet is padding
pub const fn is_padding(byte: u8) -> bool {
    byte == PADDING
}

/// Whether the octet starts a feedback packet
pub const fn is_feedback(byte: u8) -> bool {
    byte >> 3 == FEEDBACK
}

/// Size of the feedback data following the feedback header
///
/// A code of 0 means the size is in the next octet (RFC 3095, 5.2.2).
pub fn feedback_size(data: &[u8]) -> Option<usize> {
    let code = data.first()? & 0x07;
    if code != 0 {
        Some(code as usize)
    } else {
        data.get(1).map(|&size| size as usize)
    }
}

/// Size of the feedback header, 1 or 2 octets
pub const fn feedback_header_size(byte: u8) -> usize {
    if byte & 0x07 == 0 {
        2
    } else {
        1
    }
}

/// Whether the packet is an IR packet
pub fn is_ir(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b >> 1 == IR)
}

/// Whether the packet is an IR-DYN packet
pub fn is_irdyn(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b == IR_DYN)
}

/// Whether the packet is a UO-0 packet
pub fn is_uo0(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b & 0x80 == 0)
}

/// Whether the packet is a UO-1* packet
pub fn is_uo1(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b >> 6 == 0x02)
}

/// Whether a UO-1 packet carries the T bit (UO-1-TS rather than UO-1-ID)
pub fn is_uo1_ts(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b & 0x20 != 0)
}

/// Whether the packet is a UOR-2* packet
pub fn is_uor2(data: &[u8]) -> bool {
    data.first().is_some_and(|&b| b >> 5 == 0x06)
}

/// Whether a UOR-2 packet carries the T bit (UOR-2-TS rather than UOR-2-ID)
pub fn is_uor2_ts(data: &[u8], large_cid_len: usize) -> bool {
    data.len() > 1 + large_cid_len && data[1 + large_cid_len] & 0x80 != 0
}

/// Kind of a ROHC packet, after padding, feedback and Add-CID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacketKind {
    /// Only feedback, no compressed packet
    FeedbackOnly,
    /// Segment of a larger packet
    Segment,
    /// IR
    Ir,
    /// IR-DYN
    IrDyn,
    /// UO-0
    Uo0,
    /// UO-1-ID
    Uo1Id,
    /// UO-1-TS
    Uo1Ts,
    /// UOR-2-ID
    Uor2Id,
    /// UOR-2-TS
    Uor2Ts,
    /// None of the above
    Unknown,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketKind::FeedbackOnly => "feedback-only",
            PacketKind::Segment => "segment",
            PacketKind::Ir => "IR",
            PacketKind::IrDyn => "IR-DYN",
            PacketKind::Uo0 => "UO-0",
            PacketKind::Uo1Id => "UO-1-ID",
            PacketKind::Uo1Ts => "UO-1-TS",
            PacketKind::Uor2Id => "UOR-2-ID",
            PacketKind::Uor2Ts => "UOR-2-TS",
            PacketKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A ROHC packet with its leading feedback separated out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framed<'a> {
    /// Feedback elements, headers removed
    pub feedback: Vec<&'a [u8]>,
    /// What follows the feedback, starting at the Add-CID or type octet
    pub packet: &'a [u8],
}

/// Skip padding and split off piggybacked feedback
pub fn strip_feedback(data: &[u8]) -> Result<Framed<'_>, CodecError> {
    let mut pos = 0;
    let mut feedback = Vec::new();

    while pos < data.len() {
        let byte = data[pos];
        if is_padding(byte) {
            pos += 1;
        } else if is_feedback(byte) {
            let size = feedback_size(&data[pos..]).ok_or(CodecError::Truncated)?;
            let start = pos + feedback_header_size(byte);
            let end = start + size;
            if size == 0 || end > data.len() {
                return Err(CodecError::Malformed(format!(
                    "feedback of {} bytes at offset {} overruns the {}-byte packet",
                    size,
                    pos,
                    data.len()
                )));
            }
            feedback.push(&data[start..end]);
            pos = end;
        } else {
            break;
        }
    }

    Ok(Framed {
        feedback,
        packet: &data[pos..],
    })
}

/// Classify a ROHC packet
pub fn classify(data: &[u8], cid_mode: CidMode) -> Result<PacketKind, CodecError> {
    let framed = strip_feedback(data)?;
    let mut packet = framed.packet;

    if packet.is_empty() {
        return Ok(PacketKind::FeedbackOnly);
    }

    if cid_mode == CidMode::Small && is_add_cid(packet[0]) {
        packet = &packet[1..];
        if packet.is_empty() {
            return Err(CodecError::Truncated);
        }
    }

    let large_cid_len = match cid_mode {
        CidMode::Large => read_large_cid(&packet[1..]).map_or(0, |(_, used)| used),
        CidMode::Small => 0,
    };

    let kind = if is_segment(packet[0]) {
        PacketKind::Segment
    } else if is_ir(packet) {
        PacketKind::Ir
    } else if is_irdyn(packet) {
        PacketKind::IrDyn
    } else if is_uor2(packet) {
        if is_uor2_ts(packet, large_cid_len) {
            PacketKind::Uor2Ts
        } else {
            PacketKind::Uor2Id
        }
    } else if is_uo1(packet) {
        if is_uo1_ts(packet) {
            PacketKind::Uo1Ts
        } else {
            PacketKind::Uo1Id
        }
    } else if is_uo0(packet) {
        PacketKind::Uo0
    } else {
        PacketKind::Unknown
    };

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octet_discriminators() {
        assert!(is_segment(0xFE));
        assert!(is_segment(0xFF));
        assert!(is_padding(0xE0));
        assert!(is_feedback(0xF0));
        assert!(is_feedback(0xF7));
        assert!(!is_feedback(0xF8));
        assert!(is_ir(&[0xFC]));
        assert!(is_ir(&[0xFD]));
        assert!(!is_ir(&[]));
        assert!(is_irdyn(&[0xF8]));
        assert!(is_uo0(&[0x45]));
        assert!(is_uo1(&[0xA0]));
        assert!(is_uo1_ts(&[0xA0]));
        assert!(!is_uo1_ts(&[0x80]));
        assert!(is_uor2(&[0xC0]));
        assert!(is_uor2_ts(&[0xC0, 0x80], 0));
        assert!(!is_uor2_ts(&[0xC0], 0));
    }

    #[test]
    fn feedback_sizes() {
        assert_eq!(feedback_size(&[0xF1]), Some(1));
        assert_eq!(feedback_header_size(0xF1), 1);
        assert_eq!(feedback_size(&[0xF0, 12]), Some(12));
        assert_eq!(feedback_header_size(0xF0), 2);
        assert_eq!(feedback_size(&[0xF0]), None);
    }

    #[test]
    fn strip_feedback_splits_elements() {
        let data = [0xE0, 0xF2, 0xE3, 0x00, 0xF1, 0x00, 0x45, 0x00];
        let framed = strip_feedback(&data).unwrap();
        assert_eq!(framed.feedback, vec![&[0xE3, 0x00][..], &[0x00][..]]);
        assert_eq!(framed.packet, &[0x45, 0x00]);
    }

    #[test]
    fn strip_feedback_rejects_overrun() {
        assert!(strip_feedback(&[0xF5, 0x00]).is_err());
    }

    #[test]
    fn classify_packets() {
        assert_eq!(classify(&[0xFC, 0x00, 0x12], CidMode::Small).unwrap(), PacketKind::Ir);
        assert_eq!(classify(&[0xE2, 0xFC, 0x00], CidMode::Small).unwrap(), PacketKind::Ir);
        assert_eq!(classify(&[0x45, 0x00], CidMode::Small).unwrap(), PacketKind::Uo0);
        assert_eq!(classify(&[0xF1, 0x00], CidMode::Small).unwrap(), PacketKind::FeedbackOnly);
        assert_eq!(classify(&[0xC0, 0x05, 0x80], CidMode::Large).unwrap(), PacketKind::Uor2Ts);
        assert_eq!(classify(&[0xFA], CidMode::Small).unwrap(), PacketKind::Unknown);
    }
}
