//! ROHC Uncompressed profile (profile 0x0000, RFC 3095 section 5.10)
//!
//! IR packets carry the whole IP packet behind a short header with a CRC-8.
//! Once the context is acknowledged (or after a few IRs), Normal packets
//! carry the IP packet as is, with the large CID inserted after its first
//! octet. Feedback travels through a [`FeedbackChannel`].

use super::cid::{
    add_cid_octet, feedback_element, is_add_cid, parse_feedback_element, put_large_cid,
    read_large_cid,
};
use super::crc::crc8;
use super::decode::{is_ir, is_irdyn, is_segment, strip_feedback};
use super::{CodecError, Compressor, Decompressor, FeedbackChannel};
use crate::constants::rohc::{ADD_CID, FEEDBACK_ACK, PROFILE_UNCOMPRESSED};
use crate::constants::{
    IPV4_MIN_HDR_LEN, IPV6_HDR_LEN, IR_REPETITIONS, LARGE_CID_MAX, MAX_CONTEXTS_LIMIT,
    MAX_ROHC_SIZE, SMALL_CID_MAX,
};
use crate::types::CidMode;
use bytes::{BufMut, Bytes, BytesMut};
use hashbrown::{HashMap, HashSet};
use std::fmt::Write;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// IR packet type octet (x bit cleared)
const IR_TYPE: u8 = 0xFC;

/// Worst-case header bytes added in front of the IP packet
const HEADER_ROOM: usize = 6;

/// Feedback packet type with an explicit size octet
const FEEDBACK_TYPE: u8 = 0xF0;

fn max_cid_for(cid_mode: CidMode, max_contexts: usize) -> u16 {
    let limit = match cid_mode {
        CidMode::Small => SMALL_CID_MAX,
        CidMode::Large => LARGE_CID_MAX,
    };
    (max_contexts.saturating_sub(1)).min(limit as usize) as u16
}

/// Flow identity: IP version plus addresses, or the leading octet otherwise
fn flow_key(packet: &[u8]) -> Vec<u8> {
    match packet[0] >> 4 {
        4 if packet.len() >= IPV4_MIN_HDR_LEN => {
            let mut key = vec![4];
            key.extend_from_slice(&packet[12..20]);
            key
        }
        6 if packet.len() >= IPV6_HDR_LEN => {
            let mut key = vec![6];
            key.extend_from_slice(&packet[8..40]);
            key
        }
        _ => vec![0],
    }
}

#[derive(Debug)]
struct CompressorContext {
    cid: u16,
    ir_sent: u32,
    acked: bool,
    last_used: u64,
}

impl CompressorContext {
    fn new(cid: u16) -> Self {
        Self {
            cid,
            ir_sent: 0,
            acked: false,
            last_used: 0,
        }
    }
}

#[derive(Debug, Default)]
struct CompressorStats {
    packets: u64,
    ir_packets: u64,
    normal_packets: u64,
    bytes_in: u64,
    bytes_out: u64,
    feedback_piggybacked: u64,
    feedback_received: u64,
    acks: u64,
    contexts_recycled: u64,
}

/// Uncompressed-profile compressor
#[derive(Debug)]
pub struct UncompressedCompressor {
    id: u8,
    cid_mode: CidMode,
    max_contexts: usize,
    contexts: HashMap<Vec<u8>, CompressorContext>,
    feedback: FeedbackChannel,
    clock: u64,
    stats: CompressorStats,
}

impl UncompressedCompressor {
    /// Create a compressor with at most `max_contexts` contexts
    ///
    /// Returns `None` when `max_contexts` is outside 1..=16384.
    pub fn new(
        id: u8,
        cid_mode: CidMode,
        max_contexts: usize,
        feedback: FeedbackChannel,
    ) -> Option<Self> {
        if !(1..=MAX_CONTEXTS_LIMIT).contains(&max_contexts) {
            return None;
        }

        Some(Self {
            id,
            cid_mode,
            max_contexts,
            contexts: HashMap::new(),
            feedback,
            clock: 0,
            stats: CompressorStats::default(),
        })
    }

    /// Largest CID this compressor assigns
    pub fn max_cid(&self) -> u16 {
        max_cid_for(self.cid_mode, self.max_contexts)
    }

    /// Number of contexts in use
    pub fn contexts_in_use(&self) -> usize {
        self.contexts.len()
    }

    fn apply_feedback(&mut self) {
        for element in self.feedback.take_inbound() {
            self.stats.feedback_received += 1;

            let Some((cid, data)) = parse_feedback_element(self.cid_mode, &element) else {
                continue;
            };

            if data.first() == Some(&FEEDBACK_ACK) {
                if let Some(context) = self.contexts.values_mut().find(|c| c.cid == cid) {
                    context.acked = true;
                    self.stats.acks += 1;

                    #[cfg(feature = "logging")]
                    trace!("compressor {}: context {} acknowledged", self.id, cid);
                }
            }
        }
    }

    fn allocate_cid(&mut self) -> u16 {
        let max_cid = self.max_cid();

        if self.contexts.len() <= max_cid as usize {
            let used: HashSet<u16> = self.contexts.values().map(|c| c.cid).collect();
            if let Some(cid) = (0..=max_cid).find(|cid| !used.contains(cid)) {
                return cid;
            }
        }

        let oldest = self
            .contexts
            .iter()
            .min_by_key(|(_, context)| context.last_used)
            .map(|(key, context)| (key.clone(), context.cid));

        match oldest {
            Some((key, cid)) => {
                self.contexts.remove(&key);
                self.stats.contexts_recycled += 1;

                #[cfg(feature = "logging")]
                debug!("compressor {}: recycling context {}", self.id, cid);

                cid
            }
            None => 0,
        }
    }

    fn put_feedback(&mut self, out: &mut BytesMut) {
        for element in self.feedback.take_outbound() {
            if element.len() <= 7 {
                out.put_u8(FEEDBACK_TYPE | element.len() as u8);
            } else {
                out.put_u8(FEEDBACK_TYPE);
                out.put_u8(element.len() as u8);
            }
            out.put_slice(&element);
            self.stats.feedback_piggybacked += 1;
        }
    }
}

impl Compressor for UncompressedCompressor {
    fn compress(&mut self, packet: &[u8]) -> Result<Bytes, CodecError> {
        if packet.is_empty() {
            return Err(CodecError::EmptyPacket);
        }

        if packet.len() + HEADER_ROOM > MAX_ROHC_SIZE {
            return Err(CodecError::PacketTooLarge {
                size: packet.len(),
                max: MAX_ROHC_SIZE - HEADER_ROOM,
            });
        }

        self.apply_feedback();

        self.clock += 1;
        let clock = self.clock;
        let key = flow_key(packet);
        let cid = match self.contexts.get(&key) {
            Some(context) => context.cid,
            None => self.allocate_cid(),
        };
        let context = self
            .contexts
            .entry(key)
            .or_insert_with(|| CompressorContext::new(cid));
        context.last_used = clock;

        // A first octet in the 0xE0..=0xFF range would be read back as a
        // ROHC type octet, so such packets always travel in IR packets.
        let send_ir = (!context.acked && context.ir_sent < IR_REPETITIONS) || packet[0] >= ADD_CID;
        if send_ir {
            context.ir_sent += 1;
        }

        let mut out = BytesMut::with_capacity(packet.len() + HEADER_ROOM + 8);
        self.put_feedback(&mut out);

        let small_cid = self.cid_mode == CidMode::Small && cid != 0;
        let large_cid = self.cid_mode == CidMode::Large;

        if send_ir {
            let start = out.len();
            if small_cid {
                out.put_u8(add_cid_octet(cid));
            }
            out.put_u8(IR_TYPE);
            if large_cid {
                put_large_cid(&mut out, cid);
            }
            out.put_u8(PROFILE_UNCOMPRESSED);
            let crc = crc8(&out[start..]);
            out.put_u8(crc);
            out.put_slice(packet);
            self.stats.ir_packets += 1;
        } else {
            if small_cid {
                out.put_u8(add_cid_octet(cid));
            }
            out.put_u8(packet[0]);
            if large_cid {
                put_large_cid(&mut out, cid);
            }
            out.put_slice(&packet[1..]);
            self.stats.normal_packets += 1;
        }

        self.stats.packets += 1;
        self.stats.bytes_in += packet.len() as u64;
        self.stats.bytes_out += out.len() as u64;

        #[cfg(feature = "logging")]
        trace!(
            "compressor {}: {} bytes -> {} bytes on CID {} ({})",
            self.id,
            packet.len(),
            out.len(),
            cid,
            if send_ir { "IR" } else { "normal" }
        );

        Ok(out.freeze())
    }

    fn set_cid_mode(&mut self, mode: CidMode) {
        if mode != self.cid_mode {
            self.contexts.clear();
        }
        self.cid_mode = mode;
    }

    fn statistics(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        let _ = writeln!(out, "<compressor id=\"{}\">", self.id);
        let _ = writeln!(out, "\t<profile>uncompressed</profile>");
        let _ = writeln!(out, "\t<cid_type>{}</cid_type>", self.cid_mode);
        let _ = writeln!(out, "\t<max_cid>{}</max_cid>", self.max_cid());
        let _ = writeln!(out, "\t<contexts_in_use>{}</contexts_in_use>", self.contexts.len());
        let _ = writeln!(out, "\t<contexts_recycled>{}</contexts_recycled>", s.contexts_recycled);
        let _ = writeln!(out, "\t<packets>{}</packets>", s.packets);
        let _ = writeln!(out, "\t<ir_packets>{}</ir_packets>", s.ir_packets);
        let _ = writeln!(out, "\t<normal_packets>{}</normal_packets>", s.normal_packets);
        let _ = writeln!(out, "\t<bytes_in>{}</bytes_in>", s.bytes_in);
        let _ = writeln!(out, "\t<bytes_out>{}</bytes_out>", s.bytes_out);
        let _ = writeln!(out, "\t<feedback_piggybacked>{}</feedback_piggybacked>", s.feedback_piggybacked);
        let _ = writeln!(out, "\t<feedback_received>{}</feedback_received>", s.feedback_received);
        let _ = writeln!(out, "\t<acks>{}</acks>", s.acks);
        let _ = writeln!(out, "</compressor>");
        out
    }
}

#[derive(Debug, Default)]
struct DecompressorStats {
    packets: u64,
    ir_packets: u64,
    normal_packets: u64,
    failures: u64,
    feedback_sent: u64,
    feedback_forwarded: u64,
}

/// Uncompressed-profile decompressor
#[derive(Debug)]
pub struct UncompressedDecompressor {
    id: u8,
    max_contexts: usize,
    contexts: HashSet<u16>,
    feedback: FeedbackChannel,
    stats: DecompressorStats,
}

impl UncompressedDecompressor {
    /// Create a decompressor attached to the feedback channel of the
    /// compressor it sends its feedback through
    pub fn new(id: u8, max_contexts: usize, feedback: FeedbackChannel) -> Option<Self> {
        if !(1..=MAX_CONTEXTS_LIMIT).contains(&max_contexts) {
            return None;
        }

        Some(Self {
            id,
            max_contexts,
            contexts: HashSet::new(),
            feedback,
            stats: DecompressorStats::default(),
        })
    }

    fn decode(&mut self, packet: &[u8], cid_mode: CidMode) -> Result<Bytes, CodecError> {
        if packet.is_empty() {
            return Err(CodecError::EmptyPacket);
        }

        let framed = strip_feedback(packet)?;
        for element in framed.feedback {
            self.feedback.deliver(Bytes::copy_from_slice(element));
            self.stats.feedback_forwarded += 1;
        }

        let rohc = framed.packet;
        if rohc.is_empty() {
            return Err(CodecError::Malformed(
                "feedback-only packet carries no IP packet".into(),
            ));
        }

        let (mut cid, mut pos) = match cid_mode {
            CidMode::Small if is_add_cid(rohc[0]) => ((rohc[0] & 0x0F) as u16, 1),
            _ => (0, 0),
        };

        let type_octet = *rohc.get(pos).ok_or(CodecError::Truncated)?;
        pos += 1;
        let ir = is_ir(&[type_octet]);

        if is_segment(type_octet) {
            return Err(CodecError::UnsupportedPacket("segment".into()));
        }
        if is_irdyn(&[type_octet]) {
            return Err(CodecError::UnsupportedPacket("IR-DYN".into()));
        }
        if type_octet >= ADD_CID && !ir {
            return Err(CodecError::Malformed(format!(
                "unexpected type octet {:#04x}",
                type_octet
            )));
        }

        if cid_mode == CidMode::Large {
            let (large, used) = read_large_cid(&rohc[pos..]).ok_or(CodecError::Truncated)?;
            cid = large;
            pos += used;
        }

        let max = max_cid_for(cid_mode, self.max_contexts);
        if cid > max {
            return Err(CodecError::CidOutOfRange { cid, max });
        }

        if ir {
            let profile = *rohc.get(pos).ok_or(CodecError::Truncated)?;
            pos += 1;
            if profile != PROFILE_UNCOMPRESSED {
                return Err(CodecError::UnsupportedProfile(profile));
            }

            let expected = *rohc.get(pos).ok_or(CodecError::Truncated)?;
            let actual = crc8(&rohc[..pos]);
            if expected != actual {
                return Err(CodecError::CrcMismatch { expected, actual });
            }
            pos += 1;

            let ip = &rohc[pos..];
            if ip.is_empty() {
                return Err(CodecError::Truncated);
            }

            self.contexts.insert(cid);
            self.stats.ir_packets += 1;

            self.feedback
                .send(feedback_element(cid_mode, cid, FEEDBACK_ACK).freeze());
            self.stats.feedback_sent += 1;

            return Ok(Bytes::copy_from_slice(ip));
        }

        if !self.contexts.contains(&cid) {
            return Err(CodecError::UnknownContext(cid));
        }

        let mut out = BytesMut::with_capacity(rohc.len() - pos + 1);
        out.put_u8(type_octet);
        out.put_slice(&rohc[pos..]);
        self.stats.normal_packets += 1;
        Ok(out.freeze())
    }
}

impl Decompressor for UncompressedDecompressor {
    fn decompress(&mut self, packet: &[u8], cid_mode: CidMode) -> Result<Bytes, CodecError> {
        self.stats.packets += 1;
        let result = self.decode(packet, cid_mode);

        if let Err(_e) = &result {
            self.stats.failures += 1;

            #[cfg(feature = "logging")]
            debug!("decompressor {}: {}", self.id, _e);
        }

        result
    }

    fn statistics(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        let _ = writeln!(out, "<decompressor id=\"{}\">", self.id);
        let _ = writeln!(out, "\t<contexts>{}</contexts>", self.contexts.len());
        let _ = writeln!(out, "\t<packets>{}</packets>", s.packets);
        let _ = writeln!(out, "\t<ir_packets>{}</ir_packets>", s.ir_packets);
        let _ = writeln!(out, "\t<normal_packets>{}</normal_packets>", s.normal_packets);
        let _ = writeln!(out, "\t<failures>{}</failures>", s.failures);
        let _ = writeln!(out, "\t<feedback_sent>{}</feedback_sent>", s.feedback_sent);
        let _ = writeln!(out, "\t<feedback_forwarded>{}</feedback_forwarded>", s.feedback_forwarded);
        let _ = writeln!(out, "</decompressor>");
        out
    }
}
