//! Codec capabilities consumed by the pipeline, and the built-in ROHC codec
//!
//! The pipeline drives any [`Compressor`] / [`Decompressor`] pair. The
//! crate ships one implementation, the ROHC Uncompressed profile in
//! [`uncompressed`], so runs work without an external library.

pub mod cid;
pub mod crc;
pub mod decode;
pub mod feedback;
pub mod uncompressed;

use crate::error::HarnessError;
use crate::types::CidMode;
use bytes::Bytes;
use thiserror::Error;

pub use feedback::FeedbackChannel;
pub use uncompressed::{UncompressedCompressor, UncompressedDecompressor};

/// Errors reported by a codec for a single packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Nothing to compress or decompress
    #[error("empty packet")]
    EmptyPacket,

    /// Packet larger than the codec accepts
    #[error("packet of {size} bytes exceeds the {max}-byte limit")]
    PacketTooLarge {
        /// Size of the packet
        size: usize,
        /// Largest accepted size
        max: usize,
    },

    /// Packet ended before a mandatory field
    #[error("truncated ROHC packet")]
    Truncated,

    /// Packet structure not understood
    #[error("malformed ROHC packet: {0}")]
    Malformed(String),

    /// Packet type this codec does not handle
    #[error("unsupported ROHC packet type {0}")]
    UnsupportedPacket(String),

    /// IR for a profile this codec does not handle
    #[error("unsupported ROHC profile {0:#04x}")]
    UnsupportedProfile(u8),

    /// CID beyond what this decompressor accepts
    #[error("CID {cid} exceeds the maximum CID {max}")]
    CidOutOfRange {
        /// Received CID
        cid: u16,
        /// Largest accepted CID
        max: u16,
    },

    /// Compressed packet for a context never initialized by an IR
    #[error("no context for CID {0}")]
    UnknownContext(u16),

    /// Header CRC does not match
    #[error("CRC mismatch: expected {expected:#04x}, got {actual:#04x}")]
    CrcMismatch {
        /// CRC carried by the packet
        expected: u8,
        /// CRC computed over the received header
        actual: u8,
    },
}

/// Header compressor
pub trait Compressor {
    /// Compress one IP packet into one ROHC packet
    fn compress(&mut self, packet: &[u8]) -> Result<Bytes, CodecError>;

    /// Select the CID width of emitted packets
    fn set_cid_mode(&mut self, mode: CidMode);

    /// Human-readable counters
    fn statistics(&self) -> String;
}

/// Header decompressor
pub trait Decompressor {
    /// Decompress one ROHC packet into one IP packet
    fn decompress(&mut self, packet: &[u8], cid_mode: CidMode) -> Result<Bytes, CodecError>;

    /// Human-readable counters
    fn statistics(&self) -> String;
}

/// A compressor and the decompressor receiving its packets
#[derive(Debug)]
pub struct CodecPair<C, D> {
    /// Compressor of the flow
    pub compressor: C,
    /// Decompressor of the flow
    pub decompressor: D,
}

/// Build the two cross-wired Uncompressed-profile pairs of a run
///
/// Decompressor 1 is attached to compressor 2's feedback channel and
/// decompressor 2 to compressor 1's, so the feedback of each flow travels
/// on the packets of the other one. Both pairs exist before any packet is
/// compressed.
pub fn cross_wired_pairs(
    cid_mode: CidMode,
    max_contexts: usize,
) -> Result<
    [CodecPair<UncompressedCompressor, UncompressedDecompressor>; 2],
    HarnessError,
> {
    let channel1 = FeedbackChannel::new();
    let channel2 = FeedbackChannel::new();

    let compressor1 = UncompressedCompressor::new(1, cid_mode, max_contexts, channel1.clone())
        .ok_or_else(|| HarnessError::CodecAllocation("compressor 1".into()))?;
    let compressor2 = UncompressedCompressor::new(2, cid_mode, max_contexts, channel2.clone())
        .ok_or_else(|| HarnessError::CodecAllocation("compressor 2".into()))?;

    let decompressor1 = UncompressedDecompressor::new(1, max_contexts, channel2)
        .ok_or_else(|| HarnessError::CodecAllocation("decompressor 1".into()))?;
    let decompressor2 = UncompressedDecompressor::new(2, max_contexts, channel1)
        .ok_or_else(|| HarnessError::CodecAllocation("decompressor 2".into()))?;

    Ok([
        CodecPair {
            compressor: compressor1,
            decompressor: decompressor1,
        },
        CodecPair {
            compressor: compressor2,
            decompressor: decompressor2,
        },
    ])
}
