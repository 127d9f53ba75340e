//! Core types shared by the pipeline, the orchestrator and the report

use crate::compare::DiffReport;
use crate::constants::{dlt, MAX_CONTEXTS_LIMIT};
use crate::error::HarnessError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Link layer of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Ethernet II
    Ethernet,
    /// Linux cooked capture (SLL)
    LinuxCooked,
    /// Raw IP, no link header
    Raw,
}

impl LinkType {
    /// Map a libpcap DLT number to a supported link type
    pub fn from_dlt(value: u32) -> Result<Self, HarnessError> {
        match value {
            dlt::ETHERNET => Ok(LinkType::Ethernet),
            dlt::LINUX_SLL => Ok(LinkType::LinuxCooked),
            dlt::RAW | dlt::RAW_BSD | dlt::RAW_OPENBSD => Ok(LinkType::Raw),
            other => Err(HarnessError::UnsupportedLinkType(other)),
        }
    }

    /// The DLT number written into capture headers
    pub const fn dlt(&self) -> u32 {
        match self {
            LinkType::Ethernet => dlt::ETHERNET,
            LinkType::LinuxCooked => dlt::LINUX_SLL,
            LinkType::Raw => dlt::RAW,
        }
    }
}

/// Capture timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    /// Seconds since the epoch
    pub secs: u32,
    /// Sub-second part in nanoseconds
    pub nanos: u32,
}

/// A captured network frame, link header included
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Link layer the bytes start with
    pub link_type: LinkType,

    /// Capture timestamp
    pub timestamp: Timestamp,

    /// Number of bytes stored in the capture
    pub captured_len: u32,

    /// Length of the frame on the wire
    pub declared_len: u32,

    /// Raw bytes as captured
    pub data: Bytes,
}

impl Frame {
    /// Create a complete frame whose declared and captured lengths match its bytes
    pub fn new(link_type: LinkType, data: Bytes) -> Self {
        let len = data.len() as u32;
        Self {
            link_type,
            timestamp: Timestamp::default(),
            captured_len: len,
            declared_len: len,
            data,
        }
    }

    /// Set the capture timestamp
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Override the declared (wire) length
    pub fn with_declared_len(mut self, declared_len: u32) -> Self {
        self.declared_len = declared_len;
        self
    }
}

/// Width of the context identifier on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CidMode {
    /// CIDs 0..=15 carried in an Add-CID octet
    Small,
    /// CIDs 0..=16383 carried as SDVL after the packet type
    Large,
}

impl FromStr for CidMode {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smallcid" => Ok(CidMode::Small),
            "largecid" => Ok(CidMode::Large),
            other => Err(HarnessError::InvalidCidType(other.to_string())),
        }
    }
}

impl fmt::Display for CidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CidMode::Small => f.write_str("smallcid"),
            CidMode::Large => f.write_str("largecid"),
        }
    }
}

/// Result of compressing one payload
#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    /// The ROHC packet
    Ok(Bytes),
    /// The compressor rejected the payload
    Failed(String),
}

/// Result of checking a ROHC packet against the reference capture
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceOutcome {
    /// Same bytes as the reference packet
    Matched,
    /// Bytes differ from the reference packet
    Mismatched(DiffReport),
    /// No usable reference packet for this step
    NotAvailable,
    /// The build cannot produce reference-identical packets
    Skipped(&'static str),
}

/// Result of decompressing one ROHC packet
#[derive(Debug, Clone, PartialEq)]
pub enum DecompressionOutcome {
    /// The rebuilt packet
    Ok(Bytes),
    /// The decompressor rejected the packet
    Failed(String),
}

/// Result of comparing the decompressed packet to the original payload
#[derive(Debug, Clone, PartialEq)]
pub enum RoundTripOutcome {
    /// Identical
    Matched,
    /// Differences found
    Mismatched(DiffReport),
}

/// Classification of one frame on one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameVerdict {
    /// Every check passed
    Success,
    /// A soft mismatch: reference comparison or round-trip comparison failed
    Reference,
    /// The compressor failed
    CompressionError,
    /// The decompressor failed
    DecompressionError,
    /// The capture record is not a usable frame
    MalformedInput,
}

impl FrameVerdict {
    /// Whether this verdict ends the run
    pub const fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            FrameVerdict::CompressionError | FrameVerdict::DecompressionError
        )
    }
}

/// Verdict counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTally {
    /// Frame/pipeline pairs that fully succeeded
    pub ok: usize,
    /// Soft mismatches
    pub reference: usize,
    /// Compression failures
    pub compression_errors: usize,
    /// Decompression failures
    pub decompression_errors: usize,
    /// Malformed capture records
    pub malformed: usize,
}

impl RunTally {
    /// Count one verdict
    pub fn record(&mut self, verdict: FrameVerdict) {
        match verdict {
            FrameVerdict::Success => self.ok += 1,
            FrameVerdict::Reference => self.reference += 1,
            FrameVerdict::CompressionError => self.compression_errors += 1,
            FrameVerdict::DecompressionError => self.decompression_errors += 1,
            FrameVerdict::MalformedInput => self.malformed += 1,
        }
    }

    /// Number of verdicts recorded
    pub fn recorded(&self) -> usize {
        self.ok + self.reference + self.compression_errors + self.decompression_errors + self.malformed
    }

    /// Whether any hard error or malformed input was recorded
    pub fn has_hard_failures(&self) -> bool {
        self.compression_errors > 0 || self.decompression_errors > 0 || self.malformed > 0
    }
}

/// Overall judgment of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every frame round-tripped and no reference mismatch occurred
    Success,
    /// Only soft mismatches occurred
    SoftFailure,
    /// Malformed input, a codec failure or a startup failure
    HardFailure,
    /// The run is valid but the build makes it meaningless
    Skipped,
}

impl RunStatus {
    /// Process exit status for this result
    pub const fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::SoftFailure | RunStatus::HardFailure => 1,
            RunStatus::Skipped => crate::constants::EXIT_SKIPPED,
        }
    }
}

/// Resolved run options
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    /// CID width used by both compressors and decompressors
    pub cid_mode: CidMode,

    /// Maximum contexts per compressor
    pub max_contexts: usize,

    /// Capture of uncompressed frames to feed through the pipelines
    pub source_path: PathBuf,

    /// Where to write the ROHC packets, if anywhere
    pub output_path: Option<PathBuf>,

    /// Capture of ROHC packets to compare against
    pub reference_path: Option<PathBuf>,

    /// Text file receiving one size line per compressed packet
    pub size_log_path: Option<PathBuf>,
}

impl RunConfig {
    /// Validate the raw options of a run
    pub fn resolve(
        cid_type: &str,
        max_contexts: usize,
        source_path: impl Into<PathBuf>,
    ) -> Result<Self, HarnessError> {
        let cid_mode = cid_type.parse()?;

        if !(1..=MAX_CONTEXTS_LIMIT).contains(&max_contexts) {
            return Err(HarnessError::InvalidMaxContexts {
                value: max_contexts,
                max: MAX_CONTEXTS_LIMIT,
            });
        }

        Ok(Self {
            cid_mode,
            max_contexts,
            source_path: source_path.into(),
            output_path: None,
            reference_path: None,
            size_log_path: None,
        })
    }

    /// Write ROHC packets to a capture
    pub fn with_output(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.output_path = path.map(Into::into);
        self
    }

    /// Compare ROHC packets with a reference capture
    pub fn with_reference(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.reference_path = path.map(Into::into);
        self
    }

    /// Log the size of every ROHC packet
    pub fn with_size_log(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.size_log_path = path.map(Into::into);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_rejects_unknown_cid_type() {
        let err = RunConfig::resolve("mediumcid", 15, "flow.pcap").unwrap_err();
        assert!(matches!(err, HarnessError::InvalidCidType(ref s) if s == "mediumcid"));
    }

    #[test]
    fn resolve_checks_context_range() {
        assert!(RunConfig::resolve("smallcid", 0, "flow.pcap").is_err());
        assert!(RunConfig::resolve("smallcid", 16385, "flow.pcap").is_err());
        let config = RunConfig::resolve("largecid", 16384, "flow.pcap").unwrap();
        assert_eq!(config.cid_mode, CidMode::Large);
        assert_eq!(config.max_contexts, 16384);
        assert!(config.output_path.is_none());
    }

    #[test]
    fn tally_counts_each_verdict() {
        let mut tally = RunTally::default();
        tally.record(FrameVerdict::Success);
        tally.record(FrameVerdict::Success);
        tally.record(FrameVerdict::Reference);
        tally.record(FrameVerdict::MalformedInput);
        assert_eq!(tally.ok, 2);
        assert_eq!(tally.reference, 1);
        assert_eq!(tally.malformed, 1);
        assert_eq!(tally.recorded(), 4);
        assert!(tally.has_hard_failures());
    }

    #[test]
    fn link_types_map_from_dlt() {
        assert_eq!(LinkType::from_dlt(1).unwrap(), LinkType::Ethernet);
        assert_eq!(LinkType::from_dlt(113).unwrap(), LinkType::LinuxCooked);
        assert_eq!(LinkType::from_dlt(12).unwrap(), LinkType::Raw);
        assert!(matches!(
            LinkType::from_dlt(105),
            Err(HarnessError::UnsupportedLinkType(105))
        ));
    }

    #[test]
    fn unsupported_link_type_lists_every_accepted_dlt() {
        let message = LinkType::from_dlt(105).unwrap_err().to_string();
        for value in [1, 12, 14, 101, 113] {
            assert!(LinkType::from_dlt(value).is_ok());
            assert!(message.contains(&value.to_string()), "{} missing", value);
        }
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunStatus::Success.exit_code(), 0);
        assert_eq!(RunStatus::SoftFailure.exit_code(), 1);
        assert_eq!(RunStatus::HardFailure.exit_code(), 1);
        assert_eq!(RunStatus::Skipped.exit_code(), 77);
    }
}
