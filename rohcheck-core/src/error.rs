//! Error types for harness operations

use thiserror::Error;

/// Errors raised while setting up or tearing down a run
///
/// Per-frame problems never surface here; the pipeline turns them into
/// verdicts. These are the startup and I/O failures that stop a run.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// CID type was neither `smallcid` nor `largecid`
    #[error("invalid CID type '{0}', only 'smallcid' and 'largecid' expected")]
    InvalidCidType(String),

    /// Maximum number of contexts out of range
    #[error("the maximum number of ROHC contexts should be between 1 and {max}, got {value}")]
    InvalidMaxContexts {
        /// The rejected value.
        value: usize,
        /// The largest accepted value.
        max: usize,
    },

    /// Link layer the harness cannot strip
    #[error("link layer type {0} not supported (supported = 1, 12, 14, 101, 113)")]
    UnsupportedLinkType(u32),

    /// Capture container is not a pcap file
    #[error("bad capture magic number {0:#010x}")]
    BadCaptureMagic(u32),

    /// Capture record that no pcap writer produces
    #[error("invalid capture record: {0}")]
    InvalidCapture(String),

    /// Capture container ended in the middle of a header or record
    #[error("truncated capture: expected {expected} bytes, got {actual}")]
    TruncatedCapture {
        /// The number of bytes expected.
        expected: usize,
        /// The number of bytes actually read.
        actual: usize,
    },

    /// Codec instance could not be created
    #[error("cannot create the {0}")]
    CodecAllocation(String),

    /// IO error during read/write
    #[error("IO error: {0}")]
    Io(String),

    /// Report could not be serialized
    #[error("report serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Serialization(err.to_string())
    }
}
