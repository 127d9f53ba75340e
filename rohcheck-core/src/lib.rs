//! # Rohcheck Core
//!
//! Non-regression harness for ROHC compressor/decompressor pairs.
//!
//! Frames from a capture are pushed through two cross-wired pipelines: the
//! feedback of each decompressor travels on the packets of the other flow.
//! Every frame gets a verdict per pipeline and the run ends with a status
//! that maps to a process exit code.
//!
//! ## Modules
//!
//! - `constants`: Link, ROHC and harness constants
//! - `types`: Frames, step outcomes, verdicts and run options
//! - `capture`: Frame sources and sinks, pcap container
//! - `link`: Link header lengths, Ethernet padding, output tagging
//! - `compare`: Byte comparison with a bounded diff
//! - `codec`: Codec traits and the built-in Uncompressed-profile codec
//! - `pipeline`: One compressor/decompressor flow
//! - `orchestrator`: The dual-flow run loop
//! - `report`: XML and JSON run reports

#![warn(missing_docs)]

pub mod capture;
pub mod codec;
pub mod compare;
pub mod constants;
pub mod error;
pub mod link;
pub mod orchestrator;
pub mod pipeline;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use capture::{FrameSink, FrameSource, MemorySink, MemorySource, PcapReader, PcapWriter};
pub use codec::{CodecError, CodecPair, Compressor, Decompressor};
pub use compare::{compare, Comparison, DiffReport};
pub use error::HarnessError;
pub use orchestrator::{AbortCause, DualFlowOrchestrator, RunSummary};
pub use pipeline::{CodecPipeline, PacketRecord};
pub use report::{ReportEmitter, ReportFormat};
pub use types::{CidMode, Frame, FrameVerdict, LinkType, RunConfig, RunStatus, RunTally};

/// Result type alias for harness operations
pub type Result<T> = core::result::Result<T, HarnessError>;
