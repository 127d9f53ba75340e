//! Fuzzing entry points for rohcheck-core parsers and the dual-flow run
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_pcap_reader

use rohcheck_core::{
    capture::{MemorySource, PcapReader},
    codec::{cross_wired_pairs, decode::classify, Decompressor},
    orchestrator::DualFlowOrchestrator,
    report::{ReportEmitter, ReportFormat},
    types::{CidMode, Frame, LinkType},
    FrameSource,
};
use std::io::{sink, Cursor};

/// Frames read from one fuzz input at most
const MAX_FRAMES: usize = 64;

fn cid_mode(data: &[u8]) -> CidMode {
    match data.first() {
        Some(b) if b & 1 == 1 => CidMode::Large,
        _ => CidMode::Small,
    }
}

pub fn fuzz_pcap_reader(data: &[u8]) {
    // Parse the capture - should never panic
    if let Ok(mut reader) = PcapReader::new(Cursor::new(data)) {
        for _ in 0..MAX_FRAMES {
            match reader.next_frame() {
                Ok(Some(_)) => continue,
                _ => break,
            }
        }
    }
}

pub fn fuzz_classify(data: &[u8]) {
    // Classify in both CID modes - should never panic
    let _ = classify(data, CidMode::Small);
    let _ = classify(data, CidMode::Large);
}

pub fn fuzz_decompress(data: &[u8]) {
    let mode = cid_mode(data);
    let Ok([mut pair, _]) = cross_wired_pairs(mode, 16) else {
        return;
    };

    // Arbitrary ROHC packets - errors are fine, panics are not
    let _ = pair.decompressor.decompress(data, mode);
    let _ = pair.decompressor.decompress(data, mode);
}

pub fn fuzz_run(data: &[u8]) {
    let mode = cid_mode(data);
    let Ok(pairs) = cross_wired_pairs(mode, 4) else {
        return;
    };

    // Split the input into Ethernet frames of varying lengths
    let frames: Vec<Frame> = data
        .chunks(97)
        .take(MAX_FRAMES)
        .map(|chunk| Frame::new(LinkType::Ethernet, chunk.to_vec().into()))
        .collect();
    let mut source = MemorySource::new(LinkType::Ethernet, frames);
    let mut report = ReportEmitter::new(sink(), ReportFormat::Json);

    let _ = DualFlowOrchestrator::new(pairs, mode).run(&mut source, &mut report);
}
