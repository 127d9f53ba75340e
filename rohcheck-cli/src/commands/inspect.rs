use anyhow::{Context, Result};
use colored::*;
use rohcheck_core::{
    capture::PcapReader,
    codec::decode::{classify, PacketKind},
    link::header_length,
    types::CidMode,
    FrameSource,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Bytes of each packet shown in hex
const HEAD_BYTES: usize = 8;

/// Packet kinds found in a capture of ROHC packets
#[derive(Debug, Default, Serialize)]
pub struct InspectSummary {
    /// Frames read
    pub frames: usize,
    /// Number of packets per kind
    pub kinds: BTreeMap<String, usize>,
    /// Frames that could not be classified
    pub errors: usize,
}

pub fn execute(input: &str, cid_type: &str, json: bool) -> Result<InspectSummary> {
    info!("Inspecting file: {}", input);

    let cid_mode: CidMode = cid_type.parse()?;
    let mut reader = PcapReader::open(input)
        .with_context(|| format!("Failed to open capture: {}", input))?;
    let link_len = header_length(reader.link_type());

    let mut summary = InspectSummary::default();

    while let Some(frame) = reader
        .next_frame()
        .with_context(|| format!("Failed to read frame #{}", summary.frames + 1))?
    {
        summary.frames += 1;
        let packet = frame.data.get(link_len..).unwrap_or_default();
        let head = hex::encode(&packet[..packet.len().min(HEAD_BYTES)]);

        match classify(packet, cid_mode) {
            Ok(kind) => {
                *summary.kinds.entry(kind.to_string()).or_insert(0) += 1;
                if !json {
                    let label = match kind {
                        PacketKind::Unknown => kind.to_string().yellow(),
                        _ => kind.to_string().green(),
                    };
                    println!(
                        "#{:<6} {:<10} {:>6} bytes  {}",
                        summary.frames,
                        label,
                        packet.len(),
                        head
                    );
                }
            }
            Err(e) => {
                summary.errors += 1;
                warn!("Frame {} is not a ROHC packet: {}", summary.frames, e);
                if !json {
                    println!(
                        "#{:<6} {:<10} {:>6} bytes  {}",
                        summary.frames,
                        "invalid".red(),
                        packet.len(),
                        head
                    );
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary);
    }

    println!("\n=== Inspection Results ===");
    println!("Total frames:       {}", summary.frames);
    for (kind, count) in &summary.kinds {
        println!("{:<20}{}", format!("{}:", kind), count);
    }
    if summary.errors > 0 {
        println!("Invalid frames:     {}", summary.errors.to_string().red());
    } else {
        println!("{} All frames are ROHC packets", "✓".green());
    }

    Ok(summary)
}
