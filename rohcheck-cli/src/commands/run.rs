use crate::OutputFormat;
use anyhow::{Context, Result};
use rohcheck_core::{
    capture::{PcapReader, PcapWriter},
    codec::{cross_wired_pairs, UncompressedCompressor, UncompressedDecompressor},
    orchestrator::DualFlowOrchestrator,
    report::{ReportEmitter, StepStatus},
    types::{RunConfig, RunStatus},
    CodecPair, FrameSource,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};

/// Options of one `run` invocation, as given on the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `smallcid` or `largecid`
    pub cid_type: String,
    /// Capture of uncompressed frames
    pub flow: PathBuf,
    /// Capture receiving the ROHC packets
    pub output: Option<PathBuf>,
    /// Capture of reference ROHC packets
    pub reference: Option<PathBuf>,
    /// File receiving the size of every ROHC packet
    pub size_log: Option<PathBuf>,
    /// Maximum contexts per compressor
    pub max_contexts: usize,
    /// Report rendering
    pub format: OutputFormat,
}

/// Everything opened before the first frame is processed
struct Startup {
    log: Vec<String>,
    config: RunConfig,
    source: PcapReader<BufReader<File>>,
    output: Option<PcapWriter<BufWriter<File>>>,
    reference: Option<PcapReader<BufReader<File>>>,
    size_log: Option<BufWriter<File>>,
    pairs: [CodecPair<UncompressedCompressor, UncompressedDecompressor>; 2],
}

fn start(options: &RunOptions) -> Result<Startup> {
    let config = RunConfig::resolve(&options.cid_type, options.max_contexts, &options.flow)?
        .with_output(options.output.as_ref())
        .with_reference(options.reference.as_ref())
        .with_size_log(options.size_log.as_ref());

    let mut log = Vec::new();

    let source = PcapReader::open(&config.source_path).with_context(|| {
        format!(
            "failed to open the source capture '{}'",
            config.source_path.display()
        )
    })?;
    log.push(format!(
        "source capture '{}' opened, link layer {:?}",
        config.source_path.display(),
        source.link_type()
    ));

    let output = match &config.output_path {
        Some(path) => {
            let writer = PcapWriter::create(path, source.link_type())
                .with_context(|| format!("failed to open the output capture '{}'", path.display()))?;
            log.push(format!("ROHC packets will be written to '{}'", path.display()));
            Some(writer)
        }
        None => None,
    };

    let reference = match &config.reference_path {
        Some(path) => {
            let reader = PcapReader::open(path).with_context(|| {
                format!("failed to open the reference capture '{}'", path.display())
            })?;
            log.push(format!(
                "reference capture '{}' opened, link layer {:?}",
                path.display(),
                reader.link_type()
            ));
            Some(reader)
        }
        None => None,
    };

    let size_log = match &config.size_log_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create the size log '{}'", path.display()))?;
            Some(BufWriter::new(file))
        }
        None => None,
    };

    let pairs = cross_wired_pairs(config.cid_mode, config.max_contexts)?;
    log.push(format!(
        "compressors and decompressors created ({}, {} contexts)",
        config.cid_mode, config.max_contexts
    ));

    Ok(Startup {
        log,
        config,
        source,
        output,
        reference,
        size_log,
        pairs,
    })
}

/// Run the non-regression test and write its report to `out`
///
/// Startup problems (bad arguments, unreadable captures) end up in the
/// report and give [`RunStatus::HardFailure`]; only failures to write the
/// report itself are returned as errors.
pub fn execute<W: Write>(options: &RunOptions, out: W) -> Result<RunStatus> {
    info!("Running {} over {}", options.cid_type, options.flow.display());

    let mut report = ReportEmitter::new(out, options.format.into());
    report.begin()?;

    let startup = match start(options) {
        Ok(startup) => startup,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            report.startup(&[format!("{:#}", e)], StepStatus::Failed)?;
            report.end()?;
            return Ok(RunStatus::HardFailure);
        }
    };
    report.startup(&startup.log, StepStatus::Ok)?;

    let Startup {
        config,
        mut source,
        output,
        reference,
        size_log,
        pairs,
        ..
    } = startup;

    let mut orchestrator = DualFlowOrchestrator::new(pairs, config.cid_mode);
    if let Some(reference) = reference {
        orchestrator = orchestrator.with_reference(reference);
    }
    if let Some(output) = output {
        orchestrator = orchestrator.with_sink(output);
    }
    if let Some(size_log) = size_log {
        orchestrator = orchestrator.with_size_log(size_log);
    }

    let summary = orchestrator
        .run(&mut source, &mut report)
        .context("failed to write the report")?;
    report.end()?;

    info!(
        "{} frames, {} ok, {} soft mismatches: {:?}",
        summary.frames, summary.tally.ok, summary.tally.reference, summary.status
    );

    Ok(summary.status)
}
