//! The dual-flow run loop
//!
//! Every frame of the source goes through pipeline 1, then pipeline 2.
//! Because decompressor 1 carries compressor 2's feedback and the other way
//! round, this interleaving is what exercises the feedback path. The
//! reference capture, when present, holds the ROHC packets of both
//! pipelines in that same order and is consumed once per pipeline step.

use crate::capture::{FrameSink, FrameSource};
use crate::codec::{CodecPair, Compressor, Decompressor};
use crate::pipeline::{CodecPipeline, FrameOutputs};
use crate::report::{ReportEmitter, StepStatus};
use crate::types::{CidMode, Frame, FrameVerdict, RunStatus, RunTally};
use crate::Result;
use serde::Serialize;
use std::io::Write;

#[cfg(feature = "logging")]
use tracing::{debug, info, warn};

/// Why a run stopped before the end of the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortCause {
    /// A compressor or decompressor failed
    HardFailure {
        /// Frame number
        packet_id: usize,
        /// Pipeline number
        pipeline_id: u8,
        /// The failing verdict
        verdict: FrameVerdict,
    },
    /// The source capture could not be read further
    Source(String),
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Frames read from the source
    pub frames: usize,
    /// Verdict counters over both pipelines
    pub tally: RunTally,
    /// Overall status
    pub status: RunStatus,
    /// Set when the run stopped early
    pub aborted: Option<AbortCause>,
}

/// Decide the status of a run
///
/// With `skip_reference`, a run whose every frame ended in a soft mismatch
/// and nothing else is reported as skipped rather than failed.
pub fn final_status(
    tally: &RunTally,
    frames: usize,
    aborted: bool,
    skip_reference: bool,
) -> RunStatus {
    if aborted || tally.has_hard_failures() {
        return RunStatus::HardFailure;
    }

    if skip_reference && tally.ok == 0 && tally.reference == 2 * frames {
        return RunStatus::Skipped;
    }

    if tally.reference > 0 {
        RunStatus::SoftFailure
    } else if tally.ok == 2 * frames {
        RunStatus::Success
    } else {
        RunStatus::HardFailure
    }
}

/// Drives two cross-wired pipelines over a frame source
pub struct DualFlowOrchestrator<'a, C, D> {
    pipelines: [CodecPipeline<C, D>; 2],
    reference: Option<Box<dyn FrameSource + 'a>>,
    sink: Option<Box<dyn FrameSink + 'a>>,
    size_log: Option<Box<dyn Write + 'a>>,
    skip_reference: bool,
    notes: Vec<String>,
}

impl<'a, C: Compressor, D: Decompressor> DualFlowOrchestrator<'a, C, D> {
    /// Build the orchestrator from two cross-wired codec pairs
    pub fn new(pairs: [CodecPair<C, D>; 2], cid_mode: CidMode) -> Self {
        let [first, second] = pairs;
        let skip_reference = cfg!(feature = "reference-skip");
        Self {
            pipelines: [
                CodecPipeline::new(1, first.compressor, first.decompressor, cid_mode)
                    .with_reference_skip(skip_reference),
                CodecPipeline::new(2, second.compressor, second.decompressor, cid_mode)
                    .with_reference_skip(skip_reference),
            ],
            reference: None,
            sink: None,
            size_log: None,
            skip_reference,
            notes: Vec::new(),
        }
    }

    /// Compare ROHC packets with a reference capture
    pub fn with_reference(mut self, reference: impl FrameSource + 'a) -> Self {
        self.reference = Some(Box::new(reference));
        self
    }

    /// Write ROHC packets to a sink
    pub fn with_sink(mut self, sink: impl FrameSink + 'a) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Log the size of every ROHC packet
    pub fn with_size_log(mut self, size_log: impl Write + 'a) -> Self {
        self.size_log = Some(Box::new(size_log));
        self
    }

    /// Override the build-time reference skipping
    pub fn with_reference_skip(mut self, skip: bool) -> Self {
        self.skip_reference = skip;
        self.pipelines = self.pipelines.map(|p| p.with_reference_skip(skip));
        self
    }

    /// Codec statistics: both compressors, then both decompressors
    pub fn statistics(&self) -> Vec<String> {
        let mut stats: Vec<String> = self
            .pipelines
            .iter()
            .map(|p| p.compressor_statistics())
            .collect();
        stats.extend(self.pipelines.iter().map(|p| p.decompressor_statistics()));
        stats
    }

    /// Process the whole source and write the report sections of the run
    ///
    /// Writes one packet section per frame and pipeline, then the summary,
    /// codec statistics and shutdown sections. The caller owns the startup
    /// section and the document frame. Stops at the first compression or
    /// decompression failure; malformed frames and soft mismatches do not
    /// stop the run. Outputs are closed even when the report cannot be
    /// written.
    pub fn run<S, W>(mut self, source: &mut S, report: &mut ReportEmitter<W>) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        W: Write,
    {
        let outcome = self.process(source, report);
        let (log, shutdown_status) = self.teardown();

        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                #[cfg(feature = "logging")]
                for line in &log {
                    warn!("teardown after report failure: {}", line);
                }
                return Err(e);
            }
        };

        report.shutdown(&log, shutdown_status)?;
        Ok(summary)
    }

    /// Frame loop, summary and statistics sections
    fn process<S, W>(&mut self, source: &mut S, report: &mut ReportEmitter<W>) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        W: Write,
    {
        let mut tally = RunTally::default();
        let mut frames = 0;
        let mut aborted = None;

        #[cfg(feature = "logging")]
        info!("starting run over a {:?} capture", source.link_type());

        'frames: loop {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) => {
                    self.notes
                        .push(format!("cannot read frame #{} of the source: {}", frames + 1, e));
                    aborted = Some(AbortCause::Source(e.to_string()));
                    break;
                }
            };
            frames += 1;

            for index in 0..self.pipelines.len() {
                let reference = self.next_reference();
                let mut outputs = FrameOutputs {
                    sink: self.sink.as_deref_mut().map(|s| s as &mut dyn FrameSink),
                    size_log: self.size_log.as_deref_mut().map(|w| w as &mut dyn Write),
                };

                let pipeline = &mut self.pipelines[index];
                let record = pipeline.process_frame(frames, &frame, reference.as_ref(), &mut outputs);
                report.packet(&record)?;
                tally.record(record.verdict);

                if record.verdict.is_hard_failure() {
                    #[cfg(feature = "logging")]
                    warn!(
                        "frame {} failed on pipeline {}: {:?}, stopping",
                        frames,
                        pipeline.id(),
                        record.verdict
                    );

                    aborted = Some(AbortCause::HardFailure {
                        packet_id: frames,
                        pipeline_id: pipeline.id(),
                        verdict: record.verdict,
                    });
                    break 'frames;
                }
            }
        }

        let status = final_status(&tally, frames, aborted.is_some(), self.skip_reference);
        let summary = RunSummary {
            frames,
            tally,
            status,
            aborted,
        };

        #[cfg(feature = "logging")]
        debug!("run finished: {:?}", summary);

        report.summary(&summary)?;
        report.infos(&self.statistics())?;

        Ok(summary)
    }

    /// Next reference frame, read in lock-step with the pipeline steps
    fn next_reference(&mut self) -> Option<Frame> {
        let reference = self.reference.as_mut()?;
        match reference.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.notes
                    .push(format!("reference capture unreadable, comparisons disabled: {}", e));
                self.reference = None;
                None
            }
        }
    }

    /// Release everything in reverse order of acquisition
    ///
    /// Codecs go first (decompressors, then compressors, pipeline 2 before
    /// pipeline 1), then the size log, the reference capture and the output
    /// capture.
    fn teardown(self) -> (Vec<String>, StepStatus) {
        let Self {
            pipelines,
            reference,
            sink,
            size_log,
            mut notes,
            ..
        } = self;
        let mut status = StepStatus::Ok;

        let [first, second] = pipelines;
        let (compressor1, decompressor1) = first.into_parts();
        let (compressor2, decompressor2) = second.into_parts();
        drop(decompressor2);
        drop(decompressor1);
        drop(compressor2);
        drop(compressor1);
        notes.push("decompressors and compressors released".into());

        if let Some(mut size_log) = size_log {
            if let Err(e) = size_log.flush() {
                notes.push(format!("failed to flush the size log: {}", e));
                status = StepStatus::Failed;
            }
        }

        drop(reference);

        if let Some(mut sink) = sink {
            if let Err(e) = sink.finish() {
                notes.push(format!("failed to close the output capture: {}", e));
                status = StepStatus::Failed;
            }
        }

        (notes, status)
    }
}
