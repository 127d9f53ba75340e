//! Run reports
//!
//! A report opens with a startup section, has one section per frame and
//! pipeline, then a summary, the codec statistics and a shutdown section.
//! Two renderings are available: an XML document and JSON lines.

use crate::orchestrator::RunSummary;
use crate::pipeline::PacketRecord;
use crate::types::{
    CompressionOutcome, DecompressionOutcome, FrameVerdict, ReferenceOutcome, RoundTripOutcome,
    RunStatus,
};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

/// Rendering of the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// XML document
    #[default]
    Xml,
    /// One JSON object per line
    Json,
}

/// Outcome of a report section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// The step succeeded
    Ok,
    /// The step failed or could not run
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Ok => f.write_str("ok"),
            StepStatus::Failed => f.write_str("failed"),
        }
    }
}

/// One step of a packet section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Section name
    pub name: &'static str,
    /// Outcome
    pub status: StepStatus,
    /// Free-form log lines
    pub log: Vec<String>,
}

impl StepReport {
    fn new(name: &'static str, status: StepStatus, log: Vec<String>) -> Self {
        Self { name, status, log }
    }

    fn failed(name: &'static str, line: &str) -> Self {
        Self::new(name, StepStatus::Failed, vec![line.to_string()])
    }
}

/// Counters of the summary section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    /// Frames times pipelines
    pub packets_processed: usize,
    /// Frames that never reached the decompressor
    pub compression_failed: usize,
    /// Decompressor failures
    pub decompression_failed: usize,
    /// Fully successful frame/pipeline pairs
    pub matches: usize,
    /// Soft mismatches
    pub reference_mismatches: usize,
    /// Malformed capture records, also counted in `compression_failed`
    pub malformed: usize,
    /// Run status
    pub status: RunStatus,
}

impl From<&RunSummary> for SummaryCounts {
    fn from(summary: &RunSummary) -> Self {
        let tally = &summary.tally;
        Self {
            packets_processed: summary.frames * 2,
            compression_failed: tally.malformed + tally.compression_errors,
            decompression_failed: tally.decompression_errors,
            matches: tally.ok,
            reference_mismatches: tally.reference,
            malformed: tally.malformed,
            status: summary.status,
        }
    }
}

/// Steps of a packet section, in report order
pub fn packet_steps(record: &PacketRecord) -> Vec<StepReport> {
    if let Some(reason) = &record.malformed {
        return vec![
            StepReport::failed("compression", reason),
            StepReport::failed(
                "decompression",
                "Compression failed, cannot decompress the ROHC packet!",
            ),
            StepReport::failed("comparison", "Compression failed, cannot compare the packets!"),
        ];
    }

    let mut steps = Vec::with_capacity(4);

    let rohc = match &record.compression {
        Some(CompressionOutcome::Ok(rohc)) => rohc,
        Some(CompressionOutcome::Failed(reason)) => {
            steps.push(StepReport::failed("compression", reason));
            steps.push(StepReport::failed(
                "rohc_comparison",
                "Compression failed, cannot compare the packets!",
            ));
            steps.push(StepReport::failed(
                "decompression",
                "Compression failed, cannot decompress the ROHC packet!",
            ));
            steps.push(StepReport::failed(
                "ip_comparison",
                "Compression failed, cannot compare the packets!",
            ));
            return steps;
        }
        None => return steps,
    };

    let mut log = Vec::new();
    if record.padding > 0 {
        log.push(format!(
            "The Ethernet frame has {} bytes of padding after the {} byte IP packet!",
            record.padding, record.payload_len
        ));
    }
    log.push(format!(
        "IP packet of {} bytes compressed into a ROHC packet of {} bytes",
        record.payload_len,
        rohc.len()
    ));
    log.extend(record.output_errors.iter().cloned());
    steps.push(StepReport::new("compression", StepStatus::Ok, log));

    steps.push(match &record.reference {
        Some(ReferenceOutcome::Matched) => {
            StepReport::new("rohc_comparison", StepStatus::Ok, vec!["Packets are equal".into()])
        }
        Some(ReferenceOutcome::Mismatched(diff)) => {
            StepReport::new("rohc_comparison", StepStatus::Failed, diff_lines(diff))
        }
        Some(ReferenceOutcome::Skipped(reason)) => StepReport::failed("rohc_comparison", reason),
        Some(ReferenceOutcome::NotAvailable) | None => StepReport::failed(
            "rohc_comparison",
            "No ROHC packets given for reference, cannot compare (run with the -c option)",
        ),
    });

    let decompressed = match &record.decompression {
        Some(DecompressionOutcome::Ok(packet)) => packet,
        Some(DecompressionOutcome::Failed(reason)) => {
            steps.push(StepReport::failed("decompression", reason));
            steps.push(StepReport::failed(
                "ip_comparison",
                "Decompression failed, cannot compare the packets!",
            ));
            return steps;
        }
        None => return steps,
    };
    steps.push(StepReport::new(
        "decompression",
        StepStatus::Ok,
        vec![format!(
            "ROHC packet of {} bytes decompressed into an IP packet of {} bytes",
            rohc.len(),
            decompressed.len()
        )],
    ));

    match &record.round_trip {
        Some(RoundTripOutcome::Matched) => steps.push(StepReport::new(
            "ip_comparison",
            StepStatus::Ok,
            vec!["Packets are equal".into()],
        )),
        Some(RoundTripOutcome::Mismatched(diff)) => {
            steps.push(StepReport::new("ip_comparison", StepStatus::Failed, diff_lines(diff)))
        }
        None => {}
    }

    steps
}

fn diff_lines(diff: &crate::compare::DiffReport) -> Vec<String> {
    diff.to_string().lines().map(str::to_string).collect()
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum JsonEvent<'a> {
    Startup {
        status: StepStatus,
        log: &'a [String],
    },
    Packet {
        id: usize,
        comp: u8,
        verdict: FrameVerdict,
        rohc_size: Option<usize>,
        steps: &'a [StepReport],
    },
    Summary {
        frames: usize,
        #[serde(flatten)]
        counts: SummaryCounts,
    },
    Infos {
        statistics: &'a [String],
    },
    Shutdown {
        status: StepStatus,
        log: &'a [String],
    },
}

/// Writes the report of one run
pub struct ReportEmitter<W: Write> {
    out: W,
    format: ReportFormat,
}

impl<W: Write> ReportEmitter<W> {
    /// Create an emitter writing to `out`
    pub fn new(out: W, format: ReportFormat) -> Self {
        Self { out, format }
    }

    /// Open the document
    pub fn begin(&mut self) -> Result<()> {
        if self.format == ReportFormat::Xml {
            writeln!(self.out, "<?xml version=\"1.0\" encoding=\"ISO-8859-15\"?>")?;
            writeln!(self.out, "<test>")?;
        }
        Ok(())
    }

    /// Startup section
    pub fn startup(&mut self, log: &[String], status: StepStatus) -> Result<()> {
        match self.format {
            ReportFormat::Xml => self.xml_section(1, "startup", log, status),
            ReportFormat::Json => self.json_line(&JsonEvent::Startup { status, log }),
        }
    }

    /// Section for one frame on one pipeline
    pub fn packet(&mut self, record: &PacketRecord) -> Result<()> {
        let steps = packet_steps(record);
        match self.format {
            ReportFormat::Xml => {
                writeln!(
                    self.out,
                    "\t<packet id=\"{}\" comp=\"{}\" verdict=\"{}\">",
                    record.packet_id,
                    record.pipeline_id,
                    verdict_name(record.verdict)
                )?;
                for step in &steps {
                    self.xml_section(2, step.name, &step.log, step.status)?;
                }
                writeln!(self.out, "\t</packet>\n")?;
                Ok(())
            }
            ReportFormat::Json => self.json_line(&JsonEvent::Packet {
                id: record.packet_id,
                comp: record.pipeline_id,
                verdict: record.verdict,
                rohc_size: record.rohc_size(),
                steps: &steps,
            }),
        }
    }

    /// Summary section
    pub fn summary(&mut self, summary: &RunSummary) -> Result<()> {
        let counts = SummaryCounts::from(summary);
        match self.format {
            ReportFormat::Xml => {
                writeln!(self.out, "\t<summary>")?;
                let fields = [
                    ("packets_processed", counts.packets_processed),
                    ("compression_failed", counts.compression_failed),
                    ("decompression_failed", counts.decompression_failed),
                    ("matches", counts.matches),
                    ("reference_mismatches", counts.reference_mismatches),
                    ("malformed", counts.malformed),
                ];
                for (name, value) in fields {
                    writeln!(self.out, "\t\t<{name}>{value}</{name}>")?;
                }
                writeln!(self.out, "\t\t<status>{}</status>", status_name(counts.status))?;
                writeln!(self.out, "\t</summary>\n")?;
                Ok(())
            }
            ReportFormat::Json => self.json_line(&JsonEvent::Summary {
                frames: summary.frames,
                counts,
            }),
        }
    }

    /// Codec statistics
    pub fn infos(&mut self, statistics: &[String]) -> Result<()> {
        match self.format {
            ReportFormat::Xml => {
                writeln!(self.out, "\t<infos>")?;
                for block in statistics {
                    for line in block.lines() {
                        writeln!(self.out, "\t\t{}", line)?;
                    }
                }
                writeln!(self.out, "\t</infos>\n")?;
                Ok(())
            }
            ReportFormat::Json => self.json_line(&JsonEvent::Infos { statistics }),
        }
    }

    /// Shutdown section
    pub fn shutdown(&mut self, log: &[String], status: StepStatus) -> Result<()> {
        match self.format {
            ReportFormat::Xml => self.xml_section(1, "shutdown", log, status),
            ReportFormat::Json => self.json_line(&JsonEvent::Shutdown { status, log }),
        }
    }

    /// Close the document and flush
    pub fn end(&mut self) -> Result<()> {
        if self.format == ReportFormat::Xml {
            writeln!(self.out, "</test>")?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn xml_section(
        &mut self,
        depth: usize,
        name: &str,
        log: &[String],
        status: StepStatus,
    ) -> Result<()> {
        let indent = "\t".repeat(depth);
        writeln!(self.out, "{indent}<{name}>")?;
        writeln!(self.out, "{indent}\t<log>")?;
        for line in log {
            writeln!(self.out, "{}", escape_xml(line))?;
        }
        writeln!(self.out, "{indent}\t</log>")?;
        writeln!(self.out, "{indent}\t<status>{status}</status>")?;
        writeln!(self.out, "{indent}</{name}>\n")?;
        Ok(())
    }

    fn json_line(&mut self, event: &JsonEvent<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        writeln!(self.out)?;
        Ok(())
    }
}

fn verdict_name(verdict: FrameVerdict) -> &'static str {
    match verdict {
        FrameVerdict::Success => "success",
        FrameVerdict::Reference => "reference",
        FrameVerdict::CompressionError => "compression_error",
        FrameVerdict::DecompressionError => "decompression_error",
        FrameVerdict::MalformedInput => "malformed_input",
    }
}

fn status_name(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Success => "success",
        RunStatus::SoftFailure => "soft_failure",
        RunStatus::HardFailure => "hard_failure",
        RunStatus::Skipped => "skipped",
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}
