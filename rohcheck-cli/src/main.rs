use anyhow::Result;
use clap::{Parser, Subcommand};
use rohcheck_cli::{commands, commands::run::RunOptions, OutputFormat};
use rohcheck_core::constants::DEFAULT_MAX_CONTEXTS;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rohcheck")]
#[command(about = "Rohcheck - Non-regression harness for ROHC compressors", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress, decompress and check every frame of a capture
    Run {
        /// Write the ROHC packets to this capture
        #[arg(short = 'o', value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Compare the ROHC packets with this capture
        #[arg(short = 'c', value_name = "REFERENCE")]
        compare: Option<PathBuf>,

        /// Log the size of every ROHC packet to this file
        #[arg(long = "rohc-size-ouput", alias = "rohc-size-output", value_name = "FILE")]
        rohc_size_output: Option<PathBuf>,

        /// Maximum number of contexts per compressor
        #[arg(long, default_value_t = DEFAULT_MAX_CONTEXTS)]
        max_contexts: usize,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Xml)]
        format: OutputFormat,

        /// CID type: smallcid or largecid
        cid_type: String,

        /// Capture of the uncompressed flow
        flow: PathBuf,
    },

    /// Show the kind of every ROHC packet of a capture
    Inspect {
        /// Capture of ROHC packets
        #[arg(short, long)]
        input: String,

        /// CID type the packets were compressed with
        #[arg(long, default_value = "smallcid")]
        cid_type: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout carries the report
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Run {
            output,
            compare,
            rohc_size_output,
            max_contexts,
            format,
            cid_type,
            flow,
        } => {
            let options = RunOptions {
                cid_type,
                flow,
                output,
                reference: compare,
                size_log: rohc_size_output,
                max_contexts,
                format,
            };
            let status = commands::run::execute(&options, io::stdout().lock())?;
            std::process::exit(status.exit_code());
        }

        Commands::Inspect {
            input,
            cid_type,
            json,
        } => commands::inspect::execute(&input, &cid_type, json).map(|_| ()),
    }
}
