//! Command-line interface for split-segments.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **scan**: List the deduplicated alignment segments of reads overlapping loci
//! - **groups**: Cluster those segments into overlapping reference groups
//!
//! ## Usage
//!
//! ```text
//! # Segments of split reads around a breakpoint
//! split-segments scan sample.bam chr1:1000000-1010000
//!
//! # Several loci, no record cap, JSON output for scripting
//! split-segments scan sample.bam chr1:1000000-1010000 chr5:2000-3000 --max-reads 0 --format json
//!
//! # Group segments, keeping reads that only aligned once
//! split-segments groups sample.bam chr1:1000000-1010000 --include-singletons
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::locus::Locus;
use crate::core::segment::RawSegment;
use crate::grouping::groups::apply_singleton_policy;
use crate::parsing::sam::AlignmentFile;
use crate::scanning::scanner::{extract, ScanOptions, DEFAULT_MAX_READS};

pub mod groups;
pub mod scan;

/// How often, in records, verbose mode reports scan progress
const PROGRESS_INTERVAL: usize = 10_000;

#[derive(Parser)]
#[command(name = "split-segments")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Reconstruct split-read alignment segments from SAM/BAM files")]
#[command(
    long_about = "split-segments scans the reads overlapping one or more loci and reports every aligned segment of each read.\n\nSegments come from the primary alignment and from each supplementary alignment listed in the SA tag. Clipped bases give each segment's offset within the read, and identical segments reached from several records are reported once."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the segments of reads overlapping the given loci
    Scan(scan::ScanArgs),

    /// Group segments by overlapping reference intervals
    Groups(groups::GroupsArgs),
}

/// Input and scanning options shared by all commands
#[derive(clap::Args)]
pub struct InputArgs {
    /// Input alignment file (SAM or BAM)
    #[arg(required = true)]
    pub input: PathBuf,

    /// Loci to scan, as chrom:start-end (1-based, inclusive)
    #[arg(required = true, num_args = 1..)]
    pub loci: Vec<Locus>,

    /// Maximum records examined per locus (0 for no limit)
    #[arg(long, default_value_t = DEFAULT_MAX_READS)]
    pub max_reads: usize,

    /// Keep reads that have only a single aligned segment
    #[arg(long)]
    pub include_singletons: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Scan the input and apply the singleton policy
///
/// # Errors
///
/// Returns an error if the input cannot be opened, the tokio runtime cannot be
/// created, or extraction fails.
pub fn load_segments(args: &InputArgs, verbose: bool) -> anyhow::Result<Vec<RawSegment>> {
    let mut source = AlignmentFile::open(&args.input)?;

    if verbose {
        eprintln!(
            "Opened {} ({} reference sequences)",
            args.input.display(),
            source.reference_names().len()
        );
        match source.index() {
            Some(index) => eprintln!("Using index {}", index.display()),
            None if source.is_coordinate_sorted() => {
                eprintln!("No index found; scanning the file in coordinate order");
            }
            None => eprintln!("No index found; scanning the whole file per locus"),
        }
    }

    let mut options = ScanOptions::default()
        .with_max_reads(args.max_reads)
        .with_include_singletons(args.include_singletons);
    if verbose {
        options = options.with_progress(|records, at| {
            if let Some((chrom, pos)) = at {
                if records % PROGRESS_INTERVAL == 0 {
                    eprintln!("Scanned {records} records (at {chrom}:{pos})");
                }
            }
            false
        });
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let segments = runtime.block_on(extract(&mut source, &args.loci, options))?;

    if verbose {
        eprintln!(
            "Extracted {} segments from {} loci",
            segments.len(),
            args.loci.len()
        );
    }

    Ok(apply_singleton_policy(segments, args.include_singletons))
}
