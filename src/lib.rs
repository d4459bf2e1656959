//! # split-segments
//!
//! A library for reconstructing the alignment segments of split reads from
//! SAM/BAM files.
//!
//! Long or chimeric reads are often aligned in pieces: one primary record plus
//! supplementary alignments, listed in the primary's `SA` tag. `split-segments`
//! scans the records overlapping a set of loci and turns every primary and
//! supplementary alignment into a [`RawSegment`] saying where the aligned block
//! sits on the reference and where it sits within the read.
//!
//! ## Features
//!
//! - **Clip-aware placement**: Leading clips give a block's offset in the read,
//!   read in sequencing orientation for reverse-strand alignments
//! - **Deduplication**: Segments reached from several records are reported once,
//!   keyed by a structural identity
//! - **Read caps and cancellation**: Per-locus record limits and a progress
//!   callback that can abort a scan
//! - **Grouping**: A union-find clusters segments into overlapping reference groups
//!
//! ## Example
//!
//! ```rust,no_run
//! use split_segments::parsing::sam::AlignmentFile;
//! use split_segments::{extract, group_segments, Locus, ScanOptions};
//! use std::path::Path;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let mut source = AlignmentFile::open(Path::new("sample.bam"))?;
//! let loci = vec!["chr1:1000000-1010000".parse::<Locus>()?];
//!
//! let segments = extract(&mut source, &loci, ScanOptions::default()).await?;
//! for group in group_segments(&segments) {
//!     println!("{}: {} segments", group.name(), group.segments.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: CIGAR model, segments and their identity, loci
//! - [`parsing`]: SAM/BAM record source and SA tag parsing
//! - [`scanning`]: The record-source boundary and the segment extractor
//! - [`grouping`]: Union-find and segment grouping
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod grouping;
pub mod parsing;
pub mod scanning;

// Re-export commonly used types for convenience
pub use crate::core::locus::Locus;
pub use crate::core::segment::{RawSegment, Segment};
pub use crate::core::types::Strand;
pub use grouping::groups::{group_segments, SegmentGroup};
pub use grouping::union_find::UnionFind;
pub use scanning::scanner::{extract, ScanError, ScanOptions};
