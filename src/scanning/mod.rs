//! Segment extraction from streamed alignment records.
//!
//! - [`source`]: the record-source boundary and an in-memory implementation
//! - [`scanner`]: the extractor that turns records into deduplicated segments
//!
//! ## Example
//!
//! ```rust,no_run
//! use split_segments::scanning::scanner::{extract, ScanOptions};
//! use split_segments::scanning::source::{AlignmentRecord, MemorySource};
//! use split_segments::Locus;
//!
//! # async fn run() -> Result<(), split_segments::scanning::scanner::ScanError> {
//! let mut source = MemorySource::from_records(vec![
//!     AlignmentRecord::new("read1", "chr1", 99, "10S40M")
//!         .with_sa_tag("chr2,500,-,10M40S,60,0;"),
//! ]);
//! let loci = vec![Locus::new("chr1", 1, 1000)];
//! let segments = extract(&mut source, &loci, ScanOptions::default()).await?;
//! assert_eq!(segments.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod scanner;
pub mod source;
