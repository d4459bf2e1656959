//! Core data types for split-read segment extraction.
//!
//! - [`cigar`]: CIGAR tokenizing, measuring and clip-aware splitting
//! - [`segment::RawSegment`] / [`segment::Segment`]: an aligned block of a read and its identity
//! - [`locus::Locus`]: a requested genomic interval
//! - [`types::Strand`]: alignment orientation
//!
//! ## Coordinates
//!
//! | Value | Convention |
//! |-------|------------|
//! | `Locus::start` | 1-based, inclusive |
//! | `Locus::end` | 1-based, inclusive (exclusive once converted to 0-based) |
//! | `RawSegment::pos` | 1-based |
//! | `AlignmentRecord::start` | 0-based |

pub mod cigar;
pub mod locus;
pub mod segment;
pub mod types;
