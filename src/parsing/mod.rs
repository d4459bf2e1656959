//! Parsers for alignment inputs.
//!
//! This module provides:
//!
//! - **SAM/BAM files**: [`sam::AlignmentFile`], a record source backed by noodles
//! - **SA tags**: [`sa::parse_sa_tag`], the supplementary alignment grammar
//!
//! ## SA tag format
//!
//! `entry(;entry)*`, each entry being comma-separated:
//!
//! | Field | Description | Used |
//! |-------|-------------|------|
//! | rname | Reference name | Yes |
//! | pos   | 1-based position | Yes |
//! | strand | `+` or `-` | Yes |
//! | CIGAR | Alignment of this part of the read | Yes |
//! | mapQ  | Mapping quality | No |
//! | NM    | Edit distance | No |
//!
//! ## Example
//!
//! ```rust
//! use split_segments::parsing::sa::parse_sa_tag;
//!
//! let entries = parse_sa_tag("chr2,500,-,20M5S,60,0;").unwrap();
//! assert_eq!(entries.len(), 1);
//! assert_eq!(entries[0].cigar, "20M5S");
//! ```

pub mod sa;
pub mod sam;
