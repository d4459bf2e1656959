use thiserror::Error;

use crate::core::types::{InvalidStrand, Strand};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaTagError {
    #[error("SA entry '{0}' has fewer than 4 fields")]
    TooFewFields(String),

    #[error("SA entry '{entry}' has invalid position '{pos}'")]
    InvalidPosition { entry: String, pos: String },

    #[error("SA entry '{entry}': {source}")]
    InvalidStrand {
        entry: String,
        #[source]
        source: InvalidStrand,
    },
}

/// Largest 1-based position a SAM record can carry
pub const MAX_POSITION: u64 = (1 << 31) - 1;

/// Where one alignment of a read sits: the primary record itself or one SA entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlignmentDescriptor {
    pub chrom: String,
    /// 1-based reference position
    pub pos: u64,
    pub strand: Strand,
    pub cigar: String,
}

impl AlignmentDescriptor {
    pub fn new(
        chrom: impl Into<String>,
        pos: u64,
        strand: Strand,
        cigar: impl Into<String>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            strand,
            cigar: cigar.into(),
        }
    }
}

/// Parse one `chrom,pos,strand,cigar[,mapq,edits]` entry.
/// Fields past the fourth are ignored.
fn parse_entry(entry: &str) -> Result<AlignmentDescriptor, SaTagError> {
    let fields: Vec<&str> = entry.split(',').collect();
    let [chrom, pos, strand, cigar, ..] = fields.as_slice() else {
        return Err(SaTagError::TooFewFields(entry.to_string()));
    };

    let pos = pos
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|p| (1..=MAX_POSITION).contains(p))
        .ok_or_else(|| SaTagError::InvalidPosition {
            entry: entry.to_string(),
            pos: (*pos).to_string(),
        })?;
    let strand = strand
        .trim()
        .parse::<Strand>()
        .map_err(|source| SaTagError::InvalidStrand {
            entry: entry.to_string(),
            source,
        })?;

    Ok(AlignmentDescriptor::new(*chrom, pos, strand, *cigar))
}

/// Parse a whole SA tag value: `entry(;entry)*`, empty entries skipped
///
/// # Errors
///
/// Returns `SaTagError` for the first entry that has fewer than four fields,
/// a position outside `1..=MAX_POSITION`, or an unknown strand.
pub fn parse_sa_tag(value: &str) -> Result<Vec<AlignmentDescriptor>, SaTagError> {
    value
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sa_tag_with_trailing_separator() {
        let entries = parse_sa_tag("chr2,500,-,20M5S,60,0;").unwrap();
        assert_eq!(
            entries,
            vec![AlignmentDescriptor::new("chr2", 500, Strand::Reverse, "20M5S")]
        );
    }

    #[test]
    fn test_parse_sa_tag_multiple_entries() {
        let entries = parse_sa_tag("chr1,100,+,30M20S,60,1;;chrX,9000,-,25S25M,12,3;").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].chrom, "chr1");
        assert_eq!(entries[0].strand, Strand::Forward);
        assert_eq!(entries[1].pos, 9000);
        assert_eq!(entries[1].cigar, "25S25M");
    }

    #[test]
    fn test_parse_sa_tag_minimal_fields() {
        let entries = parse_sa_tag("chr3,7,+,10M").unwrap();
        assert_eq!(entries, vec![AlignmentDescriptor::new("chr3", 7, Strand::Forward, "10M")]);
    }

    #[test]
    fn test_parse_sa_tag_empty() {
        assert!(parse_sa_tag("").unwrap().is_empty());
        assert!(parse_sa_tag(";;").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sa_tag_errors() {
        assert!(matches!(
            parse_sa_tag("chr1,100,+"),
            Err(SaTagError::TooFewFields(_))
        ));
        assert!(matches!(
            parse_sa_tag("chr1,abc,+,10M,60,0"),
            Err(SaTagError::InvalidPosition { .. })
        ));
        assert!(matches!(
            parse_sa_tag("chr1,100,.,10M,60,0"),
            Err(SaTagError::InvalidStrand { .. })
        ));
    }

    #[test]
    fn test_parse_sa_tag_position_range() {
        let entries = parse_sa_tag("chr1,2147483647,+,10M").unwrap();
        assert_eq!(entries[0].pos, MAX_POSITION);
        for pos in ["0", "2147483648", "18446744073709551615", "-5"] {
            let tag = format!("chr1,{pos},+,10M,60,0;");
            assert!(
                matches!(parse_sa_tag(&tag), Err(SaTagError::InvalidPosition { .. })),
                "{tag}"
            );
        }
    }
}
