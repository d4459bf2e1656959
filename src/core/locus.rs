use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocusError {
    #[error("Invalid locus '{0}': expected chrom:start-end")]
    InvalidFormat(String),

    #[error("Invalid coordinate '{0}' in locus")]
    InvalidCoordinate(String),

    #[error("Locus start must be at least 1, got {0}")]
    ZeroStart(u64),

    #[error("Locus end {end} must not be less than start {start}")]
    EndBeforeStart { start: u64, end: u64 },
}

/// A requested genomic interval, 1-based with inclusive start
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locus {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Locus {
    pub fn new(chrom: impl Into<String>, start: u64, end: u64) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// 0-based half-open bounds `[start - 1, end)` used when querying a record source
    #[must_use]
    pub fn query_bounds(&self) -> (u64, u64) {
        (self.start.saturating_sub(1), self.end)
    }
}

impl std::fmt::Display for Locus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start, self.end)
    }
}

fn parse_coordinate(s: &str) -> Result<u64, LocusError> {
    let digits: String = s.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(LocusError::InvalidCoordinate(s.to_string()));
    }
    digits
        .parse()
        .map_err(|_| LocusError::InvalidCoordinate(s.to_string()))
}

impl std::str::FromStr for Locus {
    type Err = LocusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (chrom, range) = s
            .rsplit_once(':')
            .ok_or_else(|| LocusError::InvalidFormat(s.to_string()))?;
        if chrom.is_empty() || chrom.contains(':') {
            return Err(LocusError::InvalidFormat(s.to_string()));
        }
        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| LocusError::InvalidFormat(s.to_string()))?;

        let start = parse_coordinate(start)?;
        let end = parse_coordinate(end)?;
        if start == 0 {
            return Err(LocusError::ZeroStart(start));
        }
        if end < start {
            return Err(LocusError::EndBeforeStart { start, end });
        }

        Ok(Self::new(chrom, start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locus() {
        let locus: Locus = "chr1:1,000-2,500".parse().unwrap();
        assert_eq!(locus, Locus::new("chr1", 1000, 2500));
        assert_eq!(locus.to_string(), "chr1:1000-2500");
        assert_eq!(locus.query_bounds(), (999, 2500));
    }

    #[test]
    fn test_parse_locus_accepts_non_ucsc_names() {
        assert_eq!("MT:5-10".parse::<Locus>().unwrap(), Locus::new("MT", 5, 10));
        assert_eq!(
            "GL000220.1:1-161802".parse::<Locus>().unwrap(),
            Locus::new("GL000220.1", 1, 161_802)
        );
        // colons are reserved for the range separator
        assert!("HLA-A*01:01:5-10".parse::<Locus>().is_err());
    }

    #[test]
    fn test_parse_locus_errors() {
        assert!(matches!(
            "chr1".parse::<Locus>(),
            Err(LocusError::InvalidFormat(_))
        ));
        assert!(matches!(
            "chr1:10".parse::<Locus>(),
            Err(LocusError::InvalidFormat(_))
        ));
        assert!(matches!(
            "chr1:a-10".parse::<Locus>(),
            Err(LocusError::InvalidCoordinate(_))
        ));
        assert_eq!("chr1:0-10".parse::<Locus>(), Err(LocusError::ZeroStart(0)));
        assert_eq!(
            "chr1:20-10".parse::<Locus>(),
            Err(LocusError::EndBeforeStart { start: 20, end: 10 })
        );
    }
}
