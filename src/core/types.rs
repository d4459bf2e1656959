use serde::{Deserialize, Serialize};

/// Orientation of an alignment relative to the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    /// Strand implied by a SAM reverse-complement flag
    #[must_use]
    pub fn from_reverse_flag(is_reverse_complemented: bool) -> Self {
        if is_reverse_complemented {
            Self::Reverse
        } else {
            Self::Forward
        }
    }

    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(self, Self::Reverse)
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Forward => '+',
            Self::Reverse => '-',
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Forward => "+",
            Self::Reverse => "-",
        })
    }
}

/// Error for a strand field that is neither `+` nor `-`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid strand '{0}': expected '+' or '-'")]
pub struct InvalidStrand(pub String);

impl std::str::FromStr for Strand {
    type Err = InvalidStrand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Forward),
            "-" => Ok(Self::Reverse),
            other => Err(InvalidStrand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_round_trips_through_text() {
        assert_eq!("+".parse::<Strand>().unwrap(), Strand::Forward);
        assert_eq!("-".parse::<Strand>().unwrap(), Strand::Reverse);
        assert_eq!(Strand::Reverse.to_string(), "-");
        assert!("*".parse::<Strand>().is_err());
    }

    #[test]
    fn test_strand_serializes_as_symbol() {
        let json = serde_json::to_string(&Strand::Reverse).unwrap();
        assert_eq!(json, "\"-\"");
        let back: Strand = serde_json::from_str("\"+\"").unwrap();
        assert_eq!(back, Strand::Forward);
    }

    #[test]
    fn test_from_reverse_flag() {
        assert_eq!(Strand::from_reverse_flag(true), Strand::Reverse);
        assert!(!Strand::from_reverse_flag(false).is_reverse());
    }
}
