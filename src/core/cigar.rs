//! CIGAR tokenizing, measuring and clip-aware splitting.
//!
//! A segment's placement is derived from its CIGAR string in three steps:
//!
//! 1. The string is tokenized into `(operation, length)` pairs.
//! 2. For reverse-strand alignments the tokens are reversed, so that clips are
//!    read in the orientation the read was sequenced in rather than the
//!    reference orientation SAM reports.
//! 3. At most one leading and one trailing clip token are peeled off; the rest
//!    is the segment's core, which is measured and compressed to a net
//!    match/indel summary.
//!
//! | Op | Reference | Query |
//! |----|-----------|-------|
//! | M  | yes       | yes   |
//! | I  | no        | yes   |
//! | D  | yes       | no    |
//! | S  | no        | yes   |
//! | H  | no        | yes   |
//! | other | no     | no    |

use thiserror::Error;

use crate::core::types::Strand;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CigarError {
    #[error("CIGAR string is empty")]
    Empty,

    #[error("Operation '{op}' at offset {offset} has no length")]
    MissingLength { op: char, offset: usize },

    #[error("Length '{0}' is not followed by an operation")]
    MissingOperation(String),

    #[error("Operation length '{0}' is out of range")]
    LengthOutOfRange(String),

    #[error("Operation '{0}' has zero length")]
    ZeroLength(char),

    #[error("No operations remain after removing the leading clip")]
    NoCoreOperations,
}

/// Operation kind. Anything outside the basic vocabulary is kept as `Other`
/// and contributes to neither reference nor query length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Match,
    Insertion,
    Deletion,
    SoftClip,
    HardClip,
    Other(char),
}

impl Kind {
    /// Classify an operation letter, case-insensitively
    #[must_use]
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'M' => Self::Match,
            'I' => Self::Insertion,
            'D' => Self::Deletion,
            'S' => Self::SoftClip,
            'H' => Self::HardClip,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Insertion => 'I',
            Self::Deletion => 'D',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Other(c) => c,
        }
    }

    #[must_use]
    pub fn is_clip(self) -> bool {
        matches!(self, Self::SoftClip | Self::HardClip)
    }

    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(self, Self::Match | Self::Deletion)
    }

    #[must_use]
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            Self::Match | Self::Insertion | Self::SoftClip | Self::HardClip
        )
    }
}

/// A single `(operation, length)` token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Op {
    pub kind: Kind,
    pub len: u32,
}

impl Op {
    #[must_use]
    pub fn new(kind: Kind, len: u32) -> Self {
        Self { kind, len }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.len, self.kind.as_char())
    }
}

/// Tokenize a CIGAR string into operations, in string order.
///
/// # Errors
///
/// Returns `CigarError::Empty` for a blank string, `CigarError::MissingLength`
/// when an operation letter has no digits before it, `CigarError::MissingOperation`
/// for trailing digits, `CigarError::ZeroLength` for a zero-length token and
/// `CigarError::LengthOutOfRange` if a length does not fit in 32 bits.
pub fn parse_cigar(cigar: &str) -> Result<Vec<Op>, CigarError> {
    let cigar = cigar.trim();
    if cigar.is_empty() {
        return Err(CigarError::Empty);
    }

    let mut ops = Vec::new();
    let mut digits_start: Option<usize> = None;

    for (offset, c) in cigar.char_indices() {
        if c.is_ascii_digit() {
            digits_start.get_or_insert(offset);
            continue;
        }

        let Some(start) = digits_start.take() else {
            return Err(CigarError::MissingLength { op: c, offset });
        };
        let digits = &cigar[start..offset];
        let len: u32 = digits
            .parse()
            .map_err(|_| CigarError::LengthOutOfRange(digits.to_string()))?;
        let kind = Kind::from_char(c);
        if len == 0 {
            return Err(CigarError::ZeroLength(kind.as_char()));
        }
        ops.push(Op::new(kind, len));
    }

    if let Some(start) = digits_start {
        return Err(CigarError::MissingOperation(cigar[start..].to_string()));
    }

    Ok(ops)
}

/// Render operations back into CIGAR text
#[must_use]
pub fn format_ops(ops: &[Op]) -> String {
    ops.iter().map(ToString::to_string).collect()
}

/// Reference and query lengths consumed by a token sequence
#[must_use]
pub fn lengths(ops: &[Op]) -> (u64, u64) {
    ops.iter().fold((0, 0), |(ref_len, query_len), op| {
        let len = u64::from(op.len);
        (
            ref_len + if op.kind.consumes_reference() { len } else { 0 },
            query_len + if op.kind.consumes_query() { len } else { 0 },
        )
    })
}

/// Collapse a token sequence into total matches plus a single net indel.
///
/// Fine-grained indel structure is discarded; only net lengths survive.
#[must_use]
pub fn compress(ops: &[Op]) -> Vec<Op> {
    let mut matched: u64 = 0;
    let mut delta: i64 = 0;
    for op in ops {
        match op.kind {
            Kind::Match => matched += u64::from(op.len),
            Kind::Insertion => delta += i64::from(op.len),
            Kind::Deletion => delta -= i64::from(op.len),
            _ => {}
        }
    }

    let mut compressed = vec![Op::new(Kind::Match, saturate(matched))];
    match delta.cmp(&0) {
        std::cmp::Ordering::Greater => {
            compressed.push(Op::new(Kind::Insertion, saturate(delta.unsigned_abs())));
        }
        std::cmp::Ordering::Less => {
            compressed.push(Op::new(Kind::Deletion, saturate(delta.unsigned_abs())));
        }
        std::cmp::Ordering::Equal => {}
    }
    compressed
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Reverse token order for reverse-strand alignments
#[must_use]
pub fn orient(mut ops: Vec<Op>, strand: Strand) -> Vec<Op> {
    if strand.is_reverse() {
        ops.reverse();
    }
    ops
}

/// One aligned block carved out of a CIGAR string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSegment {
    /// Reference length of the leading clip
    pub clip_ref_len: u64,
    /// Query length of the leading clip; the block's offset within the read
    pub clip_query_len: u64,
    /// Compressed core operations
    pub core: Vec<Op>,
    pub core_ref_len: u64,
    pub core_query_len: u64,
}

impl SplitSegment {
    #[must_use]
    pub fn core_cigar(&self) -> String {
        format_ops(&self.core)
    }
}

/// Split a CIGAR string into the aligned blocks it describes.
///
/// Only linear alignments are interpreted, so the result currently always
/// holds exactly one block. Skipped-reference operators are where a
/// multi-block split would come from.
///
/// # Errors
///
/// Returns a tokenizing error from [`parse_cigar`], or
/// `CigarError::NoCoreOperations` when nothing is left once the leading clip
/// has been removed.
pub fn split_cigar(cigar: &str, strand: Strand) -> Result<Vec<SplitSegment>, CigarError> {
    let mut ops = orient(parse_cigar(cigar)?, strand);

    let leading_clip = match ops.first() {
        Some(op) if op.kind.is_clip() => Some(ops.remove(0)),
        Some(_) => None,
        None => return Err(CigarError::Empty),
    };

    match ops.last() {
        Some(op) if op.kind.is_clip() => {
            ops.pop();
        }
        Some(_) => {}
        None => return Err(CigarError::NoCoreOperations),
    }

    let (clip_ref_len, clip_query_len) = leading_clip.map_or((0, 0), |op| lengths(&[op]));
    let (core_ref_len, core_query_len) = lengths(&ops);

    Ok(vec![SplitSegment {
        clip_ref_len,
        clip_query_len,
        core: compress(&ops),
        core_ref_len,
        core_query_len,
    }])
}
