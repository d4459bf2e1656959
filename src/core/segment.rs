use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::types::Strand;

/// Separator between fields of a segment identity.
/// SAM read names and reference names never contain tabs.
pub const IDENTITY_SEPARATOR: char = '\t';

/// One contiguous aligned block of a read, after clip removal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSegment {
    pub readid: String,
    pub chrom: String,
    /// 1-based reference position where the aligned block begins
    pub pos: u64,
    pub strand: Strand,
    /// Query offset of the block, including any leading clip
    pub offset: u64,
    /// Reference length of the block
    pub rlen: u64,
    /// Query length of the block
    pub qlen: u64,
}

impl RawSegment {
    /// A segment with no reference or no query extent carries nothing alignable
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.rlen > 0 && self.qlen > 0
    }

    /// 1-based exclusive reference end of the block
    #[must_use]
    pub fn end(&self) -> u64 {
        self.pos.saturating_add(self.rlen)
    }

    /// Canonical identity; equal segments always yield equal identities
    #[must_use]
    pub fn identity(&self) -> String {
        let sep = IDENTITY_SEPARATOR;
        format!(
            "{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.readid, self.chrom, self.pos, self.strand, self.offset, self.rlen, self.qlen
        )
    }
}

/// A raw segment paired with its identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    #[serde(flatten)]
    pub raw: RawSegment,
}

impl From<RawSegment> for Segment {
    fn from(raw: RawSegment) -> Self {
        Self {
            id: raw.identity(),
            raw,
        }
    }
}

/// Insertion-ordered set of segments keyed by identity
#[derive(Debug, Clone, Default)]
pub struct SegmentSet {
    segments: Vec<RawSegment>,
    ids: HashSet<String>,
}

impl SegmentSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a segment unless one with the same identity is already present.
    /// Returns whether the segment was added.
    pub fn insert(&mut self, segment: RawSegment) -> bool {
        if self.ids.insert(segment.identity()) {
            self.segments.push(segment);
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    fn contains(&self, segment: &RawSegment) -> bool {
        self.ids.contains(&segment.identity())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[cfg(test)]
    fn iter(&self) -> impl Iterator<Item = &RawSegment> {
        self.segments.iter()
    }

    /// Segments in first-insertion order
    #[must_use]
    pub fn into_vec(self) -> Vec<RawSegment> {
        self.segments
    }
}

impl Extend<RawSegment> for SegmentSet {
    fn extend<T: IntoIterator<Item = RawSegment>>(&mut self, iter: T) {
        for segment in iter {
            self.insert(segment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(readid: &str, pos: u64) -> RawSegment {
        RawSegment {
            readid: readid.to_string(),
            chrom: "chr1".to_string(),
            pos,
            strand: Strand::Forward,
            offset: 10,
            rlen: 40,
            qlen: 40,
        }
    }

    #[test]
    fn test_identity_is_structural() {
        assert_eq!(raw("r1", 100).identity(), raw("r1", 100).identity());
        assert_ne!(raw("r1", 100).identity(), raw("r1", 101).identity());
        assert_ne!(raw("r1", 100).identity(), raw("r2", 100).identity());
    }

    #[test]
    fn test_identity_field_order() {
        assert_eq!(raw("r1", 100).identity(), "r1\tchr1\t100\t+\t10\t40\t40");
    }

    #[test]
    fn test_identity_does_not_confuse_dashes_in_names() {
        let mut a = raw("read-1", 100);
        a.chrom = "chr1".to_string();
        let mut b = raw("read", 100);
        b.chrom = "1-chr1".to_string();
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_end_saturates() {
        let mut seg = raw("r1", u64::MAX - 5);
        assert_eq!(seg.end(), u64::MAX);
        seg.pos = 100;
        assert_eq!(seg.end(), 140);
    }

    #[test]
    fn test_validity() {
        assert!(raw("r1", 1).is_valid());
        let mut zero = raw("r1", 1);
        zero.rlen = 0;
        assert!(!zero.is_valid());
        let mut zero = raw("r1", 1);
        zero.qlen = 0;
        assert!(!zero.is_valid());
    }

    #[test]
    fn test_segment_set_keeps_first_occurrence() {
        let mut set = SegmentSet::new();
        assert!(set.insert(raw("r2", 5)));
        assert!(set.insert(raw("r1", 100)));
        assert!(!set.insert(raw("r2", 5)));
        set.extend(vec![raw("r1", 100), raw("r3", 7)]);

        assert_eq!(set.len(), 3);
        assert!(set.contains(&raw("r3", 7)));
        let order: Vec<&str> = set.iter().map(|s| s.readid.as_str()).collect();
        assert_eq!(order, vec!["r2", "r1", "r3"]);
    }

    #[test]
    fn test_segment_serializes_flat() {
        let seg = Segment::from(raw("r1", 100));
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["readid"], "r1");
        assert_eq!(json["strand"], "+");
        assert_eq!(json["id"], seg.id);
    }
}
