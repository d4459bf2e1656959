use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::core::segment::{RawSegment, Segment, SegmentSet};
use crate::grouping::union_find::UnionFind;

/// A cluster of segments whose reference intervals overlap
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentGroup {
    pub chrom: String,
    /// Smallest 1-based start among the members
    pub start: u64,
    /// Largest exclusive end among the members
    pub end: u64,
    /// Members sorted by position
    pub segments: Vec<Segment>,
}

impl SegmentGroup {
    /// Display name, `chrom:start-end` with an inclusive end
    #[must_use]
    pub fn name(&self) -> String {
        format!("{}:{}-{}", self.chrom, self.start, self.end.saturating_sub(1))
    }

    #[must_use]
    pub fn width(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// Keep only segments whose read contributed more than one segment
#[must_use]
pub fn drop_singletons(segments: Vec<RawSegment>) -> Vec<RawSegment> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for segment in &segments {
        *counts.entry(segment.readid.clone()).or_default() += 1;
    }

    let before = segments.len();
    let kept: Vec<RawSegment> = segments
        .into_iter()
        .filter(|s| counts.get(&s.readid).copied().unwrap_or(0) > 1)
        .collect();
    debug!(
        dropped = before - kept.len(),
        "Dropped segments of single-segment reads"
    );
    kept
}

/// Apply the `include_singletons` option to an extraction result
#[must_use]
pub fn apply_singleton_policy(
    segments: Vec<RawSegment>,
    include_singletons: bool,
) -> Vec<RawSegment> {
    if include_singletons {
        segments
    } else {
        drop_singletons(segments)
    }
}

/// Cluster segments into groups of transitively overlapping reference intervals.
///
/// Only segments on the same chromosome can share a group. Groups come out in
/// order of chromosome first appearance, then start position.
#[must_use]
pub fn group_segments(segments: &[RawSegment]) -> Vec<SegmentGroup> {
    let mut unique = SegmentSet::new();
    unique.extend(segments.iter().cloned());
    let segments: Vec<Segment> = unique.into_vec().into_iter().map(Segment::from).collect();

    let mut chrom_order: Vec<&str> = Vec::new();
    let mut by_chrom: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, segment) in segments.iter().enumerate() {
        let chrom = segment.raw.chrom.as_str();
        by_chrom
            .entry(chrom)
            .or_insert_with(|| {
                chrom_order.push(chrom);
                Vec::new()
            })
            .push(idx);
    }

    // Registration order drives group order, so sweep chromosomes in order of
    // appearance and positions in ascending order.
    let mut uf = UnionFind::new();
    for chrom in &chrom_order {
        let mut members = by_chrom.remove(chrom).unwrap_or_default();
        members.sort_by_key(|&idx| (segments[idx].raw.pos, segments[idx].raw.end()));

        let mut open: Option<(usize, u64)> = None;
        for idx in members {
            let segment = &segments[idx];
            uf.find(&segment.id);
            open = match open {
                Some((anchor, end)) if segment.raw.pos < end => {
                    uf.union(&segments[anchor].id, &segment.id);
                    Some((anchor, end.max(segment.raw.end())))
                }
                _ => Some((idx, segment.raw.end())),
            };
        }
    }

    let position: HashMap<&str, usize> = segments
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.id.as_str(), idx))
        .collect();

    let groups: Vec<SegmentGroup> = uf
        .groups()
        .into_iter()
        .filter_map(|ids| {
            let mut members: Vec<Segment> = ids
                .iter()
                .filter_map(|id| position.get(id.as_str()).map(|&idx| segments[idx].clone()))
                .collect();
            members.sort_by(|a, b| {
                (a.raw.pos, &a.raw.readid, a.raw.offset).cmp(&(
                    b.raw.pos,
                    &b.raw.readid,
                    b.raw.offset,
                ))
            });
            let first = members.first()?;
            let chrom = first.raw.chrom.clone();
            let start = members.iter().map(|s| s.raw.pos).min()?;
            let end = members.iter().map(|s| s.raw.end()).max()?;
            Some(SegmentGroup {
                chrom,
                start,
                end,
                segments: members,
            })
        })
        .collect();

    debug!(
        segments = segments.len(),
        groups = groups.len(),
        "Grouped segments by reference overlap"
    );

    groups
}
