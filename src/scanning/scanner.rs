use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::cigar::{split_cigar, CigarError};
use crate::core::locus::Locus;
use crate::core::segment::{RawSegment, SegmentSet};
use crate::parsing::sa::{parse_sa_tag, AlignmentDescriptor, SaTagError};
use crate::scanning::source::{AlignmentRecord, RecordSource, RecordStream, SourceError};

/// Default cap on records examined per locus
pub const DEFAULT_MAX_READS: usize = 2000;

/// Progress callback: receives the record count for the current locus and,
/// once a record has been placed, its chromosome and 1-based position.
/// Returning `true` cancels the scan.
pub type ProgressFn = Box<dyn FnMut(usize, Option<(&str, u64)>) -> bool + Send>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Progress callback aborted the scan after {records} alignment records")]
    Aborted { records: usize },

    #[error("Malformed CIGAR '{cigar}' for read '{read}': {source}")]
    MalformedCigar {
        read: String,
        cigar: String,
        #[source]
        source: CigarError,
    },

    #[error("Malformed SA tag for read '{read}': {source}")]
    MalformedSaTag {
        read: String,
        #[source]
        source: SaTagError,
    },

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Options controlling a scan
pub struct ScanOptions {
    /// Maximum records examined per locus; 0 means unlimited
    pub max_reads: usize,

    /// Keep reads that produced a single segment. Extraction always returns
    /// every segment; this is honoured by
    /// [`crate::grouping::groups::apply_singleton_policy`].
    pub include_singletons: bool,

    pub progress: Option<ProgressFn>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_reads: DEFAULT_MAX_READS,
            include_singletons: false,
            progress: None,
        }
    }
}

impl std::fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanOptions")
            .field("max_reads", &self.max_reads)
            .field("include_singletons", &self.include_singletons)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl ScanOptions {
    #[must_use]
    pub fn with_max_reads(mut self, max_reads: usize) -> Self {
        self.max_reads = max_reads;
        self
    }

    #[must_use]
    pub fn with_include_singletons(mut self, include_singletons: bool) -> Self {
        self.include_singletons = include_singletons;
        self
    }

    #[must_use]
    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: FnMut(usize, Option<(&str, u64)>) -> bool + Send + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    fn check_progress(
        &mut self,
        records: usize,
        at: Option<(&str, u64)>,
    ) -> Result<(), ScanError> {
        if let Some(progress) = self.progress.as_mut() {
            if progress(records, at) {
                return Err(ScanError::Aborted { records });
            }
        }
        Ok(())
    }
}

/// Expand one record into the segments of every alignment it describes:
/// its own primary alignment plus each entry of its SA tag.
///
/// # Errors
///
/// Returns `ScanError::MalformedSaTag` if the SA tag cannot be parsed and
/// `ScanError::MalformedCigar` if any alignment's CIGAR is malformed.
pub fn record_segments(record: &AlignmentRecord) -> Result<Vec<RawSegment>, ScanError> {
    let mut descriptors = vec![AlignmentDescriptor::new(
        &record.chrom,
        record.start + 1,
        record.strand(),
        &record.cigar,
    )];

    if let Some(sa_tag) = &record.sa_tag {
        let entries = parse_sa_tag(sa_tag).map_err(|source| ScanError::MalformedSaTag {
            read: record.name.clone(),
            source,
        })?;
        for entry in entries {
            if !descriptors.contains(&entry) {
                descriptors.push(entry);
            }
        }
    }

    let mut segments = Vec::with_capacity(descriptors.len());
    for descriptor in &descriptors {
        let splits = split_cigar(&descriptor.cigar, descriptor.strand).map_err(|source| {
            ScanError::MalformedCigar {
                read: record.name.clone(),
                cigar: descriptor.cigar.clone(),
                source,
            }
        })?;
        segments.extend(splits.into_iter().map(|split| RawSegment {
            readid: record.name.clone(),
            chrom: descriptor.chrom.clone(),
            pos: descriptor.pos + split.clip_ref_len,
            strand: descriptor.strand,
            offset: split.clip_query_len,
            rlen: split.core_ref_len,
            qlen: split.core_query_len,
        }));
    }

    Ok(segments)
}

/// Extract the deduplicated segments of every read overlapping `loci`.
///
/// Loci are scanned in order. Unmapped and secondary records are skipped;
/// primary and supplementary alignments (the latter via the SA tag) become
/// segments. Segments with no reference or query extent are dropped, and each
/// segment identity is kept once, at its first occurrence.
///
/// # Errors
///
/// Returns `ScanError::Aborted` if the progress callback cancels the scan,
/// `ScanError::MalformedCigar` / `ScanError::MalformedSaTag` for bad alignment
/// descriptors, and `ScanError::Source` if the record source fails. No partial
/// result is returned on error.
pub async fn extract<S: RecordSource>(
    source: &mut S,
    loci: &[Locus],
    mut options: ScanOptions,
) -> Result<Vec<RawSegment>, ScanError> {
    let mut accumulated = SegmentSet::new();

    for locus in loci {
        let (start, end) = locus.query_bounds();
        let mut records = 0usize;

        options.check_progress(records, None)?;

        let mut stream = source.query(&locus.chrom, start, end).await?;
        'stream: while let Some(batch) = stream.next_batch().await? {
            for record in batch {
                records += 1;
                if options.max_reads > 0 && records > options.max_reads {
                    warn!(
                        locus = %locus,
                        max_reads = options.max_reads,
                        "Too many alignment records for locus, skipping the rest"
                    );
                    break 'stream;
                }

                if record.is_unmapped {
                    continue;
                }
                let pos = record.start + 1;
                options.check_progress(records, Some((locus.chrom.as_str(), pos)))?;
                if record.is_secondary {
                    continue;
                }

                accumulated.extend(record_segments(&record)?);
            }
        }

        debug!(
            locus = %locus,
            records,
            segments = accumulated.len(),
            "Finished scanning locus"
        );
    }

    let segments: Vec<RawSegment> = accumulated
        .into_vec()
        .into_iter()
        .filter(RawSegment::is_valid)
        .collect();

    info!(
        loci = loci.len(),
        segments = segments.len(),
        "Extracted alignment segments"
    );

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Strand;

    #[test]
    fn test_record_segments_primary_only() {
        let record = AlignmentRecord::new("read1", "chr1", 99, "10S40M");
        let segments = record_segments(&record).unwrap();
        assert_eq!(
            segments,
            vec![RawSegment {
                readid: "read1".to_string(),
                chrom: "chr1".to_string(),
                pos: 100,
                strand: Strand::Forward,
                offset: 10,
                rlen: 40,
                qlen: 40,
            }]
        );
    }

    #[test]
    fn test_record_segments_with_supplementary() {
        let record = AlignmentRecord::new("read1", "chr1", 99, "30M20S")
            .with_sa_tag("chr2,500,-,20M30S,60,0;");
        let segments = record_segments(&record).unwrap();
        assert_eq!(segments.len(), 2);

        let supplementary = &segments[1];
        assert_eq!(supplementary.chrom, "chr2");
        assert_eq!(supplementary.pos, 500);
        assert_eq!(supplementary.strand, Strand::Reverse);
        // reverse strand: the trailing 30S is the leading clip in read orientation
        assert_eq!(supplementary.offset, 30);
        assert_eq!((supplementary.rlen, supplementary.qlen), (20, 20));
    }

    #[test]
    fn test_record_segments_collapses_repeated_descriptors() {
        let record = AlignmentRecord::new("read1", "chr1", 99, "30M20S")
            .with_sa_tag("chr1,100,+,30M20S,60,0;chr1,100,+,30M20S,60,0;");
        assert_eq!(record_segments(&record).unwrap().len(), 1);
    }

    #[test]
    fn test_record_segments_reports_bad_input() {
        let record = AlignmentRecord::new("read1", "chr1", 0, "10S");
        assert!(matches!(
            record_segments(&record),
            Err(ScanError::MalformedCigar { .. })
        ));

        let record =
            AlignmentRecord::new("read1", "chr1", 0, "10M").with_sa_tag("chr2,x,+,5M");
        assert!(matches!(
            record_segments(&record),
            Err(ScanError::MalformedSaTag { .. })
        ));
    }

    #[test]
    fn test_default_options() {
        let options = ScanOptions::default();
        assert_eq!(options.max_reads, DEFAULT_MAX_READS);
        assert!(!options.include_singletons);
        assert!(options.progress.is_none());
        assert!(format!("{options:?}").contains("max_reads: 2000"));
    }
}
