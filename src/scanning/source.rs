//! The record-source boundary.
//!
//! The extractor never touches files directly. It asks a [`RecordSource`] for
//! the records on one reference interval and drains the returned
//! [`RecordStream`] batch by batch; every batch is a suspension point.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::core::cigar::{lengths, parse_cigar};
use crate::core::types::Strand;

/// Default number of records per batch
pub const DEFAULT_BATCH_SIZE: usize = 1024;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid query region: {0}")]
    InvalidRegion(String),

    #[error("Unknown reference sequence: {0}")]
    UnknownReference(String),

    #[error("Invalid alignment record: {0}")]
    InvalidRecord(String),
}

/// The fields of an alignment record that segment extraction reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    /// Read name (QNAME)
    pub name: String,
    /// Reference sequence name (RNAME)
    pub chrom: String,
    /// 0-based alignment start
    pub start: u64,
    pub is_unmapped: bool,
    pub is_secondary: bool,
    pub is_reverse_complemented: bool,
    pub cigar: String,
    /// Raw SA tag value, if present
    pub sa_tag: Option<String>,
}

impl AlignmentRecord {
    /// A mapped, primary, forward-strand record
    pub fn new(
        name: impl Into<String>,
        chrom: impl Into<String>,
        start: u64,
        cigar: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            chrom: chrom.into(),
            start,
            is_unmapped: false,
            is_secondary: false,
            is_reverse_complemented: false,
            cigar: cigar.into(),
            sa_tag: None,
        }
    }

    #[must_use]
    pub fn reverse(mut self) -> Self {
        self.is_reverse_complemented = true;
        self
    }

    #[must_use]
    pub fn unmapped(mut self) -> Self {
        self.is_unmapped = true;
        self
    }

    #[must_use]
    pub fn secondary(mut self) -> Self {
        self.is_secondary = true;
        self
    }

    #[must_use]
    pub fn with_sa_tag(mut self, sa_tag: impl Into<String>) -> Self {
        self.sa_tag = Some(sa_tag.into());
        self
    }

    #[must_use]
    pub fn strand(&self) -> Strand {
        Strand::from_reverse_flag(self.is_reverse_complemented)
    }

    /// 0-based exclusive end on the reference.
    ///
    /// Records whose CIGAR cannot be measured are given a span of one base so
    /// they still reach the extractor, which reports the malformed CIGAR.
    #[must_use]
    pub fn reference_end(&self) -> u64 {
        let span = parse_cigar(&self.cigar)
            .map(|ops| lengths(&ops).0)
            .unwrap_or(0);
        self.start.saturating_add(span.max(1))
    }

    /// Whether the record touches the 0-based half-open interval `[start, end)`
    #[must_use]
    pub fn overlaps(&self, chrom: &str, start: u64, end: u64) -> bool {
        self.chrom == chrom && self.start < end && self.reference_end() > start
    }
}

/// A stream of record batches for one queried interval
#[allow(async_fn_in_trait)]
pub trait RecordStream {
    /// Next batch of records, or `None` once the stream is exhausted
    async fn next_batch(&mut self) -> Result<Option<Vec<AlignmentRecord>>, SourceError>;
}

/// Something that can stream alignment records for a reference interval
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    type Stream: RecordStream;

    /// Open a stream over records on `chrom` overlapping 0-based `[start, end)`
    async fn query(&mut self, chrom: &str, start: u64, end: u64)
        -> Result<Self::Stream, SourceError>;
}

/// Records held in memory, grouped by reference
#[derive(Debug, Clone)]
pub struct MemorySource {
    records: HashMap<String, Vec<AlignmentRecord>>,
    batch_size: usize,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = AlignmentRecord>) -> Self {
        let mut source = Self::new();
        for record in records {
            source.push(record);
        }
        source
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn push(&mut self, record: AlignmentRecord) {
        self.records
            .entry(record.chrom.clone())
            .or_default()
            .push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSource for MemorySource {
    type Stream = BatchedRecords;

    async fn query(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<Self::Stream, SourceError> {
        let matching: Vec<AlignmentRecord> = self
            .records
            .get(chrom)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.overlaps(chrom, start, end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            chrom,
            start,
            end,
            records = matching.len(),
            "Opened in-memory record stream"
        );

        Ok(BatchedRecords::new(matching, self.batch_size))
    }
}

/// Hands out pre-collected records in fixed-size batches
#[derive(Debug)]
pub struct BatchedRecords {
    records: std::vec::IntoIter<AlignmentRecord>,
    batch_size: usize,
}

impl BatchedRecords {
    #[must_use]
    pub fn new(records: Vec<AlignmentRecord>, batch_size: usize) -> Self {
        Self {
            records: records.into_iter(),
            batch_size: batch_size.max(1),
        }
    }
}

impl RecordStream for BatchedRecords {
    async fn next_batch(&mut self) -> Result<Option<Vec<AlignmentRecord>>, SourceError> {
        tokio::task::yield_now().await;
        let batch: Vec<AlignmentRecord> = self.records.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_end() {
        assert_eq!(AlignmentRecord::new("r", "chr1", 100, "10S40M2D").reference_end(), 142);
        assert_eq!(AlignmentRecord::new("r", "chr1", 100, "*").reference_end(), 101);
    }

    #[test]
    fn test_overlaps() {
        let record = AlignmentRecord::new("r", "chr1", 100, "50M");
        assert!(record.overlaps("chr1", 0, 101));
        assert!(record.overlaps("chr1", 149, 200));
        assert!(!record.overlaps("chr1", 150, 200));
        assert!(!record.overlaps("chr1", 0, 100));
        assert!(!record.overlaps("chr2", 0, 1000));
    }

    #[tokio::test]
    async fn test_memory_source_batches() {
        let mut source = MemorySource::from_records(
            (0..5).map(|i| AlignmentRecord::new(format!("r{i}"), "chr1", i * 10, "10M")),
        )
        .with_batch_size(2);
        source.push(AlignmentRecord::new("other", "chr2", 0, "10M"));
        assert_eq!(source.len(), 6);

        let mut stream = source.query("chr1", 0, 1000).await.unwrap();
        let mut sizes = Vec::new();
        while let Some(batch) = stream.next_batch().await.unwrap() {
            sizes.push(batch.len());
        }
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn test_memory_source_filters_interval() {
        let mut source = MemorySource::from_records(vec![
            AlignmentRecord::new("a", "chr1", 0, "10M"),
            AlignmentRecord::new("b", "chr1", 500, "10M"),
        ]);
        let mut stream = source.query("chr1", 400, 600).await.unwrap();
        let batch = stream.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].name, "b");
        assert!(stream.next_batch().await.unwrap().is_none());

        let mut empty = source.query("chrUn", 0, 10).await.unwrap();
        assert!(empty.next_batch().await.unwrap().is_none());
    }
}
