use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use noodles::core::{Position, Region};
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::data::field::Value;
use noodles::sam::alignment::RecordBuf;
use noodles::{bam, csi, sam};
use tracing::debug;

use crate::scanning::source::{
    AlignmentRecord, RecordSource, RecordStream, SourceError, DEFAULT_BATCH_SIZE,
};

type RecordIter = Box<dyn Iterator<Item = Result<AlignmentRecord, SourceError>>>;

/// Alignment file container format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentFormat {
    Sam,
    Bam,
}

impl AlignmentFormat {
    /// Detect the format from a file extension
    ///
    /// # Errors
    ///
    /// Returns `SourceError::UnsupportedFormat` for anything but `.sam` or `.bam`.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("sam") => Ok(Self::Sam),
            Some("bam") => Ok(Self::Bam),
            Some(ext) => Err(SourceError::UnsupportedFormat(ext.to_string())),
            None => Err(SourceError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Locate a `.bai` or `.csi` index next to a BAM file
fn find_index(path: &Path) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    for ext in ["bai", "csi"] {
        let mut appended = path.as_os_str().to_owned();
        appended.push(format!(".{ext}"));
        candidates.push(PathBuf::from(appended));
        candidates.push(path.with_extension(ext));
    }
    candidates.into_iter().find(|candidate| candidate.is_file())
}

/// Whether the `@HD` line declares `SO:coordinate`
fn declares_coordinate_order(header: &sam::Header) -> bool {
    let mut writer = sam::io::Writer::new(Vec::new());
    if writer.write_header(header).is_err() {
        return false;
    }
    let text = String::from_utf8_lossy(writer.get_ref());
    text.lines().next().is_some_and(|line| {
        line.starts_with("@HD") && line.split('\t').any(|field| field == "SO:coordinate")
    })
}

/// A SAM or BAM file used as a record source.
///
/// An indexed BAM (`.bai` or `.csi` alongside it) is queried by region. Any
/// other file is read from the start on every query and filtered by overlap;
/// when the header declares coordinate order, that pass stops at the first
/// record beyond the interval.
pub struct AlignmentFile {
    path: PathBuf,
    format: AlignmentFormat,
    header: sam::Header,
    index: Option<PathBuf>,
    coordinate_sorted: bool,
    batch_size: usize,
}

impl AlignmentFile {
    /// Open a SAM/BAM file and read its header
    ///
    /// # Errors
    ///
    /// Returns `SourceError::UnsupportedFormat` for unknown extensions,
    /// `SourceError::Io` if the file cannot be read, or `SourceError::Noodles`
    /// if the header cannot be parsed.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let format = AlignmentFormat::from_path(path)?;
        let header = match format {
            AlignmentFormat::Sam => {
                let mut reader = File::open(path)
                    .map(BufReader::new)
                    .map(sam::io::Reader::new)?;
                reader
                    .read_header()
                    .map_err(|e| SourceError::Noodles(e.to_string()))?
            }
            AlignmentFormat::Bam => {
                let mut reader = File::open(path).map(bam::io::Reader::new)?;
                reader
                    .read_header()
                    .map_err(|e| SourceError::Noodles(e.to_string()))?
            }
        };

        let index = match format {
            AlignmentFormat::Bam => find_index(path),
            AlignmentFormat::Sam => None,
        };
        let coordinate_sorted = declares_coordinate_order(&header);

        debug!(
            path = %path.display(),
            format = ?format,
            references = header.reference_sequences().len(),
            index = ?index,
            coordinate_sorted,
            "Opened alignment file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            format,
            header,
            index,
            coordinate_sorted,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[must_use]
    pub fn format(&self) -> AlignmentFormat {
        self.format
    }

    #[must_use]
    pub fn header(&self) -> &sam::Header {
        &self.header
    }

    /// Index used for region queries, if one was found
    #[must_use]
    pub fn index(&self) -> Option<&Path> {
        self.index.as_deref()
    }

    #[must_use]
    pub fn is_coordinate_sorted(&self) -> bool {
        self.coordinate_sorted
    }

    /// Reference sequence names in header order
    #[must_use]
    pub fn reference_names(&self) -> Vec<String> {
        self.header
            .reference_sequences()
            .keys()
            .map(|name| String::from_utf8_lossy(name.as_ref()).into_owned())
            .collect()
    }

    /// Records overlapping 0-based `[start, end)` on `chrom`, fetched through the index
    fn indexed_records(
        &self,
        index_path: &Path,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<RecordIter, SourceError> {
        let builder = bam::io::indexed_reader::Builder::default();
        let builder = if index_path.extension().is_some_and(|ext| ext == "csi") {
            let index = File::open(index_path)
                .map(csi::io::Reader::new)?
                .read_index()?;
            builder.set_index(index)
        } else {
            let index = File::open(index_path)
                .map(bam::bai::io::Reader::new)?
                .read_index()?;
            builder.set_index(index)
        };
        let mut reader = builder.build_from_path(&self.path)?;
        let header = reader
            .read_header()
            .map_err(|e| SourceError::Noodles(e.to_string()))?;

        let region = query_region(chrom, start, end)?;
        let mut records = Vec::new();
        for result in reader.query(&header, &region)? {
            let record = RecordBuf::try_from_alignment_record(&header, &result?)?;
            records.push(to_alignment_record(&header, &record)?);
        }

        debug!(
            chrom,
            start,
            end,
            records = records.len(),
            "Fetched records through index"
        );

        Ok(Box::new(records.into_iter().map(Ok)))
    }

    /// Every record in the file, in file order
    fn records(&self) -> Result<RecordIter, SourceError> {
        match self.format {
            AlignmentFormat::Sam => {
                let mut reader = File::open(&self.path)
                    .map(BufReader::new)
                    .map(sam::io::Reader::new)?;
                let header = reader
                    .read_header()
                    .map_err(|e| SourceError::Noodles(e.to_string()))?;
                Ok(Box::new(std::iter::from_fn(move || {
                    let mut record = RecordBuf::default();
                    match reader.read_record_buf(&header, &mut record) {
                        Ok(0) => None,
                        Ok(_) => Some(to_alignment_record(&header, &record)),
                        Err(e) => Some(Err(SourceError::Io(e))),
                    }
                })))
            }
            AlignmentFormat::Bam => {
                let mut reader = File::open(&self.path).map(bam::io::Reader::new)?;
                let header = reader
                    .read_header()
                    .map_err(|e| SourceError::Noodles(e.to_string()))?;
                Ok(Box::new(std::iter::from_fn(move || {
                    let mut record = RecordBuf::default();
                    match reader.read_record_buf(&header, &mut record) {
                        Ok(0) => None,
                        Ok(_) => Some(to_alignment_record(&header, &record)),
                        Err(e) => Some(Err(SourceError::Io(e))),
                    }
                })))
            }
        }
    }
}

/// 1-based inclusive region for a 0-based half-open interval
fn query_region(chrom: &str, start: u64, end: u64) -> Result<Region, SourceError> {
    let position = |n: u64| {
        usize::try_from(n)
            .ok()
            .and_then(|n| Position::try_from(n).ok())
            .ok_or_else(|| SourceError::InvalidRegion(format!("{chrom}:{}-{end}", start + 1)))
    };
    Ok(Region::new(chrom, position(start + 1)?..=position(end)?))
}

fn kind_to_char(kind: Kind) -> char {
    match kind {
        Kind::Match => 'M',
        Kind::Insertion => 'I',
        Kind::Deletion => 'D',
        Kind::Skip => 'N',
        Kind::SoftClip => 'S',
        Kind::HardClip => 'H',
        Kind::Pad => 'P',
        Kind::SequenceMatch => '=',
        Kind::SequenceMismatch => 'X',
    }
}

/// Convert a noodles record into the fields segment extraction reads
fn to_alignment_record(
    header: &sam::Header,
    record: &RecordBuf,
) -> Result<AlignmentRecord, SourceError> {
    let flags = record.flags();

    let name = record
        .name()
        .map(|name| String::from_utf8_lossy(name.as_ref()).into_owned())
        .unwrap_or_default();

    let chrom = match record.reference_sequence_id() {
        Some(id) => header
            .reference_sequences()
            .get_index(id)
            .map(|(name, _)| String::from_utf8_lossy(name.as_ref()).into_owned())
            .ok_or_else(|| {
                SourceError::InvalidRecord(format!(
                    "read '{name}' refers to reference sequence index {id}, which is not in the header"
                ))
            })?,
        None => String::new(),
    };

    let start = record
        .alignment_start()
        .map_or(0, |position| (usize::from(position) - 1) as u64);

    let cigar: String = record
        .cigar()
        .as_ref()
        .iter()
        .map(|op| format!("{}{}", op.len(), kind_to_char(op.kind())))
        .collect();

    let sa_tag = match record.data().get(&Tag::from([b'S', b'A'])) {
        Some(Value::String(s)) => Some(String::from_utf8_lossy(s.as_ref()).into_owned()),
        Some(_) => {
            return Err(SourceError::InvalidRecord(format!(
                "read '{name}' has a non-string SA tag"
            )))
        }
        None => None,
    };

    Ok(AlignmentRecord {
        name,
        chrom,
        start,
        is_unmapped: flags.is_unmapped(),
        is_secondary: flags.is_secondary(),
        is_reverse_complemented: flags.is_reverse_complemented(),
        cigar,
        sa_tag,
    })
}

impl RecordSource for AlignmentFile {
    type Stream = FileRecordStream;

    async fn query(
        &mut self,
        chrom: &str,
        start: u64,
        end: u64,
    ) -> Result<Self::Stream, SourceError> {
        let known = self
            .header
            .reference_sequences()
            .keys()
            .any(|name| AsRef::<[u8]>::as_ref(name) == chrom.as_bytes());
        if !known {
            return Err(SourceError::UnknownReference(chrom.to_string()));
        }

        debug!(
            path = %self.path.display(),
            chrom,
            start,
            end,
            "Opening record stream"
        );

        let (records, sorted) = match &self.index {
            Some(index_path) => (self.indexed_records(index_path, chrom, start, end)?, true),
            None => (self.records()?, self.coordinate_sorted),
        };

        Ok(FileRecordStream {
            records,
            chrom: chrom.to_string(),
            start,
            end,
            batch_size: self.batch_size,
            sorted,
            seen_target: false,
            exhausted: false,
        })
    }
}

/// Records from one pass over an alignment file, restricted to an interval
pub struct FileRecordStream {
    records: RecordIter,
    chrom: String,
    start: u64,
    end: u64,
    batch_size: usize,
    /// Records arrive in coordinate order
    sorted: bool,
    seen_target: bool,
    exhausted: bool,
}

impl FileRecordStream {
    /// In coordinate order, nothing after this record can overlap the interval
    fn is_past_interval(&mut self, record: &AlignmentRecord) -> bool {
        if !self.sorted {
            return false;
        }
        if record.chrom == self.chrom {
            self.seen_target = true;
            record.start >= self.end
        } else {
            self.seen_target
        }
    }
}

impl RecordStream for FileRecordStream {
    async fn next_batch(&mut self) -> Result<Option<Vec<AlignmentRecord>>, SourceError> {
        tokio::task::yield_now().await;
        if self.exhausted {
            return Ok(None);
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while let Some(result) = self.records.next() {
            let record = result?;
            if self.is_past_interval(&record) {
                self.exhausted = true;
                break;
            }
            if record.overlaps(&self.chrom, self.start, self.end) {
                batch.push(record);
                if batch.len() >= self.batch_size {
                    break;
                }
            }
        }

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
    use std::io::Write;

    const SAM: &str = "@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:10000
@SQ\tSN:chr2\tLN:10000
read1\t0\tchr1\t100\t60\t10S40M\t*\t0\t0\t*\t*\tSA:Z:chr2,500,-,10M40S,60,0;
read2\t16\tchr1\t120\t60\t30M5S\t*\t0\t0\t*\t*
read3\t4\t*\t0\t0\t*\t*\t0\t0\t*\t*
read4\t0\tchr2\t5000\t60\t50M\t*\t0\t0\t*\t*
";

    fn write_sam() -> tempfile::NamedTempFile {
        write_sam_text(SAM)
    }

    fn write_sam_text(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".sam").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    /// chr1 records at 100, 200 and 5000, then one whose SA tag cannot be
    /// converted. Only a pass that reads beyond the interval reaches it.
    fn records_after_interval(sort_order: &str) -> String {
        format!(
            "@HD\tVN:1.6\tSO:{sort_order}
@SQ\tSN:chr1\tLN:10000
a\t0\tchr1\t100\t60\t20M\t*\t0\t0\t*\t*
b\t0\tchr1\t200\t60\t20M\t*\t0\t0\t*\t*
c\t0\tchr1\t5000\t60\t20M\t*\t0\t0\t*\t*
d\t0\tchr1\t6000\t60\t20M\t*\t0\t0\t*\t*\tSA:i:5
"
        )
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            AlignmentFormat::from_path(Path::new("x.BAM")).unwrap(),
            AlignmentFormat::Bam
        );
        assert_eq!(
            AlignmentFormat::from_path(Path::new("x.sam")).unwrap(),
            AlignmentFormat::Sam
        );
        assert!(matches!(
            AlignmentFormat::from_path(Path::new("x.cram")),
            Err(SourceError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_open_reads_header() {
        let file = write_sam();
        let source = AlignmentFile::open(file.path()).unwrap();
        assert_eq!(source.format(), AlignmentFormat::Sam);
        assert_eq!(source.reference_names(), vec!["chr1", "chr2"]);
    }

    #[tokio::test]
    async fn test_query_converts_and_filters_records() {
        let file = write_sam();
        let mut source = AlignmentFile::open(file.path()).unwrap();

        let mut stream = source.query("chr1", 0, 1000).await.unwrap();
        let batch = stream.next_batch().await.unwrap().unwrap();
        assert!(stream.next_batch().await.unwrap().is_none());

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].name, "read1");
        assert_eq!(batch[0].start, 99);
        assert_eq!(batch[0].cigar, "10S40M");
        assert_eq!(
            batch[0].sa_tag.as_deref(),
            Some("chr2,500,-,10M40S,60,0;")
        );
        assert!(batch[1].is_reverse_complemented);
        assert!(batch[1].sa_tag.is_none());
    }

    #[tokio::test]
    async fn test_sorted_query_stops_at_interval_end() {
        let file = write_sam_text(&records_after_interval("coordinate"));
        let mut source = AlignmentFile::open(file.path()).unwrap();
        assert!(source.is_coordinate_sorted());
        assert!(source.index().is_none());

        let mut stream = source.query("chr1", 0, 1000).await.unwrap();
        let batch = stream.next_batch().await.unwrap().unwrap();
        let names: Vec<&str> = batch.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(stream.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsorted_query_reads_the_whole_file() {
        let file = write_sam_text(&records_after_interval("unsorted"));
        let mut source = AlignmentFile::open(file.path()).unwrap();
        assert!(!source.is_coordinate_sorted());

        let mut stream = source.query("chr1", 0, 1000).await.unwrap();
        assert!(matches!(
            stream.next_batch().await,
            Err(SourceError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_find_index() {
        let dir = tempfile::tempdir().unwrap();
        let bam = dir.path().join("sample.bam");
        std::fs::write(&bam, b"").unwrap();
        assert_eq!(find_index(&bam), None);

        let csi = dir.path().join("sample.bam.csi");
        std::fs::write(&csi, b"").unwrap();
        assert_eq!(find_index(&bam), Some(csi));

        let bai = dir.path().join("sample.bai");
        std::fs::write(&bai, b"").unwrap();
        assert_eq!(find_index(&bam), Some(bai));
    }

    #[test]
    fn test_query_region_is_one_based_inclusive() {
        let region = query_region("chr1", 99, 200).unwrap();
        assert_eq!(region.to_string(), "chr1:100-200");
    }

    #[tokio::test]
    async fn test_query_unknown_reference() {
        let file = write_sam();
        let mut source = AlignmentFile::open(file.path()).unwrap();
        assert!(matches!(
            source.query("chr9", 0, 10).await,
            Err(SourceError::UnknownReference(_))
        ));
    }
}
