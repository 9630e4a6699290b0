use crate::data_types::alignments::AlignmentRecord;

use log::{debug, trace, warn};
use rust_htslib::bam;
use rust_htslib::bam::Read;
use rust_htslib::bam::ext::BamRecordExtensions;
use rust_htslib::htslib;
use std::path::Path;

/// An alignment overlapping a queried position, with the base it carries there
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OverlapHit {
    /// the overlapping alignment
    pub alignment: AlignmentRecord,
    /// the read base aligned to the position, `None` if it cannot be determined
    pub base: Option<u8>
}

/// Coordinate-range queries against a sorted, indexed alignment collection.
pub trait AlignmentStore {
    /// Returns every usable alignment whose span contains the 1-based position.
    /// # Arguments
    /// * `chrom` - the chromosome to query
    /// * `position` - the 1-based position
    fn fetch_overlapping(&mut self, chrom: &str, position: u64) -> Result<Vec<OverlapHit>, Box<dyn std::error::Error>>;
}

/// Point lookups used to find the other segment of a read pair.
pub trait MateLocator {
    /// Returns the mate of an alignment, if it can be found at the recorded mate coordinates.
    fn locate_mate(&mut self, alignment: &AlignmentRecord) -> Result<Option<AlignmentRecord>, Box<dyn std::error::Error>>;
}

/// Returns true if the alignment record should be ignored for evidence.
/// # Arguments
/// * `record` - the record to check
/// * `min_mapq` - the minimum mapping quality to keep the record
pub fn filter_out_alignment_record(record: &bam::Record, min_mapq: u8) -> bool {
    static FLAG_FILTER: u32 =
        htslib::BAM_FUNMAP | htslib::BAM_FSECONDARY | htslib::BAM_FQCFAIL | htslib::BAM_FDUP;

    ((record.flags() as u32) & FLAG_FILTER) != 0 || record.mapq() < min_mapq
}

/// Loads the target names from a BAM header so records can be converted without touching the header again.
pub fn get_target_names(header: &bam::HeaderView) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut target_names: Vec<String> = Vec::with_capacity(header.target_count() as usize);
    for name in header.target_names().iter() {
        target_names.push(std::str::from_utf8(name)?.to_string());
    }
    Ok(target_names)
}

/// Converts a BAM record into the engine's `AlignmentRecord`.
/// # Arguments
/// * `record` - the BAM record
/// * `target_names` - the reference names from the BAM header, indexed by tid
pub fn to_alignment_record(record: &bam::Record, target_names: &[String]) -> AlignmentRecord {
    let lookup_name = |tid: i32| -> Option<String> {
        usize::try_from(tid).ok()
            .and_then(|t| target_names.get(t))
            .cloned()
    };

    let read_name: String = String::from_utf8_lossy(record.qname()).to_string();
    let chrom: String = lookup_name(record.tid()).unwrap_or_else(|| "*".to_string());
    let start: u64 = (record.pos() + 1).max(0) as u64;
    // reference_end is 0-based exclusive, which is the same as 1-based inclusive
    let end: u64 = record.reference_end().max(record.pos() + 1).max(0) as u64;
    let mate_chrom: Option<String> = lookup_name(record.mtid());
    let mate_start: u64 = (record.mpos() + 1).max(0) as u64;

    AlignmentRecord::new(read_name, chrom, start, end, mate_chrom, mate_start, record.flags())
}

/// Returns the read base aligned to a 1-based reference position.
/// Deletions, reference skips, positions outside the alignment, and low quality bases all return `None`.
/// # Arguments
/// * `record` - the BAM record
/// * `position` - the 1-based reference position
/// * `min_base_quality` - bases below this quality are treated as undetermined
pub fn base_at(record: &bam::Record, position: u64, min_base_quality: u8) -> Option<u8> {
    let ref_pos: i64 = position as i64 - 1;
    if ref_pos < record.pos() || ref_pos >= record.reference_end() {
        return None;
    }

    match record.cigar().read_pos(ref_pos as u32, false, false) {
        Ok(Some(read_pos)) => {
            let read_pos: usize = read_pos as usize;
            // SEQ of "*" leaves nothing to compare against
            if read_pos >= record.seq_len() {
                return None;
            }
            let qualities: &[u8] = record.qual();
            // 0xff marks a record with no stored qualities
            match qualities.get(read_pos) {
                Some(&q) if q != 0xff && q < min_base_quality => None,
                _ => Some(record.seq()[read_pos])
            }
        },
        Ok(None) => None,
        Err(e) => {
            debug!("Failed to project {}:{} into read {}: {}", record.tid(), position, String::from_utf8_lossy(record.qname()), e);
            None
        }
    }
}

/// Overlap queries over an indexed BAM file
pub struct HtsAlignmentStore {
    /// handle dedicated to overlap queries
    bam_reader: bam::IndexedReader,
    /// the reference names, indexed by tid
    target_names: Vec<String>,
    /// alignments below this MAPQ are skipped
    min_mapq: u8,
    /// bases below this quality do not count as evidence
    min_base_quality: u8
}

impl HtsAlignmentStore {
    /// Opens the BAM for overlap queries.
    /// # Arguments
    /// * `bam_filename` - the indexed BAM
    /// * `min_mapq` - the minimum MAPQ for an alignment to be used
    /// * `min_base_quality` - the minimum base quality for a base to be used
    pub fn from_path(bam_filename: &Path, min_mapq: u8, min_base_quality: u8) -> Result<HtsAlignmentStore, Box<dyn std::error::Error>> {
        let bam_reader: bam::IndexedReader = bam::IndexedReader::from_path(bam_filename)?;
        let target_names: Vec<String> = get_target_names(bam_reader.header())?;
        Ok(HtsAlignmentStore {
            bam_reader,
            target_names,
            min_mapq,
            min_base_quality
        })
    }
}

impl AlignmentStore for HtsAlignmentStore {
    fn fetch_overlapping(&mut self, chrom: &str, position: u64) -> Result<Vec<OverlapHit>, Box<dyn std::error::Error>> {
        let ref_pos: i64 = position as i64 - 1;
        if let Err(e) = self.bam_reader.fetch((chrom, ref_pos, ref_pos + 1)) {
            // usually a chromosome that is in the VCF but not the BAM
            warn!("Failed to fetch {}:{} from BAM: {}", chrom, position, e);
            return Ok(vec![]);
        }

        let hits: Vec<OverlapHit> = collect_overlap_hits(
            self.bam_reader.records(), chrom, position,
            &self.target_names, self.min_mapq, self.min_base_quality
        );
        Ok(hits)
    }
}

/// Converts the records of a fetched region into overlap hits.
/// An invalid record is skipped, but a truncated stream ends the region since nothing after it can be decoded.
/// # Arguments
/// * `records` - the records of the fetched region
/// * `chrom` - the queried chromosome
/// * `position` - the queried 1-based position
/// * `target_names` - the reference names, indexed by tid
/// * `min_mapq` - alignments below this MAPQ are skipped
/// * `min_base_quality` - bases below this quality do not count as evidence
fn collect_overlap_hits<I>(
    records: I, chrom: &str, position: u64,
    target_names: &[String], min_mapq: u8, min_base_quality: u8
) -> Vec<OverlapHit>
where
    I: Iterator<Item = Result<bam::Record, rust_htslib::errors::Error>>
{
    let mut hits: Vec<OverlapHit> = vec![];
    for read_entry in records {
        let read: bam::Record = match read_entry {
            Ok(r) => r,
            Err(rust_htslib::errors::Error::BamInvalidRecord) => {
                warn!("Skipping invalid alignment record at {}:{}", chrom, position);
                continue;
            },
            Err(e) => {
                warn!("Error while reading alignments at {}:{}: {}; skipping the remaining alignments at this site", chrom, position, e);
                break;
            }
        };

        //make sure we care about the alignment
        if filter_out_alignment_record(&read, min_mapq) {
            continue;
        }

        let alignment: AlignmentRecord = to_alignment_record(&read, target_names);
        if !alignment.covers(chrom, position) {
            continue;
        }
        let base: Option<u8> = base_at(&read, position, min_base_quality);
        trace!("\t{} {}-{} base={:?}", alignment.read_name(), alignment.start(), alignment.end(), base.map(char::from));
        hits.push(OverlapHit { alignment, base });
    }
    hits
}

/// Mate lookups over a second, independent handle to the BAM
pub struct HtsMateLocator {
    /// handle dedicated to mate lookups
    bam_reader: bam::IndexedReader,
    /// the reference names, indexed by tid
    target_names: Vec<String>
}

impl HtsMateLocator {
    pub fn from_path(bam_filename: &Path) -> Result<HtsMateLocator, Box<dyn std::error::Error>> {
        let bam_reader: bam::IndexedReader = bam::IndexedReader::from_path(bam_filename)?;
        let target_names: Vec<String> = get_target_names(bam_reader.header())?;
        Ok(HtsMateLocator {
            bam_reader,
            target_names
        })
    }
}

impl MateLocator for HtsMateLocator {
    fn locate_mate(&mut self, alignment: &AlignmentRecord) -> Result<Option<AlignmentRecord>, Box<dyn std::error::Error>> {
        let mate_chrom: &str = match alignment.mate_chrom() {
            Some(c) => c,
            None => return Ok(None)
        };
        let mate_pos: i64 = alignment.mate_start() as i64 - 1;
        self.bam_reader.fetch((mate_chrom, mate_pos, mate_pos + 1))?;

        let read_name: &[u8] = alignment.read_name().as_bytes();
        for read_entry in self.bam_reader.records() {
            let read: bam::Record = read_entry?;
            if read.pos() != mate_pos || read.qname() != read_name {
                continue;
            }
            let candidate: AlignmentRecord = to_alignment_record(&read, &self.target_names);
            if candidate.is_mate_of(alignment) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// In-memory store with ungapped reads, shared by the unit tests of the engine
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct MemoryAlignmentStore {
    /// alignments in insertion order with their sequence starting at `start`
    reads: Vec<(AlignmentRecord, Vec<u8>)>,
    /// number of overlap queries issued
    pub queries: usize
}

#[cfg(test)]
impl MemoryAlignmentStore {
    pub fn new() -> MemoryAlignmentStore {
        Default::default()
    }

    /// Adds an ungapped read and returns the stored record.
    pub fn add_read(&mut self, read_name: &str, chrom: &str, start: u64, sequence: &[u8], mate: Option<(&str, u64)>, flags: u16) -> AlignmentRecord {
        let end: u64 = start + sequence.len() as u64 - 1;
        let (mate_chrom, mate_start) = match mate {
            Some((c, s)) => (Some(c.to_string()), s),
            None => (None, 0)
        };
        let record = AlignmentRecord::new(read_name.to_string(), chrom.to_string(), start, end, mate_chrom, mate_start, flags);
        self.reads.push((record.clone(), sequence.to_vec()));
        record
    }

    /// All stored alignments, in insertion order
    pub fn alignments(&self) -> Vec<AlignmentRecord> {
        self.reads.iter().map(|(r, _)| r.clone()).collect()
    }
}

#[cfg(test)]
impl AlignmentStore for MemoryAlignmentStore {
    fn fetch_overlapping(&mut self, chrom: &str, position: u64) -> Result<Vec<OverlapHit>, Box<dyn std::error::Error>> {
        self.queries += 1;
        Ok(self.reads.iter()
            .filter(|(r, _)| r.covers(chrom, position))
            .map(|(r, seq)| OverlapHit {
                alignment: r.clone(),
                base: seq.get((position - r.start()) as usize).cloned()
            })
            .collect())
    }
}

#[cfg(test)]
impl MateLocator for MemoryAlignmentStore {
    fn locate_mate(&mut self, alignment: &AlignmentRecord) -> Result<Option<AlignmentRecord>, Box<dyn std::error::Error>> {
        Ok(self.reads.iter()
            .map(|(r, _)| r)
            .find(|r| r.is_mate_of(alignment))
            .cloned())
    }
}
