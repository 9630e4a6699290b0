use rust_htslib::htslib;

/// Identity of a single alignment record within the store.
/// Two mates share a read name but differ by flags (and usually start), so they stay distinct.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AlignmentKey {
    /// the chromosome of the alignment
    chrom: String,
    /// the alignment start, 1-based
    start: u64,
    /// the read name
    read_name: String,
    /// SAM flags
    flags: u16
}

/// The parts of an alignment the phasing engine works with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlignmentRecord {
    /// the read name (QNAME)
    read_name: String,
    /// the chromosome, "*" if unmapped
    chrom: String,
    /// first aligned reference base, 1-based
    start: u64,
    /// last aligned reference base, 1-based inclusive
    end: u64,
    /// mate chromosome, if the mate is mapped
    mate_chrom: Option<String>,
    /// mate start, 1-based
    mate_start: u64,
    /// SAM flags
    flags: u16
}

impl AlignmentRecord {
    /// Creates a new record.
    /// # Arguments
    /// * `read_name` - the QNAME
    /// * `chrom` - the chromosome
    /// * `start` - 1-based start of the aligned span
    /// * `end` - 1-based inclusive end of the aligned span
    /// * `mate_chrom` - mate chromosome, `None` when the mate is unmapped or absent
    /// * `mate_start` - 1-based mate start, ignored when `mate_chrom` is `None`
    /// * `flags` - SAM flags
    pub fn new(
        read_name: String, chrom: String, start: u64, end: u64,
        mate_chrom: Option<String>, mate_start: u64, flags: u16
    ) -> AlignmentRecord {
        AlignmentRecord {
            read_name,
            chrom,
            start,
            end,
            mate_chrom,
            mate_start,
            flags
        }
    }

    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn mate_chrom(&self) -> Option<&str> {
        self.mate_chrom.as_deref()
    }

    pub fn mate_start(&self) -> u64 {
        self.mate_start
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn key(&self) -> AlignmentKey {
        AlignmentKey {
            chrom: self.chrom.clone(),
            start: self.start,
            read_name: self.read_name.clone(),
            flags: self.flags
        }
    }

    /// Returns true if the 1-based position falls inside the aligned span.
    pub fn covers(&self, chrom: &str, position: u64) -> bool {
        self.chrom == chrom && self.start <= position && position <= self.end
    }

    pub fn is_paired(&self) -> bool {
        (self.flags as u32 & htslib::BAM_FPAIRED) != 0
    }

    pub fn is_first_in_template(&self) -> bool {
        (self.flags as u32 & htslib::BAM_FREAD1) != 0
    }

    /// Returns true if this record could be the mate of `other`: same read name, opposite segment.
    pub fn is_mate_of(&self, other: &AlignmentRecord) -> bool {
        self.read_name == other.read_name &&
            self.is_first_in_template() != other.is_first_in_template() &&
            self.chrom == other.mate_chrom().unwrap_or("*") &&
            self.start == other.mate_start
    }
}

/// Records that can have their paired flag set before emission.
pub trait PairedFlag {
    fn mark_paired(&mut self);
}

impl PairedFlag for AlignmentRecord {
    fn mark_paired(&mut self) {
        self.flags |= htslib::BAM_FPAIRED as u16;
    }
}

impl PairedFlag for rust_htslib::bam::Record {
    fn mark_paired(&mut self) {
        let flags = self.flags() | htslib::BAM_FPAIRED as u16;
        self.set_flags(flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers() {
        let record = AlignmentRecord::new("r1".to_string(), "chr1".to_string(), 91, 110, None, 0, 0);
        assert!(record.covers("chr1", 91));
        assert!(record.covers("chr1", 100));
        assert!(record.covers("chr1", 110));
        assert!(!record.covers("chr1", 90));
        assert!(!record.covers("chr1", 111));
        assert!(!record.covers("chr2", 100));
    }

    #[test]
    fn test_mates() {
        let flags_r1 = (htslib::BAM_FPAIRED | htslib::BAM_FREAD1) as u16;
        let flags_r2 = htslib::BAM_FREAD2 as u16;
        let r1 = AlignmentRecord::new("pair".to_string(), "chr1".to_string(), 100, 150, Some("chr1".to_string()), 300, flags_r1);
        let mut r2 = AlignmentRecord::new("pair".to_string(), "chr1".to_string(), 300, 350, Some("chr1".to_string()), 100, flags_r2);
        assert!(r2.is_mate_of(&r1));
        assert!(r1.is_mate_of(&r2));
        assert!(!r1.is_mate_of(&r1));
        assert_ne!(r1.key(), r2.key());

        assert!(r1.is_paired());
        assert!(!r2.is_paired());
        r2.mark_paired();
        assert!(r2.is_paired());
        assert!(!r2.is_first_in_template());
    }
}
