use crate::data_types::variants::{SampleCall, SamplePair, VariantSite};

use log::{debug, trace};
use rust_htslib::bcf;
use rust_htslib::bcf::Read;
use rust_htslib::bcf::record::GenotypeAllele;
use simple_error::bail;
use std::path::{Path, PathBuf};

/// Structured failures from the variant stream
#[derive(thiserror::Error, Debug)]
pub enum VariantStreamError {
    #[error("Sample name {sample:?} was not found in VCF: {path:?}")]
    SampleNotFound { sample: String, path: PathBuf },
    #[error("Variant file is not sorted: {chrom}:{position} follows {chrom}:{previous_position}")]
    PositionOutOfOrder { chrom: String, position: u64, previous_position: u64 },
    #[error("Variant file is not sorted: chromosome {chrom} appears in more than one block")]
    ChromosomeRevisited { chrom: String }
}

/// Returns the sample names from a VCF file.
/// # Arguments
/// * `filename` - the VCF file to load, plain or bgzipped
/// # Errors
/// * if the filename fails to load as a VCF
/// * if the sample name fails to parse from utf8
pub fn get_vcf_samples(filename: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let vcf_reader: bcf::Reader = bcf::Reader::from_path(filename)?;
    let vcf_header: &bcf::header::HeaderView = vcf_reader.header();
    let mut sample_names = vec![];
    for sv in vcf_header.samples().iter() {
        let vcf_sample_string: String = std::str::from_utf8(sv)?.to_string();
        sample_names.push(vcf_sample_string);
    }
    Ok(sample_names)
}

/// Finds the column of each requested sample.
/// # Arguments
/// * `vcf_samples` - the sample columns of the VCF, in order
/// * `sample_a` - the name used for sample A
/// * `sample_b` - the name used for sample B
/// * `path` - the VCF path, only used for error reporting
/// # Errors
/// * if either sample is absent from the VCF
pub fn resolve_samples(vcf_samples: &[String], sample_a: &str, sample_b: &str, path: &Path) -> Result<SamplePair, VariantStreamError> {
    let find_index = |sample: &str| -> Result<usize, VariantStreamError> {
        vcf_samples.iter()
            .position(|s| s == sample)
            .ok_or_else(|| VariantStreamError::SampleNotFound {
                sample: sample.to_string(),
                path: path.to_path_buf()
            })
    };
    let index_a: usize = find_index(sample_a)?;
    let index_b: usize = find_index(sample_b)?;
    debug!("Sample columns: {}={}, {}={}", sample_a, index_a, sample_b, index_b);
    Ok(SamplePair::new(sample_a.to_string(), index_a, sample_b.to_string(), index_b))
}

/// Streams every record of a VCF as a parsed `VariantSite` alongside the raw record.
/// The raw record is kept so that used sites can be copied verbatim to the output VCF.
pub struct VcfSiteReader {
    /// the underlying reader, sequential so plain VCFs are supported
    vcf_reader: bcf::Reader,
    /// homozygous calls with a minor allele fraction above this are treated as heterozygous
    het_maf_cutoff: f64
}

impl VcfSiteReader {
    /// Opens a VCF for streaming.
    /// # Arguments
    /// * `filename` - the VCF file, plain or bgzipped
    /// * `het_maf_cutoff` - the allele-depth fraction above which a call is considered heterozygous
    pub fn from_path(filename: &Path, het_maf_cutoff: f64) -> Result<VcfSiteReader, Box<dyn std::error::Error>> {
        let vcf_reader: bcf::Reader = bcf::Reader::from_path(filename)?;
        Ok(VcfSiteReader {
            vcf_reader,
            het_maf_cutoff
        })
    }

    pub fn header(&self) -> &bcf::header::HeaderView {
        self.vcf_reader.header()
    }
}

impl Iterator for VcfSiteReader {
    type Item = Result<(VariantSite, bcf::Record), Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record: bcf::Record = self.vcf_reader.empty_record();
        match self.vcf_reader.read(&mut record) {
            None => None,
            Some(Err(e)) => Some(Err(Box::new(e))),
            Some(Ok(())) => {
                Some(parse_site(&record, self.het_maf_cutoff).map(|site| (site, record)))
            }
        }
    }
}

/// Converts a VCF record into a `VariantSite`.
/// # Arguments
/// * `record` - the record to parse
/// * `het_maf_cutoff` - the allele-depth fraction above which a call is considered heterozygous
/// # Errors
/// * if the record has no chromosome
/// * if rust_htslib fails to parse the genotypes
pub fn parse_site(record: &bcf::Record, het_maf_cutoff: f64) -> Result<VariantSite, Box<dyn std::error::Error>> {
    let header: &bcf::header::HeaderView = record.header();
    let chrom: String = match record.rid() {
        Some(rid) => std::str::from_utf8(header.rid2name(rid)?)?.to_string(),
        None => bail!("Encountered VCF record without a chromosome at position {}", record.pos() + 1)
    };
    let position: u64 = (record.pos() + 1).try_into()?;

    // "." has no filters set, which we do not count as PASS
    let filter_names: Vec<Vec<u8>> = record.filters()
        .map(|filter_id| header.id_to_name(filter_id))
        .collect();
    let filter_pass: bool = filter_names.len() == 1 && filter_names[0] == b"PASS";

    let alleles: Vec<Vec<u8>> = record.alleles().iter()
        .map(|a| a.to_vec())
        .collect();

    // AD is optional, anything that fails to load is just skipped
    let allele_depths: Option<Vec<Vec<i32>>> = match record.format(b"AD").integer() {
        Ok(all_ad) => Some(all_ad.iter().map(|ad| ad.to_vec()).collect()),
        Err(_) => None
    };

    let sample_count: usize = header.sample_count() as usize;
    let all_genotypes = match record.genotypes() {
        Ok(g) => g,
        Err(e) => {
            // no usable GT, so every sample is a no-call and the site is never informative
            debug!("No genotypes at {}:{}: {}", chrom, position, e);
            let calls: Vec<SampleCall> = vec![SampleCall::no_call(); sample_count];
            return Ok(VariantSite::new(chrom, position, filter_pass, alleles, calls));
        }
    };
    let mut calls: Vec<SampleCall> = Vec::with_capacity(sample_count);
    for sample_index in 0..sample_count {
        let genotype = all_genotypes.get(sample_index);
        let gt: Vec<Option<u32>> = genotype.iter()
            .map(|allele| match allele {
                GenotypeAllele::Unphased(at) |
                GenotypeAllele::Phased(at) => u32::try_from(*at).ok(),
                GenotypeAllele::UnphasedMissing |
                GenotypeAllele::PhasedMissing => None
            })
            .collect();

        let called: Vec<u32> = gt.iter().flatten().cloned().collect();
        let mixed_alleles: bool = called.windows(2).any(|w| w[0] != w[1]);
        let high_minor_fraction: bool = match allele_depths.as_ref().and_then(|ad| ad.get(sample_index)) {
            Some(depths) => minor_allele_fraction(depths) > het_maf_cutoff,
            None => false
        };
        calls.push(SampleCall::new(gt, mixed_alleles || high_minor_fraction));
    }

    trace!("Parsed {}:{} pass={} calls={:?}", chrom, position, filter_pass, calls);
    Ok(VariantSite::new(chrom, position, filter_pass, alleles, calls))
}

/// Fraction of reads not supporting the most common allele.
/// Missing and vector-end values from htslib are negative and get ignored.
fn minor_allele_fraction(depths: &[i32]) -> f64 {
    let valid: Vec<u64> = depths.iter()
        .filter(|&&d| d >= 0)
        .map(|&d| d as u64)
        .collect();
    let total: u64 = valid.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let max_depth: u64 = valid.iter().cloned().max().unwrap_or(0);
    (total - max_depth) as f64 / total as f64
}
