use crate::alignment_store::{get_target_names, to_alignment_record, HtsAlignmentStore, HtsMateLocator};
use crate::assignment::{assign_alignments, replay_evidence, AssignmentCounters};
use crate::data_types::alignments::AlignmentRecord;
use crate::data_types::phase_call::SampleCount;
use crate::data_types::variants::{Sample, SamplePair};
use crate::scanner::{scan_variants, ScanSummary};
use crate::variant_stream::{get_vcf_samples, resolve_samples, VcfSiteReader};
use crate::writers::evidence_writer::EvidenceWriter;
use crate::writers::phased_bam_writer::PhasedBamWriter;
use crate::writers::read_summary_writer::write_read_summary_file;
use crate::writers::used_site_writer::UsedSiteWriter;

use log::{debug, info};
use rust_htslib::bam;
use rust_htslib::bam::Read;
use rustc_hash::FxHashMap as HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Tunable parameters for a phasing run
#[derive(Clone, Debug, PartialEq)]
pub struct PhasingConfig {
    /// alignments below this MAPQ never contribute evidence
    pub min_mapq: u8,
    /// bases below this quality never contribute evidence
    pub min_base_quality: u8,
    /// homozygous calls with a larger AD minor-allele fraction are treated as heterozygous
    pub het_maf_cutoff: f64,
    /// log progress every this many sites or alignments, 0 disables
    pub progress_interval: u64
}

impl Default for PhasingConfig {
    fn default() -> PhasingConfig {
        PhasingConfig {
            min_mapq: 0,
            min_base_quality: 0,
            het_maf_cutoff: 0.1,
            progress_interval: 100000
        }
    }
}

/// Every file produced by a run
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputPaths {
    /// alignments assigned to sample A
    pub sample_a_bam: PathBuf,
    /// alignments assigned to sample B
    pub sample_b_bam: PathBuf,
    /// alignments with evidence that could not be assigned
    pub ambiguous_bam: PathBuf,
    /// the covered informative sites
    pub used_sites_vcf: PathBuf,
    /// one row per (read, site) observation
    pub read_evidence: PathBuf,
    /// one row per read name with counts and call
    pub read_summary: PathBuf
}

impl OutputPaths {
    /// Builds all output paths from a shared prefix.
    /// # Arguments
    /// * `prefix` - the prefix, e.g. "/path/to/sample" for "/path/to/sample.phased.NA1.bam"
    /// * `sample_a` - the name of sample A
    /// * `sample_b` - the name of sample B
    pub fn from_prefix(prefix: &str, sample_a: &str, sample_b: &str) -> OutputPaths {
        OutputPaths {
            sample_a_bam: format!("{prefix}.phased.{sample_a}.bam").into(),
            sample_b_bam: format!("{prefix}.phased.{sample_b}.bam").into(),
            ambiguous_bam: format!("{prefix}.phased.ambiguous.bam").into(),
            used_sites_vcf: format!("{prefix}.phasingSnps.vcf").into(),
            read_evidence: format!("{prefix}.read_snp_sample.tsv").into(),
            read_summary: format!("{prefix}.read_sample_summary.tsv").into()
        }
    }

    /// Builds all output paths next to the input BAM by replacing its ".bam" extension.
    pub fn from_input(bam_filename: &Path, sample_a: &str, sample_b: &str) -> OutputPaths {
        let full_path: String = bam_filename.to_string_lossy().to_string();
        let prefix: &str = full_path.strip_suffix(".bam").unwrap_or(&full_path);
        OutputPaths::from_prefix(prefix, sample_a, sample_b)
    }

    /// All paths, in a stable order for logging and checks
    pub fn all_paths(&self) -> [&Path; 6] {
        [
            &self.sample_a_bam, &self.sample_b_bam, &self.ambiguous_bam,
            &self.used_sites_vcf, &self.read_evidence, &self.read_summary
        ]
    }
}

/// Everything counted during a run
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PhasingSummary {
    /// counts from the variant scan
    pub scan: ScanSummary,
    /// counts from writing the phased alignments
    pub assignment: AssignmentCounters
}

impl PhasingSummary {
    /// Logs the final counts.
    pub fn log_summary(&self, samples: &SamplePair) {
        let sample_a: &str = samples.name(Sample::A);
        let sample_b: &str = samples.name(Sample::B);
        info!("{} sites in input VCF file", self.scan.total_sites);
        info!("{} informative {}/{} sites found", self.scan.informative_sites, sample_a, sample_b);
        info!("{} informative sites with read coverage", self.scan.covered_sites);
        info!("{} alignments uniquely assigned to sample {}", self.assignment.a_unique, sample_a);
        info!("{} alignments uniquely assigned to sample {}", self.assignment.b_unique, sample_b);
        info!("{} alignments assigned to sample {} by majority", self.assignment.a_majority, sample_a);
        info!("{} alignments assigned to sample {} by majority", self.assignment.b_majority, sample_b);
        info!("{} alignments unassigned because of an ambiguous site pattern", self.assignment.ambiguous);
    }
}

/// Looks up both samples in the VCF header.
/// # Errors
/// * if the VCF cannot be opened
/// * if either sample is missing
pub fn load_sample_pair(vcf_filename: &Path, sample_a: &str, sample_b: &str) -> Result<SamplePair, Box<dyn std::error::Error>> {
    let vcf_samples: Vec<String> = get_vcf_samples(vcf_filename)?;
    Ok(resolve_samples(&vcf_samples, sample_a, sample_b, vcf_filename)?)
}

/// Runs both phases: the variant scan that produces the evidence table, then the rewrite of the alignments.
/// Every file handle is scoped to the phase that needs it.
/// # Arguments
/// * `bam_filename` - the sorted, indexed BAM
/// * `vcf_filename` - the sorted VCF, plain or bgzipped
/// * `samples` - the two samples under comparison
/// * `outputs` - where to write every output
/// * `config` - the run parameters
/// # Errors
/// * if any input or output fails to open
/// * if the VCF is unsorted or unparseable
pub fn phase_alignments(
    bam_filename: &Path, vcf_filename: &Path, samples: &SamplePair,
    outputs: &OutputPaths, config: &PhasingConfig
) -> Result<PhasingSummary, Box<dyn std::error::Error>> {
    debug!("Outputs: {:?}", outputs);

    // phase 1: scan the VCF and write the evidence table
    info!("Scanning BAM file for alignments covering informative sites...");
    let scan: ScanSummary = {
        let site_reader: VcfSiteReader = VcfSiteReader::from_path(vcf_filename, config.het_maf_cutoff)?;
        let mut used_sites: UsedSiteWriter = UsedSiteWriter::new(&outputs.used_sites_vcf, site_reader.header())?;
        let mut store: HtsAlignmentStore = HtsAlignmentStore::from_path(bam_filename, config.min_mapq, config.min_base_quality)?;
        let mut evidence_writer: EvidenceWriter<File> = EvidenceWriter::new(&outputs.read_evidence, samples.clone())?;
        let scan = scan_variants(
            site_reader, &mut store, samples,
            &mut used_sites, &mut evidence_writer,
            config.progress_interval
        )?;
        evidence_writer.finish()?;
        debug!("Wrote {} used sites", used_sites.sites_written());
        scan
    };

    // phase 2: replay the evidence and rewrite the alignments
    info!("Writing read to sample assignment summary...");
    let read_counts: HashMap<String, SampleCount> = replay_evidence(File::open(&outputs.read_evidence)?, samples)?;
    write_read_summary_file(&outputs.read_summary, &read_counts, samples)?;

    info!("Phasing alignments file...");
    let assignment: AssignmentCounters = {
        let mut bam_reader: bam::Reader = bam::Reader::from_path(bam_filename)?;
        let bam_header: bam::HeaderView = bam_reader.header().clone();
        let target_names: Vec<String> = get_target_names(&bam_header)?;
        let mut sink: PhasedBamWriter = PhasedBamWriter::new(
            &bam_header,
            &outputs.sample_a_bam, &outputs.sample_b_bam, &outputs.ambiguous_bam
        )?;
        let mut mates: HtsMateLocator = HtsMateLocator::from_path(bam_filename)?;
        let alignments = bam_reader.records()
            .map(|read_entry| -> Result<(AlignmentRecord, bam::Record), Box<dyn std::error::Error>> {
                let record: bam::Record = read_entry?;
                Ok((to_alignment_record(&record, &target_names), record))
            });
        assign_alignments(alignments, &read_counts, &mut mates, &mut sink, config.progress_interval)?
    };

    Ok(PhasingSummary {
        scan,
        assignment
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_store::MemoryAlignmentStore;
    use crate::assignment::PhasedSink;
    use crate::data_types::phase_call::PhasedOutput;
    use crate::data_types::variants::{SampleCall, VariantSite};
    use crate::scanner::UsedSiteSink;
    use rust_htslib::bcf;
    use rust_htslib::htslib;

    const TEST_VCF: &str = "./test_data/two_sample.vcf";

    #[test]
    fn test_output_paths() {
        let outputs = OutputPaths::from_input(Path::new("/data/run.sorted.bam"), "NA1", "NA2");
        assert_eq!(outputs.sample_a_bam, PathBuf::from("/data/run.sorted.phased.NA1.bam"));
        assert_eq!(outputs.sample_b_bam, PathBuf::from("/data/run.sorted.phased.NA2.bam"));
        assert_eq!(outputs.ambiguous_bam, PathBuf::from("/data/run.sorted.phased.ambiguous.bam"));
        assert_eq!(outputs.used_sites_vcf, PathBuf::from("/data/run.sorted.phasingSnps.vcf"));
        assert_eq!(outputs.read_evidence, PathBuf::from("/data/run.sorted.read_snp_sample.tsv"));
        assert_eq!(outputs.read_summary, PathBuf::from("/data/run.sorted.read_sample_summary.tsv"));

        // no extension to replace
        let outputs = OutputPaths::from_input(Path::new("reads"), "NA1", "NA2");
        assert_eq!(outputs.ambiguous_bam, PathBuf::from("reads.phased.ambiguous.bam"));
        assert_eq!(OutputPaths::from_prefix("out/x", "NA1", "NA2").all_paths()[3], Path::new("out/x.phasingSnps.vcf"));
    }

    #[derive(Default)]
    struct MemorySinks {
        used_sites: Vec<u64>,
        written: Vec<(PhasedOutput, String)>
    }

    impl UsedSiteSink<u64> for MemorySinks {
        fn write_used_site(&mut self, record: &mut u64) -> Result<(), Box<dyn std::error::Error>> {
            self.used_sites.push(*record);
            Ok(())
        }
    }

    impl PhasedSink<AlignmentRecord> for MemorySinks {
        fn write_phased(&mut self, output: PhasedOutput, record: &AlignmentRecord) -> Result<(), Box<dyn std::error::Error>> {
            self.written.push((output, record.read_name().to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_two_phase_in_memory() {
        let samples = SamplePair::new("S1".to_string(), 0, "S2".to_string(), 1);
        let mut store = MemoryAlignmentStore::new();
        store.add_read("read_1", "chr1", 91, b"CCCCCCCCCACCCCCCCCCC", None, 0);
        store.add_read("read_2", "chr1", 95, b"CCCCCACCCC", None, 0);
        store.add_read("read_3", "chr1", 98, b"CCGCC", None, 0);
        store.add_read("read_4", "chr1", 400, b"ACGTACGTAC", None, 0);

        let build_site = |position: u64, gt_a: u32, gt_b: u32| -> Result<(VariantSite, u64), Box<dyn std::error::Error>> {
            Ok((VariantSite::new(
                "chr1".to_string(), position, true,
                vec![b"A".to_vec(), b"G".to_vec()],
                vec![SampleCall::homozygous(gt_a), SampleCall::homozygous(gt_b)]
            ), position))
        };
        let sites = vec![build_site(50, 1, 1), build_site(100, 0, 1)];

        let mut sinks = MemorySinks::default();
        let mut evidence_writer = EvidenceWriter::from_writer(vec![], samples.clone());
        let scan = scan_variants(sites.into_iter(), &mut store, &samples, &mut sinks, &mut evidence_writer, 0).unwrap();
        assert_eq!(store.queries, 1);
        assert_eq!(scan.covered_sites, 1);
        assert_eq!(sinks.used_sites, vec![100]);

        let table: Vec<u8> = evidence_writer.finish().unwrap();
        let read_counts = replay_evidence(table.as_slice(), &samples).unwrap();
        let alignments = store.alignments().into_iter().map(|a| Ok::<_, Box<dyn std::error::Error>>((a.clone(), a)));
        let mut mates = store.clone();
        let counters = assign_alignments(alignments, &read_counts, &mut mates, &mut sinks, 0).unwrap();

        assert_eq!(counters, AssignmentCounters {
            a_unique: 2,
            b_unique: 1,
            ..Default::default()
        });
        assert_eq!(sinks.written, vec![
            (PhasedOutput::SampleA, "read_1".to_string()),
            (PhasedOutput::SampleA, "read_2".to_string()),
            (PhasedOutput::SampleB, "read_3".to_string())
        ]);
    }

    /// Converts a SAM fixture into an indexed BAM.
    fn build_indexed_bam(sam_filename: &Path, bam_filename: &Path) {
        let mut sam_reader = bam::Reader::from_path(sam_filename).unwrap();
        let header = bam::Header::from_template(sam_reader.header());
        {
            let mut bam_writer = bam::Writer::from_path(bam_filename, &header, bam::Format::Bam).unwrap();
            for record in sam_reader.records() {
                bam_writer.write(&record.unwrap()).unwrap();
            }
        }
        bam::index::build(bam_filename, None, bam::index::Type::Bai, 1).unwrap();
    }

    /// Returns (read name, flags) for every record in a BAM.
    fn load_bam(bam_filename: &Path) -> Vec<(String, u16)> {
        let mut bam_reader = bam::Reader::from_path(bam_filename).unwrap();
        bam_reader.records()
            .map(|r| {
                let record = r.unwrap();
                (String::from_utf8(record.qname().to_vec()).unwrap(), record.flags())
            })
            .collect()
    }

    fn run_fixture(sam_name: &str) -> (tempfile::TempDir, OutputPaths, PhasingSummary) {
        let temp_dir = tempfile::tempdir().unwrap();
        let bam_filename = temp_dir.path().join("reads.bam");
        build_indexed_bam(&Path::new("./test_data").join(sam_name), &bam_filename);

        let vcf_filename = Path::new(TEST_VCF);
        let samples = load_sample_pair(vcf_filename, "S1", "S2").unwrap();
        let outputs = OutputPaths::from_input(&bam_filename, "S1", "S2");
        let config = PhasingConfig {
            progress_interval: 2,
            ..Default::default()
        };
        let summary = phase_alignments(&bam_filename, vcf_filename, &samples, &outputs, &config).unwrap();
        (temp_dir, outputs, summary)
    }

    #[test]
    fn test_end_to_end() {
        let (_temp_dir, outputs, summary) = run_fixture("three_reads.sam");
        assert_eq!(summary, PhasingSummary {
            scan: ScanSummary {
                total_sites: 7,
                informative_sites: 2,
                covered_sites: 1,
                finalized_alignments: 3,
                evidence_rows: 3
            },
            assignment: AssignmentCounters {
                a_unique: 2,
                b_unique: 1,
                ..Default::default()
            }
        });

        let names = |path: &Path| -> Vec<String> {
            load_bam(path).into_iter().map(|(n, _)| n).collect()
        };
        assert_eq!(names(&outputs.sample_a_bam), vec!["read_1".to_string(), "read_2".to_string()]);
        assert_eq!(names(&outputs.sample_b_bam), vec!["read_3".to_string()]);
        assert!(names(&outputs.ambiguous_bam).is_empty());

        // only the covered site makes it into the VCF
        let mut vcf_reader = bcf::Reader::from_path(&outputs.used_sites_vcf).unwrap();
        let positions: Vec<i64> = bcf::Read::records(&mut vcf_reader)
            .map(|r| r.unwrap().pos())
            .collect();
        assert_eq!(positions, vec![99]);

        let read_summary = std::fs::read_to_string(&outputs.read_summary).unwrap();
        assert_eq!(read_summary, "read_name\tS1\tS2\tcall\n\
            read_1\t1\t0\tA_unique\n\
            read_2\t1\t0\tA_unique\n\
            read_3\t0\t1\tB_unique\n");
    }

    #[test]
    fn test_end_to_end_mates() {
        let (_temp_dir, outputs, summary) = run_fixture("mate_pair.sam");
        assert_eq!(summary.assignment, AssignmentCounters {
            a_unique: 2,
            b_unique: 1,
            ..Default::default()
        });

        // the second mate has no evidence of its own but follows its partner, and both get the paired flag
        let paired: u16 = htslib::BAM_FPAIRED as u16;
        let sample_a: Vec<(String, u16)> = load_bam(&outputs.sample_a_bam);
        assert_eq!(sample_a, vec![
            ("pair_1".to_string(), 64 | paired),
            ("pair_1".to_string(), 128 | paired)
        ]);
        assert_eq!(load_bam(&outputs.sample_b_bam), vec![("lonely".to_string(), 0)]);
    }

    #[test]
    fn test_end_to_end_contig_missing_from_bam() {
        // chr2 is in the VCF but not in this BAM header
        let (_temp_dir, outputs, summary) = run_fixture("chr1_only.sam");
        assert_eq!(summary.scan.informative_sites, 2);
        assert_eq!(summary.scan.covered_sites, 1);
        assert_eq!(summary.assignment, AssignmentCounters {
            a_unique: 2,
            b_unique: 1,
            ..Default::default()
        });
        assert_eq!(load_bam(&outputs.sample_b_bam), vec![("read_3".to_string(), 0)]);
    }
}
