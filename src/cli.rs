use clap::Parser;
use chrono::Datelike;
use flate2::bufread::MultiGzDecoder;
use lazy_static::lazy_static;
use log::{error, info, trace};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::phaser::{OutputPaths, PhasingConfig};

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.3.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.3.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) 2022-{}
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input alignment file in BAM format, coordinate sorted and indexed
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(value_name = "BAM")]
    #[clap(help_heading = Some("Input/Output"))]
    pub bam_filename: PathBuf,

    /// Input variant file in VCF format, sorted by chromosome and position
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub vcf_filename: PathBuf,

    /// First sample to split alignments into
    #[clap(required = true)]
    #[clap(short = 'a')]
    #[clap(long = "sample-a")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sample_a: String,

    /// Second sample to split alignments into
    #[clap(required = true)]
    #[clap(short = 'B')]
    #[clap(long = "sample-b")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sample_b: String,

    /// Prefix for all outputs (default: the input BAM path without ".bam")
    #[clap(short = 'o')]
    #[clap(long = "output-prefix")]
    #[clap(value_name = "PREFIX")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_prefix: Option<String>,

    /// Output summary statistics file (optional, csv/tsv)
    #[clap(long = "summary-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub summary_filename: Option<PathBuf>,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Sets a minimum MAPQ to include a read in the evidence
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Alignment Filtering"))]
    pub min_mapping_quality: u8,

    /// Sets a minimum base quality for a base to count as evidence
    #[clap(long = "min-base-quality")]
    #[clap(value_name = "QUAL")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Alignment Filtering"))]
    pub min_base_quality: u8,

    /// Treats a homozygous call as heterozygous when its AD minor-allele fraction is above this value
    #[clap(long = "het-maf-cutoff")]
    #[clap(value_name = "FRAC")]
    #[clap(default_value = "0.1")]
    #[clap(help_heading = Some("Variant Filtering"))]
    pub het_maf_cutoff: f64,

    /// Logs progress every this many sites or alignments, 0 disables
    #[clap(long = "progress-interval")]
    #[clap(value_name = "COUNT")]
    #[clap(default_value = "100000")]
    pub progress_interval: u64
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

/// Returns true if any of the given index extensions exist next to the file
fn has_index(filename: &Path, known_indices: &[&str]) -> bool {
    known_indices.iter().any(|ki| {
        let mut extension_path = filename.to_owned()
            .into_os_string();
        extension_path.push(format!(".{ki}"));
        PathBuf::from(extension_path).exists()
    })
}

/// Checks if the BAM file exists and has an index. If it fails either, this will exit.
/// # Arguments
/// * `filename` - the BAM file path to check
/// * `label` - the label to use for error messages
fn check_required_bam(filename: &Path, label: &str) {
    check_required_filename(filename, label);
    if !has_index(filename, &["bai", "csi"]) {
        error!("Error while checking {filename:?}: no BAM index found (.bai or .csi)");
        std::process::exit(exitcode::NOINPUT);
    }
}

/// Checks if the VCF file exists and, if compressed, that it can actually be decompressed.
/// # Arguments
/// * `filename` - the VCF file path to check
/// * `label` - the label to use for error messages
fn check_required_vcf(filename: &Path, label: &str) {
    check_required_filename(filename, label);
    if filename.extension().unwrap_or_default() != "gz" {
        // plain text VCF, htslib will tell us if it's broken
        return;
    }

    let vcf_file: File = match File::open(filename) {
        Ok(f) => f,
        Err(e) => {
            error!("Error while opening {filename:?}: {e}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let file_reader = BufReader::new(vcf_file);
    let mut gz_decoder = MultiGzDecoder::new(file_reader);
    let mut small_buffer: [u8; 10] = [0; 10];
    match gz_decoder.read(&mut small_buffer) {
        Ok(bytes_read) => {
            trace!("Successfully read {bytes_read} bytes from VCF.")
        },
        Err(e) => {
            if e.to_string() == "invalid gzip header" {
                error!("Error while checking {filename:?}: {e}; is the VCF bgzipped?");
            } else {
                error!("Error while checking {filename:?}: {e}");
            }
            std::process::exit(exitcode::IOERR);
        }
    };
}

impl Settings {
    /// Builds the run parameters from our CLI settings
    pub fn phasing_config(&self) -> PhasingConfig {
        PhasingConfig {
            min_mapq: self.min_mapping_quality,
            min_base_quality: self.min_base_quality,
            het_maf_cutoff: self.het_maf_cutoff,
            progress_interval: self.progress_interval
        }
    }

    /// Resolves every output path from `--output-prefix`, or from the input BAM when no prefix is given
    pub fn output_paths(&self) -> OutputPaths {
        match self.output_prefix.as_deref() {
            Some(prefix) => OutputPaths::from_prefix(prefix, &self.sample_a, &self.sample_b),
            None => OutputPaths::from_input(&self.bam_filename, &self.sample_a, &self.sample_b)
        }
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(settings: Settings) -> Settings {
    //check for any of our required files
    check_required_bam(&settings.bam_filename, "Alignment file");
    check_required_vcf(&settings.vcf_filename, "Variant file");

    if settings.sample_a == settings.sample_b {
        error!("--sample-a and --sample-b must be different, both are {:?}", settings.sample_a);
        std::process::exit(exitcode::USAGE);
    }
    info!("Samples: {:?} / {:?}", settings.sample_a, settings.sample_b);

    if !(0.0..=1.0).contains(&settings.het_maf_cutoff) {
        error!("--het-maf-cutoff must be in the range [0.0, 1.0]");
        std::process::exit(exitcode::USAGE);
    }

    // dump stuff to the logger
    info!("Alignment filtering:");
    info!("\tMinimum mapping quality: {}", settings.min_mapping_quality);
    info!("\tMinimum base quality: {}", settings.min_base_quality);
    info!("Variant filtering:");
    info!("\tHeterozygous minor-allele fraction cutoff: {}", settings.het_maf_cutoff);

    for path in settings.output_paths().all_paths() {
        info!("Output file: \"{}\"", path.display());
    }
    if let Some(summary_filename) = settings.summary_filename.as_ref() {
        info!("Summary file: \"{}\"", summary_filename.display());
    }

    //send the settings back
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let settings = Settings::try_parse_from([
            "gtsplit", "--bam", "/data/run1.bam", "--vcf", "/data/calls.vcf.gz",
            "--sample-a", "NA1", "--sample-b", "NA2"
        ]).unwrap();
        assert_eq!(settings.phasing_config(), PhasingConfig::default());
        assert_eq!(settings.verbosity, 0);
        assert!(settings.summary_filename.is_none());

        let outputs = settings.output_paths();
        assert_eq!(outputs.sample_a_bam, PathBuf::from("/data/run1.phased.NA1.bam"));
        assert_eq!(outputs.read_summary, PathBuf::from("/data/run1.read_sample_summary.tsv"));
    }

    #[test]
    fn test_parse_options() {
        let settings = Settings::try_parse_from([
            "gtsplit", "-b", "in.bam", "-c", "in.vcf", "-a", "NA1", "-B", "NA2",
            "-o", "out/split", "--min-mapq", "20", "--min-base-quality", "13",
            "--het-maf-cutoff", "0.2", "--progress-interval", "0", "-vv"
        ]).unwrap();
        assert_eq!(settings.verbosity, 2);
        assert_eq!(settings.phasing_config(), PhasingConfig {
            min_mapq: 20,
            min_base_quality: 13,
            het_maf_cutoff: 0.2,
            progress_interval: 0
        });
        assert_eq!(settings.output_paths().ambiguous_bam, PathBuf::from("out/split.phased.ambiguous.bam"));
    }

    #[test]
    fn test_missing_sample() {
        assert!(Settings::try_parse_from(["gtsplit", "--bam", "in.bam", "--vcf", "in.vcf", "--sample-a", "NA1"]).is_err());
    }

    #[test]
    fn test_has_index() {
        let tmp_dir = tempfile::tempdir().unwrap();
        let bam_filename = tmp_dir.path().join("reads.bam");
        std::fs::write(&bam_filename, b"").unwrap();
        assert!(!has_index(&bam_filename, &["bai", "csi"]));
        std::fs::write(tmp_dir.path().join("reads.bam.csi"), b"").unwrap();
        assert!(has_index(&bam_filename, &["bai", "csi"]));
    }
}
