use crate::assignment::PhasedSink;
use crate::data_types::phase_call::PhasedOutput;

use log::debug;
use rust_htslib::bam;
use std::path::Path;

/// The three alignment outputs: sample A, sample B, and ambiguous
pub struct PhasedBamWriter {
    /// one writer per `PhasedOutput`, in enum order
    bam_writers: Vec<bam::Writer>
}

impl PhasedBamWriter {
    /// Creates the three outputs using the input header as a template.
    /// # Arguments
    /// * `template` - the header of the input BAM
    /// * `output_a` - the BAM for alignments assigned to sample A
    /// * `output_b` - the BAM for alignments assigned to sample B
    /// * `output_ambiguous` - the BAM for everything else with evidence
    pub fn new(
        template: &bam::HeaderView,
        output_a: &Path, output_b: &Path, output_ambiguous: &Path
    ) -> Result<PhasedBamWriter, rust_htslib::errors::Error> {
        let mut output_header: bam::header::Header = bam::header::Header::from_template(template);
        let cli_string: String = std::env::args().collect::<Vec<String>>().join(" ");
        let cli_version: &str = &crate::cli::FULL_VERSION;

        let mut cli_record = bam::header::HeaderRecord::new("PG".as_bytes());
        cli_record.push_tag("PN".as_bytes(), &"gtsplit");
        cli_record.push_tag("ID".as_bytes(), &format!("gtsplit-v{cli_version}"));
        cli_record.push_tag("VN".as_bytes(), &cli_version);
        cli_record.push_tag("CL".as_bytes(), &cli_string);
        output_header.push_record(&cli_record);

        let mut bam_writers: Vec<bam::Writer> = Vec::with_capacity(3);
        let outputs = [
            (PhasedOutput::SampleA, output_a),
            (PhasedOutput::SampleB, output_b),
            (PhasedOutput::Ambiguous, output_ambiguous)
        ];
        for (output, path) in outputs {
            debug!("Creating {} BAM: {:?}", output, path);
            bam_writers.push(bam::Writer::from_path(path, &output_header, bam::Format::Bam)?);
        }
        Ok(PhasedBamWriter {
            bam_writers
        })
    }
}

impl PhasedSink<bam::Record> for PhasedBamWriter {
    fn write_phased(&mut self, output: PhasedOutput, record: &bam::Record) -> Result<(), Box<dyn std::error::Error>> {
        self.bam_writers[output as usize].write(record)?;
        Ok(())
    }
}
