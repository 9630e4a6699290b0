use crate::scanner::UsedSiteSink;

use log::debug;
use rust_htslib::bcf;
use std::path::Path;

/// Copies covered informative sites into a plain-text VCF sharing the input header
pub struct UsedSiteWriter {
    /// the output VCF
    vcf_writer: bcf::Writer,
    /// the number of records written
    sites_written: u64
}

impl UsedSiteWriter {
    /// Creates the output VCF using the input header as a template.
    /// # Arguments
    /// * `filename` - the output path, always written uncompressed
    /// * `template` - the header of the input VCF
    pub fn new(filename: &Path, template: &bcf::header::HeaderView) -> Result<UsedSiteWriter, Box<dyn std::error::Error>> {
        debug!("Creating used-site VCF: {:?}", filename);
        let mut output_header: bcf::header::Header = bcf::header::Header::from_template(template);
        let cli_string: String = std::env::args().collect::<Vec<String>>().join(" ");
        let cli_version: &str = &crate::cli::FULL_VERSION;
        output_header.push_record(format!(r#"##gtsplit_version="{cli_version}""#).as_bytes());
        output_header.push_record(format!(r#"##gtsplit_command="{cli_string}""#).as_bytes());
        let vcf_writer: bcf::Writer = bcf::Writer::from_path(
            filename,
            &output_header,
            true,
            bcf::Format::Vcf
        )?;
        Ok(UsedSiteWriter {
            vcf_writer,
            sites_written: 0
        })
    }

    pub fn sites_written(&self) -> u64 {
        self.sites_written
    }
}

impl UsedSiteSink<bcf::Record> for UsedSiteWriter {
    fn write_used_site(&mut self, record: &mut bcf::Record) -> Result<(), Box<dyn std::error::Error>> {
        // records still point at the reader header until translated
        self.vcf_writer.translate(record);
        self.vcf_writer.write(record)?;
        self.sites_written += 1;
        Ok(())
    }
}
