use crate::data_types::variants::{Sample, SamplePair};
use crate::phaser::PhasingSummary;

use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Contains all the data written to the run summary
#[derive(Serialize)]
struct SummaryRow<'a> {
    /// the name of sample A
    sample_a: &'a str,
    /// the name of sample B
    sample_b: &'a str,
    /// every record in the VCF
    total_sites: u64,
    /// sites passing the informative-site checks
    informative_sites: u64,
    /// informative sites with at least one overlapping alignment
    covered_sites: u64,
    /// rows in the read-evidence table
    evidence_rows: u64,
    /// alignments written to the A output with no B votes
    a_unique: u64,
    /// alignments written to the A output by majority
    a_majority: u64,
    /// alignments written to the B output with no A votes
    b_unique: u64,
    /// alignments written to the B output by majority
    b_majority: u64,
    /// alignments written to the ambiguous output
    ambiguous: u64
}

/// Writes the run summary as a single row.
/// # Arguments
/// * `csv_writer` - the configured writer
/// * `summary` - the counts from the run
/// * `samples` - the samples under comparison
fn write_summary_row<W: Write>(mut csv_writer: csv::Writer<W>, summary: &PhasingSummary, samples: &SamplePair) -> csv::Result<()> {
    let row = SummaryRow {
        sample_a: samples.name(Sample::A),
        sample_b: samples.name(Sample::B),
        total_sites: summary.scan.total_sites,
        informative_sites: summary.scan.informative_sites,
        covered_sites: summary.scan.covered_sites,
        evidence_rows: summary.scan.evidence_rows,
        a_unique: summary.assignment.a_unique,
        a_majority: summary.assignment.a_majority,
        b_unique: summary.assignment.b_unique,
        b_majority: summary.assignment.b_majority,
        ambiguous: summary.assignment.ambiguous
    };
    csv_writer.serialize(&row)?;
    csv_writer.flush()?;
    Ok(())
}

/// Writes the run summary to a file, comma-separated if it ends with .csv and tab-separated otherwise.
/// # Arguments
/// * `filename` - the path to write the summary to
/// * `summary` - the counts from the run
/// * `samples` - the samples under comparison
pub fn write_run_summary(filename: &Path, summary: &PhasingSummary, samples: &SamplePair) -> csv::Result<()> {
    // modify the delimiter to "," if it ends with .csv
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)?;
    write_summary_row(csv_writer, summary, samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::AssignmentCounters;
    use crate::scanner::ScanSummary;

    #[test]
    fn test_summary_row() {
        let samples = SamplePair::new("NA1".to_string(), 0, "NA2".to_string(), 1);
        let summary = PhasingSummary {
            scan: ScanSummary {
                total_sites: 10,
                informative_sites: 4,
                covered_sites: 3,
                finalized_alignments: 5,
                evidence_rows: 7
            },
            assignment: AssignmentCounters {
                a_unique: 2,
                a_majority: 1,
                b_unique: 1,
                b_majority: 0,
                ambiguous: 1
            }
        };

        let mut buffer: Vec<u8> = vec![];
        let csv_writer = csv::WriterBuilder::new().delimiter(b',').from_writer(&mut buffer);
        write_summary_row(csv_writer, &summary, &samples).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "sample_a,sample_b,total_sites,informative_sites,covered_sites,evidence_rows,a_unique,a_majority,b_unique,b_majority,ambiguous\n\
            NA1,NA2,10,4,3,7,2,1,1,0,1\n");
    }
}
