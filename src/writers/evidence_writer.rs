use crate::data_types::variants::SamplePair;
use crate::overlap::Observation;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One row of the read-evidence table: a single (alignment, site) observation
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EvidenceRow {
    /// the read name of the alignment
    pub read_name: String,
    /// the chromosome of the site
    pub chrom: String,
    /// the 1-based position of the site
    pub position: u64,
    /// the name of the matched sample, empty if neither matched
    pub sample: String
}

/// Writes the read-evidence table as alignments are finalized
pub struct EvidenceWriter<W: Write> {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<W>,
    /// used to turn sample votes into names
    samples: SamplePair,
    /// the number of rows written so far
    rows_written: u64
}

impl EvidenceWriter<File> {
    /// Creates a new tab-delimited writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write the table to
    /// * `samples` - the samples under comparison
    pub fn new(filename: &Path, samples: SamplePair) -> csv::Result<EvidenceWriter<File>> {
        let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(filename)?;
        Ok(EvidenceWriter {
            csv_writer,
            samples,
            rows_written: 0
        })
    }
}

impl<W: Write> EvidenceWriter<W> {
    /// Wraps any writer, mostly useful for testing
    pub fn from_writer(writer: W, samples: SamplePair) -> EvidenceWriter<W> {
        let csv_writer: csv::Writer<W> = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        EvidenceWriter {
            csv_writer,
            samples,
            rows_written: 0
        }
    }

    /// Writes the row for one observation, including observations with no match.
    /// # Arguments
    /// * `chrom` - the chromosome of the site
    /// * `position` - the 1-based position of the site
    /// * `observation` - the alignment and its vote
    /// # Errors
    /// * if the csv_writer has any errors
    pub fn write_observation(&mut self, chrom: &str, position: u64, observation: &Observation) -> Result<(), Box<dyn std::error::Error>> {
        let row: EvidenceRow = EvidenceRow {
            read_name: observation.alignment.read_name().to_string(),
            chrom: chrom.to_string(),
            position,
            sample: match observation.sample {
                Some(s) => self.samples.name(s).to_string(),
                None => String::new()
            }
        };
        self.csv_writer.serialize(&row)?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flushes everything and hands back the underlying writer.
    pub fn finish(self) -> Result<W, Box<dyn std::error::Error>> {
        let inner: W = self.csv_writer.into_inner()
            .map_err(|e| e.into_error())?;
        Ok(inner)
    }
}

/// Loads every row of a read-evidence table.
/// # Arguments
/// * `reader` - the table contents, including the header line
/// # Errors
/// * if any row fails to parse
pub fn read_evidence_rows<R: std::io::Read>(reader: R) -> Result<Vec<EvidenceRow>, Box<dyn std::error::Error>> {
    let mut csv_reader: csv::Reader<R> = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(reader);
    let mut rows: Vec<EvidenceRow> = vec![];
    for row_result in csv_reader.deserialize() {
        let row: EvidenceRow = row_result?;
        rows.push(row);
    }
    Ok(rows)
}
