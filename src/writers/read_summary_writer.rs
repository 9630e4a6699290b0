use crate::data_types::phase_call::{PhaseCall, SampleCount};
use crate::data_types::variants::{Sample, SamplePair};

use rustc_hash::FxHashMap as HashMap;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Contains all the data written to each row of the read summary
#[derive(Serialize)]
struct ReadSummaryRow<'a> {
    /// the read name, shared by both mates
    read_name: &'a str,
    /// the number of sites matching sample A
    count_a: u64,
    /// the number of sites matching sample B
    count_b: u64,
    /// the resulting call label
    call: &'static str
}

/// Writes one row per read name with its counts and call, sorted by read name.
/// The header names the two samples instead of A and B.
/// # Arguments
/// * `writer` - the destination
/// * `read_counts` - the per-read tallies
/// * `samples` - the samples under comparison
/// # Errors
/// * if the csv_writer has any errors
pub fn write_read_summary<W: Write>(writer: W, read_counts: &HashMap<String, SampleCount>, samples: &SamplePair) -> csv::Result<()> {
    let mut csv_writer: csv::Writer<W> = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(["read_name", samples.name(Sample::A), samples.name(Sample::B), "call"])?;

    let mut read_names: Vec<&String> = read_counts.keys().collect();
    read_names.sort();
    for read_name in read_names.into_iter() {
        let counts: SampleCount = read_counts[read_name];
        let row = ReadSummaryRow {
            read_name,
            count_a: counts.count_a,
            count_b: counts.count_b,
            call: PhaseCall::from_counts(counts).label()
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Same as `write_read_summary`, but to a file
pub fn write_read_summary_file(filename: &Path, read_counts: &HashMap<String, SampleCount>, samples: &SamplePair) -> csv::Result<()> {
    let file: File = File::create(filename)?;
    write_read_summary(file, read_counts, samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_summary() {
        let samples = SamplePair::new("NA1".to_string(), 0, "NA2".to_string(), 1);
        let mut read_counts: HashMap<String, SampleCount> = Default::default();
        read_counts.insert("read_b".to_string(), SampleCount::new(1, 3));
        read_counts.insert("read_a".to_string(), SampleCount::new(2, 0));
        read_counts.insert("read_c".to_string(), SampleCount::new(0, 0));

        let mut buffer: Vec<u8> = vec![];
        write_read_summary(&mut buffer, &read_counts, &samples).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "read_name\tNA1\tNA2\tcall\n\
            read_a\t2\t0\tA_unique\n\
            read_b\t1\t3\tB_majority\n\
            read_c\t0\t0\tambiguous\n");
    }
}
