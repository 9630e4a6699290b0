use crate::alignment_store::MateLocator;
use crate::data_types::alignments::{AlignmentRecord, PairedFlag};
use crate::data_types::phase_call::{PhaseCall, PhasedOutput, SampleCount, Support};
use crate::data_types::variants::{Sample, SamplePair};
use crate::writers::evidence_writer::{read_evidence_rows, EvidenceRow};

use log::{debug, info, trace, warn};
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;

/// Destination for alignments once their read name has been called
pub trait PhasedSink<R> {
    fn write_phased(&mut self, output: PhasedOutput, record: &R) -> Result<(), Box<dyn std::error::Error>>;
}

/// Number of emitted alignment records per call
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AssignmentCounters {
    pub a_unique: u64,
    pub a_majority: u64,
    pub b_unique: u64,
    pub b_majority: u64,
    pub ambiguous: u64
}

impl AssignmentCounters {
    pub fn record(&mut self, call: PhaseCall) {
        match call {
            PhaseCall::AssignedA(Support::Unique) => self.a_unique += 1,
            PhaseCall::AssignedA(Support::Majority) => self.a_majority += 1,
            PhaseCall::AssignedB(Support::Unique) => self.b_unique += 1,
            PhaseCall::AssignedB(Support::Majority) => self.b_majority += 1,
            PhaseCall::Ambiguous => self.ambiguous += 1
        }
    }

    pub fn total(&self) -> u64 {
        self.a_unique + self.a_majority + self.b_unique + self.b_majority + self.ambiguous
    }
}

/// Builds per-read sample counts from evidence rows.
/// Both mates share a read name, so their rows are unioned per site: a site votes for a sample if any row
/// matched it and no row matched the other sample.
/// # Arguments
/// * `rows` - the evidence rows, in any order
/// * `samples` - the samples under comparison
/// # Errors
/// * if a row names a sample that is neither A nor B
pub fn tally_evidence<I: IntoIterator<Item = EvidenceRow>>(rows: I, samples: &SamplePair) -> Result<HashMap<String, SampleCount>, Box<dyn std::error::Error>> {
    // read name -> (chrom, position) -> (matched A, matched B)
    let mut site_votes: HashMap<String, HashMap<(String, u64), (bool, bool)>> = Default::default();
    for row in rows.into_iter() {
        let vote: Option<Sample> = if row.sample.is_empty() {
            None
        } else {
            match samples.lookup(&row.sample) {
                Some(s) => Some(s),
                None => bail!("Evidence row for {} has unknown sample {:?}", row.read_name, row.sample)
            }
        };

        let entry: &mut (bool, bool) = site_votes.entry(row.read_name)
            .or_default()
            .entry((row.chrom, row.position))
            .or_insert((false, false));
        match vote {
            Some(Sample::A) => entry.0 = true,
            Some(Sample::B) => entry.1 = true,
            None => {}
        }
    }

    let mut read_counts: HashMap<String, SampleCount> = Default::default();
    read_counts.reserve(site_votes.len());
    for (read_name, sites) in site_votes.into_iter() {
        let mut counts: SampleCount = Default::default();
        for &(matched_a, matched_b) in sites.values() {
            let vote: Option<Sample> = match (matched_a, matched_b) {
                (true, false) => Some(Sample::A),
                (false, true) => Some(Sample::B),
                // mates disagree, or neither matched
                _ => None
            };
            counts.add_vote(vote);
        }
        read_counts.insert(read_name, counts);
    }
    Ok(read_counts)
}

/// Reloads the read-evidence table and builds per-read sample counts.
/// # Arguments
/// * `reader` - the evidence table, including the header
/// * `samples` - the samples under comparison
pub fn replay_evidence<R: std::io::Read>(reader: R, samples: &SamplePair) -> Result<HashMap<String, SampleCount>, Box<dyn std::error::Error>> {
    let rows: Vec<EvidenceRow> = read_evidence_rows(reader)?;
    debug!("Loaded {} evidence rows", rows.len());
    let read_counts = tally_evidence(rows, samples)?;
    info!("Loaded evidence for {} read names", read_counts.len());
    Ok(read_counts)
}

/// Streams every alignment, writing those whose read name has evidence to the output for its call.
/// Before writing, the mate is looked up and the paired flag is set when it is found.
/// # Arguments
/// * `alignments` - every alignment of the input, each with the raw record that gets written
/// * `read_counts` - per-read sample counts from `replay_evidence`
/// * `mates` - lookup for mates, independent of whatever produces `alignments`
/// * `sink` - receives the called alignments
/// * `progress_interval` - log progress every this many alignments, 0 disables
/// # Errors
/// * if the alignment stream or the sink fails; mate lookup failures are only logged
pub fn assign_alignments<I, R, M, P>(
    alignments: I, read_counts: &HashMap<String, SampleCount>,
    mates: &mut M, sink: &mut P, progress_interval: u64
) -> Result<AssignmentCounters, Box<dyn std::error::Error>>
where
    I: Iterator<Item = Result<(AlignmentRecord, R), Box<dyn std::error::Error>>>,
    R: PairedFlag,
    M: MateLocator,
    P: PhasedSink<R>
{
    let mut counters: AssignmentCounters = Default::default();
    let mut processed: u64 = 0;
    for entry in alignments {
        let (alignment, mut record) = entry?;
        processed += 1;
        if progress_interval > 0 && processed % progress_interval == 0 {
            info!("{} alignments processed, {} written...", processed, counters.total());
        }

        let counts: SampleCount = match read_counts.get(alignment.read_name()) {
            Some(&c) => c,
            None => continue
        };
        let call: PhaseCall = PhaseCall::from_counts(counts);

        match mates.locate_mate(&alignment) {
            Ok(Some(mate)) => {
                trace!("Found mate of {} at {}:{}", alignment.read_name(), mate.chrom(), mate.start());
                record.mark_paired();
            },
            Ok(None) => {
                trace!("No mate found for {}", alignment.read_name());
            },
            Err(e) => {
                warn!("Error while locating mate of {}: {}", alignment.read_name(), e);
            }
        }

        sink.write_phased(call.output(), &record)?;
        counters.record(call);
    }
    info!("{} alignments processed, {} written.", processed, counters.total());
    Ok(counters)
}
