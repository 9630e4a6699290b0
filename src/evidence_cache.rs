use crate::data_types::alignments::{AlignmentKey, AlignmentRecord};
use crate::data_types::phase_call::SampleCount;
use crate::data_types::variants::Sample;
use crate::overlap::Observation;

use log::trace;
use priority_queue::PriorityQueue;
use rustc_hash::FxHashMap as HashMap;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Alignments with the smallest end coordinate come out first
type EvictionPriority = Reverse<u64>;

/// An alignment that can no longer receive evidence, along with everything it collected.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FinalizedAlignment {
    /// the alignment
    pub alignment: AlignmentRecord,
    /// (1-based site position, matched sample) in ascending position order
    pub evidence: Vec<(u64, Option<Sample>)>
}

impl FinalizedAlignment {
    /// Tallies the votes of this single alignment.
    pub fn sample_count(&self) -> SampleCount {
        let mut counts = SampleCount::default();
        for &(_, sample) in self.evidence.iter() {
            counts.add_vote(sample);
        }
        counts
    }
}

/// Accumulates per-alignment evidence while the variant scan is in flight.
/// Memory stays bounded because alignments are evicted as soon as the scan passes their end.
#[derive(Default)]
pub struct EvidenceCache {
    /// the chromosome currently being scanned
    current_chrom: String,
    /// all live alignments and the evidence gathered so far
    entries: HashMap<AlignmentKey, (AlignmentRecord, BTreeMap<u64, Option<Sample>>)>,
    /// eviction order, keyed on alignment end
    eviction_queue: PriorityQueue<AlignmentKey, EvictionPriority>
}

impl EvidenceCache {
    pub fn new() -> EvidenceCache {
        Default::default()
    }

    /// Number of alignments currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records one observation at a site.
    /// Repeated observations of the same (alignment, site) keep the first value.
    /// Returns true if this is the first observation of the alignment at this site.
    /// # Arguments
    /// * `position` - the 1-based position of the site
    /// * `observation` - the alignment and its vote
    pub fn observe(&mut self, position: u64, observation: &Observation) -> bool {
        let key: AlignmentKey = observation.alignment.key();
        let end: u64 = observation.alignment.end();
        let (_, evidence) = self.entries.entry(key.clone())
            .or_insert_with(|| (observation.alignment.clone(), BTreeMap::new()));
        if evidence.contains_key(&position) {
            return false;
        }
        evidence.insert(position, observation.sample);
        self.eviction_queue.push(key, Reverse(end));
        true
    }

    /// Removes every alignment that cannot overlap a site at or after the given position.
    /// Moving to a new chromosome flushes the whole cache.
    /// # Arguments
    /// * `chrom` - the chromosome of the next site
    /// * `position` - the 1-based position of the next site
    pub fn evict_before(&mut self, chrom: &str, position: u64) -> Vec<FinalizedAlignment> {
        if self.current_chrom != chrom {
            trace!("Chromosome change {:?} -> {:?}, flushing {} alignments", self.current_chrom, chrom, self.len());
            let finalized = self.flush();
            self.current_chrom = chrom.to_string();
            return finalized;
        }

        let mut finalized: Vec<FinalizedAlignment> = vec![];
        while let Some((_, &Reverse(end))) = self.eviction_queue.peek() {
            if end >= position {
                break;
            }
            if let Some((key, _)) = self.eviction_queue.pop() {
                if let Some(entry) = self.entries.remove(&key) {
                    finalized.push(finalize(entry));
                }
            }
        }
        sort_finalized(&mut finalized);
        finalized
    }

    /// Removes and returns everything in the cache.
    pub fn flush(&mut self) -> Vec<FinalizedAlignment> {
        self.eviction_queue.clear();
        let mut finalized: Vec<FinalizedAlignment> = self.entries.drain()
            .map(|(_, entry)| finalize(entry))
            .collect();
        sort_finalized(&mut finalized);
        finalized
    }
}

fn finalize((alignment, evidence): (AlignmentRecord, BTreeMap<u64, Option<Sample>>)) -> FinalizedAlignment {
    FinalizedAlignment {
        alignment,
        evidence: evidence.into_iter().collect()
    }
}

/// hash map and heap order are arbitrary, so put outputs in coordinate order
fn sort_finalized(finalized: &mut [FinalizedAlignment]) {
    finalized.sort_by_cached_key(|f| f.alignment.key());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(read_name: &str, start: u64, end: u64, sample: Option<Sample>) -> Observation {
        Observation {
            alignment: AlignmentRecord::new(read_name.to_string(), "chr1".to_string(), start, end, None, 0, 0),
            sample
        }
    }

    #[test]
    fn test_eviction_safety() {
        let mut cache = EvidenceCache::new();
        assert!(cache.evict_before("chr1", 100).is_empty());
        cache.observe(100, &observation("short", 91, 110, Some(Sample::A)));
        cache.observe(100, &observation("long", 95, 200, Some(Sample::B)));
        assert_eq!(cache.len(), 2);

        // the scan is still inside both alignments
        assert!(cache.evict_before("chr1", 110).is_empty());
        cache.observe(110, &observation("short", 91, 110, None));
        cache.observe(110, &observation("long", 95, 200, Some(Sample::B)));

        let evicted = cache.evict_before("chr1", 111);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].alignment.read_name(), "short");
        assert_eq!(evicted[0].evidence, vec![(100, Some(Sample::A)), (110, None)]);
        assert_eq!(evicted[0].sample_count(), SampleCount::new(1, 0));
        assert_eq!(cache.len(), 1);

        // end of input
        let flushed = cache.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].sample_count(), SampleCount::new(0, 2));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_chromosome_change() {
        let mut cache = EvidenceCache::new();
        cache.evict_before("chr1", 100);
        cache.observe(100, &observation("r1", 50, 5000, Some(Sample::A)));
        cache.observe(100, &observation("r2", 60, 6000, Some(Sample::B)));

        let flushed = cache.evict_before("chr2", 10);
        let names: Vec<&str> = flushed.iter().map(|f| f.alignment.read_name()).collect();
        assert_eq!(names, vec!["r1", "r2"]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_repeat_observation() {
        let mut cache = EvidenceCache::new();
        cache.evict_before("chr1", 100);
        assert!(cache.observe(100, &observation("r1", 91, 110, Some(Sample::A))));
        assert!(!cache.observe(100, &observation("r1", 91, 110, Some(Sample::B))));
        let flushed = cache.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].evidence, vec![(100, Some(Sample::A))]);
    }
}
