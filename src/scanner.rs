use crate::alignment_store::AlignmentStore;
use crate::data_types::variants::{SamplePair, VariantSite};
use crate::evidence_cache::{EvidenceCache, FinalizedAlignment};
use crate::overlap::{resolve_site, Observation};
use crate::site_selection::is_informative;
use crate::variant_stream::VariantStreamError;
use crate::writers::evidence_writer::EvidenceWriter;

use log::{debug, info, trace};
use rustc_hash::FxHashSet as HashSet;
use std::io::Write;

/// Destination for informative sites that had at least one overlapping alignment
pub trait UsedSiteSink<R> {
    fn write_used_site(&mut self, record: &mut R) -> Result<(), Box<dyn std::error::Error>>;
}

/// Counts collected while scanning the variant stream
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanSummary {
    /// every record in the variant stream
    pub total_sites: u64,
    /// sites passing the informative-site checks
    pub informative_sites: u64,
    /// informative sites with at least one overlapping alignment
    pub covered_sites: u64,
    /// alignments that were finalized out of the evidence cache
    pub finalized_alignments: u64,
    /// rows written to the read-evidence table
    pub evidence_rows: u64
}

/// Rejects a variant stream that is not grouped by chromosome and sorted by position.
#[derive(Default)]
struct SortOrderCheck {
    /// the chromosome of the previous record
    current_chrom: Option<String>,
    /// the position of the previous record
    current_pos: u64,
    /// chromosomes that we have already moved past
    finished_chroms: HashSet<String>
}

impl SortOrderCheck {
    fn check(&mut self, site: &VariantSite) -> Result<(), VariantStreamError> {
        match self.current_chrom.as_deref() {
            Some(chrom) if chrom == site.chrom() => {
                if site.position() < self.current_pos {
                    return Err(VariantStreamError::PositionOutOfOrder {
                        chrom: chrom.to_string(),
                        position: site.position(),
                        previous_position: self.current_pos
                    });
                }
            },
            _ => {
                if self.finished_chroms.contains(site.chrom()) {
                    return Err(VariantStreamError::ChromosomeRevisited {
                        chrom: site.chrom().to_string()
                    });
                }
                if let Some(previous) = self.current_chrom.take() {
                    self.finished_chroms.insert(previous);
                }
                self.current_chrom = Some(site.chrom().to_string());
            }
        }
        self.current_pos = site.position();
        Ok(())
    }
}

/// Scans the variant stream, gathering evidence for every alignment that overlaps an informative site.
/// Evidence rows are written as each site is resolved, in the order the store returns the alignments.
/// The cache only tracks which (alignment, site) pairs were seen until the scan moves past each alignment.
/// Covered sites are passed to `used_sites` in scan order.
/// # Arguments
/// * `sites` - the variant stream, each site paired with the raw record for `used_sites`
/// * `store` - the alignment store to query
/// * `samples` - the two samples under comparison
/// * `used_sites` - receives every covered informative site, once each
/// * `evidence_writer` - receives one row per observation
/// * `progress_interval` - log progress every this many sites, 0 disables
/// # Errors
/// * if the variant stream fails to parse or is unsorted
/// * if the store or any writer fails
pub fn scan_variants<I, R, S, U, W>(
    sites: I, store: &mut S, samples: &SamplePair,
    used_sites: &mut U, evidence_writer: &mut EvidenceWriter<W>,
    progress_interval: u64
) -> Result<ScanSummary, Box<dyn std::error::Error>>
where
    I: Iterator<Item = Result<(VariantSite, R), Box<dyn std::error::Error>>>,
    S: AlignmentStore,
    U: UsedSiteSink<R>,
    W: Write
{
    let mut summary: ScanSummary = Default::default();
    let mut sort_check: SortOrderCheck = Default::default();
    let mut cache: EvidenceCache = EvidenceCache::new();

    for site_result in sites {
        let (site, mut record) = site_result?;
        summary.total_sites += 1;
        if progress_interval > 0 && summary.total_sites % progress_interval == 0 {
            info!("{} sites processed, {} alignments in cache...", summary.total_sites, cache.len());
        }
        sort_check.check(&site)?;

        if !is_informative(&site, samples) {
            continue;
        }
        summary.informative_sites += 1;

        // anything ending before this site is done collecting evidence
        let finalized: Vec<FinalizedAlignment> = cache.evict_before(site.chrom(), site.position());
        record_finalized(&finalized, &mut summary);

        let observations: Vec<Observation> = resolve_site(store, &site, samples)?;
        if !observations.is_empty() {
            summary.covered_sites += 1;
            used_sites.write_used_site(&mut record)?;
        }
        for observation in observations.iter() {
            // rows go out in the order the store returned them
            if cache.observe(site.position(), observation) {
                evidence_writer.write_observation(site.chrom(), site.position(), observation)?;
                summary.evidence_rows += 1;
            }
        }
    }

    let finalized: Vec<FinalizedAlignment> = cache.flush();
    record_finalized(&finalized, &mut summary);

    info!("{} sites processed.", summary.total_sites);
    debug!("Scan summary: {:?}", summary);
    Ok(summary)
}

fn record_finalized(finalized: &[FinalizedAlignment], summary: &mut ScanSummary) {
    for alignment in finalized.iter() {
        trace!("Finalized {} with {:?}", alignment.alignment.read_name(), alignment.sample_count());
        summary.finalized_alignments += 1;
    }
}
