use crate::alignment_store::{AlignmentStore, OverlapHit};
use crate::data_types::alignments::AlignmentRecord;
use crate::data_types::variants::{Sample, SamplePair, VariantSite};

use log::trace;

/// One alignment's vote at one informative site
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Observation {
    /// the overlapping alignment
    pub alignment: AlignmentRecord,
    /// the sample whose allele the alignment carries, if exactly one matched
    pub sample: Option<Sample>
}

/// Matches an observed base against each sample's homozygous allele.
/// Only single-base alleles are compared; anything else yields no evidence.
/// # Arguments
/// * `base` - the observed read base, `None` if undetermined
/// * `site` - the informative site
/// * `samples` - the two samples under comparison
pub fn match_sample(base: Option<u8>, site: &VariantSite, samples: &SamplePair) -> Option<Sample> {
    let base: u8 = base?.to_ascii_uppercase();
    let allele_of = |sample: Sample| -> Option<u8> {
        let allele_index: u32 = site.call(samples.index(sample))?.homozygous_allele()?;
        match site.allele(allele_index)? {
            &[allele_base] => Some(allele_base.to_ascii_uppercase()),
            _ => None
        }
    };

    // indels and multi-base substitutions cannot be judged from a single base
    let allele_a: u8 = allele_of(Sample::A)?;
    let allele_b: u8 = allele_of(Sample::B)?;
    match (allele_a == base, allele_b == base) {
        (true, false) => Some(Sample::A),
        (false, true) => Some(Sample::B),
        // neither or both
        _ => None
    }
}

/// Queries the store for every alignment covering an informative site and decides each alignment's vote.
/// Every overlapping alignment is returned, with or without a matched sample.
/// # Arguments
/// * `store` - the alignment store to query
/// * `site` - the informative site
/// * `samples` - the two samples under comparison
/// # Errors
/// * if the store query fails
pub fn resolve_site<S: AlignmentStore>(store: &mut S, site: &VariantSite, samples: &SamplePair) -> Result<Vec<Observation>, Box<dyn std::error::Error>> {
    let hits: Vec<OverlapHit> = store.fetch_overlapping(site.chrom(), site.position())?;
    let observations: Vec<Observation> = hits.into_iter()
        .map(|hit| {
            let sample: Option<Sample> = match_sample(hit.base, site, samples);
            Observation {
                alignment: hit.alignment,
                sample
            }
        })
        .collect();
    trace!("{}:{} => {} overlapping alignments", site.chrom(), site.position(), observations.len());
    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment_store::MemoryAlignmentStore;
    use crate::data_types::variants::SampleCall;

    fn snv_site(ref_allele: &[u8], alt_allele: &[u8], gt_a: u32, gt_b: u32) -> VariantSite {
        VariantSite::new(
            "chr1".to_string(), 100, true,
            vec![ref_allele.to_vec(), alt_allele.to_vec()],
            vec![SampleCall::homozygous(gt_a), SampleCall::homozygous(gt_b)]
        )
    }

    fn default_samples() -> SamplePair {
        SamplePair::new("S1".to_string(), 0, "S2".to_string(), 1)
    }

    #[test]
    fn test_match_sample() {
        let samples = default_samples();
        let site = snv_site(b"A", b"G", 0, 1);
        assert_eq!(match_sample(Some(b'A'), &site, &samples), Some(Sample::A));
        assert_eq!(match_sample(Some(b'g'), &site, &samples), Some(Sample::B));
        assert_eq!(match_sample(Some(b'T'), &site, &samples), None);
        assert_eq!(match_sample(None, &site, &samples), None);

        // the order of the alleles does not matter, only which sample holds which
        let swapped = snv_site(b"A", b"G", 1, 0);
        assert_eq!(match_sample(Some(b'A'), &swapped, &samples), Some(Sample::B));
    }

    #[test]
    fn test_non_snv_alleles() {
        let samples = default_samples();
        let deletion = snv_site(b"AT", b"A", 0, 1);
        assert_eq!(match_sample(Some(b'A'), &deletion, &samples), None);
        assert_eq!(match_sample(Some(b'T'), &deletion, &samples), None);

        let insertion = snv_site(b"A", b"AT", 1, 0);
        assert_eq!(match_sample(Some(b'A'), &insertion, &samples), None);
    }

    #[test]
    fn test_resolve_site() {
        let samples = default_samples();
        let site = snv_site(b"A", b"G", 0, 1);
        let mut store = MemoryAlignmentStore::new();
        store.add_read("read_a", "chr1", 91, b"CCCCCCCCCACCCCCCCCCC", None, 0);
        store.add_read("read_b", "chr1", 95, b"CCCCCGCCCC", None, 0);
        store.add_read("read_n", "chr1", 100, b"TCCCC", None, 0);
        store.add_read("read_far", "chr1", 200, b"ACGTA", None, 0);

        let observations = resolve_site(&mut store, &site, &samples).unwrap();
        let votes: Vec<(&str, Option<Sample>)> = observations.iter()
            .map(|o| (o.alignment.read_name(), o.sample))
            .collect();
        assert_eq!(votes, vec![
            ("read_a", Some(Sample::A)),
            ("read_b", Some(Sample::B)),
            ("read_n", None)
        ]);

        // resolving the same site again gives the same answer
        let repeat = resolve_site(&mut store, &site, &samples).unwrap();
        assert_eq!(observations, repeat);
        assert_eq!(store.queries, 2);
    }
}
