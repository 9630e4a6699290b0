use crate::data_types::variants::{Sample, SamplePair, SampleCall, VariantSite};

/// Returns true if a site can be used to tell the two samples apart.
/// The site must be PASS, both samples must be called and homozygous, and their genotypes must differ.
/// Only the filter status and the two selected sample columns are consulted.
/// # Arguments
/// * `site` - the variant site to check
/// * `samples` - the sample columns under comparison
pub fn is_informative(site: &VariantSite, samples: &SamplePair) -> bool {
    if !site.filter_pass() {
        return false;
    }

    let (call_a, call_b): (&SampleCall, &SampleCall) = match (
        site.call(samples.index(Sample::A)),
        site.call(samples.index(Sample::B))
    ) {
        (Some(a), Some(b)) => (a, b),
        // a missing column is the same as a missing call
        _ => return false
    };

    call_a.is_called() && call_b.is_called() &&
        !call_a.is_heterozygous() && !call_b.is_heterozygous() &&
        call_a.called_alleles() != call_b.called_alleles()
}
