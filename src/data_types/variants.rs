/// One of the two donor samples being compared
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Sample {
    A=0,
    B
}

/// A single sample's genotype at a site.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SampleCall {
    /// allele indices from the GT field, `None` for a missing allele (e.g. "./.")
    genotype: Vec<Option<u32>>,
    /// true if the call is heterozygous, either by GT or by allele fraction
    heterozygous: bool
}

impl SampleCall {
    /// Creates a new call from parsed GT alleles.
    /// # Arguments
    /// * `genotype` - the allele indices, `None` where the allele is missing
    /// * `heterozygous` - the heterozygosity flag as decided by the variant reader
    pub fn new(genotype: Vec<Option<u32>>, heterozygous: bool) -> SampleCall {
        SampleCall {
            genotype,
            heterozygous
        }
    }

    /// Shortcut for a homozygous call of the given allele, mostly for tests
    pub fn homozygous(allele: u32) -> SampleCall {
        SampleCall::new(vec![Some(allele), Some(allele)], false)
    }

    /// Shortcut for a fully missing call ("./.")
    pub fn no_call() -> SampleCall {
        SampleCall::new(vec![None, None], false)
    }

    /// Returns true if every allele of the genotype was called.
    pub fn is_called(&self) -> bool {
        !self.genotype.is_empty() && self.genotype.iter().all(|a| a.is_some())
    }

    pub fn is_heterozygous(&self) -> bool {
        self.heterozygous
    }

    /// Returns the distinct called allele indices in sorted order.
    /// Ordering, phasing, and ploidy are ignored, so "1|0" matches "0/1" and haploid "0" matches "0/0".
    pub fn called_alleles(&self) -> Vec<u32> {
        let mut alleles: Vec<u32> = self.genotype.iter().flatten().cloned().collect();
        alleles.sort_unstable();
        alleles.dedup();
        alleles
    }

    /// Returns the allele index if this is a called, homozygous genotype.
    pub fn homozygous_allele(&self) -> Option<u32> {
        if !self.is_called() || self.heterozygous {
            return None;
        }
        let first = self.genotype[0];
        if self.genotype.iter().all(|&a| a == first) {
            first
        } else {
            None
        }
    }
}

/// A variant record reduced to what the phasing engine needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantSite {
    /// the chromosome of the site
    chrom: String,
    /// the position of the site, 1-based
    position: u64,
    /// true if the FILTER column is PASS
    filter_pass: bool,
    /// REF followed by all ALT alleles
    alleles: Vec<Vec<u8>>,
    /// one call per sample column in the source file
    calls: Vec<SampleCall>
}

impl VariantSite {
    /// Creates a new site.
    /// # Arguments
    /// * `chrom` - the chromosome name
    /// * `position` - 1-based coordinate
    /// * `filter_pass` - true if the record passed all filters
    /// * `alleles` - REF followed by the ALT alleles
    /// * `calls` - the genotype calls, indexed by sample column
    pub fn new(chrom: String, position: u64, filter_pass: bool, alleles: Vec<Vec<u8>>, calls: Vec<SampleCall>) -> VariantSite {
        VariantSite {
            chrom,
            position,
            filter_pass,
            alleles,
            calls
        }
    }

    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn filter_pass(&self) -> bool {
        self.filter_pass
    }

    pub fn alleles(&self) -> &[Vec<u8>] {
        &self.alleles
    }

    /// Returns the call for a sample column, if the column exists.
    pub fn call(&self, sample_index: usize) -> Option<&SampleCall> {
        self.calls.get(sample_index)
    }

    /// Returns the allele sequence for a given allele index.
    pub fn allele(&self, allele_index: u32) -> Option<&[u8]> {
        self.alleles.get(allele_index as usize).map(|a| a.as_slice())
    }
}

/// The two sample columns under comparison.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SamplePair {
    /// sample names, in (A, B) order
    names: [String; 2],
    /// column indices in the variant file, in (A, B) order
    indices: [usize; 2]
}

impl SamplePair {
    pub fn new(name_a: String, index_a: usize, name_b: String, index_b: usize) -> SamplePair {
        SamplePair {
            names: [name_a, name_b],
            indices: [index_a, index_b]
        }
    }

    pub fn name(&self, sample: Sample) -> &str {
        &self.names[sample as usize]
    }

    pub fn index(&self, sample: Sample) -> usize {
        self.indices[sample as usize]
    }

    /// Maps a sample name back to A or B, `None` for anything else.
    pub fn lookup(&self, name: &str) -> Option<Sample> {
        if name == self.names[0] {
            Some(Sample::A)
        } else if name == self.names[1] {
            Some(Sample::B)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_call() {
        let hom = SampleCall::homozygous(1);
        assert!(hom.is_called());
        assert_eq!(hom.homozygous_allele(), Some(1));

        let missing = SampleCall::new(vec![Some(0), None], false);
        assert!(!missing.is_called());
        assert_eq!(missing.homozygous_allele(), None);
        assert!(!SampleCall::no_call().is_called());
        assert!(!SampleCall::new(vec![], false).is_called());

        // phased and unphased orderings of the same alleles compare equal
        let gt1 = SampleCall::new(vec![Some(1), Some(0)], true);
        let gt2 = SampleCall::new(vec![Some(0), Some(1)], true);
        assert_eq!(gt1.called_alleles(), gt2.called_alleles());
        assert_eq!(gt1.called_alleles(), vec![0, 1]);

        // ploidy does not change the alleles carried
        let haploid = SampleCall::new(vec![Some(0)], false);
        assert_eq!(haploid.called_alleles(), SampleCall::homozygous(0).called_alleles());
        assert_eq!(haploid.homozygous_allele(), Some(0));
        assert_eq!(gt1.homozygous_allele(), None);

        // flagged heterozygous by allele fraction even though GT is homozygous
        let af_het = SampleCall::new(vec![Some(0), Some(0)], true);
        assert_eq!(af_het.homozygous_allele(), None);
    }

    #[test]
    fn test_sample_pair() {
        let samples = SamplePair::new("NA1".to_string(), 2, "NA2".to_string(), 0);
        assert_eq!(samples.name(Sample::A), "NA1");
        assert_eq!(samples.index(Sample::B), 0);
        assert_eq!(samples.lookup("NA2"), Some(Sample::B));
        assert_eq!(samples.lookup("other"), None);
    }
}
