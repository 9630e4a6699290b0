
/// Overlap queries and mate lookups over an indexed BAM
pub mod alignment_store;
/// Replays the evidence table into per-read calls and routes every alignment to its output
pub mod assignment;
/// CLI functionality and checks
pub mod cli;
/// Contains multiple wrappers for useful data types in gtsplit
pub mod data_types;
/// Holds per-alignment evidence until no later site can overlap the alignment
pub mod evidence_cache;
/// Compares aligned bases against the sample alleles at a site
pub mod overlap;
/// Organizes the full run: variant scan, evidence replay, and alignment output
pub mod phaser;
/// Walks the variant stream, collecting evidence at every informative site
pub mod scanner;
/// Decides which variant sites can tell the two samples apart
pub mod site_selection;
/// Parses VCF records into variant sites and checks the sample names
pub mod variant_stream;
/// Contains all the various output writer functionality
pub mod writers;
