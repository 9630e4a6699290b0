/// Alignment records as seen by the phasing engine, plus the paired-flag hook
pub mod alignments;
/// Per-read vote counts and the final phase call
pub mod phase_call;
/// Contains VariantSite type as well as supporting sample definitions
pub mod variants;
