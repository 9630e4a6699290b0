
/// Contains the writer and reader for the per-read evidence table
pub mod evidence_writer;
/// Contains the writers for the three phased BAM files
pub mod phased_bam_writer;
/// Contains the writer for per-read sample counts
pub mod read_summary_writer;
/// Contains the writer for the run summary
pub mod summary_writer;
/// Contains the writer for the informative sites that had coverage
pub mod used_site_writer;
