use gtsplit::cli::{Settings, check_settings, get_raw_settings};
use gtsplit::data_types::variants::SamplePair;
use gtsplit::phaser::{OutputPaths, PhasingConfig, PhasingSummary, load_sample_pair, phase_alignments};
use gtsplit::writers::summary_writer::write_run_summary;

use log::{LevelFilter, error, info};
use std::time::Instant;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);
    let outputs: OutputPaths = cli_settings.output_paths();
    let config: PhasingConfig = cli_settings.phasing_config();

    // both samples must be in the VCF before we touch anything else
    let samples: SamplePair = match load_sample_pair(&cli_settings.vcf_filename, &cli_settings.sample_a, &cli_settings.sample_b) {
        Ok(s) => s,
        Err(e) => {
            error!("Error during VCF sample name parsing: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    let start_time: Instant = Instant::now();
    let summary: PhasingSummary = match phase_alignments(
        &cli_settings.bam_filename, &cli_settings.vcf_filename,
        &samples, &outputs, &config
    ) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while phasing alignments: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    summary.log_summary(&samples);

    if let Some(ref filename) = cli_settings.summary_filename {
        info!("Saving summary statistics to {:?}...", filename);
        match write_run_summary(filename, &summary, &samples) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while writing summary statistics file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        }
    }

    info!("All alignments phased successfully after {} seconds.", start_time.elapsed().as_secs_f64());
}
