use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use edep_truth::{
    analysis::Analysis,
    ancestry::LOW_ENERGY_THRESHOLD,
    containment::{ContainmentClassifier, MuonTagging},
    json::{count_records, events, expand_paths},
    style::Style,
};
use env_logger::Env;
use log::{debug, info};

/// Hadronic containment of charged-current events in the active volume
#[derive(Debug, Parser)]
#[clap(about, version)]
struct Opt {
    /// Output directory for the histogram tables
    #[clap(long, short, default_value = ".")]
    outdir: PathBuf,

    /// Ignore trajectories with a smaller initial energy (MeV)
    #[clap(long, default_value_t = LOW_ENERGY_THRESHOLD)]
    low_energy_threshold: f64,

    /// Only count muons as tagged if they end at or beyond this z (mm)
    #[clap(long)]
    muon_exit_z: Option<f64>,

    /// Number of threads
    ///
    /// If set to 0, a default number of threads is chosen.
    #[cfg(feature = "multi-threading")]
    #[clap(long, short, default_value_t = 0)]
    threads: usize,

    /// Verbosity level
    ///
    /// Possible values with increasing amount of output are
    /// 'off', 'error', 'warn', 'info', 'debug', 'trace'.
    #[clap(long, short, default_value = "info")]
    loglevel: String,

    /// Event files in JSON lines format
    ///
    /// Wildcards are expanded, also when they are quoted.
    #[clap(name = "INFILES", required = true)]
    infiles: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let env = Env::default().filter_or("EDEP_TRUTH_LOG", &opt.loglevel);
    env_logger::init_from_env(env);
    debug!("settings: {opt:#?}");

    #[cfg(feature = "multi-threading")]
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.threads)
        .build_global()?;

    let infiles = expand_paths(&opt.infiles)?;
    debug!("input files: {infiles:?}");
    let mut nevents = 0;
    for file in &infiles {
        nevents += count_records(file)
            .with_context(|| format!("Failed to read events from {file:?}"))?;
    }
    if nevents == 0 {
        bail!("No events in {:?}", opt.infiles);
    }

    let muon_tagging = match opt.muon_exit_z {
        Some(z) => MuonTagging::DownstreamExit { z },
        None => MuonTagging::AssumeTagged,
    };
    let analysis = Analysis::new(ContainmentClassifier {
        low_energy_threshold: opt.low_energy_threshold,
        muon_tagging,
        ..Default::default()
    });

    let summary = analysis.run_stream(events(&infiles), nevents)?;
    summary.log();

    std::fs::create_dir_all(&opt.outdir)
        .with_context(|| format!("Failed to create {:?}", opt.outdir))?;
    summary
        .write(&opt.outdir, &Style::containment())
        .with_context(|| format!("Failed to write histograms to {:?}", opt.outdir))?;
    info!("done");
    Ok(())
}
