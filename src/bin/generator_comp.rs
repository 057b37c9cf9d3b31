use std::{fs::File, io::BufReader, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use edep_truth::{
    comparison::{make_generator_comp, Config, Sample},
    style::Style,
};
use env_logger::Env;
use log::{debug, info};

/// Compare generator predictions from flat event tables
#[derive(Debug, Parser)]
#[clap(about, version)]
struct Opt {
    /// JSON file with the samples and plots
    ///
    /// Without a configuration, the NuMI medium energy samples are compared.
    #[clap(long, short)]
    config: Option<PathBuf>,

    /// Output directory for the comparison tables
    #[clap(long, short, default_value = ".")]
    outdir: PathBuf,

    /// Verbosity level
    ///
    /// Possible values with increasing amount of output are
    /// 'off', 'error', 'warn', 'info', 'debug', 'trace'.
    #[clap(long, short, default_value = "info")]
    loglevel: String,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let env = Env::default().filter_or("EDEP_TRUTH_LOG", &opt.loglevel);
    env_logger::init_from_env(env);
    debug!("settings: {opt:#?}");

    let config: Config = match &opt.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {path:?}"))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse {path:?}"))?
        }
        None => Config::default(),
    };

    let samples = config
        .samples
        .iter()
        .map(|spec| {
            info!("Reading {} from {:?}", spec.name, spec.path);
            Sample::load(spec).with_context(|| format!("Failed to read {:?}", spec.path))
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(&opt.outdir)
        .with_context(|| format!("Failed to create {:?}", opt.outdir))?;
    let style = Style::comparison();
    for plot in &config.plots {
        let comparison = make_generator_comp(plot, &samples)?;
        let out = opt.outdir.join(&plot.output);
        info!("Writing {} comparison to {out:?}", plot.variable);
        comparison
            .write_to(&style, &out)
            .with_context(|| format!("Failed to write {out:?}"))?;
    }
    info!("done");
    Ok(())
}
