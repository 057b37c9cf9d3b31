//! Comparison of generator predictions
//!
//! Each generator sample is a flat table with one row per event. The
//! event weights normalise the histograms to a differential cross section.
use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    histogram::{Binning, Hist1D},
    style::{Colour, Style},
};

/// One event of a flat tree
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct FlatEvent {
    /// 1 for charged-current events
    pub cc: i32,
    /// Energy transfer in GeV
    #[serde(default)]
    pub q0: f64,
    /// PDG codes of the final-state particles
    #[serde(default)]
    pub pdg: Vec<i32>,
    /// Event weight
    #[serde(alias = "fScaleFactor", default = "unit_weight")]
    pub scale_factor: f64,
}

fn unit_weight() -> f64 {
    1.
}

/// Quantity to histogram
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Energy transfer
    Q0,
    /// Number of protons, charged pions, muons, and charged kaons
    NTracks,
    /// Number of minimum ionising particles (charged pions and muons)
    NMips,
    NProtons,
}

const PROTON: i32 = 2212;
const PI_PLUS: i32 = 211;
const MUON: i32 = 13;
const K_PLUS: i32 = 321;

impl Variable {
    pub fn value(&self, event: &FlatEvent) -> f64 {
        let count = |f: fn(i32) -> bool| event.pdg.iter().filter(|&&pdg| f(pdg)).count() as f64;
        match self {
            Self::Q0 => event.q0,
            Self::NTracks => count(|pdg| {
                pdg == PROTON || [PI_PLUS, MUON, K_PLUS].contains(&pdg.abs())
            }),
            Self::NMips => count(|pdg| [PI_PLUS, MUON].contains(&pdg.abs())),
            Self::NProtons => count(|pdg| pdg == PROTON),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Q0 => "q0",
            Self::NTracks => "ntracks",
            Self::NMips => "nmips",
            Self::NProtons => "nprotons",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "q0" => Ok(Self::Q0),
            "ntracks" | "n_tracks" => Ok(Self::NTracks),
            "nmips" | "n_mips" => Ok(Self::NMips),
            "nprotons" | "n_protons" => Ok(Self::NProtons),
            _ => Err(Error::UnknownVariable(s.to_owned())),
        }
    }
}

/// A comparison plot
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PlotSpec {
    /// Output file name
    pub output: String,
    pub variable: Variable,
    pub binning: Binning,
    /// Axis titles, separated by `;`
    pub labels: String,
    #[serde(default)]
    pub log_y: bool,
}

/// Where to find a generator sample and how to show it
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SampleSpec {
    pub name: String,
    pub path: PathBuf,
    pub colour: Colour,
}

/// Samples and plots of a comparison run
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Config {
    pub samples: Vec<SampleSpec>,
    pub plots: Vec<PlotSpec>,
}

const XSEC_UNIT: &str = "(#times 10^{-38} cm^{2}/nucleon)";

impl Default for Config {
    /// NuMI medium energy, FHC muon neutrinos on argon
    fn default() -> Self {
        let samples = [
            ("GENIEv3_G18_10a_00_000", "GENIEv3 10a", Colour::BLUE),
            ("GENIEv3_G18_10b_00_000", "GENIEv3 10b", Colour::CYAN),
            ("GENIEv3_G18_10c_00_000", "GENIEv3 10c", Colour::TEAL),
            ("GENIEv3_CRPA21_04a_00_000", "CRPA", Colour::ORANGE),
            ("GENIEv3_G21_11a_00_000", "SuSAv2", Colour::RED),
            ("NEUT", "NEUT", Colour::GRAY),
            ("NUWRO_LFGRPA", "NuWro", Colour::MAGENTA),
        ]
        .into_iter()
        .map(|(tune, name, colour)| SampleSpec {
            name: name.to_owned(),
            path: PathBuf::from(format!(
                "flat_trees/NuMIME_FHC_numu_Ar40_{tune}_1M_0000_NUISFLAT.jsonl"
            )),
            colour,
        })
        .collect();

        let plots = [
            (Variable::Q0, 100, 5., "q_{0} (GeV); d#sigma/dq_{0}"),
            (Variable::NTracks, 15, 15., "N. tracks; d#sigma/d(N. tracks)"),
            (Variable::NMips, 10, 10., "N. MIPs; d#sigma/d(N. MIPs)"),
            (Variable::NProtons, 10, 10., "N. protons; d#sigma/d(N. protons)"),
        ]
        .into_iter()
        .map(|(variable, nbins, max, labels)| PlotSpec {
            output: format!("generator_comp_{variable}.dat"),
            variable,
            binning: Binning::uniform(nbins, 0., max),
            labels: format!("{labels} {XSEC_UNIT}"),
            log_y: false,
        })
        .collect();
        Self { samples, plots }
    }
}

/// Events of one generator
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub name: String,
    pub colour: Colour,
    pub events: Vec<FlatEvent>,
}

impl Sample {
    /// Read the events of a sample from a JSON lines file
    pub fn load(spec: &SampleSpec) -> Result<Self> {
        let events = read_flat_events(&spec.path)?;
        debug!("Read {} events for {}", events.len(), spec.name);
        Ok(Self {
            name: spec.name.clone(),
            colour: spec.colour,
            events,
        })
    }
}

pub fn read_flat_events(path: impl AsRef<Path>) -> Result<Vec<FlatEvent>> {
    crate::json::open::<FlatEvent>(path)?.collect()
}

/// Weighted distributions of one variable for several generators
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub plot: PlotSpec,
    pub entries: Vec<(String, Colour, Hist1D)>,
    /// Upper end of the y axis
    pub maximum: f64,
    /// Lower end of the y axis, automatic for logarithmic axes
    pub minimum: Option<f64>,
}

/// Histogram `plot.variable` for the charged-current events of each sample
pub fn make_generator_comp(plot: &PlotSpec, samples: &[Sample]) -> Result<Comparison> {
    if samples.is_empty() {
        return Err(Error::NoSamples);
    }
    let entries: Vec<_> = samples
        .iter()
        .map(|sample| {
            let mut hist = Hist1D::new(plot.binning);
            for event in sample.events.iter().filter(|ev| ev.cc == 1) {
                hist.fill_weighted(plot.variable.value(event), event.scale_factor);
            }
            debug!(
                "{}: {} of {} events, integral {}",
                sample.name,
                hist.entries(),
                sample.events.len(),
                hist.integral()
            );
            (sample.name.clone(), sample.colour, hist)
        })
        .collect();
    let max = entries
        .iter()
        .map(|(_, _, hist)| hist.max())
        .fold(0., f64::max);
    Ok(Comparison {
        plot: plot.clone(),
        entries,
        maximum: 1.3 * max,
        minimum: if plot.log_y { None } else { Some(0.) },
    })
}

impl Comparison {
    /// Write a table with one column per generator
    pub fn write(&self, style: &Style, mut out: impl Write) -> std::io::Result<()> {
        style.write_header(&mut out)?;
        writeln!(out, "# {}", self.plot.labels)?;
        let legend = &style.legend;
        writeln!(
            out,
            "# legend at {:?} in {} columns, text size {}",
            legend.position, legend.columns, legend.text_size
        )?;
        for (name, colour, _) in &self.entries {
            writeln!(out, "# {name}: colour {} ({})", colour.index, colour.hex())?;
        }
        let minimum = match self.minimum {
            Some(min) => min.to_string(),
            None => "auto".to_owned(),
        };
        writeln!(
            out,
            "# y range {minimum} to {}, log scale {}",
            self.maximum, self.plot.log_y
        )?;
        let binning = self.plot.binning;
        for i in 0..binning.nbins() {
            let (low, high) = binning.edges(i);
            write!(out, "{low:e} {high:e}")?;
            for (_, _, hist) in &self.entries {
                write!(out, " {:e}", hist.value(i))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn write_to(&self, style: &Style, path: &Path) -> Result<()> {
        let out = BufWriter::new(File::create(path)?);
        self.write(style, out)?;
        Ok(())
    }
}
