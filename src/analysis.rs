//! Event loop of the containment study
use std::{fs::File, io::BufWriter, path::Path};

use log::{debug, info, warn};

use crate::{
    containment::{reco_energy, ContainmentClassifier},
    error::Result,
    event::{Event, EventRecord, GenieRecord},
    histogram::{Binning, Hist1D, Hist2D},
    selection::{
        is_cc_inclusive, neutrino_four_momentum, particles_for_pdg, q_squared,
        CHARGED_PIONS, MUONS,
    },
    style::Style,
    util::{kinetic_energy, GEV_TO_MEV},
};

/// Number of events classified together before merging into the summary
///
/// Sequential, parallel and streaming runs use the same batches and merge
/// them in order, so their results agree exactly.
pub const EVENT_BATCH_SIZE: usize = 1_000;

/// Q² binning in GeV²
pub const Q2_BINNING: Binning = Binning::uniform(25, 0., 5.);

/// Pion kinetic energy binning in GeV
pub const PION_ENERGY_BINNING: Binning = Binning::uniform(20, 0., 1.);

/// What happened to an event
#[derive(Clone, Debug, PartialEq)]
pub enum EventOutcome {
    /// No muon among the primary particles
    NotSignal,
    /// No primary vertex
    MissingVertex,
    /// No incoming neutrino in the generator record
    MissingNeutrino,
    /// No primary muon to compute Q² from
    MissingMuon,
    Classified(Classification),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// Q² in GeV²
    pub q2: f64,
    pub contained: bool,
    /// Primary charged pions, only filled for contained events
    pub pions: Vec<PionEnergy>,
}

/// True and deposited energy of a primary pion in GeV
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PionEnergy {
    pub true_kinetic: f64,
    pub deposited: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Analysis {
    pub classifier: ContainmentClassifier,
}

impl Analysis {
    pub fn new(classifier: ContainmentClassifier) -> Self {
        Self { classifier }
    }

    /// Classify a single event
    pub fn process(&self, event: &Event, genie: &GenieRecord) -> EventOutcome {
        use EventOutcome::*;

        // TODO: full spill simulations have several vertices per event
        let Some(vertex) = event.primaries.first() else {
            return MissingVertex;
        };
        if !is_cc_inclusive(vertex.particles.iter().map(|p| p.id.id())) {
            return NotSignal;
        }
        let contained = self.classifier.is_event_contained(event);
        let Some(nu) = neutrino_four_momentum(genie) else {
            return MissingNeutrino;
        };
        let Some(muon) = particles_for_pdg(&vertex.particles, &MUONS).next() else {
            return MissingMuon;
        };
        let q2 = q_squared(&muon.p, &nu);

        let pions = if contained {
            particles_for_pdg(&vertex.particles, &CHARGED_PIONS)
                .map(|pion| PionEnergy {
                    true_kinetic: kinetic_energy(&pion.p) / GEV_TO_MEV,
                    deposited: reco_energy(event.segments(), pion.track_id) / GEV_TO_MEV,
                })
                .collect()
        } else {
            Vec::new()
        };
        Classified(Classification {
            q2,
            contained,
            pions,
        })
    }

    /// Classify all events in order
    pub fn run(&self, records: &[EventRecord]) -> Summary {
        info!("Looping over {} events", records.len());
        let mut summary = Summary::new();
        self.run_batches(&mut summary, records, records.len());
        summary
    }

    /// Classify events in parallel batches
    ///
    /// The result is identical to that of [Analysis::run].
    #[cfg(feature = "multi-threading")]
    pub fn run_parallel(&self, records: &[EventRecord]) -> Summary {
        info!("Looping over {} events", records.len());
        let mut summary = Summary::new();
        self.run_batches_parallel(&mut summary, records, records.len());
        summary
    }

    /// Classify a stream of events, one block of batches at a time
    ///
    /// Only the current block is kept in memory. `total` is the expected
    /// number of events and only used for progress messages. The result
    /// is identical to that of [Analysis::run] on all events at once.
    pub fn run_stream<I>(&self, records: I, total: usize) -> Result<Summary>
    where
        I: IntoIterator<Item = Result<EventRecord>>,
    {
        info!("Looping over {total} events");
        let block_size = EVENT_BATCH_SIZE * batches_per_block();
        let mut records = records.into_iter();
        let mut block = Vec::with_capacity(block_size);
        let mut summary = Summary::new();
        loop {
            block.clear();
            for record in records.by_ref().take(block_size) {
                block.push(record?);
            }
            if block.is_empty() {
                return Ok(summary);
            }
            #[cfg(feature = "multi-threading")]
            self.run_batches_parallel(&mut summary, &block, total);
            #[cfg(not(feature = "multi-threading"))]
            self.run_batches(&mut summary, &block, total);
        }
    }

    /// Classify `records` batch by batch and merge into `summary`
    ///
    /// Event numbers continue after the `summary.nevents` events already
    /// processed.
    pub fn run_batches(&self, summary: &mut Summary, records: &[EventRecord], total: usize) {
        let progress = Progress::new(total);
        for batch in records.chunks(EVENT_BATCH_SIZE) {
            let partial = self.classify_batch(summary.nevents, batch);
            progress.merge_into(summary, &partial);
        }
    }

    /// Parallel version of [Analysis::run_batches]
    #[cfg(feature = "multi-threading")]
    pub fn run_batches_parallel(
        &self,
        summary: &mut Summary,
        records: &[EventRecord],
        total: usize,
    ) {
        use rayon::prelude::*;

        let offset = summary.nevents;
        let partials: Vec<_> = records
            .par_chunks(EVENT_BATCH_SIZE)
            .enumerate()
            .map(|(batch_nr, batch)| {
                let partial = self.classify_batch(offset + batch_nr * EVENT_BATCH_SIZE, batch);
                debug!("Finished batch {batch_nr}");
                partial
            })
            .collect();
        let progress = Progress::new(total);
        for partial in &partials {
            progress.merge_into(summary, partial);
        }
    }

    fn classify_batch(&self, offset: usize, batch: &[EventRecord]) -> Summary {
        let mut partial = Summary::new();
        for (n, record) in batch.iter().enumerate() {
            let outcome = self.process(&record.event, &record.genie);
            partial.integrate_logged(offset + n, &outcome);
        }
        partial
    }
}

#[cfg(feature = "multi-threading")]
fn batches_per_block() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "multi-threading"))]
fn batches_per_block() -> usize {
    1
}

/// Reports progress every 10% of the expected events
#[derive(Copy, Clone, Debug)]
struct Progress {
    total: usize,
    step: usize,
}

impl Progress {
    fn new(total: usize) -> Self {
        Self {
            total,
            step: std::cmp::max(total / 10, 1),
        }
    }

    /// Whether going from `before` to `after` events completes a step
    fn completes_step(&self, before: usize, after: usize) -> bool {
        after / self.step > before / self.step
    }

    fn merge_into(&self, summary: &mut Summary, partial: &Summary) {
        let before = summary.nevents;
        summary.merge(partial);
        let after = summary.nevents;
        if self.completes_step(before, after) {
            info!("Processed {after} of {} events", self.total);
        }
    }
}

/// Accumulated results of the containment study
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub nevents: usize,
    pub not_signal: usize,
    pub missing_vertex: usize,
    pub missing_neutrino: usize,
    pub missing_muon: usize,
    pub classified: usize,
    pub contained: usize,
    /// Q² of all selected events
    pub q2_all: Hist1D,
    /// Q² of contained events
    pub q2_cont: Hist1D,
    /// Deposited vs. true kinetic energy of primary charged pions
    pub pi_energy_smearing: Hist2D,
}

impl Default for Summary {
    fn default() -> Self {
        Self::new()
    }
}

impl Summary {
    pub fn new() -> Self {
        Self {
            nevents: 0,
            not_signal: 0,
            missing_vertex: 0,
            missing_neutrino: 0,
            missing_muon: 0,
            classified: 0,
            contained: 0,
            q2_all: Hist1D::new(Q2_BINNING),
            q2_cont: Hist1D::new(Q2_BINNING),
            pi_energy_smearing: Hist2D::new(PION_ENERGY_BINNING, PION_ENERGY_BINNING),
        }
    }

    pub fn integrate(&mut self, outcome: &EventOutcome) {
        use EventOutcome::*;
        self.nevents += 1;
        match outcome {
            NotSignal => self.not_signal += 1,
            MissingVertex => self.missing_vertex += 1,
            MissingNeutrino => self.missing_neutrino += 1,
            MissingMuon => self.missing_muon += 1,
            Classified(class) => {
                self.classified += 1;
                self.q2_all.fill(class.q2);
                if !class.contained {
                    return;
                }
                self.contained += 1;
                self.q2_cont.fill(class.q2);
                for pion in &class.pions {
                    self.pi_energy_smearing
                        .fill(pion.true_kinetic, pion.deposited);
                }
            }
        }
    }

    fn integrate_logged(&mut self, evt: usize, outcome: &EventOutcome) {
        match outcome {
            EventOutcome::MissingVertex => warn!("Event {evt}: no primary vertex"),
            EventOutcome::MissingNeutrino => warn!("Event {evt}: no incoming neutrino"),
            EventOutcome::MissingMuon => warn!("Event {evt}: no primary muon"),
            _ => {}
        }
        self.integrate(outcome)
    }

    pub fn merge(&mut self, other: &Self) {
        self.nevents += other.nevents;
        self.not_signal += other.not_signal;
        self.missing_vertex += other.missing_vertex;
        self.missing_neutrino += other.missing_neutrino;
        self.missing_muon += other.missing_muon;
        self.classified += other.classified;
        self.contained += other.contained;
        self.q2_all.merge(&other.q2_all);
        self.q2_cont.merge(&other.q2_cont);
        self.pi_energy_smearing.merge(&other.pi_energy_smearing);
    }

    /// Fraction of contained events as a function of Q²
    pub fn containment_fraction(&self) -> Result<Hist1D> {
        self.q2_cont.divide(&self.q2_all)
    }

    pub fn log(&self) {
        info!("Events: {}", self.nevents);
        info!("Not CC-inclusive: {}", self.not_signal);
        info!(
            "Skipped: {} without vertex, {} without neutrino, {} without muon",
            self.missing_vertex, self.missing_neutrino, self.missing_muon
        );
        info!("Selected: {}, contained: {}", self.classified, self.contained);
    }

    /// Write histogram tables to `outdir`
    pub fn write(&self, outdir: &Path, style: &Style) -> Result<()> {
        let tables = [
            ("q2_all.dat", "Q^2 (GeV); N. events", &self.q2_all),
            ("q2_cont.dat", "Q^2 (GeV); N. events", &self.q2_cont),
        ];
        for (name, labels, hist) in tables {
            let path = outdir.join(name);
            debug!("Writing {path:?}");
            let mut out = BufWriter::new(File::create(path)?);
            style.write_header(&mut out)?;
            writeln_labels(&mut out, labels)?;
            hist.write_table(&mut out)?;
        }

        let path = outdir.join("q2_cont_fraction.dat");
        debug!("Writing {path:?}");
        let mut out = BufWriter::new(File::create(path)?);
        style.write_header(&mut out)?;
        writeln_labels(&mut out, "Q^2 (GeV); Containment fraction")?;
        self.containment_fraction()?.write_table(&mut out)?;

        let path = outdir.join("pi_energy_smearing.dat");
        debug!("Writing {path:?}");
        let mut out = BufWriter::new(File::create(path)?);
        style.write_header(&mut out)?;
        writeln_labels(
            &mut out,
            "p_{#pi}^{true} (GeV); p_{#pi}^{reco} (GeV); N. events",
        )?;
        self.pi_energy_smearing.write_table(&mut out)?;
        Ok(())
    }
}

fn writeln_labels(mut out: impl std::io::Write, labels: &str) -> std::io::Result<()> {
    writeln!(out, "# {labels}")
}
