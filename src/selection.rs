//! Signal selection and truth kinematics
use crate::{
    event::{GenieRecord, PrimaryParticle, Status},
    util::{minkowski_sq, sub, GEV_TO_MEV},
};

/// PDG codes of muons and anti-muons
pub const MUONS: [i32; 2] = [13, -13];
/// PDG codes of charged pions
pub const CHARGED_PIONS: [i32; 2] = [211, -211];
/// PDG codes of neutrinos (any flavour, absolute value)
pub const NEUTRINOS: [i32; 3] = [12, 14, 16];

/// Charged-current inclusive selection
///
/// We only require a muon in the final state.
pub fn is_cc_inclusive<I>(pdgs: I) -> bool
where
    I: IntoIterator<Item = i32>,
{
    pdgs.into_iter().any(|pdg| MUONS.contains(&pdg))
}

/// Track ids of the particles with one of the given PDG codes
pub fn track_ids_for_pdg(particles: &[PrimaryParticle], pdgs: &[i32]) -> Vec<i32> {
    particles_for_pdg(particles, pdgs)
        .map(|p| p.track_id)
        .collect()
}

/// Particles with one of the given PDG codes
pub fn particles_for_pdg<'a>(
    particles: &'a [PrimaryParticle],
    pdgs: &'a [i32],
) -> impl Iterator<Item = &'a PrimaryParticle> + 'a {
    particles.iter().filter(|p| pdgs.contains(&p.id.id()))
}

/// Four-momentum (E, px, py, pz) of the incoming neutrino in MeV
///
/// This is the first initial-state neutrino in the generator record.
pub fn neutrino_four_momentum(record: &GenieRecord) -> Option<[f64; 4]> {
    record
        .particles
        .iter()
        .filter(|p| p.status == Status::Initial)
        .find(|p| NEUTRINOS.contains(&p.id.id().abs()))
        .map(|p| {
            let [px, py, pz, e] = p.p4;
            [e, px, py, pz].map(|c| c * GEV_TO_MEV)
        })
}

/// Four-momentum transfer Q² in GeV², from momenta in MeV
pub fn q_squared(muon: &[f64; 4], neutrino: &[f64; 4]) -> f64 {
    -minkowski_sq(&sub(muon, neutrino)) / (GEV_TO_MEV * GEV_TO_MEV)
}
