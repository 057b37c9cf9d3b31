//! Truth-level containment of the hadronic system
use ahash::AHashSet;
use itertools::izip;

use crate::{
    ancestry::{low_energy_ids, neutron_descendants, LOW_ENERGY_THRESHOLD},
    event::{Event, Segment},
    selection::{track_ids_for_pdg, MUONS},
};

/// Axis-aligned box in detector coordinates (mm)
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContainmentVolume {
    pub centre: [f64; 3],
    pub half_width: [f64; 3],
}

impl ContainmentVolume {
    /// Active volume of the 2x2 demonstrator
    pub const TWO_BY_TWO: Self = Self {
        centre: [0., 430., 0.],
        half_width: [670., 670., 670.],
    };

    /// Whether the spatial part of `pos` lies inside the box
    ///
    /// Points on the boundary are inside.
    pub fn contains(&self, pos: &[f64]) -> bool {
        pos.len() >= 3
            && izip!(pos, self.centre, self.half_width)
                .all(|(x, c, h)| (x - c).abs() <= h)
    }
}

impl Default for ContainmentVolume {
    fn default() -> Self {
        Self::TWO_BY_TWO
    }
}

/// Track ids whose energy deposits are ignored when testing containment
#[derive(Clone, Debug, Default)]
pub struct Exclusions {
    /// Neutrons and their descendants
    pub neutron_family: AHashSet<i32>,
    /// Low-energy trajectories
    pub low_energy: AHashSet<i32>,
    /// Primary muons, which need a separate treatment
    pub muons: AHashSet<i32>,
}

impl Exclusions {
    pub fn for_event(event: &Event, low_energy_threshold: f64) -> Self {
        let muons = event
            .primaries
            .first()
            .map(|vx| track_ids_for_pdg(&vx.particles, &MUONS))
            .unwrap_or_default();
        Self {
            neutron_family: neutron_descendants(&event.trajectories),
            low_energy: low_energy_ids(&event.trajectories, low_energy_threshold),
            muons: muons.into_iter().collect(),
        }
    }

    /// Whether `segment` is ignored
    ///
    /// Muon deposits are identified by their primary particle, everything
    /// else by the main contributor.
    pub fn excludes(&self, segment: &Segment) -> bool {
        if self.muons.contains(&segment.primary_id) {
            return true;
        }
        match segment.key_contributor() {
            Some(key) => {
                self.neutron_family.contains(&key) || self.low_energy.contains(&key)
            }
            None => false,
        }
    }
}

/// Whether all deposits not excluded stop inside `volume`
pub fn is_hadronic_contained<'a, I>(
    segments: I,
    exclusions: &Exclusions,
    volume: &ContainmentVolume,
) -> bool
where
    I: IntoIterator<Item = &'a Segment>,
{
    segments
        .into_iter()
        .filter(|seg| !exclusions.excludes(seg))
        .all(|seg| volume.contains(&seg.stop))
}

/// Total energy deposited by segments with the given primary particle
pub fn reco_energy<'a, I>(segments: I, track_id: i32) -> f64
where
    I: IntoIterator<Item = &'a Segment>,
{
    segments
        .into_iter()
        .filter(|seg| seg.primary_id == track_id)
        .map(|seg| seg.energy_deposit)
        .sum()
}

/// How to decide whether the primary muon is tagged
///
/// Muons are rarely contained. Instead, we look for muons that punch
/// through the active volume and leave it downstream, into a tracker that
/// measures them.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum MuonTagging {
    /// Every muon is tagged
    #[default]
    AssumeTagged,
    /// The last trajectory point of a primary muon lies at or beyond `z` (mm)
    DownstreamExit { z: f64 },
}

impl MuonTagging {
    pub fn is_tagged(&self, event: &Event) -> bool {
        match *self {
            Self::AssumeTagged => true,
            Self::DownstreamExit { z } => {
                let Some(vx) = event.primaries.first() else {
                    return false;
                };
                track_ids_for_pdg(&vx.particles, &MUONS)
                    .into_iter()
                    .filter_map(|id| event.trajectory(id))
                    .filter_map(|t| t.points.last())
                    .any(|pt| pt[2] >= z)
            }
        }
    }
}

/// Event-level containment classification
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContainmentClassifier {
    pub volume: ContainmentVolume,
    /// Initial energy (MeV) below which trajectories are ignored
    pub low_energy_threshold: f64,
    pub muon_tagging: MuonTagging,
}

impl Default for ContainmentClassifier {
    fn default() -> Self {
        Self {
            volume: ContainmentVolume::TWO_BY_TWO,
            low_energy_threshold: LOW_ENERGY_THRESHOLD,
            muon_tagging: MuonTagging::default(),
        }
    }
}

impl ContainmentClassifier {
    pub fn is_hadronic_contained(&self, event: &Event) -> bool {
        let exclusions = Exclusions::for_event(event, self.low_energy_threshold);
        is_hadronic_contained(event.segments(), &exclusions, &self.volume)
    }

    /// The muon is tagged and the hadronic system is contained
    pub fn is_event_contained(&self, event: &Event) -> bool {
        self.muon_tagging.is_tagged(event) && self.is_hadronic_contained(event)
    }
}
