use particle_id::ParticleID;

/// Simulated detector event
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    /// Event id
    pub id: Option<i32>,
    /// Interaction vertices
    ///
    /// Only the first vertex is used by the analysis. Full spill
    /// simulations have more than one vertex per event.
    pub primaries: Vec<PrimaryVertex>,
    /// Truth trajectories of all simulated particles
    pub trajectories: Vec<Trajectory>,
    /// Energy deposits, grouped by the name of the detector volume
    pub segment_detectors: Vec<(String, Vec<Segment>)>,
}

impl Event {
    /// All energy deposits in all detector volumes
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.segment_detectors
            .iter()
            .flat_map(|(_volume, segments)| segments)
    }

    /// Look up the trajectory with the given track id
    pub fn trajectory(&self, track_id: i32) -> Option<&Trajectory> {
        self.trajectories.iter().find(|t| t.track_id == track_id)
    }
}

/// Truth record of a simulated particle
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    /// Track id, unique within an event
    pub track_id: i32,
    /// Track id of the parent, -1 for primary particles
    pub parent_id: i32,
    /// Particle type
    pub id: ParticleID,
    /// Initial four-momentum (E, px, py, pz) in MeV
    pub p: [f64; 4],
    /// Trajectory points (x, y, z, t) in mm and ns
    pub points: Vec<[f64; 4]>,
}

impl Trajectory {
    pub fn new(track_id: i32, parent_id: i32, id: ParticleID, p: [f64; 4]) -> Self {
        Self {
            track_id,
            parent_id,
            id,
            p,
            points: Vec::new(),
        }
    }

    /// Initial energy in MeV
    pub fn energy(&self) -> f64 {
        self.p[0]
    }
}

/// Energy deposited by one or more particles in a detector volume
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segment {
    /// Track ids of the contributing trajectories
    ///
    /// The first entry is the main contributor.
    pub contributors: Vec<i32>,
    /// Track id of the primary particle the deposit descends from
    pub primary_id: i32,
    /// Start position (x, y, z, t) in mm and ns
    pub start: [f64; 4],
    /// Stop position (x, y, z, t) in mm and ns
    pub stop: [f64; 4],
    /// Deposited energy in MeV
    pub energy_deposit: f64,
}

impl Segment {
    /// The trajectory contributing most to this deposit
    pub fn key_contributor(&self) -> Option<i32> {
        self.contributors.first().copied()
    }
}

/// Primary interaction vertex
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimaryVertex {
    /// Position (x, y, z, t) in mm and ns
    pub position: [f64; 4],
    /// Particles leaving the vertex
    pub particles: Vec<PrimaryParticle>,
}

/// Particle produced at a primary vertex
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimaryParticle {
    /// Track id of the corresponding trajectory
    pub track_id: i32,
    /// Particle type
    pub id: ParticleID,
    /// Four-momentum (E, px, py, pz) in MeV
    pub p: [f64; 4],
}

/// Generator-level record passed through the detector simulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenieRecord {
    pub particles: Vec<StdHepParticle>,
}

/// Entry in the generator particle stack
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StdHepParticle {
    pub status: Status,
    /// Particle type
    pub id: ParticleID,
    /// Four-momentum (px, py, pz, E) in GeV
    pub p4: [f64; 4],
}

/// Status codes of the generator particle stack
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Initial state (incoming neutrino, target)
    Initial,
    /// Stable final state particle
    StableFinal,
    Intermediate,
    Decayed,
    /// Struck nucleon
    NucleonTarget,
    /// Hadron before intranuclear transport
    HadronInTheNucleus,
    /// Final state nuclear remnant
    NuclearRemnant,
    /// Unknown
    Unknown(i32),
}

pub const INITIAL: i32 = 0;
pub const STABLE_FINAL: i32 = 1;
pub const INTERMEDIATE: i32 = 2;
pub const DECAYED: i32 = 3;
pub const NUCLEON_TARGET: i32 = 11;
pub const HADRON_IN_THE_NUCLEUS: i32 = 14;
pub const NUCLEAR_REMNANT: i32 = 15;

impl From<i32> for Status {
    fn from(status: i32) -> Self {
        use Status::*;
        match status {
            INITIAL => Initial,
            STABLE_FINAL => StableFinal,
            INTERMEDIATE => Intermediate,
            DECAYED => Decayed,
            NUCLEON_TARGET => NucleonTarget,
            HADRON_IN_THE_NUCLEUS => HadronInTheNucleus,
            NUCLEAR_REMNANT => NuclearRemnant,
            s => Unknown(s),
        }
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        use Status::*;
        match status {
            Initial => INITIAL,
            StableFinal => STABLE_FINAL,
            Intermediate => INTERMEDIATE,
            Decayed => DECAYED,
            NucleonTarget => NUCLEON_TARGET,
            HadronInTheNucleus => HADRON_IN_THE_NUCLEUS,
            NuclearRemnant => NUCLEAR_REMNANT,
            Unknown(s) => s,
        }
    }
}

/// A detector event together with its generator record
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventRecord {
    pub event: Event,
    pub genie: GenieRecord,
}
