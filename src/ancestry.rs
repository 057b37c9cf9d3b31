//! Truth ancestry of trajectories
use std::collections::hash_map::Entry;

use ahash::{AHashMap, AHashSet};
use log::warn;
use petgraph::{
    prelude::{DiGraph, NodeIndex},
    visit::Dfs,
};

use crate::event::Trajectory;

/// PDG code of the neutron
pub const NEUTRON: i32 = 2112;

/// Trajectories below this initial energy (in MeV) count as low-energy
///
/// Mostly delta rays, which often leave the active volume without
/// telling us anything about the containment of the event.
pub const LOW_ENERGY_THRESHOLD: f64 = 10.;

/// Track ids of all neutrons and everything they produced
pub fn neutron_descendants(trajectories: &[Trajectory]) -> AHashSet<i32> {
    descendants(trajectories, |t| t.id.id() == NEUTRON)
}

/// Track ids of trajectories selected by `is_root` and all their descendants
///
/// The result does not depend on the order of `trajectories`: children
/// may appear before their parents. A parent id that does not refer to any
/// trajectory makes the trajectory a root of the ancestry graph. Repeated
/// track ids share one node, with the parents of all copies, and the node
/// is a root if any copy is.
pub fn descendants<F>(trajectories: &[Trajectory], is_root: F) -> AHashSet<i32>
where
    F: Fn(&Trajectory) -> bool,
{
    let mut g = DiGraph::<i32, ()>::with_capacity(
        trajectories.len(),
        trajectories.len(),
    );
    let mut nodes: AHashMap<i32, NodeIndex> =
        AHashMap::with_capacity(trajectories.len());
    for traj in trajectories {
        match nodes.entry(traj.track_id) {
            Entry::Occupied(_) => {
                warn!("Repeated trajectory with track id {}", traj.track_id)
            }
            Entry::Vacant(entry) => {
                entry.insert(g.add_node(traj.track_id));
            }
        }
    }
    for traj in trajectories {
        let Some(&parent) = nodes.get(&traj.parent_id) else {
            continue;
        };
        let child = nodes[&traj.track_id];
        if parent != child {
            g.update_edge(parent, child, ());
        }
    }

    let mut family = AHashSet::new();
    // the discovered set is shared between searches, so every node is
    // visited at most once
    let mut dfs = Dfs::empty(&g);
    for root in trajectories.iter().filter(|t| is_root(t)) {
        dfs.move_to(nodes[&root.track_id]);
        while let Some(nx) = dfs.next(&g) {
            family.insert(g[nx]);
        }
    }
    family
}

/// Track ids of trajectories with initial energy below `threshold`
pub fn low_energy_ids(trajectories: &[Trajectory], threshold: f64) -> AHashSet<i32> {
    trajectories
        .iter()
        .filter(|t| t.energy() < threshold)
        .map(|t| t.track_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_id::ParticleID;

    fn traj(track_id: i32, parent_id: i32, pdg: i32, e: f64) -> Trajectory {
        Trajectory::new(track_id, parent_id, ParticleID::new(pdg), [e, 0., 0., 0.])
    }

    fn sorted(ids: AHashSet<i32>) -> Vec<i32> {
        let mut ids = Vec::from_iter(ids);
        ids.sort_unstable();
        ids
    }

    #[test]
    fn neutron_and_photon() {
        let trajs = [traj(1, 0, 2112, 1000.), traj(2, 1, 22, 5.)];
        assert_eq!(sorted(neutron_descendants(&trajs)), [1, 2]);
    }

    #[test]
    fn unrelated_tracks_excluded() {
        let trajs = [
            traj(1, 0, 13, 2000.),
            traj(2, 0, 2212, 300.),
            traj(3, 2, 2112, 50.),
            traj(4, 3, 2212, 20.),
            traj(5, 4, 11, 1.),
            traj(6, 1, 11, 3.),
            traj(7, 2, 22, 4.),
        ];
        assert_eq!(sorted(neutron_descendants(&trajs)), [3, 4, 5]);
    }

    #[test]
    fn children_before_parents() {
        let trajs = [
            traj(5, 4, 11, 1.),
            traj(4, 3, 2212, 20.),
            traj(3, 2, 2112, 50.),
            traj(2, 0, 2212, 300.),
        ];
        assert_eq!(sorted(neutron_descendants(&trajs)), [3, 4, 5]);
    }

    #[test]
    fn matches_single_pass_when_ordered() {
        let trajs = [
            traj(1, 0, 14, 3000.),
            traj(2, 1, 2112, 900.),
            traj(3, 1, 211, 400.),
            traj(4, 2, 2212, 100.),
            traj(5, 3, 2112, 40.),
            traj(6, 5, 22, 2.),
            traj(7, 4, 11, 0.5),
            traj(8, 3, 13, 60.),
        ];
        let mut single_pass = Vec::new();
        for t in &trajs {
            if t.id.id() == NEUTRON || single_pass.contains(&t.parent_id) {
                single_pass.push(t.track_id);
            }
        }
        single_pass.sort_unstable();
        assert_eq!(sorted(neutron_descendants(&trajs)), single_pass);
    }

    #[test]
    fn closed_under_parent_relation() {
        let trajs = [
            traj(1, 0, 2112, 900.),
            traj(2, 1, 2212, 100.),
            traj(3, 2, 11, 1.),
            traj(4, 0, 211, 200.),
            traj(5, 4, 2112, 30.),
            traj(6, 5, 22, 3.),
            traj(7, 99, 22, 3.),
        ];
        let family = neutron_descendants(&trajs);
        for t in trajs.iter().filter(|t| family.contains(&t.track_id)) {
            assert!(t.id.id() == NEUTRON || family.contains(&t.parent_id));
        }
        assert!(!family.contains(&7));
    }

    #[test]
    fn duplicates_and_cycles() {
        let trajs = [
            traj(1, 2, 2112, 10.),
            traj(2, 1, 22, 10.),
            traj(2, 0, 22, 10.),
            traj(3, 3, 22, 10.),
        ];
        assert_eq!(sorted(neutron_descendants(&trajs)), [1, 2]);
    }

    #[test]
    fn repeated_track_id() {
        let trajs = [traj(1, 0, 22, 10.), traj(1, 0, 2112, 10.)];
        assert_eq!(sorted(neutron_descendants(&trajs)), [1]);

        let trajs = [
            traj(1, 0, 22, 10.),
            traj(2, 1, 11, 5.),
            traj(3, 0, 13, 500.),
            traj(1, 3, 2112, 10.),
        ];
        assert_eq!(sorted(neutron_descendants(&trajs)), [1, 2]);
    }

    #[test]
    fn no_trajectories() {
        assert!(neutron_descendants(&[]).is_empty());
        assert!(low_energy_ids(&[], LOW_ENERGY_THRESHOLD).is_empty());
    }

    #[test]
    fn low_energy() {
        let trajs = [
            traj(1, 0, 13, 2000.),
            traj(2, 1, 11, 9.99),
            traj(3, 1, 11, 10.),
            traj(4, 0, 22, 0.),
        ];
        assert_eq!(sorted(low_energy_ids(&trajs, LOW_ENERGY_THRESHOLD)), [2, 4]);
        assert_eq!(sorted(low_energy_ids(&trajs, 0.)), Vec::<i32>::new());
    }

    #[test]
    fn idempotent() {
        let trajs = [traj(1, 0, 2112, 1000.), traj(2, 1, 22, 5.), traj(3, 0, 13, 500.)];
        assert_eq!(
            sorted(neutron_descendants(&trajs)),
            sorted(neutron_descendants(&trajs))
        );
        assert_eq!(
            sorted(low_energy_ids(&trajs, LOW_ENERGY_THRESHOLD)),
            sorted(low_energy_ids(&trajs, LOW_ENERGY_THRESHOLD))
        );
    }
}
