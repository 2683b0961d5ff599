//! Long-range attachment (tether) constraints.
//!
//! Kinematic particles are grouped into islands: connected components of the
//! neighbour graph restricted to kinematic particles. Every dynamic particle
//! reachable from an island is tethered to that island's nearest anchor, for
//! up to [`MAX_TETHER_ISLANDS`] closest islands. A tether only pulls: it acts
//! when the particle drifts further than `limit_scale × reference` from its
//! anchor.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};
use weft_types::constants::{EPSILON, MAX_TETHER_ISLANDS};

use crate::constraint::{xpbd_alpha_tilde, ClothConstraint, Formulation};
use crate::particles::ParticleBuffer;

/// How anchors are chosen and reference lengths measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TetherMode {
    /// Straight-line distance to the closest anchor of each island.
    Euclidean,
    /// Shortest path through the neighbour graph.
    #[default]
    Geodesic,
}

/// Tethers from dynamic particles to kinematic anchors.
#[derive(Debug, Clone)]
pub struct LongRangeConstraints {
    /// `[anchor, particle]` per tether.
    tethers: Vec<[u32; 2]>,
    reference_lengths: Vec<f32>,
    lambdas: Vec<f32>,
    stiffness: f32,
    limit_scale: f32,
    mode: TetherMode,
    formulation: Formulation,
}

impl LongRangeConstraints {
    pub fn new(
        particles: &ParticleBuffer,
        neighbor_map: &BTreeMap<u32, BTreeSet<u32>>,
        stiffness: f32,
        limit_scale: f32,
        mode: TetherMode,
        formulation: Formulation,
    ) -> Self {
        let islands = kinematic_islands(particles, neighbor_map);

        // particle → (geodesic distance, island, anchor, reference length)
        let mut candidates: BTreeMap<u32, Vec<(f32, usize, u32, f32)>> = BTreeMap::new();
        for (island_index, island) in islands.iter().enumerate() {
            let reach = geodesic_reach(particles, neighbor_map, island);
            for (particle, (geodesic, geodesic_anchor)) in reach {
                if particles.is_kinematic(particle as usize) {
                    continue;
                }
                let (anchor, reference) = match mode {
                    TetherMode::Geodesic => (geodesic_anchor, geodesic),
                    TetherMode::Euclidean => closest_anchor(particles, island, particle),
                };
                candidates
                    .entry(particle)
                    .or_default()
                    .push((geodesic, island_index, anchor, reference));
            }
        }

        let mut tethers = Vec::new();
        let mut reference_lengths = Vec::new();
        for (particle, mut reachable) in candidates {
            reachable.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for &(_, _, anchor, reference) in reachable.iter().take(MAX_TETHER_ISLANDS) {
                tethers.push([anchor, particle]);
                reference_lengths.push(reference);
            }
        }

        let lambdas = vec![0.0; tethers.len()];
        Self {
            tethers,
            reference_lengths,
            lambdas,
            stiffness,
            limit_scale,
            mode,
            formulation,
        }
    }

    /// `[anchor, particle]` pairs.
    pub fn tethers(&self) -> &[[u32; 2]] {
        &self.tethers
    }

    pub fn reference_lengths(&self) -> &[f32] {
        &self.reference_lengths
    }

    pub fn mode(&self) -> TetherMode {
        self.mode
    }

    pub fn limit_scale(&self) -> f32 {
        self.limit_scale
    }
}

impl ClothConstraint for LongRangeConstraints {
    fn formulation(&self) -> Formulation {
        self.formulation
    }

    fn init(&mut self, _particles: &ParticleBuffer) {
        self.lambdas.fill(0.0);
    }

    fn apply(&mut self, particles: &mut ParticleBuffer, dt: f32) {
        let alpha = match self.formulation {
            Formulation::Standard => 0.0,
            Formulation::Extended => xpbd_alpha_tilde(self.stiffness, dt),
        };

        for k in 0..self.tethers.len() {
            let [anchor, particle] = self.tethers[k].map(|i| i as usize);
            let w = particles.inv_mass(particle);
            if w == 0.0 {
                continue;
            }

            let diff = particles.position(particle) - particles.position(anchor);
            let len = diff.length();
            let limit = self.reference_lengths[k] * self.limit_scale;
            let violation = len - limit;
            if violation <= 0.0 || len < EPSILON {
                continue;
            }
            let dir = diff / len;

            match self.formulation {
                Formulation::Standard => {
                    particles.displace(particle, -dir * (self.stiffness * violation));
                }
                Formulation::Extended => {
                    let d_lambda = (-violation - alpha * self.lambdas[k]) / (w + alpha);
                    self.lambdas[k] += d_lambda;
                    particles.displace(particle, dir * (w * d_lambda));
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.tethers.len()
    }
}

/// Connected components of kinematic particles, each sorted ascending.
fn kinematic_islands(
    particles: &ParticleBuffer,
    neighbor_map: &BTreeMap<u32, BTreeSet<u32>>,
) -> Vec<Vec<u32>> {
    let is_kinematic = |v: u32| (v as usize) < particles.len() && particles.is_kinematic(v as usize);

    let mut visited = BTreeSet::new();
    let mut islands = Vec::new();
    for &seed in neighbor_map.keys() {
        if !is_kinematic(seed) || !visited.insert(seed) {
            continue;
        }

        let mut island = vec![seed];
        let mut queue = VecDeque::from([seed]);
        while let Some(v) = queue.pop_front() {
            let Some(neighbors) = neighbor_map.get(&v) else {
                continue;
            };
            for &n in neighbors {
                if is_kinematic(n) && visited.insert(n) {
                    island.push(n);
                    queue.push_back(n);
                }
            }
        }
        island.sort_unstable();
        islands.push(island);
    }
    islands
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    distance: f32,
    particle: u32,
    anchor: u32,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // Reversed for a min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.particle.cmp(&self.particle))
            .then_with(|| other.anchor.cmp(&self.anchor))
    }
}

/// Multi-source Dijkstra from every particle of an island.
///
/// Returns, for each reachable particle, its geodesic distance to the island
/// and the anchor that path starts from.
fn geodesic_reach(
    particles: &ParticleBuffer,
    neighbor_map: &BTreeMap<u32, BTreeSet<u32>>,
    island: &[u32],
) -> BTreeMap<u32, (f32, u32)> {
    let mut settled: BTreeMap<u32, (f32, u32)> = BTreeMap::new();
    let mut heap: BinaryHeap<HeapEntry> = island
        .iter()
        .map(|&v| HeapEntry {
            distance: 0.0,
            particle: v,
            anchor: v,
        })
        .collect();

    while let Some(entry) = heap.pop() {
        if settled.contains_key(&entry.particle) {
            continue;
        }
        settled.insert(entry.particle, (entry.distance, entry.anchor));

        let Some(neighbors) = neighbor_map.get(&entry.particle) else {
            continue;
        };
        let from = particles.position(entry.particle as usize);
        for &n in neighbors {
            if settled.contains_key(&n) || n as usize >= particles.len() {
                continue;
            }
            let step = (particles.position(n as usize) - from).length();
            heap.push(HeapEntry {
                distance: entry.distance + step,
                particle: n,
                anchor: entry.anchor,
            });
        }
    }
    settled
}

fn closest_anchor(particles: &ParticleBuffer, island: &[u32], particle: u32) -> (u32, f32) {
    let p = particles.position(particle as usize);
    let mut best = (island[0], f32::INFINITY);
    for &anchor in island {
        let d = (particles.position(anchor as usize) - p).length();
        if d < best.1 {
            best = (anchor, d);
        }
    }
    best
}
