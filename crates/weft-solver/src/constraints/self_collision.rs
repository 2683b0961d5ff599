//! Self-collision springs between nearby, non-adjacent particles.
//!
//! `init` runs before the substep's prediction, so it only marks the pair
//! list stale. The first `apply` of the substep re-queries the spatial hash
//! at the predicted positions, keeping every pair within a margin of
//! `thickness`. Each `apply` then pushes the listed pairs that are closer than
//! `thickness` apart with mass-weighted corrections.

use std::collections::BTreeSet;

use weft_types::constants::EPSILON;
use weft_types::ParticleRange;

use crate::constraint::ClothConstraint;
use crate::particles::ParticleBuffer;
use crate::spatial_hash::SpatialHash;

/// Pairs within this multiple of `thickness` are kept as candidates, so
/// pairs closing during the solver iterations are still seen.
const CANDIDATE_MARGIN: f32 = 2.0;

#[derive(Debug, Clone)]
pub struct SelfCollisionConstraints {
    range: ParticleRange,
    /// Unordered pairs excluded from collision, stored as `[min, max]`.
    excluded: BTreeSet<[u32; 2]>,
    thickness: f32,
    hash: SpatialHash,
    /// Proximity pairs found by the last query.
    pairs: Vec<[u32; 2]>,
    /// Set by `init`; the next `apply` re-queries before projecting.
    stale: bool,
}

impl SelfCollisionConstraints {
    /// Pairs sharing a triangle and the given `disabled_pairs` never collide.
    pub fn new(
        range: ParticleRange,
        triangles: &[[u32; 3]],
        disabled_pairs: &BTreeSet<[u32; 2]>,
        thickness: f32,
    ) -> Self {
        let mut excluded: BTreeSet<[u32; 2]> = disabled_pairs
            .iter()
            .map(|&[a, b]| [a.min(b), a.max(b)])
            .collect();
        for &[a, b, c] in triangles {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                excluded.insert([u.min(v), u.max(v)]);
            }
        }

        Self {
            range,
            excluded,
            thickness,
            hash: SpatialHash::new(thickness * CANDIDATE_MARGIN),
            pairs: Vec::new(),
            stale: true,
        }
    }

    /// Candidate pairs found by the last proximity query.
    pub fn pairs(&self) -> &[[u32; 2]] {
        &self.pairs
    }

    pub fn thickness(&self) -> f32 {
        self.thickness
    }

    pub fn is_excluded(&self, a: u32, b: u32) -> bool {
        self.excluded.contains(&[a.min(b), a.max(b)])
    }

    /// Rebuild the candidate pairs from the current positions.
    pub fn refresh_pairs(&mut self, particles: &ParticleBuffer) {
        self.hash.rebuild(particles, self.range);
        let reach = self.thickness * CANDIDATE_MARGIN;
        let reach_sq = reach * reach;

        self.pairs.clear();
        for [a, b] in self.hash.candidate_pairs() {
            let (i, j) = (a as usize, b as usize);
            if particles.is_kinematic(i) && particles.is_kinematic(j) {
                continue;
            }
            if self.excluded.contains(&[a, b]) {
                continue;
            }
            if (particles.position(i) - particles.position(j)).length_squared() < reach_sq {
                self.pairs.push([a, b]);
            }
        }
        self.stale = false;
    }
}

impl ClothConstraint for SelfCollisionConstraints {
    fn has_init(&self) -> bool {
        true
    }

    fn init(&mut self, particles: &ParticleBuffer) {
        self.refresh_pairs(particles);
        self.stale = true;
    }

    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        if self.stale {
            self.refresh_pairs(particles);
        }
        for &[a, b] in &self.pairs {
            let (i, j) = (a as usize, b as usize);
            let w_i = particles.inv_mass(i);
            let w_j = particles.inv_mass(j);
            let w_sum = w_i + w_j;
            if w_sum < EPSILON {
                continue;
            }

            let diff = particles.position(i) - particles.position(j);
            let dist = diff.length();
            if dist >= self.thickness || dist < 1e-10 {
                continue;
            }

            let normal = diff / dist;
            let overlap = self.thickness - dist;
            particles.displace(i, normal * (overlap * w_i / w_sum));
            particles.displace(j, -normal * (overlap * w_j / w_sum));
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
