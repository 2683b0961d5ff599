//! Sphere constraints anchored on the animated pose.
//!
//! - [`SphericalConstraint`]: each particle stays inside a sphere of radius
//!   `max_distance × multiplier` around its animated position.
//! - [`SphericalBackstopConstraint`]: each particle stays outside a sphere
//!   placed behind the animated surface, along the negative animated normal.

use weft_types::constants::EPSILON;
use weft_types::ParticleRange;

use crate::constraint::{ClothConstraint, LiveParameter, SharedPose};
use crate::particles::ParticleBuffer;

/// Maximum-distance sphere per particle.
#[derive(Debug, Clone)]
pub struct SphericalConstraint {
    range: ParticleRange,
    pose: SharedPose,
    /// Per-particle radius, indexed locally.
    radii: Vec<f32>,
    multiplier_source: LiveParameter,
    sphere_radii_multiplier: f32,
}

impl SphericalConstraint {
    pub fn new(range: ParticleRange, pose: SharedPose, radii: Vec<f32>, multiplier: LiveParameter) -> Self {
        debug_assert_eq!(radii.len(), range.count);
        let sphere_radii_multiplier = multiplier.get().max(0.0);
        Self {
            range,
            pose,
            radii,
            multiplier_source: multiplier,
            sphere_radii_multiplier,
        }
    }

    /// Stamp the multiplier directly, clamped to `>= 0`.
    pub fn set_sphere_radii_multiplier(&mut self, multiplier: f32) {
        self.sphere_radii_multiplier = multiplier.max(0.0);
    }

    /// Multiplier used by the next `apply`.
    pub fn sphere_radii_multiplier(&self) -> f32 {
        self.sphere_radii_multiplier
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }
}

impl ClothConstraint for SphericalConstraint {
    fn update_live_parameters(&mut self) {
        self.set_sphere_radii_multiplier(self.multiplier_source.get());
    }

    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        let pose = self.pose.borrow();
        pose.assert_covers(self.range);
        for (local, index) in self.range.indices().enumerate() {
            if particles.is_kinematic(index) {
                continue;
            }

            let center = pose.positions[index];
            let radius = self.radii[local] * self.sphere_radii_multiplier;
            let offset = particles.position(index) - center;
            let dist = offset.length();
            if dist <= radius || dist < EPSILON {
                continue;
            }
            particles.set_position(index, center + offset * (radius / dist));
        }
    }

    fn len(&self) -> usize {
        self.range.count
    }
}

/// Backstop sphere per particle.
#[derive(Debug, Clone)]
pub struct SphericalBackstopConstraint {
    range: ParticleRange,
    pose: SharedPose,
    distances: Vec<f32>,
    radii: Vec<f32>,
    use_legacy: bool,
}

impl SphericalBackstopConstraint {
    /// With `use_legacy`, `distances` already include the radius and the
    /// sphere centre sits at `pose - normal × distance`. Otherwise the centre
    /// sits at `pose - normal × (distance + radius)`.
    pub fn new(
        range: ParticleRange,
        pose: SharedPose,
        distances: Vec<f32>,
        radii: Vec<f32>,
        use_legacy: bool,
    ) -> Self {
        debug_assert_eq!(distances.len(), range.count);
        debug_assert_eq!(radii.len(), range.count);
        Self {
            range,
            pose,
            distances,
            radii,
            use_legacy,
        }
    }

    pub fn uses_legacy(&self) -> bool {
        self.use_legacy
    }
}

impl ClothConstraint for SphericalBackstopConstraint {
    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        let pose = self.pose.borrow();
        pose.assert_covers(self.range);
        for (local, index) in self.range.indices().enumerate() {
            if particles.is_kinematic(index) {
                continue;
            }

            let radius = self.radii[local];
            let depth = if self.use_legacy {
                self.distances[local]
            } else {
                self.distances[local] + radius
            };
            let center = pose.positions[index] - pose.normals[index] * depth;

            let offset = particles.position(index) - center;
            let dist = offset.length();
            if dist >= radius {
                continue;
            }
            // A particle at the centre is pushed out along the animated normal.
            let dir = if dist < EPSILON {
                pose.normals[index].normalize_or_zero()
            } else {
                offset / dist
            };
            particles.set_position(index, center + dir * radius);
        }
    }

    fn len(&self) -> usize {
        self.range.count
    }
}
