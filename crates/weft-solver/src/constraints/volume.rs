//! Enclosed volume preservation over a closed triangle surface.
//!
//! A single global constraint `C = V - V0` where `V` is the signed volume
//! enclosed by the surface, summed as origin-based tetrahedra. Particles
//! move along `∇V` weighted by inverse mass.

use std::collections::{BTreeMap, BTreeSet};

use weft_math::{signed_tet_volume, Vec3};
use weft_types::constants::EPSILON;

use crate::constraint::ClothConstraint;
use crate::particles::ParticleBuffer;

/// One volume constraint over all triangles of a closed surface.
#[derive(Debug, Clone)]
pub struct VolumeConstraint {
    /// Unique particles touched by the surface, ascending.
    particles: Vec<u32>,
    /// Triangles as indices into `particles`.
    triangles: Vec<[usize; 3]>,
    rest_volume: f32,
    stiffness: f32,
    gradients: Vec<Vec3>,
}

impl VolumeConstraint {
    pub fn new(particles: &ParticleBuffer, triangles: &[[u32; 3]], stiffness: f32) -> Self {
        let unique: Vec<u32> = triangles
            .iter()
            .flatten()
            .copied()
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .collect();
        let local: BTreeMap<u32, usize> = unique.iter().enumerate().map(|(slot, &v)| (v, slot)).collect();
        let triangles: Vec<[usize; 3]> = triangles
            .iter()
            .map(|tri| tri.map(|v| local[&v]))
            .collect();

        let mut constraint = Self {
            gradients: vec![Vec3::ZERO; unique.len()],
            particles: unique,
            triangles,
            rest_volume: 0.0,
            stiffness,
        };
        constraint.rest_volume = constraint.volume(particles);
        constraint
    }

    /// Signed volume enclosed by the surface at the given positions.
    pub fn volume(&self, particles: &ParticleBuffer) -> f32 {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                signed_tet_volume(
                    particles.position(self.particles[a] as usize),
                    particles.position(self.particles[b] as usize),
                    particles.position(self.particles[c] as usize),
                )
            })
            .sum()
    }

    pub fn rest_volume(&self) -> f32 {
        self.rest_volume
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

impl ClothConstraint for VolumeConstraint {
    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        if self.triangles.is_empty() {
            return;
        }

        let violation = self.volume(particles) - self.rest_volume;
        if violation.abs() < EPSILON {
            return;
        }

        self.gradients.fill(Vec3::ZERO);
        for &[a, b, c] in &self.triangles {
            let pa = particles.position(self.particles[a] as usize);
            let pb = particles.position(self.particles[b] as usize);
            let pc = particles.position(self.particles[c] as usize);
            self.gradients[a] += pb.cross(pc) / 6.0;
            self.gradients[b] += pc.cross(pa) / 6.0;
            self.gradients[c] += pa.cross(pb) / 6.0;
        }

        let denominator: f32 = self
            .particles
            .iter()
            .zip(&self.gradients)
            .map(|(&i, g)| particles.inv_mass(i as usize) * g.length_squared())
            .sum();
        if denominator < EPSILON {
            return;
        }

        let s = self.stiffness * violation / denominator;
        for (&i, &g) in self.particles.iter().zip(&self.gradients) {
            let i = i as usize;
            particles.displace(i, g * (-s * particles.inv_mass(i)));
        }
    }

    fn len(&self) -> usize {
        usize::from(!self.triangles.is_empty())
    }
}
