//! Four-particle dihedral bending elements.
//!
//! Each element `[v0, v1, wing_a, wing_b]` holds the signed dihedral angle
//! about the shared edge (v0, v1) at its rest value, moving all four
//! particles along the analytic angle gradient.

use weft_math::{wrap_angle, Hinge};
use weft_types::constants::EPSILON;

use crate::constraint::{is_fully_kinematic, ClothConstraint};
use crate::particles::ParticleBuffer;

/// A set of dihedral bending elements. Always standard formulation.
#[derive(Debug, Clone)]
pub struct BendingElementConstraints {
    constraints: Vec<[u32; 4]>,
    rest_angles: Vec<f32>,
    stiffness: f32,
    stripped: usize,
}

impl BendingElementConstraints {
    /// Build elements measuring rest angles from the current positions.
    ///
    /// Fully kinematic and degenerate hinges are dropped.
    pub fn new(particles: &ParticleBuffer, elements: &[[u32; 4]], stiffness: f32) -> Self {
        let mut constraints = Vec::with_capacity(elements.len());
        let mut rest_angles = Vec::with_capacity(elements.len());
        let mut stripped = 0;

        for element in elements {
            if is_fully_kinematic(particles, element) {
                stripped += 1;
                continue;
            }
            let Some(hinge) = hinge_of(particles, element) else {
                stripped += 1;
                continue;
            };
            constraints.push(*element);
            rest_angles.push(hinge.angle());
        }

        Self {
            constraints,
            rest_angles,
            stiffness,
            stripped,
        }
    }

    pub fn constraints(&self) -> &[[u32; 4]] {
        &self.constraints
    }

    pub fn rest_angles(&self) -> &[f32] {
        &self.rest_angles
    }

    pub fn stripped_count(&self) -> usize {
        self.stripped
    }
}

impl ClothConstraint for BendingElementConstraints {
    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        for (element, &rest) in self.constraints.iter().zip(&self.rest_angles) {
            let Some(hinge) = hinge_of(particles, element) else {
                continue;
            };

            let violation = wrap_angle(hinge.angle() - rest);
            if violation.abs() < EPSILON {
                continue;
            }

            let gradients = hinge.angle_gradients();
            let mut denominator = 0.0;
            for (&i, g) in element.iter().zip(&gradients) {
                denominator += particles.inv_mass(i as usize) * g.length_squared();
            }
            if denominator < EPSILON {
                continue;
            }

            let s = self.stiffness * violation / denominator;
            for (&i, &g) in element.iter().zip(&gradients) {
                let i = i as usize;
                particles.displace(i, g * (-s * particles.inv_mass(i)));
            }
        }
    }

    fn len(&self) -> usize {
        self.constraints.len()
    }
}

fn hinge_of(particles: &ParticleBuffer, &[v0, v1, wing_a, wing_b]: &[u32; 4]) -> Option<Hinge> {
    Hinge::new(
        particles.position(v0 as usize),
        particles.position(v1 as usize),
        particles.position(wing_a as usize),
        particles.position(wing_b as usize),
    )
}
