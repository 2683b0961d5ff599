//! Distance springs between particle pairs.
//!
//! Each spring holds its two particles at the rest length measured at
//! construction. Standard springs move both endpoints directly toward the
//! rest length scaled by stiffness; extended springs solve for a Lagrange
//! multiplier increment against a stiffness-derived compliance.

use std::collections::HashSet;

use weft_types::constants::EPSILON;

use crate::constraint::{is_fully_kinematic, xpbd_alpha_tilde, ClothConstraint, Formulation};
use crate::particles::ParticleBuffer;

/// A set of distance springs.
#[derive(Debug, Clone)]
pub struct SpringConstraints {
    constraints: Vec<[u32; 2]>,
    rest_lengths: Vec<f32>,
    lambdas: Vec<f32>,
    stiffness: f32,
    formulation: Formulation,
    stripped: usize,
}

impl SpringConstraints {
    /// Build springs over `edges`, measuring rest lengths from the current positions.
    ///
    /// With `strip_kinematic`, springs whose endpoints are both kinematic are dropped.
    pub fn new(
        particles: &ParticleBuffer,
        edges: &[[u32; 2]],
        stiffness: f32,
        formulation: Formulation,
        strip_kinematic: bool,
    ) -> Self {
        let mut constraints = Vec::with_capacity(edges.len());
        let mut rest_lengths = Vec::with_capacity(edges.len());
        let mut stripped = 0;

        for edge in edges {
            if strip_kinematic && is_fully_kinematic(particles, edge) {
                stripped += 1;
                continue;
            }
            let [a, b] = *edge;
            let rest = (particles.position(a as usize) - particles.position(b as usize)).length();
            constraints.push(*edge);
            rest_lengths.push(rest);
        }

        let lambdas = vec![0.0; constraints.len()];
        Self {
            constraints,
            rest_lengths,
            lambdas,
            stiffness,
            formulation,
            stripped,
        }
    }

    /// Build springs over the unique edges of a triangle list.
    pub fn from_surface_elements(
        particles: &ParticleBuffer,
        surface_elements: &[[u32; 3]],
        stiffness: f32,
        formulation: Formulation,
        strip_kinematic: bool,
    ) -> Self {
        let edges = surface_edges(surface_elements);
        Self::new(particles, &edges, stiffness, formulation, strip_kinematic)
    }

    /// Build springs with explicit rest lengths.
    pub fn with_rest_lengths(
        constraints: Vec<[u32; 2]>,
        rest_lengths: Vec<f32>,
        stiffness: f32,
        formulation: Formulation,
    ) -> Self {
        assert_eq!(
            constraints.len(),
            rest_lengths.len(),
            "one rest length per spring"
        );
        let lambdas = vec![0.0; constraints.len()];
        Self {
            constraints,
            rest_lengths,
            lambdas,
            stiffness,
            formulation,
            stripped: 0,
        }
    }

    pub fn constraints(&self) -> &[[u32; 2]] {
        &self.constraints
    }

    pub fn rest_lengths(&self) -> &[f32] {
        &self.rest_lengths
    }

    /// Accumulated multipliers of the current substep (extended only).
    pub fn lambdas(&self) -> &[f32] {
        &self.lambdas
    }

    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }

    /// Number of fully kinematic springs dropped at construction.
    pub fn stripped_count(&self) -> usize {
        self.stripped
    }

    fn apply_standard(&mut self, particles: &mut ParticleBuffer) {
        for (&[a, b], &rest) in self.constraints.iter().zip(&self.rest_lengths) {
            let (a, b) = (a as usize, b as usize);
            let w_a = particles.inv_mass(a);
            let w_b = particles.inv_mass(b);
            let w_sum = w_a + w_b;
            if w_sum == 0.0 {
                continue;
            }

            let diff = particles.position(a) - particles.position(b);
            let dist = diff.length();
            if dist < EPSILON {
                continue;
            }

            let dir = diff / dist;
            let s = self.stiffness * (dist - rest) / w_sum;
            particles.displace(a, -dir * (w_a * s));
            particles.displace(b, dir * (w_b * s));
        }
    }

    fn apply_extended(&mut self, particles: &mut ParticleBuffer, dt: f32) {
        let alpha = xpbd_alpha_tilde(self.stiffness, dt);
        for (k, &[a, b]) in self.constraints.iter().enumerate() {
            let (a, b) = (a as usize, b as usize);
            let w_a = particles.inv_mass(a);
            let w_b = particles.inv_mass(b);
            let w_sum = w_a + w_b;
            if w_sum == 0.0 {
                continue;
            }

            let diff = particles.position(a) - particles.position(b);
            let dist = diff.length();
            if dist < EPSILON {
                continue;
            }

            let dir = diff / dist;
            let c = dist - self.rest_lengths[k];
            let d_lambda = (-c - alpha * self.lambdas[k]) / (w_sum + alpha);
            self.lambdas[k] += d_lambda;
            particles.displace(a, dir * (w_a * d_lambda));
            particles.displace(b, -dir * (w_b * d_lambda));
        }
    }
}

impl ClothConstraint for SpringConstraints {
    fn formulation(&self) -> Formulation {
        self.formulation
    }

    fn init(&mut self, _particles: &ParticleBuffer) {
        self.lambdas.fill(0.0);
    }

    fn apply(&mut self, particles: &mut ParticleBuffer, dt: f32) {
        match self.formulation {
            Formulation::Standard => self.apply_standard(particles),
            Formulation::Extended => self.apply_extended(particles, dt),
        }
    }

    fn len(&self) -> usize {
        self.constraints.len()
    }
}

/// Unique edges of a triangle list, in first-occurrence order. Collapsed
/// edges (`v0 == v1`) are skipped.
pub fn surface_edges(surface_elements: &[[u32; 3]]) -> Vec<[u32; 2]> {
    let mut seen = HashSet::new();
    let mut edges = Vec::with_capacity(surface_elements.len() * 3 / 2);
    for &[a, b, c] in surface_elements {
        for (v0, v1) in [(a, b), (b, c), (c, a)] {
            if v0 == v1 {
                continue;
            }
            let key = if v0 < v1 { [v0, v1] } else { [v1, v0] };
            if seen.insert(key) {
                edges.push(key);
            }
        }
    }
    edges
}
