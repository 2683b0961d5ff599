//! Axial (altitude) springs preserving triangle area.
//!
//! For each triangle the apex is the vertex opposite the longest edge. The
//! apex is held at its rest distance from a barycentric foot point on that
//! edge; with the edge length held by edge springs this preserves area.
//!
//! ```text
//!          apex
//!           |
//!           |  rest
//!           |
//!   b ──────┴─────── c
//!         foot = bary·b + (1 - bary)·c
//! ```

use weft_types::constants::{DEGENERATE_LENGTH_SQUARED, EPSILON};

use crate::constraint::{is_fully_kinematic, xpbd_alpha_tilde, ClothConstraint, Formulation};
use crate::particles::ParticleBuffer;

/// A set of axial springs, one per non-degenerate triangle.
#[derive(Debug, Clone)]
pub struct AxialSpringConstraints {
    /// `[apex, b, c]` per triangle.
    constraints: Vec<[u32; 3]>,
    barys: Vec<f32>,
    rest_lengths: Vec<f32>,
    lambdas: Vec<f32>,
    stiffness: f32,
    formulation: Formulation,
    stripped: usize,
}

impl AxialSpringConstraints {
    pub fn new(
        particles: &ParticleBuffer,
        surface_elements: &[[u32; 3]],
        stiffness: f32,
        formulation: Formulation,
    ) -> Self {
        let mut constraints = Vec::with_capacity(surface_elements.len());
        let mut barys = Vec::with_capacity(surface_elements.len());
        let mut rest_lengths = Vec::with_capacity(surface_elements.len());
        let mut stripped = 0;

        for element in surface_elements {
            if is_fully_kinematic(particles, element) {
                stripped += 1;
                continue;
            }
            let Some((tuple, bary)) = orient_by_longest_edge(particles, *element) else {
                stripped += 1;
                continue;
            };

            let [apex, b, c] = tuple.map(|i| particles.position(i as usize));
            let foot = b * bary + c * (1.0 - bary);
            constraints.push(tuple);
            barys.push(bary);
            rest_lengths.push((apex - foot).length());
        }

        let lambdas = vec![0.0; constraints.len()];
        Self {
            constraints,
            barys,
            rest_lengths,
            lambdas,
            stiffness,
            formulation,
            stripped,
        }
    }

    /// `[apex, b, c]` tuples of the active springs.
    pub fn constraints(&self) -> &[[u32; 3]] {
        &self.constraints
    }

    pub fn rest_lengths(&self) -> &[f32] {
        &self.rest_lengths
    }

    pub fn lambdas(&self) -> &[f32] {
        &self.lambdas
    }

    pub fn stripped_count(&self) -> usize {
        self.stripped
    }
}

impl ClothConstraint for AxialSpringConstraints {
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

        for k in 0..self.constraints.len() {
            let [apex, b, c] = self.constraints[k].map(|i| i as usize);
            let bary = self.barys[k];
            let w_apex = particles.inv_mass(apex);
            let w_b = particles.inv_mass(b);
            let w_c = particles.inv_mass(c);
            let w_sum = w_apex + bary * bary * w_b + (1.0 - bary) * (1.0 - bary) * w_c;
            if w_sum < EPSILON {
                continue;
            }

            let foot = particles.position(b) * bary + particles.position(c) * (1.0 - bary);
            let diff = particles.position(apex) - foot;
            let dist = diff.length();
            if dist < EPSILON {
                continue;
            }
            let dir = diff / dist;
            let violation = dist - self.rest_lengths[k];

            // Gradients: apex → dir, b → -bary·dir, c → -(1 - bary)·dir.
            let step = match self.formulation {
                Formulation::Standard => -self.stiffness * violation / w_sum,
                Formulation::Extended => {
                    let d_lambda = (-violation - alpha * self.lambdas[k]) / (w_sum + alpha);
                    self.lambdas[k] += d_lambda;
                    d_lambda
                }
            };

            particles.displace(apex, dir * (w_apex * step));
            particles.displace(b, -dir * (w_b * bary * step));
            particles.displace(c, -dir * (w_c * (1.0 - bary) * step));
        }
    }

    fn len(&self) -> usize {
        self.constraints.len()
    }
}

/// Reorders a triangle as `[apex, b, c]` with `(b, c)` its longest edge and
/// returns the barycentric weight of `b` at the apex's projected foot.
fn orient_by_longest_edge(particles: &ParticleBuffer, [i0, i1, i2]: [u32; 3]) -> Option<([u32; 3], f32)> {
    let candidates = [[i0, i1, i2], [i1, i2, i0], [i2, i0, i1]];
    let [apex, b, c] = candidates
        .into_iter()
        .max_by(|x, y| {
            let len_x = edge_length_squared(particles, x[1], x[2]);
            let len_y = edge_length_squared(particles, y[1], y[2]);
            len_x.total_cmp(&len_y)
        })?;

    let p_apex = particles.position(apex as usize);
    let p_b = particles.position(b as usize);
    let p_c = particles.position(c as usize);
    let base = p_b - p_c;
    let base_len2 = base.length_squared();
    if base_len2 < DEGENERATE_LENGTH_SQUARED {
        return None;
    }

    let bary = ((p_apex - p_c).dot(base) / base_len2).clamp(0.0, 1.0);
    Some(([apex, b, c], bary))
}

fn edge_length_squared(particles: &ParticleBuffer, a: u32, b: u32) -> f32 {
    (particles.position(a as usize) - particles.position(b as usize)).length_squared()
}
