//! Uniform-grid spatial hash for self-collision candidate search.
//!
//! Bins the particles of a range into cubic cells. Candidate pairs come from
//! particles in the same or adjacent cells, so with a cell size of at least
//! the query distance no close pair is missed.

use std::collections::HashMap;

use weft_types::ParticleRange;

use crate::particles::ParticleBuffer;

/// Spatial hash over a uniform grid.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    /// Inverse cell size (cached).
    inv_cell_size: f32,
    /// Cell key → particle indices.
    grid: HashMap<(i32, i32, i32), Vec<u32>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        let cell_size = cell_size.max(1e-6);
        Self {
            inv_cell_size: 1.0 / cell_size,
            grid: HashMap::new(),
        }
    }

    fn cell_key(&self, x: f32, y: f32, z: f32) -> (i32, i32, i32) {
        let cx = (x * self.inv_cell_size).floor() as i32;
        let cy = (y * self.inv_cell_size).floor() as i32;
        let cz = (z * self.inv_cell_size).floor() as i32;
        (cx, cy, cz)
    }

    /// Re-bin every particle of `range` at its current position.
    pub fn rebuild(&mut self, particles: &ParticleBuffer, range: ParticleRange) {
        self.grid.clear();
        for i in range.indices() {
            let key = self.cell_key(particles.pos_x[i], particles.pos_y[i], particles.pos_z[i]);
            self.grid.entry(key).or_default().push(i as u32);
        }
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.grid.len()
    }

    /// All `[a, b]` pairs with `a < b` sharing a cell or in adjacent cells,
    /// sorted ascending.
    pub fn candidate_pairs(&self) -> Vec<[u32; 2]> {
        let mut pairs = Vec::new();

        for (&(cx, cy, cz), particles) in &self.grid {
            // Pairs within the cell
            for i in 0..particles.len() {
                for j in (i + 1)..particles.len() {
                    pairs.push(ordered(particles[i], particles[j]));
                }
            }

            // Half of the 26 neighbours, so each cell pair is visited once
            for dx in -1..=1_i32 {
                for dy in -1..=1_i32 {
                    for dz in -1..=1_i32 {
                        let neighbor = (cx + dx, cy + dy, cz + dz);
                        if neighbor <= (cx, cy, cz) {
                            continue;
                        }
                        if let Some(others) = self.grid.get(&neighbor) {
                            for &a in particles {
                                for &b in others {
                                    pairs.push(ordered(a, b));
                                }
                            }
                        }
                    }
                }
            }
        }

        // HashMap iteration order is unspecified.
        pairs.sort_unstable();
        pairs
    }
}

#[inline]
fn ordered(a: u32, b: u32) -> [u32; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}
