//! Particle buffer: SoA storage for every per-particle quantity.
//!
//! The host engine owns this buffer. Constraints read and write only the
//! projected positions (`pos_*`) of the particles inside their range.

use weft_math::Vec3;
use weft_mesh::TriangleMesh;
use weft_types::{WeftError, WeftResult};

/// SoA particle buffers.
///
/// # Layout
///
/// All arrays have length `particle_count`:
/// ```text
/// pos_x: [x0, x1, x2, ...]
/// pos_y: [y0, y1, y2, ...]
/// ...
/// ```
/// `pos_*` holds the projected positions constraints operate on,
/// `prev_*` the positions at the start of the current substep.
#[derive(Debug, Clone)]
pub struct ParticleBuffer {
    /// Number of particles.
    pub particle_count: usize,

    // ─── Position (projected) ───
    pub pos_x: Vec<f32>,
    pub pos_y: Vec<f32>,
    pub pos_z: Vec<f32>,

    // ─── Position at substep start ───
    pub prev_x: Vec<f32>,
    pub prev_y: Vec<f32>,
    pub prev_z: Vec<f32>,

    // ─── Velocity ───
    pub vel_x: Vec<f32>,
    pub vel_y: Vec<f32>,
    pub vel_z: Vec<f32>,

    // ─── Mass (infinite mass = kinematic) ───
    pub mass: Vec<f32>,
    pub inv_mass: Vec<f32>,
}

impl ParticleBuffer {
    /// Creates a buffer at rest from positions and per-particle masses.
    ///
    /// An infinite mass makes the particle kinematic (`inv_mass = 0`).
    /// Zero, negative or NaN masses are rejected.
    pub fn new(positions: Vec<Vec3>, masses: &[f32]) -> WeftResult<Self> {
        let n = positions.len();
        if masses.len() != n {
            return Err(WeftError::InvalidParameter(format!(
                "Mass array length ({}) != particle count ({})",
                masses.len(),
                n
            )));
        }

        let mut inv_mass = Vec::with_capacity(n);
        for (i, &m) in masses.iter().enumerate() {
            if m.is_nan() || m <= 0.0 {
                return Err(WeftError::InvalidParameter(format!(
                    "Particle {} has invalid mass {}",
                    i, m
                )));
            }
            inv_mass.push(if m.is_infinite() { 0.0 } else { 1.0 / m });
        }

        let pos_x: Vec<f32> = positions.iter().map(|p| p.x).collect();
        let pos_y: Vec<f32> = positions.iter().map(|p| p.y).collect();
        let pos_z: Vec<f32> = positions.iter().map(|p| p.z).collect();

        Ok(Self {
            particle_count: n,
            prev_x: pos_x.clone(),
            prev_y: pos_y.clone(),
            prev_z: pos_z.clone(),
            pos_x,
            pos_y,
            pos_z,
            vel_x: vec![0.0; n],
            vel_y: vec![0.0; n],
            vel_z: vec![0.0; n],
            mass: masses.to_vec(),
            inv_mass,
        })
    }

    /// Initialize a buffer from a mesh and a uniform vertex mass.
    ///
    /// Pinned vertices become kinematic.
    pub fn from_mesh(mesh: &TriangleMesh, vertex_mass: f32, pinned: &[bool]) -> WeftResult<Self> {
        let n = mesh.vertex_count();
        if pinned.len() != n {
            return Err(WeftError::InvalidParameter(format!(
                "Pinned array length ({}) != vertex count ({})",
                pinned.len(),
                n
            )));
        }

        let masses: Vec<f32> = pinned
            .iter()
            .map(|&p| if p { f32::INFINITY } else { vertex_mass })
            .collect();
        Self::new(mesh.positions(), &masses)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particle_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particle_count == 0
    }

    /// Projected position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        Vec3::new(self.pos_x[i], self.pos_y[i], self.pos_z[i])
    }

    #[inline]
    pub fn set_position(&mut self, i: usize, p: Vec3) {
        self.pos_x[i] = p.x;
        self.pos_y[i] = p.y;
        self.pos_z[i] = p.z;
    }

    /// Moves particle `i` by `delta`.
    #[inline]
    pub fn displace(&mut self, i: usize, delta: Vec3) {
        self.pos_x[i] += delta.x;
        self.pos_y[i] += delta.y;
        self.pos_z[i] += delta.z;
    }

    /// Position of particle `i` at the start of the substep.
    #[inline]
    pub fn previous(&self, i: usize) -> Vec3 {
        Vec3::new(self.prev_x[i], self.prev_y[i], self.prev_z[i])
    }

    #[inline]
    pub fn velocity(&self, i: usize) -> Vec3 {
        Vec3::new(self.vel_x[i], self.vel_y[i], self.vel_z[i])
    }

    #[inline]
    pub fn inv_mass(&self, i: usize) -> f32 {
        self.inv_mass[i]
    }

    /// Returns true if particle `i` cannot be moved by constraints.
    #[inline]
    pub fn is_kinematic(&self, i: usize) -> bool {
        self.inv_mass[i] == 0.0
    }

    /// Save projected positions as the substep start positions.
    pub fn save_previous(&mut self) {
        self.prev_x.copy_from_slice(&self.pos_x);
        self.prev_y.copy_from_slice(&self.pos_y);
        self.prev_z.copy_from_slice(&self.pos_z);
    }

    /// Predict positions: p = x + dt * v + dt² * gravity.
    ///
    /// Kinematic particles keep their substep start position.
    pub fn predict(&mut self, dt: f32, gravity: [f32; 3]) {
        let dt2 = dt * dt;
        for i in 0..self.particle_count {
            if self.inv_mass[i] == 0.0 {
                self.pos_x[i] = self.prev_x[i];
                self.pos_y[i] = self.prev_y[i];
                self.pos_z[i] = self.prev_z[i];
                continue;
            }

            self.pos_x[i] = self.prev_x[i] + dt * self.vel_x[i] + dt2 * gravity[0];
            self.pos_y[i] = self.prev_y[i] + dt * self.vel_y[i] + dt2 * gravity[1];
            self.pos_z[i] = self.prev_z[i] + dt * self.vel_z[i] + dt2 * gravity[2];
        }
    }

    /// Update velocities from position change: v = (p - x) / dt.
    pub fn update_velocities(&mut self, dt: f32) {
        let inv_dt = 1.0 / dt;
        for i in 0..self.particle_count {
            self.vel_x[i] = (self.pos_x[i] - self.prev_x[i]) * inv_dt;
            self.vel_y[i] = (self.pos_y[i] - self.prev_y[i]) * inv_dt;
            self.vel_z[i] = (self.pos_z[i] - self.prev_z[i]) * inv_dt;
        }
    }

    /// Apply velocity damping: v *= (1 - damping).
    pub fn damp_velocities(&mut self, damping: f32) {
        let factor = 1.0 - damping;
        for i in 0..self.particle_count {
            self.vel_x[i] *= factor;
            self.vel_y[i] *= factor;
            self.vel_z[i] *= factor;
        }
    }

    /// Compute total kinetic energy: 0.5 * Σ m_i * ||v_i||² over dynamic particles.
    pub fn kinetic_energy(&self) -> f64 {
        let mut energy = 0.0f64;
        for i in 0..self.particle_count {
            if self.inv_mass[i] == 0.0 {
                continue;
            }
            let vx = self.vel_x[i] as f64;
            let vy = self.vel_y[i] as f64;
            let vz = self.vel_z[i] as f64;
            energy += 0.5 * self.mass[i] as f64 * (vx * vx + vy * vy + vz * vz);
        }
        energy
    }
}
