//! Soft drive toward the animated pose.

use weft_types::ParticleRange;

use crate::constraint::{ClothConstraint, LiveParameter, SharedPose};
use crate::particles::ParticleBuffer;

/// Pulls each particle a fraction `stiffness × multiplier` of the way toward
/// its animated position per pass.
#[derive(Debug, Clone)]
pub struct AnimDriveConstraint {
    range: ParticleRange,
    pose: SharedPose,
    /// Per-particle multiplier, indexed locally.
    multipliers: Vec<f32>,
    stiffness_source: LiveParameter,
    spring_stiffness: f32,
}

impl AnimDriveConstraint {
    pub fn new(range: ParticleRange, pose: SharedPose, multipliers: Vec<f32>, stiffness: LiveParameter) -> Self {
        debug_assert_eq!(multipliers.len(), range.count);
        let spring_stiffness = stiffness.get().clamp(0.0, 1.0);
        Self {
            range,
            pose,
            multipliers,
            stiffness_source: stiffness,
            spring_stiffness,
        }
    }

    /// Stamp the stiffness directly, clamped to `[0, 1]`.
    pub fn set_spring_stiffness(&mut self, stiffness: f32) {
        self.spring_stiffness = stiffness.clamp(0.0, 1.0);
    }

    pub fn spring_stiffness(&self) -> f32 {
        self.spring_stiffness
    }
}

impl ClothConstraint for AnimDriveConstraint {
    fn update_live_parameters(&mut self) {
        self.set_spring_stiffness(self.stiffness_source.get());
    }

    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        if self.spring_stiffness == 0.0 {
            return;
        }
        let pose = self.pose.borrow();
        pose.assert_covers(self.range);
        for (local, index) in self.range.indices().enumerate() {
            if particles.is_kinematic(index) {
                continue;
            }
            let weight = (self.spring_stiffness * self.multipliers[local]).clamp(0.0, 1.0);
            let p = particles.position(index);
            particles.set_position(index, p + (pose.positions[index] - p) * weight);
        }
    }

    fn len(&self) -> usize {
        self.range.count
    }
}
