//! Shape targeting: pulls particles toward the pose positions.

use weft_types::ParticleRange;

use crate::constraint::{ClothConstraint, SharedPose};
use crate::particles::ParticleBuffer;

#[derive(Debug, Clone)]
pub struct ShapeConstraints {
    range: ParticleRange,
    pose: SharedPose,
    stiffness: f32,
}

impl ShapeConstraints {
    pub fn new(range: ParticleRange, pose: SharedPose, stiffness: f32) -> Self {
        Self {
            range,
            pose,
            stiffness,
        }
    }

    pub fn stiffness(&self) -> f32 {
        self.stiffness
    }
}

impl ClothConstraint for ShapeConstraints {
    fn apply(&mut self, particles: &mut ParticleBuffer, _dt: f32) {
        let pose = self.pose.borrow();
        pose.assert_covers(self.range);
        for index in self.range.indices() {
            if particles.is_kinematic(index) {
                continue;
            }
            let p = particles.position(index);
            particles.set_position(index, p + (pose.positions[index] - p) * self.stiffness);
        }
    }

    fn len(&self) -> usize {
        self.range.count
    }
}
