//! Constraint trait: the interface every cloth constraint family implements.
//!
//! A family owns its own topology tuples and exposes an optional `init`
//! phase (run once per substep before integration) and an `apply` phase
//! (one relaxation pass, run once per solver iteration).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use weft_math::Vec3;
use weft_types::constants::XPBD_BASE_COMPLIANCE;
use weft_types::ParticleRange;

use crate::particles::ParticleBuffer;

/// The closed set of constraint families a registry can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    EdgeDistance,
    BendingSpring,
    BendingElement,
    AreaSpring,
    VolumeThinShell,
    VolumeTet,
    LongRangeTether,
    MaxDistanceSphere,
    BackstopSphere,
    AnimDrive,
    ShapeTarget,
    SelfCollisionSpring,
}

impl ConstraintKind {
    /// Stable name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::EdgeDistance => "edge_distance",
            Self::BendingSpring => "bending_spring",
            Self::BendingElement => "bending_element",
            Self::AreaSpring => "area_spring",
            Self::VolumeThinShell => "volume_thin_shell",
            Self::VolumeTet => "volume_tet",
            Self::LongRangeTether => "long_range_tether",
            Self::MaxDistanceSphere => "max_distance_sphere",
            Self::BackstopSphere => "backstop_sphere",
            Self::AnimDrive => "anim_drive",
            Self::ShapeTarget => "shape_target",
            Self::SelfCollisionSpring => "self_collision_spring",
        }
    }
}

/// How a constraint family relaxes its tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Formulation {
    /// Direct positional projection scaled by stiffness. No history.
    #[default]
    Standard,
    /// Compliance-based projection accumulating a Lagrange multiplier per
    /// tuple. The multipliers are reset by `init` every substep.
    Extended,
}

impl Formulation {
    pub fn from_extended(use_extended: bool) -> Self {
        if use_extended {
            Self::Extended
        } else {
            Self::Standard
        }
    }
}

/// A constraint family operating on the shared particle buffer.
///
/// The host calls, per substep:
///
/// ```text
/// if constraint.has_init() { constraint.init(particles) }
/// ...integration...
/// for each iteration {
///     constraint.update_live_parameters();
///     constraint.apply(particles, dt);
/// }
/// ```
pub trait ClothConstraint {
    /// Formulation the family was built with.
    fn formulation(&self) -> Formulation {
        Formulation::Standard
    }

    /// Whether the family declares an init phase.
    ///
    /// Every extended family has one to reset its multipliers.
    fn has_init(&self) -> bool {
        self.formulation() == Formulation::Extended
    }

    /// Recompute per-substep auxiliary state.
    fn init(&mut self, particles: &ParticleBuffer) {
        let _ = particles;
    }

    /// Re-read live parameters (radius multiplier, drive stiffness) and
    /// stamp their clamped values ahead of the next `apply`.
    fn update_live_parameters(&mut self) {}

    /// Perform one relaxation pass over every tuple.
    fn apply(&mut self, particles: &mut ParticleBuffer, dt: f32);

    /// Number of active tuples after kinematic stripping.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A constraint shared between the registry and the host's callbacks.
pub type SharedConstraint = Rc<RefCell<dyn ClothConstraint>>;

/// A scalar the caller may change between substeps.
///
/// The registry keeps one handle and the constraint another; the constraint
/// reads and clamps the value in `update_live_parameters`.
#[derive(Debug, Clone, Default)]
pub struct LiveParameter(Rc<Cell<f32>>);

impl LiveParameter {
    pub fn new(value: f32) -> Self {
        Self(Rc::new(Cell::new(value)))
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.0.get()
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.0.set(value);
    }
}

/// Animated reference pose, indexed by global particle index.
///
/// Refreshed by the caller once per frame or substep; constraints only read it.
#[derive(Debug, Clone, Default)]
pub struct AnimationPose {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
}

impl AnimationPose {
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>) -> Self {
        Self { positions, normals }
    }

    /// Number of particles the pose covers.
    pub fn len(&self) -> usize {
        self.positions.len().min(self.normals.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Panics if the pose no longer covers every particle of `range`.
    #[inline]
    pub fn assert_covers(&self, range: ParticleRange) {
        assert!(
            self.len() >= range.end(),
            "Animation pose covers {} particles, range needs {}",
            self.len(),
            range.end()
        );
    }

    /// Wraps the pose for sharing with constraints.
    pub fn shared(self) -> SharedPose {
        Rc::new(RefCell::new(self))
    }
}

/// Animation pose shared between the caller and pose-driven constraints.
///
/// The pose is indexed by global particle index. A refresh must keep it at
/// least as long as the end of every range that reads it.
pub type SharedPose = Rc<RefCell<AnimationPose>>;

/// Time-scaled compliance `alpha / dt²` for an extended constraint.
#[inline]
pub fn xpbd_alpha_tilde(stiffness: f32, dt: f32) -> f32 {
    XPBD_BASE_COMPLIANCE / (stiffness * dt * dt)
}

/// Returns true if every particle of the tuple is kinematic.
#[inline]
pub fn is_fully_kinematic(particles: &ParticleBuffer, tuple: &[u32]) -> bool {
    tuple.iter().all(|&i| particles.is_kinematic(i as usize))
}
