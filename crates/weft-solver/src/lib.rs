//! # weft-solver
//!
//! Position-based cloth constraints: the registry that turns precomputed
//! topology into constraint instances, the kernels that relax them, and the
//! binding that installs them into a host engine's init/rule callback ranges.
//!
//! ## Key Types
//!
//! - [`ClothConstraints`]: Constraint registry bound to one particle range
//! - [`ClothConstraint`]: Per-family kernel interface (`init`, `apply`)
//! - [`ConstraintHost`]: The host engine's callback-range interface
//! - [`PbdEvolution`]: Reference host engine driving substeps
//! - [`ParticleBuffer`]: SoA particle storage shared by all constraints
//!
//! ## Substep
//!
//! ```text
//! host.save_previous()
//! for init in active init ranges:   init(particles)
//! host.predict(dt)
//! repeat iterations:
//!     for rule in active rule ranges:   rule(particles, dt)
//! host.update_velocities(dt)
//! ```

pub mod config;
pub mod constraint;
pub mod constraints;
pub mod evolution;
pub mod host;
pub mod particles;
pub mod registry;
pub mod setup;
pub mod spatial_hash;

pub use config::{BendingModel, ClothConfig, EvolutionConfig, VolumeModel};
pub use constraint::{
    AnimationPose, ClothConstraint, ConstraintKind, Formulation, LiveParameter, SharedPose,
};
pub use constraints::long_range::TetherMode;
pub use evolution::{PbdEvolution, SubstepResult};
pub use host::{ConstraintHost, ConstraintInit, ConstraintRule, HostRange};
pub use particles::ParticleBuffer;
pub use registry::{ClothConstraints, SlotInfo};
pub use setup::ClothSetup;
