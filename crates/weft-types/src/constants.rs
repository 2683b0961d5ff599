//! Physical constants and solver defaults.

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f32 = 9.81;

/// Default frame timestep (seconds). 1/60th of a second.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Default number of rule passes per substep.
pub const DEFAULT_ITERATIONS: u32 = 4;

/// Default number of substeps per frame.
pub const DEFAULT_SUBSTEPS: u32 = 1;

/// Default self-collision thickness (meters).
pub const DEFAULT_SELF_COLLISION_THICKNESS: f32 = 0.01;

/// Maximum number of kinematic islands a particle is tethered to.
pub const MAX_TETHER_ISLANDS: usize = 4;

/// Compliance of an extended constraint registered at stiffness 1.0.
///
/// Lower stiffness scales compliance up: `alpha = XPBD_BASE_COMPLIANCE / stiffness`.
pub const XPBD_BASE_COMPLIANCE: f32 = 1.0e-7;

/// Epsilon for floating-point comparisons.
pub const EPSILON: f32 = 1.0e-7;

/// Squared-length threshold below which a direction is treated as undefined.
pub const DEGENERATE_LENGTH_SQUARED: f32 = 1.0e-12;
