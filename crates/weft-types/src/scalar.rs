//! Scalar type alias for the simulation.

/// The floating-point type used throughout the solver.
///
/// Particle buffers, rest lengths and stiffness values are all `f32`,
/// matching the host engine's particle storage.
pub type Scalar = f32;
