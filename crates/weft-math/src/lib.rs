//! # weft-math
//!
//! Geometry primitives for the weft constraint kernels.
//!
//! Provides:
//! - Re-exports of `glam` types (`Vec3`, etc.)
//! - Hinge geometry and the signed dihedral angle used by bending elements
//! - Triangle area and signed tetrahedral volume for area/volume constraints

pub mod geometry;

// Re-export glam types as the canonical math types for weft.
pub use glam::{Vec2, Vec3};

pub use geometry::{signed_dihedral_angle, signed_tet_volume, triangle_area, wrap_angle, Hinge};
