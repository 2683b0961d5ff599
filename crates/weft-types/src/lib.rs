//! # weft-types
//!
//! Shared types, particle ranges, error types, and solver constants
//! for the weft cloth constraint solver.
//!
//! This crate has zero domain logic: it defines the vocabulary
//! that all other weft crates share.

pub mod constants;
pub mod error;
pub mod range;
pub mod scalar;

pub use error::{WeftError, WeftResult};
pub use range::ParticleRange;
pub use scalar::Scalar;
