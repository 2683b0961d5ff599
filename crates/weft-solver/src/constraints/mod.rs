//! Constraint kernels, one module per family.
//!
//! Kernels are plain structs implementing [`ClothConstraint`](crate::constraint::ClothConstraint);
//! several constraint kinds share a kernel (edge, bending-spring and
//! thin-shell volume are all [`spring::SpringConstraints`]).

pub mod anim_drive;
pub mod axial_spring;
pub mod bending_element;
pub mod long_range;
pub mod self_collision;
pub mod shape;
pub mod spherical;
pub mod spring;
pub mod volume;

pub use anim_drive::AnimDriveConstraint;
pub use axial_spring::AxialSpringConstraints;
pub use bending_element::BendingElementConstraints;
pub use long_range::{LongRangeConstraints, TetherMode};
pub use self_collision::SelfCollisionConstraints;
pub use shape::ShapeConstraints;
pub use spherical::{SphericalBackstopConstraint, SphericalConstraint};
pub use spring::SpringConstraints;
pub use volume::VolumeConstraint;
