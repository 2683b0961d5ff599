//! # weft-mesh
//!
//! Triangle mesh fixtures with Structure-of-Arrays (SoA) layout and the
//! topology extraction that produces the precomputed arrays the
//! constraint registry consumes.
//!
//! ## Key Types
//!
//! - [`TriangleMesh`]: SoA positions plus a flat triangle index buffer.
//! - [`Topology`]: Edges, interior edges, bending tuples and the one-ring
//!   neighbour map used to build tethers.
//! - Procedural generators for tests and demos (quad grids, octahedra).

pub mod generators;
pub mod mesh;
pub mod topology;

pub use mesh::TriangleMesh;
pub use topology::Topology;
