//! Precomputed inputs a registry is configured from.
//!
//! A [`ClothSetup`] bundles the topology arrays and the per-particle weight
//! maps of one cloth. Indices are global particle indices; weight maps are
//! indexed locally (one entry per particle of the range).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use weft_mesh::{Topology, TriangleMesh};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClothSetup {
    pub surface_elements: Vec<[u32; 3]>,
    pub bending_edges: Vec<[u32; 2]>,
    pub bending_elements: Vec<[u32; 4]>,
    pub double_bending_edges: Vec<[u32; 2]>,
    pub neighbor_map: BTreeMap<u32, BTreeSet<u32>>,
    pub disabled_collision_pairs: BTreeSet<[u32; 2]>,

    // ─── Weight maps (local index) ───
    pub max_distances: Option<Vec<f32>>,
    pub backstop_distances: Option<Vec<f32>>,
    pub backstop_radii: Option<Vec<f32>>,
    pub anim_drive_multipliers: Option<Vec<f32>>,
}

impl ClothSetup {
    /// Extract every topology array from a mesh whose vertex `i` is particle `i`.
    pub fn from_mesh(mesh: &TriangleMesh) -> Self {
        let topology = Topology::build(mesh);
        Self {
            surface_elements: mesh.triangles(),
            bending_edges: topology.bending_edges(),
            bending_elements: topology.bending_elements(),
            double_bending_edges: topology.double_bending_edges(),
            neighbor_map: topology.neighbor_map(),
            ..Default::default()
        }
    }

    /// Shift every topology index by `offset`, for a cloth whose particles
    /// start at `offset` in the shared buffer.
    pub fn with_offset(mut self, offset: u32) -> Self {
        let shift = |v: u32| v + offset;
        for tri in &mut self.surface_elements {
            *tri = tri.map(shift);
        }
        for edge in self.bending_edges.iter_mut().chain(&mut self.double_bending_edges) {
            *edge = edge.map(shift);
        }
        for element in &mut self.bending_elements {
            *element = element.map(shift);
        }
        self.neighbor_map = self
            .neighbor_map
            .into_iter()
            .map(|(v, ring)| (shift(v), ring.into_iter().map(shift).collect()))
            .collect();
        self.disabled_collision_pairs = self
            .disabled_collision_pairs
            .into_iter()
            .map(|pair| pair.map(shift))
            .collect();
        self
    }

    pub fn with_max_distances(mut self, max_distances: Vec<f32>) -> Self {
        self.max_distances = Some(max_distances);
        self
    }

    pub fn with_backstop(mut self, distances: Vec<f32>, radii: Vec<f32>) -> Self {
        self.backstop_distances = Some(distances);
        self.backstop_radii = Some(radii);
        self
    }

    pub fn with_anim_drive_multipliers(mut self, multipliers: Vec<f32>) -> Self {
        self.anim_drive_multipliers = Some(multipliers);
        self
    }

    pub fn with_disabled_collision_pairs(mut self, pairs: BTreeSet<[u32; 2]>) -> Self {
        self.disabled_collision_pairs = pairs;
        self
    }
}
