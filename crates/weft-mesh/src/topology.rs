//! Mesh topology queries.
//!
//! Builds adjacency data structures from the triangle index buffer and
//! extracts the precomputed tuples the constraint registry consumes
//! (edges, bending pairs, bending elements, tether neighbour maps).
//!
//! All containers are ordered so that extraction is deterministic:
//! the registry relaxes constraints in the order it receives them.

use std::collections::{BTreeMap, BTreeSet};

use crate::mesh::TriangleMesh;

/// Precomputed topology information for a triangle mesh.
#[derive(Debug, Clone)]
pub struct Topology {
    /// For each vertex, the list of triangles that contain it.
    pub vertex_triangles: Vec<Vec<u32>>,

    /// Unique edges as `[v_min, v_max]` pairs, sorted.
    pub edges: Vec<[u32; 2]>,

    /// For each edge, the one or two adjacent triangles.
    /// Boundary edges have exactly 1 adjacent triangle.
    pub edge_triangles: Vec<Vec<u32>>,

    /// Interior edges that have exactly 2 adjacent triangles.
    pub interior_edges: Vec<InteriorEdge>,
}

/// An interior (non-boundary) edge with its two adjacent triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteriorEdge {
    /// Index of vertex A of the shared edge.
    pub v0: u32,
    /// Index of vertex B of the shared edge.
    pub v1: u32,
    /// The "wing" vertex of triangle A (not on the edge).
    pub wing_a: u32,
    /// The "wing" vertex of triangle B (not on the edge).
    pub wing_b: u32,
    /// Index of adjacent triangle A.
    pub tri_a: u32,
    /// Index of adjacent triangle B.
    pub tri_b: u32,
}

impl Topology {
    /// Build topology from a triangle mesh.
    pub fn build(mesh: &TriangleMesh) -> Self {
        let vertex_count = mesh.vertex_count();
        let tri_count = mesh.triangle_count();

        let mut vertex_triangles: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];
        for t in 0..tri_count {
            for v in mesh.triangle(t) {
                vertex_triangles[v as usize].push(t as u32);
            }
        }

        // Key: (min_vertex, max_vertex) to canonicalize edge direction
        let mut edge_map: BTreeMap<(u32, u32), Vec<u32>> = BTreeMap::new();
        for t in 0..tri_count {
            let [a, b, c] = mesh.triangle(t);
            for (v0, v1) in [(a, b), (b, c), (c, a)] {
                let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };
                edge_map.entry(key).or_default().push(t as u32);
            }
        }

        let mut edges = Vec::with_capacity(edge_map.len());
        let mut edge_triangles = Vec::with_capacity(edge_map.len());
        let mut interior_edges = Vec::new();

        for ((v0, v1), tris) in edge_map {
            edges.push([v0, v1]);

            if tris.len() == 2 {
                let tri_a = tris[0];
                let tri_b = tris[1];
                interior_edges.push(InteriorEdge {
                    v0,
                    v1,
                    wing_a: find_wing_vertex(mesh, tri_a, v0, v1),
                    wing_b: find_wing_vertex(mesh, tri_b, v0, v1),
                    tri_a,
                    tri_b,
                });
            }

            edge_triangles.push(tris);
        }

        Self {
            vertex_triangles,
            edges,
            edge_triangles,
            interior_edges,
        }
    }

    /// Returns the 1-ring vertex neighborhood of vertex `v`.
    pub fn one_ring(&self, v: u32, mesh: &TriangleMesh) -> BTreeSet<u32> {
        let mut neighbors = BTreeSet::new();
        for &tri in &self.vertex_triangles[v as usize] {
            neighbors.extend(mesh.triangle(tri as usize).into_iter().filter(|&n| n != v));
        }
        neighbors
    }

    /// Point-to-neighbours map over mesh edges, used to build tethers.
    pub fn neighbor_map(&self) -> BTreeMap<u32, BTreeSet<u32>> {
        let mut map: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for &[a, b] in &self.edges {
            map.entry(a).or_default().insert(b);
            map.entry(b).or_default().insert(a);
        }
        map
    }

    /// Springs across every interior edge, joining its two wing vertices.
    pub fn bending_edges(&self) -> Vec<[u32; 2]> {
        let pairs: BTreeSet<[u32; 2]> = self
            .interior_edges
            .iter()
            .map(|ie| ordered_pair(ie.wing_a, ie.wing_b))
            .collect();
        pairs.into_iter().collect()
    }

    /// Four-particle hinges `[v0, v1, wing_a, wing_b]`, one per interior edge.
    pub fn bending_elements(&self) -> Vec<[u32; 4]> {
        self.interior_edges
            .iter()
            .map(|ie| [ie.v0, ie.v1, ie.wing_a, ie.wing_b])
            .collect()
    }

    /// Springs spanning two consecutive bending springs.
    ///
    /// Pairs already joined by a mesh edge or a bending spring are skipped.
    pub fn double_bending_edges(&self) -> Vec<[u32; 2]> {
        let bending = self.bending_edges();
        let mut bending_neighbors: BTreeMap<u32, BTreeSet<u32>> = BTreeMap::new();
        for &[a, b] in &bending {
            bending_neighbors.entry(a).or_default().insert(b);
            bending_neighbors.entry(b).or_default().insert(a);
        }

        let existing: BTreeSet<[u32; 2]> = self.edges.iter().chain(&bending).copied().collect();
        let mut pairs = BTreeSet::new();
        for (&middle, ends) in &bending_neighbors {
            for &a in ends {
                for &b in ends {
                    if a < b && a != middle && b != middle && !existing.contains(&[a, b]) {
                        pairs.insert([a, b]);
                    }
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Returns the number of boundary edges (edges with only 1 adjacent triangle).
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_triangles
            .iter()
            .filter(|tris| tris.len() == 1)
            .count()
    }

    /// Returns true if the mesh is closed (no boundary edges).
    pub fn is_closed(&self) -> bool {
        self.boundary_edge_count() == 0
    }
}

fn ordered_pair(a: u32, b: u32) -> [u32; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Find the vertex in triangle `tri` that is not v0 or v1 (the "wing" vertex).
fn find_wing_vertex(mesh: &TriangleMesh, tri: u32, v0: u32, v1: u32) -> u32 {
    let [a, b, c] = mesh.triangle(tri as usize);
    if a != v0 && a != v1 {
        a
    } else if b != v0 && b != v1 {
        b
    } else {
        c
    }
}
