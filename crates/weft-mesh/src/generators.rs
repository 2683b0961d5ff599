//! Procedural mesh generators for tests and demos.
//!
//! These generators produce deterministic, resolution-configurable meshes
//! with consistent winding order.

use weft_math::Vec3;

use crate::mesh::TriangleMesh;

/// Generates a flat rectangular quad grid in the XY plane.
///
/// The grid spans `[-width/2, width/2]` in X and `[-height/2, height/2]` in Y,
/// centered at the origin at Z=0. Vertices are numbered row by row from the
/// top-left corner.
///
/// # Example
/// ```
/// use weft_mesh::generators::quad_grid;
/// let mesh = quad_grid(2, 2, 1.0, 1.0);
/// assert_eq!(mesh.vertex_count(), 9);  // 3×3 vertices
/// assert_eq!(mesh.triangle_count(), 8); // 2×2 quads × 2 tris each
/// ```
pub fn quad_grid(cols: usize, rows: usize, width: f32, height: f32) -> TriangleMesh {
    let verts_x = cols + 1;
    let verts_y = rows + 1;
    let mut mesh = TriangleMesh::with_capacity(verts_x * verts_y, cols * rows * 2);

    let half_w = width / 2.0;
    let half_h = height / 2.0;

    for j in 0..verts_y {
        for i in 0..verts_x {
            let u = i as f32 / cols as f32;
            let v = j as f32 / rows as f32;
            mesh.push_vertex(Vec3::new(-half_w + u * width, half_h - v * height, 0.0));
        }
    }

    for j in 0..rows {
        for i in 0..cols {
            let top_left = (j * verts_x + i) as u32;
            let top_right = top_left + 1;
            let bot_left = top_left + verts_x as u32;
            let bot_right = bot_left + 1;

            // Upper-left triangle
            mesh.indices.extend_from_slice(&[top_left, bot_left, top_right]);
            // Lower-right triangle
            mesh.indices.extend_from_slice(&[top_right, bot_left, bot_right]);
        }
    }

    mesh
}

/// Generates a closed octahedron centered at the origin.
///
/// Triangles are wound counter-clockwise seen from outside, so the signed
/// enclosed volume is positive: `4/3 · radius³`.
pub fn octahedron(radius: f32) -> TriangleMesh {
    let mut mesh = TriangleMesh::with_capacity(6, 8);
    let px = mesh.push_vertex(Vec3::X * radius);
    let nx = mesh.push_vertex(-Vec3::X * radius);
    let py = mesh.push_vertex(Vec3::Y * radius);
    let ny = mesh.push_vertex(-Vec3::Y * radius);
    let pz = mesh.push_vertex(Vec3::Z * radius);
    let nz = mesh.push_vertex(-Vec3::Z * radius);

    let faces = [
        [px, py, pz],
        [py, nx, pz],
        [nx, ny, pz],
        [ny, px, pz],
        [py, px, nz],
        [nx, py, nz],
        [ny, nx, nz],
        [px, ny, nz],
    ];
    for face in faces {
        mesh.indices.extend_from_slice(&face);
    }

    mesh
}
