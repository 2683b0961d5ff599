//! Hinge, area and volume geometry.
//!
//! ## Hinge
//!
//! For a shared edge (p0, p1) with wing vertices (pa, pb):
//! ```text
//!        pa
//!       / \
//!      /   \
//!    p0 ─── p1
//!      \   /
//!       \ /
//!        pb
//! ```
//! Each wing is decomposed into a foot point on the edge line,
//! `p0 + t · (p1 - p0)`, and a perpendicular offset from that foot.
//! The signed dihedral angle is the rotation about the edge direction
//! carrying the offset of `pa` onto the offset of `pb`.

use std::f32::consts::PI;

use glam::Vec3;

/// Decomposition of a four-particle hinge around its shared edge.
#[derive(Debug, Clone, Copy)]
pub struct Hinge {
    /// Unit direction of the shared edge, p0 → p1.
    pub axis: Vec3,
    /// Edge parameter of wing a's foot point.
    pub t_a: f32,
    /// Edge parameter of wing b's foot point.
    pub t_b: f32,
    /// Offset of wing a perpendicular to the edge.
    pub perp_a: Vec3,
    /// Offset of wing b perpendicular to the edge.
    pub perp_b: Vec3,
}

impl Hinge {
    /// Decompose the hinge. Returns `None` for a degenerate edge or a
    /// wing lying on the edge line.
    pub fn new(p0: Vec3, p1: Vec3, pa: Vec3, pb: Vec3) -> Option<Self> {
        let edge = p1 - p0;
        let edge_len2 = edge.length_squared();
        if edge_len2 < 1e-12 {
            return None;
        }

        let to_a = pa - p0;
        let to_b = pb - p0;
        let t_a = to_a.dot(edge) / edge_len2;
        let t_b = to_b.dot(edge) / edge_len2;
        let perp_a = to_a - edge * t_a;
        let perp_b = to_b - edge * t_b;

        if perp_a.length_squared() < 1e-12 || perp_b.length_squared() < 1e-12 {
            return None;
        }

        Some(Self {
            axis: edge / edge_len2.sqrt(),
            t_a,
            t_b,
            perp_a,
            perp_b,
        })
    }

    /// Signed angle in `(-π, π]` from `perp_a` to `perp_b` about `axis`.
    pub fn angle(&self) -> f32 {
        let sin = self.perp_a.cross(self.perp_b).dot(self.axis);
        let cos = self.perp_a.dot(self.perp_b);
        sin.atan2(cos)
    }

    /// Gradients of [`Hinge::angle`] with respect to (p0, p1, pa, pb).
    pub fn angle_gradients(&self) -> [Vec3; 4] {
        let g_a = -self.axis.cross(self.perp_a) / self.perp_a.length_squared();
        let g_b = self.axis.cross(self.perp_b) / self.perp_b.length_squared();
        let g_1 = -(g_a * self.t_a) - g_b * self.t_b;
        let g_0 = g_a * (self.t_a - 1.0) + g_b * (self.t_b - 1.0);
        [g_0, g_1, g_a, g_b]
    }
}

/// Signed dihedral angle of the hinge (p0, p1, pa, pb).
///
/// A flat hinge with wings on opposite sides of the edge returns ±π.
/// Degenerate hinges return π.
pub fn signed_dihedral_angle(p0: Vec3, p1: Vec3, pa: Vec3, pb: Vec3) -> f32 {
    Hinge::new(p0, p1, pa, pb).map_or(PI, |hinge| hinge.angle())
}

/// Wraps an angle difference into `(-π, π]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle % (2.0 * PI);
    if wrapped > PI {
        wrapped -= 2.0 * PI;
    } else if wrapped <= -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

/// Area of triangle (a, b, c).
#[inline]
pub fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    0.5 * (b - a).cross(c - a).length()
}

/// Signed volume of the tetrahedron spanned by the origin and triangle (a, b, c).
///
/// Summed over a closed, consistently wound surface this gives the enclosed volume.
#[inline]
pub fn signed_tet_volume(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    a.dot(b.cross(c)) / 6.0
}
