//! View frustum for per-cell grass culling

use crate::core::types::{Vec3, Vec4, Mat4};
use super::aabb::Aabb;

/// A plane defined by normal and distance from origin
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance from point to plane (positive = in front)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// View frustum with 6 planes (left, right, bottom, top, near, far)
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix
    /// (Gribb/Hartmann).
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];
        let raw = [
            rows[3] + rows[0], // left
            rows[3] - rows[0], // right
            rows[3] + rows[1], // bottom
            rows[3] - rows[1], // top
            rows[3] + rows[2], // near
            rows[3] - rows[2], // far
        ];
        Self {
            planes: raw.map(Self::normalize_plane),
        }
    }

    /// A frustum that accepts everything
    pub fn unbounded() -> Self {
        Self {
            planes: [Plane::new(Vec3::Z, f32::INFINITY); 6],
        }
    }

    fn normalize_plane(plane: Vec4) -> Plane {
        let normal = plane.truncate();
        let len = normal.length();
        if len > 0.0 {
            Plane::new(normal / len, plane.w / len)
        } else {
            Plane::new(Vec3::Z, f32::INFINITY)
        }
    }

    /// Check if AABB intersects frustum (conservative test)
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // p-vertex: the corner furthest along the plane normal
            let p = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }
}
