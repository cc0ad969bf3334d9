//! Axis-aligned boxes for cell bounds, obstacles and volumes

use crate::core::types::Vec3;

/// Axis-aligned bounding box defined by min and max corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Check if point is inside AABB (boundary inclusive)
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y &&
        p.z >= self.min.z && p.z <= self.max.z
    }

    /// Check if two AABBs intersect
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Expand AABB to include point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Bounding box of a point set. Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Aabb> {
        let (first, rest) = points.split_first()?;
        let mut aabb = Aabb::new(*first, *first);
        for p in rest {
            aabb.expand(*p);
        }
        Some(aabb)
    }

    /// The 8 corners. The first four lie on the -X face and the last four
    /// on the +X face, so neighbours along X share `corners()[4..]` with
    /// the next box's `corners()[..4]`.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(aabb.contains_point(Vec3::splat(0.5)));
        assert!(aabb.contains_point(Vec3::ONE));
        assert!(!aabb.contains_point(Vec3::splat(2.0)));
    }

    #[test]
    fn test_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5));
        let c = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_from_points() {
        assert!(Aabb::from_points(&[]).is_none());
        let aabb = Aabb::from_points(&[
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 3.0, 0.0),
        ]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
    }

    #[test]
    fn test_corners_face_order() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let pts = aabb.corners();
        assert!(pts[..4].iter().all(|p| p.x == 0.0));
        assert!(pts[4..].iter().all(|p| p.x == 2.0));

        // Shared face with the neighbour along +X
        let next = Aabb::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(4.0, 1.0, 1.0));
        assert_eq!(&pts[4..], &next.corners()[..4]);
    }
}
