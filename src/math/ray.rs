//! Line-of-sight segments against boxes

use crate::core::types::Vec3;
use super::aabb::Aabb;

/// A ray from `origin` along `direction`; `t = 1` is `origin + direction`.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    /// Per-axis 1/direction for the slab test
    inv_direction: Vec3,
}

impl Ray {
    /// `direction` need not be normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction, inv_direction: direction.recip() }
    }

    /// Ray spanning `start` (t = 0) to `end` (t = 1)
    pub fn between(start: Vec3, end: Vec3) -> Self {
        Self::new(start, end - start)
    }

    /// Slab test. Returns the entry and exit parameters, with entry clamped
    /// to 0, or `None` if the box is missed or entirely behind the origin.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> Option<(f32, f32)> {
        let t1 = (aabb.min - self.origin) * self.inv_direction;
        let t2 = (aabb.max - self.origin) * self.inv_direction;
        let t_near = t1.min(t2).max_element();
        let t_far = t1.max(t2).min_element();
        (t_near <= t_far && t_far >= 0.0).then(|| (t_near.max(0.0), t_far))
    }

    /// The segment `t in [0, 1]` touches the box.
    pub fn segment_hits_aabb(&self, aabb: &Aabb) -> bool {
        self.intersects_aabb(aabb).is_some_and(|(t_near, _)| t_near <= 1.0)
    }
}
