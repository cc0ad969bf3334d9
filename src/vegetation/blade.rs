//! Grass blade instances and their vertex records.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Vertices emitted per blade (one triangle).
pub const VERTS_PER_BLADE: usize = 3;

/// One procedurally placed grass blade.
///
/// A zero `dir` is the tombstone: the blade is logically removed but keeps
/// its slot so every cell's index range stays valid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GrassBlade {
    /// Base anchor point.
    pub position: Vec3,
    /// Lean direction; its length is the blade length.
    pub dir: Vec3,
    /// Face normal.
    pub normal: Vec3,
    pub color: [u8; 3],
    /// Blade width.
    pub width: f32,
    /// Anchored on the height-field (vs. a volumetric surface polygon).
    pub on_mesh: bool,
}

impl GrassBlade {
    pub fn new(position: Vec3, dir: Vec3, normal: Vec3, color: [u8; 3], width: f32, on_mesh: bool) -> Self {
        Self { position, dir, normal, color, width, on_mesh }
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.dir == Vec3::ZERO
    }

    /// Tombstone this blade.
    #[inline]
    pub fn remove(&mut self) {
        self.dir = Vec3::ZERO;
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.dir.length()
    }

    /// Fold `other` into this blade for a coarser LOD level.
    ///
    /// Positions are averaged, orientations and lengths are averaged
    /// independently, widths add up so the covered area is preserved.
    /// Colors are left alone.
    pub fn merge(&mut self, other: &GrassBlade) {
        self.position = (self.position + other.position) * 0.5;
        let (len1, len2) = (self.dir.length(), other.dir.length());
        self.dir = (self.dir.normalize_or_zero() + other.dir.normalize_or_zero()).normalize_or_zero()
            * (0.5 * (len1 + len2));
        self.normal = (self.normal + other.normal).normalize_or_zero();
        self.width += other.width;
    }

    /// Triangle for this blade: two base corners spread across the blade
    /// plane and a tip raised by `tip_raise`. A removed blade collapses to
    /// a degenerate triangle at its anchor.
    pub fn vertices(&self, shading_normal: Vec3, tip_raise: f32) -> [GrassVertex; VERTS_PER_BLADE] {
        let base = self.position;
        let color = [self.color[0], self.color[1], self.color[2], 255];
        if self.is_removed() {
            return [GrassVertex::new(base, shading_normal, color); VERTS_PER_BLADE];
        }
        let tip = base + self.dir + Vec3::new(0.0, 0.0, tip_raise);
        let binormal = self.dir.cross(self.normal).normalize_or_zero();
        let delta = binormal * (0.5 * self.width);
        [
            GrassVertex::new(base - delta, shading_normal, color),
            GrassVertex::new(base + delta, shading_normal, color),
            GrassVertex::new(tip, shading_normal, color),
        ]
    }
}

/// GPU vertex for grass (28 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GrassVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [u8; 4],
}

impl GrassVertex {
    pub fn new(position: Vec3, normal: Vec3, color: [u8; 4]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blade(x: f32, len: f32, width: f32) -> GrassBlade {
        GrassBlade::new(Vec3::new(x, 0.0, 0.0), Vec3::Z * len, Vec3::X, [10, 200, 30], width, true)
    }

    #[test]
    fn test_grass_vertex_size() {
        assert_eq!(std::mem::size_of::<GrassVertex>(), 28);
        let v = GrassVertex::zeroed();
        assert_eq!(bytemuck::bytes_of(&v).len(), 28);
    }

    #[test]
    fn test_tombstone() {
        let mut b = blade(0.0, 0.02, 0.002);
        assert!(!b.is_removed());
        b.remove();
        assert!(b.is_removed());
        assert_eq!(b.length(), 0.0);
        // Removal keeps everything else
        assert_eq!(b.width, 0.002);
    }

    #[test]
    fn test_merge_preserves_width_and_averages() {
        let mut a = blade(0.0, 0.02, 0.002);
        let mut b = blade(1.0, 0.04, 0.003);
        b.dir = Vec3::new(0.04, 0.0, 0.0);
        b.normal = Vec3::Y;
        a.merge(&b);
        assert_eq!(a.position, Vec3::new(0.5, 0.0, 0.0));
        assert!((a.width - 0.005).abs() < 1e-7);
        assert!((a.length() - 0.03).abs() < 1e-6);
        let expected_dir = Vec3::new(1.0, 0.0, 1.0).normalize();
        assert!((a.dir.normalize() - expected_dir).length() < 1e-5);
        assert!((a.normal.length() - 1.0).abs() < 1e-5);
        assert_eq!(a.color, [10, 200, 30]);
    }

    #[test]
    fn test_vertices_span_width() {
        let b = blade(0.0, 0.02, 0.004);
        let verts = b.vertices(Vec3::Z, 0.001);
        let p0 = Vec3::from_array(verts[0].position);
        let p1 = Vec3::from_array(verts[1].position);
        let tip = Vec3::from_array(verts[2].position);
        assert!(((p1 - p0).length() - 0.004).abs() < 1e-6);
        assert!((tip.z - 0.021).abs() < 1e-6);
        assert_eq!(verts[2].color, [10, 200, 30, 255]);
    }

    #[test]
    fn test_removed_blade_is_degenerate() {
        let mut b = blade(2.0, 0.02, 0.004);
        b.remove();
        let verts = b.vertices(Vec3::Z, 0.001);
        assert!(verts.iter().all(|v| v.position == [2.0, 0.0, 0.0]));
    }
}
