//! Flower instances and their quad vertex records.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Vertices emitted per flower (one quad).
pub const VERTS_PER_FLOWER: usize = 4;

/// Index pattern drawing one flower quad as two triangles.
pub const FLOWER_QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// One flower head. `radius == 0` is the tombstone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flower {
    /// Center of the flower head (top of the stem).
    pub position: Vec3,
    pub normal: Vec3,
    pub radius: f32,
    /// Stem length.
    pub height: f32,
    pub color: Vec4,
}

impl Flower {
    pub fn new(position: Vec3, normal: Vec3, radius: f32, height: f32, color: Vec4) -> Self {
        Self { position, normal, radius, height, color }
    }

    #[inline]
    pub fn is_removed(&self) -> bool {
        self.radius == 0.0
    }

    #[inline]
    pub fn remove(&mut self) {
        self.radius = 0.0;
    }

    /// Quad corners spanning `radius` in the plane orthogonal to the normal.
    pub fn vertices(&self) -> [FlowerVertex; VERTS_PER_FLOWER] {
        let n = self.normal;
        let mut v1 = Vec3::ZERO;
        v1[min_dim(n)] = 1.0;
        let v2 = self.radius * n.cross(v1).normalize_or_zero();
        let v1 = self.radius * n.cross(v2).normalize_or_zero();
        let color = pack_color(self.color);
        let normal = pack_normal(n);
        let p = self.position;
        [p - v1 - v2, p + v1 - v2, p + v1 + v2, p - v1 + v2]
            .map(|corner| FlowerVertex { position: corner.to_array(), normal, color })
    }
}

/// Axis along which `v` has the smallest magnitude.
fn min_dim(v: Vec3) -> usize {
    let a = v.abs();
    if a.x <= a.y && a.x <= a.z {
        0
    } else if a.y <= a.z {
        1
    } else {
        2
    }
}

/// Unit normal quantized to signed bytes.
fn pack_normal(n: Vec3) -> [i8; 4] {
    let q = |c: f32| (c.clamp(-1.0, 1.0) * 127.0).round() as i8;
    [q(n.x), q(n.y), q(n.z), 0]
}

pub(crate) fn pack_color(c: Vec4) -> [u8; 4] {
    let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [q(c.x), q(c.y), q(c.z), q(c.w)]
}

/// GPU vertex for flowers (20 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlowerVertex {
    pub position: [f32; 3],
    pub normal: [i8; 4],
    pub color: [u8; 4],
}
