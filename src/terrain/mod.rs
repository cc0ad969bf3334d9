//! Terrain collaborator interface.
//!
//! The vegetation field never modifies terrain; it queries heights, normals,
//! water, ground texture weights, obstruction and occlusion through the
//! [`Terrain`] trait. Visibility culling queries occluders through
//! [`Occluders`]. [`HeightField`] is a self-contained implementation of both
//! (flat or noise-generated heights).
//!
//! Grid convention: the terrain has `W x H` vertices. Vertex `(x, y)` sits at
//! `origin + (x * dx, y * dy)`, and cell `(x, y)` covers
//! `[x*dx, (x+1)*dx) x [y*dy, (y+1)*dy)` relative to the origin. Z is up.

pub mod generator;
pub mod heightfield;

pub use generator::{TerrainGenerator, TerrainParams};
pub use heightfield::{HeightField, Obstacle};

use crate::core::types::{Vec2, Vec3};

/// Index of an occluding object owned by the terrain/world.
pub type OccluderId = usize;

/// An upward-facing polygon on attached volumetric geometry (triangle or quad).
#[derive(Clone, Debug, PartialEq)]
pub struct SurfacePolygon {
    pub points: Vec<Vec3>,
}

impl SurfacePolygon {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }

    /// Unit normal from the first three points (counter-clockwise = up).
    pub fn normal(&self) -> Vec3 {
        let p = &self.points;
        (p[1] - p[0]).cross(p[2] - p[0]).normalize_or_zero()
    }

    /// Area of a planar triangle or quad.
    pub fn area(&self) -> f32 {
        let p = &self.points;
        let mut area = 0.5 * (p[1] - p[0]).cross(p[2] - p[0]).length();
        if p.len() == 4 {
            area += 0.5 * (p[2] - p[0]).cross(p[3] - p[0]).length();
        }
        area
    }
}

/// Height-field terrain queried by the vegetation field.
pub trait Terrain: Sync {
    /// Vertex counts `(W, H)`.
    fn dims(&self) -> (usize, usize);

    /// World XY of vertex `(0, 0)`.
    fn origin(&self) -> Vec2;

    /// Cell extent `(dx, dy)`.
    fn cell_size(&self) -> Vec2;

    /// Vertex height.
    fn height(&self, x: usize, y: usize) -> f32;

    /// Smoothed per-vertex normal.
    fn vertex_normal(&self, x: usize, y: usize) -> Vec3;

    /// Flat normal of cell `(x, y)`.
    fn surface_normal(&self, x: usize, y: usize) -> Vec3 {
        self.vertex_normal(x, y)
    }

    /// Lowest z of anything drawn in cell `(x, y)`.
    fn min_height(&self, x: usize, y: usize) -> f32 {
        self.height(x, y)
    }

    /// Highest z of the terrain and everything attached to it.
    fn max_height(&self) -> f32;

    /// Water surface at a vertex, if there is water.
    fn water_level(&self, _x: usize, _y: usize) -> Option<f32> {
        None
    }

    /// Vertices excluded from drawing.
    fn is_disabled(&self, _x: usize, _y: usize) -> bool {
        false
    }

    /// Whether the ground texture class is in use at all. When false no
    /// height-field grass is placed.
    fn grass_texture_enabled(&self) -> bool {
        true
    }

    /// Blend weight of the "ground" texture class at a point: 1 = ground,
    /// 0 = another class, in between = blended. `None` when the terrain is
    /// textured uniformly with ground.
    fn ground_weight(&self, _pos: Vec3) -> Option<f32> {
        None
    }

    /// Top of the coarse collision column at a vertex. Above the mesh height
    /// means something solid may obstruct grass there.
    fn obstruction_height(&self, x: usize, y: usize) -> f32 {
        self.height(x, y)
    }

    /// Exact obstruction test for a blade anchor.
    fn point_obstructed(&self, _pos: Vec3) -> bool {
        false
    }

    /// Line-of-sight test: true if solid geometry blocks the segment.
    fn segment_occluded(&self, _start: Vec3, _end: Vec3) -> bool {
        false
    }

    /// True if any volumetric surface polygons are attached.
    fn has_surface_polygons(&self) -> bool {
        false
    }

    /// Surface polygons overlapping the footprint of vertex `(x, y)`.
    fn surface_polygons(&self, _x: usize, _y: usize) -> &[SurfacePolygon] {
        &[]
    }

    /// True if the world has solid volumetric terrain.
    fn has_volume(&self) -> bool {
        false
    }

    /// Point lies inside solid volumetric terrain.
    fn inside_volume(&self, _pos: Vec3) -> bool {
        false
    }

    /// Ambient light reaching a point of volumetric terrain, 0..1.
    fn ambient_light(&self, _pos: Vec3) -> f32 {
        1.0
    }

    /// Extra flower weight per vertex, 0..1.
    fn flower_weight(&self, _x: usize, _y: usize) -> f32 {
        1.0
    }

    /// World X of vertex column `x`.
    fn world_x(&self, x: i32) -> f32 {
        self.origin().x + x as f32 * self.cell_size().x
    }

    /// World Y of vertex row `y`.
    fn world_y(&self, y: i32) -> f32 {
        self.origin().y + y as f32 * self.cell_size().y
    }

    /// Cell containing a world point (may be out of range).
    fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        let o = self.origin();
        let d = self.cell_size();
        (((x - o.x) / d.x).floor() as i32, ((y - o.y) / d.y).floor() as i32)
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        let (w, h) = self.dims();
        x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h
    }

    /// True if the point's XY lies over the mesh.
    fn is_over(&self, pos: Vec3) -> bool {
        let (x, y) = self.cell_of(pos.x, pos.y);
        self.in_bounds(x, y)
    }

    /// World position of vertex `(x, y)`.
    fn vertex_pos(&self, x: usize, y: usize) -> Vec3 {
        Vec3::new(self.world_x(x as i32), self.world_y(y as i32), self.height(x, y))
    }

    /// Bilinear height at a world XY, clamped to the mesh.
    fn interpolate_height(&self, x: f32, y: f32) -> f32 {
        let (w, h) = self.dims();
        let (x0, y0, tx, ty) = bilinear_cell(self, x, y, w, h);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let a = self.height(x0, y0) * (1.0 - tx) + self.height(x1, y0) * tx;
        let b = self.height(x0, y1) * (1.0 - tx) + self.height(x1, y1) * tx;
        a * (1.0 - ty) + b * ty
    }

    /// Bilinear vertex normal at a world XY; +Z outside the mesh.
    fn interpolate_normal(&self, pos: Vec3) -> Vec3 {
        let (w, h) = self.dims();
        let (cx, cy) = self.cell_of(pos.x, pos.y);
        if !self.in_bounds(cx, cy) || !self.in_bounds(cx + 1, cy + 1) {
            return Vec3::Z;
        }
        let (x0, y0, tx, ty) = bilinear_cell(self, pos.x, pos.y, w, h);
        self.vertex_normal(x0, y0) * ((1.0 - tx) * (1.0 - ty))
            + self.vertex_normal(x0, y0 + 1) * ((1.0 - tx) * ty)
            + self.vertex_normal(x0 + 1, y0) * (tx * (1.0 - ty))
            + self.vertex_normal(x0 + 1, y0 + 1) * (tx * ty)
    }

    /// Point is below the water surface of its cell.
    fn is_underwater(&self, pos: Vec3) -> bool {
        let (x, y) = self.cell_of(pos.x, pos.y);
        if !self.in_bounds(x, y) {
            return false;
        }
        matches!(self.water_level(x as usize, y as usize), Some(level) if pos.z < level)
    }
}

/// Lower-left vertex and fractional offsets for bilinear lookups.
fn bilinear_cell<T: Terrain + ?Sized>(t: &T, x: f32, y: f32, w: usize, h: usize) -> (usize, usize, f32, f32) {
    let o = t.origin();
    let d = t.cell_size();
    let fx = ((x - o.x) / d.x).clamp(0.0, (w - 1) as f32);
    let fy = ((y - o.y) / d.y).clamp(0.0, (h - 1) as f32);
    let x0 = (fx.floor() as usize).min(w.saturating_sub(2));
    let y0 = (fy.floor() as usize).min(h.saturating_sub(2));
    (x0, y0, fx - x0 as f32, fy - y0 as f32)
}

/// Occluding objects consulted by visibility culling.
pub trait Occluders {
    /// The occluder was removed or switched off since it was memoized.
    fn occluder_disabled(&self, id: OccluderId) -> bool;

    /// Occluder `id` blocks every segment from `eye` to `points`.
    fn occludes_all(&self, id: OccluderId, eye: Vec3, points: &[Vec3]) -> bool;

    /// Find an occluder hiding every point from `eye`, trying `hint` first.
    fn find_occluder(&self, eye: Vec3, points: &[Vec3], hint: Option<OccluderId>) -> Option<OccluderId>;
}
