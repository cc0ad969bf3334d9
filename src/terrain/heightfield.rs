//! In-memory height-field terrain with water, obstacles and volumetric extras.

use glam::{Vec2, Vec3};

use super::{OccluderId, Occluders, SurfacePolygon, Terrain};
use crate::math::{Aabb, Ray};

/// Solid box that blocks light, grass placement and line of sight.
#[derive(Clone, Copy, Debug)]
pub struct Obstacle {
    pub bounds: Aabb,
    pub disabled: bool,
}

/// Ground texture gives way to another class above `max_z`, blended over
/// `blend` height units.
#[derive(Clone, Copy, Debug)]
struct GroundBand {
    max_z: f32,
    blend: f32,
}

/// Regular vertex grid terrain implementing [`Terrain`] and [`Occluders`].
#[derive(Clone, Debug)]
pub struct HeightField {
    width: usize,
    height: usize,
    origin: Vec2,
    cell_size: Vec2,
    heights: Vec<f32>,
    vertex_normals: Vec<Vec3>,
    surface_normals: Vec<Vec3>,
    water: Option<Vec<f32>>,
    disabled: Vec<bool>,
    ground_band: Option<GroundBand>,
    grass_texture: bool,
    obstacles: Vec<Obstacle>,
    polygons: Vec<Vec<SurfacePolygon>>,
    has_polygons: bool,
    volumes: Vec<Aabb>,
    ambient: f32,
}

impl HeightField {
    /// Flat terrain at height `z`.
    pub fn flat(width: usize, height: usize, origin: Vec2, cell_size: Vec2, z: f32) -> Self {
        assert!(width >= 2 && height >= 2, "height-field needs at least 2x2 vertices");
        assert!(cell_size.x > 0.0 && cell_size.y > 0.0);
        let n = width * height;
        Self {
            width,
            height,
            origin,
            cell_size,
            heights: vec![z; n],
            vertex_normals: vec![Vec3::Z; n],
            surface_normals: vec![Vec3::Z; n],
            water: None,
            disabled: vec![false; n],
            ground_band: None,
            grass_texture: true,
            obstacles: Vec::new(),
            polygons: vec![Vec::new(); n],
            has_polygons: false,
            volumes: Vec::new(),
            ambient: 1.0,
        }
    }

    #[inline]
    fn idx(&self, x: usize, y: usize) -> usize {
        assert!(x < self.width && y < self.height, "vertex ({x}, {y}) out of range");
        y * self.width + x
    }

    /// Set one vertex height. Call [`recompute_normals`](Self::recompute_normals) afterwards.
    pub fn set_height(&mut self, x: usize, y: usize, z: f32) {
        let i = self.idx(x, y);
        self.heights[i] = z;
    }

    /// Rebuild vertex and cell normals from the heights.
    pub fn recompute_normals(&mut self) {
        let (w, h) = (self.width, self.height);
        let (dx, dy) = (self.cell_size.x, self.cell_size.y);
        for y in 0..h {
            for x in 0..w {
                let (xl, xr) = (x.saturating_sub(1), (x + 1).min(w - 1));
                let (yl, yr) = (y.saturating_sub(1), (y + 1).min(h - 1));
                let gx = (self.heights[y * w + xr] - self.heights[y * w + xl]) / ((xr - xl) as f32 * dx);
                let gy = (self.heights[yr * w + x] - self.heights[yl * w + x]) / ((yr - yl) as f32 * dy);
                self.vertex_normals[y * w + x] = Vec3::new(-gx, -gy, 1.0).normalize();

                self.surface_normals[y * w + x] = if x + 1 < w && y + 1 < h {
                    let h00 = self.heights[y * w + x];
                    let sx = (self.heights[y * w + x + 1] - h00) / dx;
                    let sy = (self.heights[(y + 1) * w + x] - h00) / dy;
                    Vec3::new(-sx, -sy, 1.0).normalize()
                } else {
                    self.vertex_normals[y * w + x]
                };
            }
        }
    }

    /// Uniform water surface over the whole grid.
    pub fn set_water_level(&mut self, level: f32) {
        self.water = Some(vec![level; self.width * self.height]);
    }

    /// Water surface at one vertex (creates a dry water table if needed).
    pub fn set_vertex_water(&mut self, x: usize, y: usize, level: f32) {
        let i = self.idx(x, y);
        let table = self.water.get_or_insert_with(|| vec![f32::NEG_INFINITY; self.width * self.height]);
        table[i] = level;
    }

    pub fn disable_vertex(&mut self, x: usize, y: usize) {
        let i = self.idx(x, y);
        self.disabled[i] = true;
    }

    /// Ground texture fades out between `max_z` and `max_z + blend`.
    pub fn set_ground_band(&mut self, max_z: f32, blend: f32) {
        self.ground_band = Some(GroundBand { max_z, blend: blend.max(f32::EPSILON) });
    }

    pub fn set_grass_texture_enabled(&mut self, enabled: bool) {
        self.grass_texture = enabled;
    }

    /// Add a solid box; returns its occluder id.
    pub fn add_obstacle(&mut self, bounds: Aabb) -> OccluderId {
        self.obstacles.push(Obstacle { bounds, disabled: false });
        self.obstacles.len() - 1
    }

    pub fn set_obstacle_disabled(&mut self, id: OccluderId, disabled: bool) {
        self.obstacles[id].disabled = disabled;
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Attach an upward-facing volumetric polygon; registered with every
    /// vertex whose footprint its bounds overlap.
    pub fn add_surface_polygon(&mut self, polygon: SurfacePolygon) {
        let Some(bounds) = Aabb::from_points(&polygon.points) else {
            return;
        };
        let half = self.cell_size * 0.5;
        let (x0, y0) = self.cell_of(bounds.min.x + half.x, bounds.min.y + half.y);
        let (x1, y1) = self.cell_of(bounds.max.x + half.x, bounds.max.y + half.y);
        for y in y0.max(0)..=y1.min(self.height as i32 - 1) {
            for x in x0.max(0)..=x1.min(self.width as i32 - 1) {
                let i = self.idx(x as usize, y as usize);
                self.polygons[i].push(polygon.clone());
            }
        }
        self.has_polygons = true;
    }

    /// Add a solid volumetric region grass must not grow inside.
    pub fn add_solid_volume(&mut self, bounds: Aabb) {
        self.volumes.push(bounds);
    }

    pub fn set_ambient_light(&mut self, ambient: f32) {
        self.ambient = ambient;
    }

    pub fn lowest(&self) -> f32 {
        self.heights.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_height_value(&self) -> f32 {
        self.heights.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    fn vertex_footprint_contains(&self, bounds: &Aabb, x: usize, y: usize) -> bool {
        let p = self.vertex_pos(x, y);
        p.x + self.cell_size.x >= bounds.min.x && p.x <= bounds.max.x &&
        p.y + self.cell_size.y >= bounds.min.y && p.y <= bounds.max.y
    }

    fn live_obstacles(&self) -> impl Iterator<Item = (OccluderId, &Obstacle)> {
        self.obstacles.iter().enumerate().filter(|(_, o)| !o.disabled)
    }
}

impl Terrain for HeightField {
    fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn origin(&self) -> Vec2 {
        self.origin
    }

    fn cell_size(&self) -> Vec2 {
        self.cell_size
    }

    fn height(&self, x: usize, y: usize) -> f32 {
        self.heights[self.idx(x, y)]
    }

    fn vertex_normal(&self, x: usize, y: usize) -> Vec3 {
        self.vertex_normals[self.idx(x, y)]
    }

    fn surface_normal(&self, x: usize, y: usize) -> Vec3 {
        self.surface_normals[self.idx(x, y)]
    }

    fn min_height(&self, x: usize, y: usize) -> f32 {
        let (x1, y1) = ((x + 1).min(self.width - 1), (y + 1).min(self.height - 1));
        [(x, y), (x1, y), (x, y1), (x1, y1)]
            .iter()
            .map(|&(cx, cy)| self.height(cx, cy))
            .fold(f32::INFINITY, f32::min)
    }

    fn max_height(&self) -> f32 {
        let mut z = self.max_height_value();
        for obstacle in &self.obstacles {
            z = z.max(obstacle.bounds.max.z);
        }
        for poly in self.polygons.iter().flatten() {
            for p in &poly.points {
                z = z.max(p.z);
            }
        }
        z
    }

    fn water_level(&self, x: usize, y: usize) -> Option<f32> {
        let level = self.water.as_ref()?[self.idx(x, y)];
        level.is_finite().then_some(level)
    }

    fn is_disabled(&self, x: usize, y: usize) -> bool {
        self.disabled[self.idx(x, y)]
    }

    fn grass_texture_enabled(&self) -> bool {
        self.grass_texture
    }

    fn ground_weight(&self, pos: Vec3) -> Option<f32> {
        let band = self.ground_band?;
        Some((1.0 - (pos.z - band.max_z) / band.blend).clamp(0.0, 1.0))
    }

    fn obstruction_height(&self, x: usize, y: usize) -> f32 {
        let mut top = self.height(x, y);
        for (_, obstacle) in self.live_obstacles() {
            if self.vertex_footprint_contains(&obstacle.bounds, x, y) {
                top = top.max(obstacle.bounds.max.z);
            }
        }
        top
    }

    fn point_obstructed(&self, pos: Vec3) -> bool {
        self.live_obstacles().any(|(_, o)| o.bounds.contains_point(pos))
    }

    fn segment_occluded(&self, start: Vec3, end: Vec3) -> bool {
        let ray = Ray::between(start, end);
        self.live_obstacles().any(|(_, o)| ray.segment_hits_aabb(&o.bounds))
    }

    fn has_surface_polygons(&self) -> bool {
        self.has_polygons
    }

    fn surface_polygons(&self, x: usize, y: usize) -> &[SurfacePolygon] {
        &self.polygons[self.idx(x, y)]
    }

    fn has_volume(&self) -> bool {
        !self.volumes.is_empty()
    }

    fn inside_volume(&self, pos: Vec3) -> bool {
        self.volumes.iter().any(|v| v.contains_point(pos))
    }

    fn ambient_light(&self, _pos: Vec3) -> f32 {
        self.ambient
    }
}

impl Occluders for HeightField {
    fn occluder_disabled(&self, id: OccluderId) -> bool {
        self.obstacles.get(id).is_none_or(|o| o.disabled)
    }

    fn occludes_all(&self, id: OccluderId, eye: Vec3, points: &[Vec3]) -> bool {
        let Some(obstacle) = self.obstacles.get(id) else {
            return false;
        };
        !obstacle.disabled
            && points.iter().all(|&p| Ray::between(eye, p).segment_hits_aabb(&obstacle.bounds))
    }

    fn find_occluder(&self, eye: Vec3, points: &[Vec3], hint: Option<OccluderId>) -> Option<OccluderId> {
        if let Some(id) = hint {
            if self.occludes_all(id, eye, points) {
                return Some(id);
            }
        }
        (0..self.obstacles.len())
            .filter(|&id| Some(id) != hint)
            .find(|&id| self.occludes_all(id, eye, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> HeightField {
        HeightField::flat(8, 8, Vec2::ZERO, Vec2::ONE, 0.0)
    }

    #[test]
    fn test_slope_normals() {
        let mut f = field();
        for y in 0..8 {
            for x in 0..8 {
                f.set_height(x, y, x as f32);
            }
        }
        f.recompute_normals();
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert!((f.vertex_normal(3, 3) - expected).length() < 1e-5);
        assert!((f.surface_normal(3, 3) - expected).length() < 1e-5);
    }

    #[test]
    fn test_water_per_vertex() {
        let mut f = field();
        assert_eq!(f.water_level(1, 1), None);
        f.set_vertex_water(1, 1, 0.5);
        assert_eq!(f.water_level(1, 1), Some(0.5));
        assert_eq!(f.water_level(2, 1), None);
        assert!(f.is_underwater(Vec3::new(1.5, 1.5, 0.2)));
        assert!(!f.is_underwater(Vec3::new(1.5, 1.5, 0.7)));
    }

    #[test]
    fn test_ground_band() {
        let mut f = field();
        assert_eq!(f.ground_weight(Vec3::ZERO), None);
        f.set_ground_band(1.0, 2.0);
        assert_eq!(f.ground_weight(Vec3::new(0.0, 0.0, 0.5)), Some(1.0));
        assert_eq!(f.ground_weight(Vec3::new(0.0, 0.0, 2.0)), Some(0.5));
        assert_eq!(f.ground_weight(Vec3::new(0.0, 0.0, 9.0)), Some(0.0));
    }

    #[test]
    fn test_obstacle_occludes_and_obstructs() {
        let mut f = field();
        let id = f.add_obstacle(Aabb::new(Vec3::new(2.0, 2.0, 0.0), Vec3::new(4.0, 4.0, 3.0)));
        assert!(f.obstruction_height(3, 3) >= 3.0);
        assert_eq!(f.obstruction_height(6, 6), 0.0);
        assert!(f.point_obstructed(Vec3::new(3.0, 3.0, 0.0)));
        assert!(f.segment_occluded(Vec3::new(3.0, 3.0, -1.0), Vec3::new(3.0, 3.0, 10.0)));
        assert!(!f.segment_occluded(Vec3::new(6.0, 6.0, 0.0), Vec3::new(6.0, 6.0, 10.0)));

        let eye = Vec3::new(0.0, 3.0, 1.0);
        let behind = [Vec3::new(6.0, 3.0, 1.0), Vec3::new(6.0, 3.2, 1.0)];
        assert!(f.occludes_all(id, eye, &behind));
        assert_eq!(f.find_occluder(eye, &behind, None), Some(id));

        f.set_obstacle_disabled(id, true);
        assert!(f.occluder_disabled(id));
        assert_eq!(f.find_occluder(eye, &behind, Some(id)), None);
    }

    #[test]
    fn test_surface_polygon_registration() {
        let mut f = field();
        f.add_surface_polygon(SurfacePolygon::new(vec![
            Vec3::new(2.1, 2.1, 1.0),
            Vec3::new(2.9, 2.1, 1.0),
            Vec3::new(2.1, 2.9, 1.0),
        ]));
        assert!(f.has_surface_polygons());
        assert_eq!(f.surface_polygons(2, 2).len(), 1);
        assert!(f.surface_polygons(6, 6).is_empty());
        assert!(f.max_height() >= 1.0);
    }

    #[test]
    fn test_min_height_over_cell() {
        let mut f = field();
        f.set_height(2, 3, -1.5);
        assert_eq!(f.min_height(1, 2), -1.5);
        assert_eq!(f.min_height(4, 4), 0.0);
    }
}
