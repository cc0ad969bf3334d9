//! Placement of grass blades over the terrain.
//!
//! Blades are generated cell by cell in raster order so each cell's blades
//! form one contiguous range of the output array. A parallel occlusion
//! pre-pass estimates how much sky every vertex sees; heavily occluded
//! cells get sparser grass.

use std::time::Instant;

use glam::Vec3;
use rayon::prelude::*;

use super::blade::GrassBlade;
use super::config::VegetationConfig;
use super::factory::BladeFactory;
use super::index::CellIndex;
use super::rng::TileRng;
use crate::math::Aabb;
use crate::terrain::{SurfacePolygon, Terrain};

/// Brightness tint applied to generated blades.
pub const GRASS_COLOR_SCALE: f32 = 0.8;

/// Salt for the per-row occlusion generators.
const OCCLUSION_ROW_SALT: u32 = 123;

/// Minimum normal z of a surface polygon that carries grass.
const POLYGON_NZ_THRESH: f32 = 0.4;

/// Slack when comparing the collision column to the mesh height.
const OBSTRUCTION_EPSILON: f32 = 1e-4;

/// Ray hit counts per terrain vertex from the occlusion pre-pass.
#[derive(Clone, Debug, PartialEq)]
pub struct OcclusionMap {
    width: usize,
    samples: u32,
    hits: Vec<u32>,
}

impl OcclusionMap {
    /// Rays cast per vertex.
    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn hits(&self, x: usize, y: usize) -> u32 {
        self.hits[y * self.width + x]
    }

    /// Fraction of unblocked rays over the four corners of cell `(x, y)`.
    pub fn sunlight(&self, x: usize, y: usize) -> f32 {
        if self.samples == 0 {
            return 1.0;
        }
        let count = self.hits(x, y) + self.hits(x + 1, y) + self.hits(x, y + 1) + self.hits(x + 1, y + 1);
        1.0 - count as f32 / (4 * self.samples) as f32
    }
}

/// Generated blades plus the per-cell index over them.
pub struct Placement {
    pub blades: Vec<GrassBlade>,
    pub index: CellIndex,
    /// Some blades sit on volumetric surface polygons rather than the mesh.
    pub has_surface_grass: bool,
}

/// Decides where blades go and asks the factory to build them.
pub struct PlacementSampler<'a, T: Terrain + ?Sized> {
    config: &'a VegetationConfig,
    terrain: &'a T,
    factory: BladeFactory<'a>,
}

impl<'a, T: Terrain + ?Sized> PlacementSampler<'a, T> {
    pub fn new(config: &'a VegetationConfig, terrain: &'a T) -> Self {
        Self {
            config,
            terrain,
            factory: BladeFactory::new(config),
        }
    }

    /// Rays cast per vertex by the occlusion pre-pass.
    fn occlusion_samples(&self) -> u32 {
        self.config.grass_density.min(self.config.occlusion_samples_max)
    }

    /// Length of the occlusion rays: half the larger terrain extent.
    fn occlusion_ray_length(&self) -> f32 {
        let (w, h) = self.terrain.dims();
        let d = self.terrain.cell_size();
        0.5 * (w as f32 * d.x).max(h as f32 * d.y)
    }

    /// Cast `samples` random upward rays from every enabled vertex and count
    /// the blocked ones. Rows run in parallel, each with its own generator.
    pub fn occlusion_map(&self) -> OcclusionMap {
        let (w, h) = self.terrain.dims();
        let samples = self.occlusion_samples();
        let length = self.occlusion_ray_length();
        let terrain = self.terrain;

        let rows: Vec<Vec<u32>> = (0..h)
            .into_par_iter()
            .map(|y| {
                let mut rng = TileRng::for_row(y, OCCLUSION_ROW_SALT);
                (0..w)
                    .map(|x| {
                        if terrain.is_disabled(x, y) {
                            return 0;
                        }
                        let start = terrain.vertex_pos(x, y);
                        let mut hits = 0u32;
                        for _ in 0..samples {
                            let spread = Vec3::new(0.5 * rng.signed_rand_float(), 0.5 * rng.signed_rand_float(), 1.0);
                            if terrain.segment_occluded(start, start + length * spread) {
                                hits += 1;
                            }
                        }
                        hits
                    })
                    .collect()
            })
            .collect();

        OcclusionMap { width: w, samples, hits: rows.concat() }
    }

    /// Run the full placement pass.
    pub fn generate(&self) -> Placement {
        let start = Instant::now();
        let terrain = self.terrain;
        let (w, h) = terrain.dims();
        let mut rng = TileRng::new(self.config.seed);
        let mut blades = Vec::new();
        let mut index = CellIndex::builder(w, h);
        let mut has_surface_grass = false;
        let (mut polys_used, mut polygon_blades) = (0usize, 0usize);

        let grass_tex = terrain.grass_texture_enabled();
        let occlusion = grass_tex.then(|| self.occlusion_map());

        for y in 0..h {
            for x in 0..w {
                if terrain.has_surface_polygons() {
                    for poly in terrain.surface_polygons(x, y) {
                        let added = self.polygon_grass(&mut rng, x, y, poly, &mut blades);
                        if added.is_some() {
                            polys_used += 1;
                        }
                        polygon_blades += added.unwrap_or(0);
                    }
                    has_surface_grass |= polygon_blades > 0;
                }
                if let Some(occlusion) = &occlusion {
                    self.mesh_grass(&mut rng, occlusion, x, y, &mut blades);
                }
                index.close_cell(blades.len());
            }
        }

        if has_surface_grass {
            log::debug!("surface polygons: {polys_used}, surface blades: {polygon_blades}");
        }
        blades.shrink_to_fit();
        let total = blades.len();
        log::debug!("Grass generation: {} blades in {:.1}ms", total, start.elapsed().as_secs_f64() * 1000.0);

        Placement {
            blades,
            index: index.finish(total),
            has_surface_grass,
        }
    }

    /// Height-field grass for cell `(x, y)`.
    fn mesh_grass(&self, rng: &mut TileRng, occlusion: &OcclusionMap, x: usize, y: usize, out: &mut Vec<GrassBlade>) {
        let terrain = self.terrain;
        let (w, h) = terrain.dims();
        // The last row and column have no mesh quad
        if x + 1 >= w || y + 1 >= h {
            return;
        }
        let corners = [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)];
        if corners.iter().any(|&(cx, cy)| terrain.is_disabled(cx, cy)) {
            return;
        }
        let base_z = terrain.height(x, y);
        if terrain.water_level(x, y).is_some_and(|level| base_z < level) {
            return;
        }
        let check_obstruction = corners
            .iter()
            .any(|&(cx, cy)| terrain.height(cx, cy) + OBSTRUCTION_EPSILON < terrain.obstruction_height(cx, cy));

        let vnz = terrain.vertex_normal(x, y).z;
        let (lo, hi) = (self.config.slope_lower, self.config.slope_upper);
        let slope_scale = if vnz < hi { ((vnz - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 1.0 };
        if slope_scale == 0.0 {
            return;
        }
        debug_assert!(vnz > 0.0);

        // Uniform density over the slanted surface, not its projection
        let mut mod_den = self.config.grass_density as f32 / vnz;
        mod_den *= (2.0 * occlusion.sunlight(x, y)).min(1.0);
        let count = mod_den.round() as u32;

        let cell = terrain.cell_size();
        let (xval, yval) = (terrain.world_x(x as i32), terrain.world_y(y as i32));
        for _ in 0..count {
            let xv = rng.rand_uniform(xval, xval + cell.x);
            let yv = rng.rand_uniform(yval, yval + cell.y);
            let pos = Vec3::new(xv, yv, terrain.interpolate_height(xv, yv));

            if let Some(ground) = terrain.ground_weight(pos) {
                if ground <= 0.0 {
                    continue;
                }
                let density = ground * slope_scale;
                if density < 1.0 && rng.rand_float() >= density {
                    continue;
                }
            }
            if check_obstruction && terrain.point_obstructed(pos) {
                continue;
            }
            if terrain.has_volume() && (terrain.inside_volume(pos) || too_dark(rng, terrain, pos)) {
                continue;
            }
            let normal = terrain.interpolate_normal(pos);
            out.push(self.factory.grass_blade(rng, pos, Some(normal), GRASS_COLOR_SCALE));
        }
    }

    /// Grass on one upward-facing polygon registered with vertex `(x, y)`.
    /// Returns the number of blades added, or `None` if the polygon was
    /// not eligible.
    fn polygon_grass(
        &self,
        rng: &mut TileRng,
        x: usize,
        y: usize,
        poly: &SurfacePolygon,
        out: &mut Vec<GrassBlade>,
    ) -> Option<usize> {
        let npoints = poly.points.len();
        assert!(npoints == 3 || npoints == 4, "surface polygon with {npoints} points");
        let terrain = self.terrain;
        let normal = poly.normal();
        if normal.z < POLYGON_NZ_THRESH {
            return None;
        }

        let cell = terrain.cell_size();
        let (xval, yval) = (terrain.world_x(x as i32), terrain.world_y(y as i32));
        let test_cube = Aabb::new(
            Vec3::new(xval - 0.5 * cell.x, yval - 0.5 * cell.y, terrain.height(x, y)),
            Vec3::new(xval + 0.5 * cell.x, yval + 0.5 * cell.y, terrain.max_height() + self.config.grass_length),
        );
        if !Aabb::from_points(&poly.points).is_some_and(|b| b.intersects(&test_cube)) {
            return None;
        }

        let blades_per_area = self.config.grass_density as f32 / (cell.x * cell.y);
        let density_scale = (normal.z - POLYGON_NZ_THRESH) / (1.0 - POLYGON_NZ_THRESH);
        let count = (blades_per_area * density_scale * poly.area()).round() as usize;
        let p = &poly.points;
        let mut added = 0;

        for n in 0..count {
            let (r1, r2) = (rng.rand_float(), rng.rand_float());
            let sqrt_r1 = r1.sqrt();
            // Quads: first half of the samples on triangle 0-3-2, the rest on 0-1-2
            let mid = if npoints == 4 && n < count / 2 { 3 } else { 1 };
            let pos = (1.0 - sqrt_r1) * p[0] + (sqrt_r1 * (1.0 - r2)) * p[mid] + (sqrt_r1 * r2) * p[2];
            if !test_cube.contains_point(pos) || too_dark(rng, terrain, pos) {
                continue;
            }
            out.push(self.factory.grass_blade(rng, pos, None, GRASS_COLOR_SCALE));
            added += 1;
        }
        Some(added)
    }
}

/// Probabilistic rejection of blades in poorly lit volumetric terrain.
fn too_dark<T: Terrain + ?Sized>(rng: &mut TileRng, terrain: &T, pos: Vec3) -> bool {
    let keep_prob = 5.0 * (terrain.ambient_light(pos) - 0.8);
    keep_prob < 0.0 || (keep_prob < 1.0 && rng.rand_float() > keep_prob)
}
