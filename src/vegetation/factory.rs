//! Blade and flower synthesis.

use glam::{Vec3, Vec4};

use super::blade::GrassBlade;
use super::config::VegetationConfig;
use super::flower::Flower;
use super::noise_field::FlowerNoise;
use super::rng::TileRng;
use crate::terrain::Terrain;

const BASE_COLOR: [f32; 3] = [0.25, 0.6, 0.08];
const MOD_COLOR: [f32; 3] = [0.3, 0.3, 0.12];
const LEAF_TINT_MULT: [f32; 3] = [0.2, 0.4, 0.0];
const DEAD_COLOR: [f32; 3] = [0.75, 0.6, 0.0];

/// Flowers need at least this much grass in a cell.
const MIN_FLOWER_GRASS_DENSITY: f32 = 0.5;

const FLOWER_PALETTE: [Vec4; 3] = [
    Vec4::new(1.0, 1.0, 1.0, 1.0), // white
    Vec4::new(1.0, 1.0, 0.0, 1.0), // yellow
    Vec4::new(0.5, 0.7, 1.0, 1.0), // light blue
];

/// Creates vegetation instances from the global appearance settings.
pub struct BladeFactory<'a> {
    config: &'a VegetationConfig,
}

impl<'a> BladeFactory<'a> {
    pub fn new(config: &'a VegetationConfig) -> Self {
        Self { config }
    }

    /// One grass blade at `pos`.
    ///
    /// `mesh_normal` is the interpolated terrain normal for blades on the
    /// height-field, `None` for blades on other surfaces (they grow
    /// straight up and are not `on_mesh`). `cscale` scales brightness.
    pub fn grass_blade(&self, rng: &mut TileRng, pos: Vec3, mesh_normal: Option<Vec3>, cscale: f32) -> GrassBlade {
        let base_dir = match mesh_normal {
            Some(n) => 0.5 * (Vec3::Z + n),
            None => Vec3::Z,
        };
        let dir = (base_dir + rng.signed_rand_vector(0.3)).normalize_or(Vec3::Z);
        let normal = dir.cross(rng.signed_rand_vector(1.0)).normalize_or(Vec3::X);

        let ilch = 1.0 - self.config.leaf_color_coherence;
        let dead = self.config.deadness.clamp(0.0, 1.0);
        let tint = self.config.leaf_base_color;
        let mut color = [0u8; 3];
        for i in 0..3 {
            let live = (cscale * (BASE_COLOR[i] + LEAF_TINT_MULT[i] * tint[i] + ilch * MOD_COLOR[i] * rng.rand_float()))
                .clamp(0.0, 1.0);
            color[i] = (255.0 * (dead * DEAD_COLOR[i] + (1.0 - dead) * live)) as u8;
        }

        let length = self.config.grass_length * rng.rand_uniform(0.7, 1.3);
        let width = self.config.grass_width * rng.rand_uniform(0.7, 1.3);
        GrassBlade::new(pos, dir * length, normal, color, width, mesh_normal.is_some())
    }

    /// Flowers for cell `(x, y)` with grass density `grass_den` (0..1),
    /// appended to `out`. Stems stand on the interpolated terrain height.
    pub fn flowers_in_cell<T: Terrain + ?Sized>(
        &self,
        rng: &mut TileRng,
        noise: &FlowerNoise,
        terrain: &T,
        x: usize,
        y: usize,
        grass_den: f32,
        out: &mut Vec<Flower>,
    ) {
        if grass_den < MIN_FLOWER_GRASS_DENSITY {
            return;
        }
        let cell = terrain.cell_size();
        let (x0, y0) = (terrain.world_x(x as i32), terrain.world_y(y as i32));
        let center = (x0 + 0.5 * cell.x, y0 + 0.5 * cell.y);
        let dval = noise.density_at(center.0, center.1);
        let cval = noise.color_at(center.0, center.1);
        let count = (self.config.flower_density * grass_den).round() as u32;

        for _ in 0..count {
            if dval + 0.2 * rng.signed_rand_float() > noise.threshold() {
                continue;
            }
            let height = self.config.grass_length * rng.rand_uniform(0.85, 1.0);
            let px = x0 + cell.x * rng.rand_float();
            let py = y0 + cell.y * rng.rand_float();
            let pos = Vec3::new(px, py, terrain.interpolate_height(px, py) + height);
            let normal = (Vec3::Z + rng.signed_rand_vector(0.2)).normalize();
            let radius = self.config.grass_width * rng.rand_uniform(1.5, 2.5);
            let color = match self.config.flower_color {
                Some(c) => Vec4::from_array(c),
                None => {
                    let color_val = cval + 0.25 * rng.signed_rand_float();
                    let n = FLOWER_PALETTE.len() as i32;
                    FLOWER_PALETTE[((n as f32 * color_val).floor() as i32).rem_euclid(n) as usize]
                }
            };
            out.push(Flower::new(pos, normal, radius, height, color));
        }
    }
}
