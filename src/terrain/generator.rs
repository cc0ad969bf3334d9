//! Noise-based procedural height-field generation

use glam::Vec2;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::heightfield::HeightField;

/// Parameters controlling terrain generation
#[derive(Clone, Debug)]
pub struct TerrainParams {
    pub seed: u32,
    pub scale: f32,        // Horizontal scale (larger = smoother)
    pub height_scale: f32, // Vertical scale (max height)
    pub octaves: u32,      // FBM octaves (detail levels)
    pub persistence: f32,  // FBM persistence (0.5 typical)
    pub lacunarity: f32,   // FBM lacunarity (2.0 typical)
    pub sea_level: Option<f32>,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 100.0,
            height_scale: 16.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            sea_level: None,
        }
    }
}

/// Procedural terrain generator using fractal Brownian motion (FBM)
pub struct TerrainGenerator {
    params: TerrainParams,
    noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    pub fn new(params: TerrainParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves as usize)
            .set_persistence(params.persistence as f64)
            .set_lacunarity(params.lacunarity as f64);

        Self { params, noise }
    }

    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Terrain height at world position (x, y), in `[0, height_scale]`
    pub fn height_at(&self, x: f32, y: f32) -> f32 {
        let nx = (x / self.params.scale) as f64;
        let ny = (y / self.params.scale) as f64;
        let normalized = (self.noise.get([nx, ny]) + 1.0) / 2.0;
        (normalized.clamp(0.0, 1.0) * self.params.height_scale as f64) as f32
    }

    /// Sample a `width x height` vertex grid into a height-field.
    pub fn build(&self, width: usize, height: usize, origin: Vec2, cell_size: Vec2) -> HeightField {
        let mut field = HeightField::flat(width, height, origin, cell_size, 0.0);
        for y in 0..height {
            for x in 0..width {
                let wx = origin.x + x as f32 * cell_size.x;
                let wy = origin.y + y as f32 * cell_size.y;
                field.set_height(x, y, self.height_at(wx, wy));
            }
        }
        field.recompute_normals();
        if let Some(level) = self.params.sea_level {
            field.set_water_level(level);
        }
        log::debug!(
            "Generated {}x{} height-field (seed {}, height range {:.2}..{:.2})",
            width, height, self.params.seed, field.lowest(), field.max_height_value(),
        );
        field
    }
}
