//! Low-frequency noise fields that make flowers grow in patches.

use glam::Vec2;
use noise::{NoiseFn, Perlin};

/// Cells per density noise feature.
const DENSITY_PERIOD_CELLS: f32 = 12.0;
/// Cells per color noise feature (30% higher frequency).
const COLOR_PERIOD_CELLS: f32 = DENSITY_PERIOD_CELLS / 1.3;

/// Density and color selection noise over the terrain grid.
pub struct FlowerNoise {
    density: Perlin,
    color: Perlin,
    density_scale: Vec2,
    color_scale: Vec2,
    threshold: f32,
}

impl FlowerNoise {
    /// Build both fields and the density threshold: the `quantile` of
    /// density values sampled at every cell center of a `width x height`
    /// grid. Flowers only grow where density stays below it.
    pub fn new(seed: u32, origin: Vec2, cell_size: Vec2, width: usize, height: usize, quantile: f32) -> Self {
        let mut field = Self {
            density: Perlin::new(seed),
            color: Perlin::new(seed.wrapping_add(1)),
            density_scale: Vec2::ONE / (cell_size * DENSITY_PERIOD_CELLS),
            color_scale: Vec2::ONE / (cell_size * COLOR_PERIOD_CELLS),
            threshold: 0.5,
        };

        let mut samples = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let p = origin + (Vec2::new(x as f32, y as f32) + 0.5) * cell_size;
                samples.push(field.density_at(p.x, p.y));
            }
        }
        if !samples.is_empty() {
            let k = ((quantile.clamp(0.0, 1.0) * (samples.len() - 1) as f32).round() as usize).min(samples.len() - 1);
            let (_, kth, _) = samples.select_nth_unstable_by(k, f32::total_cmp);
            field.threshold = *kth;
        }
        field
    }

    /// Density noise in `[0, 1]`.
    pub fn density_at(&self, x: f32, y: f32) -> f32 {
        let p = [(x * self.density_scale.x) as f64, (y * self.density_scale.y) as f64];
        ((self.density.get(p) as f32 + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Color selection noise in `[0, 1]`.
    pub fn color_at(&self, x: f32, y: f32) -> f32 {
        let p = [(x * self.color_scale.x) as f64, (y * self.color_scale.y) as f64];
        ((self.color.get(p) as f32 + 1.0) * 0.5).clamp(0.0, 1.0)
    }

    /// Density value flowers must not exceed.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}
