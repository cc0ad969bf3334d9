//! Deterministic random source for placement and appearance.
//!
//! Every generator in the vegetation field draws from a [`TileRng`] seeded
//! from a tile coordinate, a row index or the field seed, so the same
//! inputs always produce the same field.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seedable uniform generator.
#[derive(Clone, Debug)]
pub struct TileRng {
    rng: ChaCha8Rng,
}

impl TileRng {
    pub fn new(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Generator for a spatial tile.
    pub fn for_tile(x: i32, y: i32) -> Self {
        Self::new(((x as u32 as u64) << 32) | y as u32 as u64)
    }

    /// Generator for one row of a row-parallel pass.
    pub fn for_row(row: usize, salt: u32) -> Self {
        Self::new(((row as u64) << 32) | salt as u64)
    }

    /// Uniform in `[0, 1)`.
    pub fn rand_float(&mut self) -> f32 {
        self.rng.r#gen::<f32>()
    }

    /// Uniform in `[lo, hi)`; returns `lo` for an empty range.
    pub fn rand_uniform(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.rand_float()
    }

    /// Uniform in `[-1, 1)`.
    pub fn signed_rand_float(&mut self) -> f32 {
        2.0 * self.rand_float() - 1.0
    }

    /// Each component uniform in `[-scale, scale)`.
    pub fn signed_rand_vector(&mut self, scale: f32) -> Vec3 {
        Vec3::new(
            self.signed_rand_float(),
            self.signed_rand_float(),
            self.signed_rand_float(),
        ) * scale
    }

    pub fn rand_bool(&mut self) -> bool {
        self.rng.r#gen::<bool>()
    }
}
