//! GPU-ready vegetation uniform (32 bytes, 16-byte aligned).
//!
//! Wind animation happens in the vertex shaders; the field only supplies
//! these scalars.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::config::VegetationConfig;

/// Alpha below which flower texels are discarded.
pub const FLOWER_MIN_ALPHA: f32 = 0.9;

/// GPU uniform shared by the grass and flower passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct VegetationParams {
    /// Wind animation time in seconds, at half speed.
    pub time: f32,
    pub wind_x: f32,
    pub wind_y: f32,
    /// Nominal blade length.
    pub height: f32,
    // -- 16 bytes --
    pub min_alpha: f32,
    pub _pad: [f32; 3],
    // -- 16 bytes --
    // Total: 32 bytes
}

impl VegetationParams {
    pub fn new(config: &VegetationConfig, wind: Vec2, seconds: f32) -> Self {
        Self {
            time: 0.5 * seconds,
            wind_x: wind.x,
            wind_y: wind.y,
            height: config.grass_length,
            min_alpha: FLOWER_MIN_ALPHA,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_size() {
        assert_eq!(std::mem::size_of::<VegetationParams>(), 32);
    }

    #[test]
    fn test_params_alignment() {
        assert_eq!(std::mem::size_of::<VegetationParams>() % 16, 0);
    }

    #[test]
    fn test_params_from_config() {
        let config = VegetationConfig::default();
        let p = VegetationParams::new(&config, Vec2::new(0.3, -0.1), 4.0);
        assert_eq!(p.time, 2.0);
        assert_eq!(p.wind_x, 0.3);
        assert_eq!(p.height, config.grass_length);
        assert_eq!(bytemuck::bytes_of(&p).len(), 32);
    }
}
