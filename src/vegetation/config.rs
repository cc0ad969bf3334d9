//! Vegetation configuration (user-facing global settings).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Upper bound on `lod_levels`; merge radii double per level.
pub const MAX_LOD_LEVELS: u32 = 16;

/// Global grass and flower settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    /// Master on/off. Disabled fields generate nothing.
    pub enabled: bool,
    /// Seed for the field's random source.
    pub seed: u64,
    /// Nominal blades per terrain cell.
    pub grass_density: u32,
    /// Nominal blade length.
    pub grass_length: f32,
    /// Nominal blade width.
    pub grass_width: f32,
    /// Flowers per cell at full grass density. 0 disables flowers.
    pub flower_density: f32,
    /// 1 = every blade gets the same tint, 0 = full random variation.
    pub leaf_color_coherence: f32,
    /// 0 = healthy, 1 = fully dead (straw colored).
    pub deadness: f32,
    /// Global leaf tint blended into the blade base color.
    pub leaf_base_color: [f32; 3],
    /// Fixed flower color; `None` picks from the palette.
    pub flower_color: Option<[f32; 4]>,
    /// Surface normal z at or below which no grass grows.
    pub slope_lower: f32,
    /// Surface normal z at or above which grass has full density.
    pub slope_upper: f32,
    /// Cap on occlusion rays per vertex.
    pub occlusion_samples_max: u32,
    /// Number of LOD levels for tiled grass (level 0 included).
    pub lod_levels: u32,
    /// Cells per side of one tiled grass block.
    pub lod_block_cells: u32,
    /// Number of tiled grass blocks.
    pub lod_blocks: u32,
    /// Cells closer than this many grass widths are drawn in the near pass.
    pub near_distance_scale: f32,
    /// Quantile of the flower density noise that must be cleared.
    pub flower_dist_thresh: f32,
    /// Skip color edits on submerged blades when burning or water checking.
    pub use_water_gating: bool,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 12345,
            grass_density: 4,
            grass_length: 0.02,
            grass_width: 0.002,
            flower_density: 0.0,
            leaf_color_coherence: 0.5,
            deadness: 0.0,
            leaf_base_color: [0.0, 0.7, 0.0],
            flower_color: None,
            slope_lower: 0.65,
            slope_upper: 0.80,
            occlusion_samples_max: 16,
            lod_levels: 6,
            lod_block_cells: 8,
            lod_blocks: 4,
            near_distance_scale: 1000.0,
            flower_dist_thresh: 0.5,
            use_water_gating: true,
        }
    }
}

impl VegetationConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grass_length > 0.0 && self.grass_width > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "grass length/width must be positive, got {}/{}",
                self.grass_length, self.grass_width
            )));
        }
        if !(self.slope_lower < self.slope_upper) {
            return Err(Error::InvalidParameter(format!(
                "slope_lower {} must be below slope_upper {}",
                self.slope_lower, self.slope_upper
            )));
        }
        if self.flower_density < 0.0 {
            return Err(Error::InvalidParameter("flower_density must not be negative".into()));
        }
        if !(1..=MAX_LOD_LEVELS).contains(&self.lod_levels) {
            return Err(Error::InvalidParameter(format!(
                "lod_levels must be in 1..={MAX_LOD_LEVELS}, got {}",
                self.lod_levels
            )));
        }
        Ok(())
    }

    /// No grass (and therefore no flowers) will be generated.
    pub fn no_grass(&self) -> bool {
        !self.enabled || self.grass_density == 0
    }
}
