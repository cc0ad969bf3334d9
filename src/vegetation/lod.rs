//! Block-tiled grass with merged LOD levels.
//!
//! Level 0 holds `lod_blocks` independently generated blocks of
//! `lod_block_cells x lod_block_cells` cells at full density. Each coarser
//! level is built from the previous one, block by block, by greedily
//! merging every blade with its nearest unconsumed neighbor inside a short
//! look-ahead window. Blocks never look across their boundaries so every
//! level's offsets stay monotonic.

use std::ops::Range;
use std::time::Instant;

use glam::{Vec2, Vec3};

use super::blade::{GrassBlade, GrassVertex, VERTS_PER_BLADE};
use super::config::VegetationConfig;
use super::factory::BladeFactory;
use super::placement::GRASS_COLOR_SCALE;
use super::rng::TileRng;
use super::sync::BufferSync;
use crate::render::buffer::GpuDevice;

/// Merge radius at level 1, in blade widths. Doubles per level.
const MERGE_DIST_WIDTHS: f32 = 2.5;

/// One coarser LOD slice from `src`: every blade not yet consumed seeds a new
/// blade and absorbs its nearest unconsumed successor among the next
/// `window - 1` blades, if that one is closer than `dmax`.
pub fn merge_level(src: &[GrassBlade], window: usize, dmax: f32) -> Vec<GrassBlade> {
    let mut used = vec![false; src.len()];
    let mut out = Vec::with_capacity(src.len() / 2 + 1);

    for i in 0..src.len() {
        if used[i] {
            continue;
        }
        let mut seed = src[i];
        let mut dmin_sq = dmax * dmax;
        let mut merge_ix = None;
        for cur in i + 1..(i + window).min(src.len()) {
            if used[cur] {
                continue;
            }
            let dist_sq = src[i].position.distance_squared(src[cur].position);
            if dist_sq < dmin_sq {
                dmin_sq = dist_sq;
                merge_ix = Some(cur);
            }
        }
        if let Some(j) = merge_ix {
            seed.merge(&src[j]);
            used[j] = true;
        }
        out.push(seed);
    }
    out
}

/// Tiled grass blades of every LOD level in one array.
#[derive(Clone, Debug, Default)]
pub struct LodGrass {
    blades: Vec<GrassBlade>,
    /// `offsets[lod][b]..offsets[lod][b + 1]` is block `b` of level `lod`.
    offsets: Vec<Vec<u32>>,
}

impl LodGrass {
    /// Generate all levels for the configured number of blocks.
    pub fn build(config: &VegetationConfig, cell_size: Vec2) -> Self {
        let start = Instant::now();
        let levels = config.lod_levels.max(1) as usize;
        let blocks = config.lod_blocks as usize;
        let mut lod = Self::default();

        for level in 0..levels {
            let mut offsets = Vec::with_capacity(blocks + 1);
            offsets.push(lod.blades.len() as u32);
            lod.offsets.push(offsets);
            for block in 0..blocks {
                if level == 0 {
                    lod.gen_block(config, cell_size, block);
                } else {
                    lod.gen_lod_block(config, block, level);
                }
            }
        }

        log::debug!(
            "Tiled grass: {} blades over {} levels in {:.1}ms",
            lod.blades.len(),
            levels,
            start.elapsed().as_secs_f64() * 1000.0
        );
        lod
    }

    /// Full-density blades for one block.
    fn gen_block(&mut self, config: &VegetationConfig, cell_size: Vec2, block: usize) {
        let factory = BladeFactory::new(config);
        let mut rng = TileRng::new(config.seed.wrapping_add(block as u64));
        let cells = config.lod_block_cells as usize;

        for y in 0..cells {
            for x in 0..cells {
                let (xval, yval) = (x as f32 * cell_size.x, y as f32 * cell_size.y);
                for _ in 0..config.grass_density {
                    let pos = Vec3::new(
                        rng.rand_uniform(xval, xval + cell_size.x),
                        rng.rand_uniform(yval, yval + cell_size.y),
                        0.0,
                    );
                    self.blades.push(factory.grass_blade(&mut rng, pos, None, GRASS_COLOR_SCALE));
                }
            }
        }
        self.offsets[0].push(self.blades.len() as u32);
    }

    /// Merge block `block` of level `lod - 1` into level `lod`.
    fn gen_lod_block(&mut self, config: &VegetationConfig, block: usize, lod: usize) {
        let src = self.block_range(block, lod - 1);
        let dmax = MERGE_DIST_WIDTHS * config.grass_width * 2f32.powi(lod as i32);
        let merged = merge_level(&self.blades[src], config.grass_density.max(1) as usize, dmax);
        self.blades.extend(merged);
        self.offsets[lod].push(self.blades.len() as u32);
    }

    pub fn is_empty(&self) -> bool {
        self.blades.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blades.len()
    }

    pub fn levels(&self) -> usize {
        self.offsets.len()
    }

    pub fn blocks(&self) -> usize {
        self.offsets.first().map_or(0, |o| o.len().saturating_sub(1))
    }

    pub fn blades(&self) -> &[GrassBlade] {
        &self.blades
    }

    /// Blade range of block `block` at level `lod`.
    pub fn block_range(&self, block: usize, lod: usize) -> Range<usize> {
        assert!(lod < self.offsets.len(), "LOD {lod} not built");
        let offsets = &self.offsets[lod];
        assert!(block + 1 < offsets.len(), "block {block} not built");
        offsets[block] as usize..offsets[block + 1] as usize
    }

    /// Blades to draw for block `block` at level `lod` with a density
    /// fraction in `(0, 1]`: the first `ceil(density * len)` blades.
    pub fn draw_range(&self, block: usize, lod: usize, density: f32) -> Range<usize> {
        assert!(density > 0.0 && density <= 1.0, "density {density} outside (0, 1]");
        let range = self.block_range(block, lod);
        let count = (density * range.len() as f32).ceil() as usize;
        range.start..range.start + count.min(range.len())
    }

    /// Rescale every blade's length and width in place.
    pub fn scale(&mut self, length_scale: f32, width_scale: f32) {
        for blade in &mut self.blades {
            blade.dir *= length_scale;
            blade.width *= width_scale;
        }
    }

    /// Vertices for a blade range; tiled blades shade with +Z.
    pub fn vertices(&self, range: Range<usize>, tip_raise: f32, out: &mut Vec<GrassVertex>) {
        for blade in &self.blades[range] {
            out.extend_from_slice(&blade.vertices(Vec3::Z, tip_raise));
        }
    }
}

/// Tiled LOD grass plus its GPU mirror, updated once per frame.
pub struct TiledGrass<D: GpuDevice> {
    device: D,
    lod: LodGrass,
    sync: BufferSync<D::Buffer>,
    cell_size: Vec2,
}

impl<D: GpuDevice> TiledGrass<D> {
    pub fn new(device: D, cell_size: Vec2) -> Self {
        Self {
            device,
            lod: LodGrass::default(),
            sync: BufferSync::new("tiled_grass", VERTS_PER_BLADE * std::mem::size_of::<GrassVertex>()),
            cell_size,
        }
    }

    pub fn lod(&self) -> &LodGrass {
        &self.lod
    }

    pub fn buffer(&self) -> Option<&D::Buffer> {
        self.sync.buffer()
    }

    pub fn is_valid(&self) -> bool {
        self.sync.is_valid()
    }

    /// Generate on first use, create the buffer and upload when invalid.
    /// Disabled grass clears everything.
    pub fn update(&mut self, config: &VegetationConfig) {
        if config.no_grass() {
            self.clear();
            return;
        }
        if self.lod.is_empty() {
            self.lod = LodGrass::build(config, self.cell_size);
        }
        let lod = &self.lod;
        let tip_raise = 0.05 * config.grass_length;
        self.sync.sync(&self.device, lod.len(), |range, out| lod.vertices(range, tip_raise, out));
    }

    /// Vertex range to draw for one block; empty if nothing is uploaded.
    pub fn render_block(&self, block: usize, lod: usize, density: f32) -> Range<u32> {
        if !self.sync.is_valid() {
            return 0..0;
        }
        let r = self.lod.draw_range(block, lod, density);
        let v = VERTS_PER_BLADE as u32;
        r.start as u32 * v..r.end as u32 * v
    }

    /// Rescale blades after a global length/width change.
    pub fn scale(&mut self, length_scale: f32, width_scale: f32) {
        self.lod.scale(length_scale, width_scale);
        self.sync.invalidate();
    }

    pub fn clear(&mut self) {
        self.lod = LodGrass::default();
        self.sync.clear();
    }
}
