//! The vegetation field: grass and flowers over one terrain.

use std::ops::Range;
use std::time::Instant;

use glam::{Vec2, Vec3};

use super::blade::{GrassBlade, GrassVertex, VERTS_PER_BLADE};
use super::config::VegetationConfig;
use super::factory::BladeFactory;
use super::flower::{Flower, FlowerVertex, VERTS_PER_FLOWER};
use super::index::CellIndex;
use super::mutation::{self, DirtySpan, VegetationEdit};
use super::noise_field::FlowerNoise;
use super::params::VegetationParams;
use super::placement::PlacementSampler;
use super::rng::TileRng;
use super::sync::BufferSync;
use super::visibility::{CullParams, DrawList, GrassCuller, ViewState};
use crate::core::{Error, Result};
use crate::render::buffer::GpuDevice;
use crate::terrain::{Occluders, Terrain};

/// Offset mixed into the seed for flower generation.
const FLOWER_SEED_SALT: u64 = 0x00f1_0e75;

/// Index spans changed by one [`VegetationField::modify_vegetation`] call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EditReport {
    pub grass: DirtySpan,
    pub flowers: DirtySpan,
}

impl EditReport {
    pub fn is_empty(&self) -> bool {
        self.grass.is_empty() && self.flowers.is_empty()
    }
}

/// Grass blades, flowers, their cell index and GPU mirrors for one terrain.
///
/// Generation, edits and uploads all take `&mut self`; the field is the
/// only owner of its instance arrays and buffers.
pub struct VegetationField<D: GpuDevice> {
    config: VegetationConfig,
    device: D,
    grass: Vec<GrassBlade>,
    index: CellIndex,
    flowers: Vec<Flower>,
    surface_grass: bool,
    grass_sync: BufferSync<D::Buffer>,
    flower_sync: BufferSync<D::Buffer>,
    culler: GrassCuller,
}

impl<D: GpuDevice> VegetationField<D> {
    pub fn new(config: VegetationConfig, device: D) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            device,
            grass: Vec::new(),
            index: CellIndex::default(),
            flowers: Vec::new(),
            surface_grass: false,
            grass_sync: BufferSync::new("grass", VERTS_PER_BLADE * std::mem::size_of::<GrassVertex>()),
            flower_sync: BufferSync::new("flowers", VERTS_PER_FLOWER * std::mem::size_of::<FlowerVertex>()),
            culler: GrassCuller::default(),
        })
    }

    pub fn config(&self) -> &VegetationConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.grass.is_empty()
    }

    /// Number of grass blades, tombstones included.
    pub fn size(&self) -> usize {
        self.grass.len()
    }

    pub fn flower_count(&self) -> usize {
        self.flowers.len()
    }

    pub fn blades(&self) -> &[GrassBlade] {
        &self.grass
    }

    pub fn flowers(&self) -> &[Flower] {
        &self.flowers
    }

    pub fn index(&self) -> &CellIndex {
        &self.index
    }

    pub fn grass_buffer(&self) -> Option<&D::Buffer> {
        self.grass_sync.buffer()
    }

    pub fn flower_buffer(&self) -> Option<&D::Buffer> {
        self.flower_sync.buffer()
    }

    /// Both GPU mirrors hold the current instance data.
    pub fn is_uploaded(&self) -> bool {
        self.grass_sync.is_valid() && (self.flowers.is_empty() || self.flower_sync.is_valid())
    }

    /// CPU memory held by the instance arrays.
    pub fn memory_bytes(&self) -> usize {
        self.grass.len() * std::mem::size_of::<GrassBlade>()
            + self.flowers.len() * std::mem::size_of::<Flower>()
            + self.index.offsets().len() * std::mem::size_of::<u32>()
    }

    /// GPU memory taken by the vertex mirrors.
    pub fn vertex_bytes(&self) -> usize {
        self.grass.len() * VERTS_PER_BLADE * std::mem::size_of::<GrassVertex>()
            + self.flowers.len() * VERTS_PER_FLOWER * std::mem::size_of::<FlowerVertex>()
    }

    /// Drop all instances and destroy both buffers.
    pub fn clear(&mut self) {
        self.grass = Vec::new();
        self.flowers = Vec::new();
        self.index = CellIndex::default();
        self.surface_grass = false;
        self.grass_sync.clear();
        self.flower_sync.clear();
        self.culler.reset();
    }

    /// Rebuild grass and flowers from scratch for `terrain`.
    pub fn regenerate<T: Terrain + ?Sized>(&mut self, terrain: &T) {
        self.clear();
        if self.config.no_grass() {
            return;
        }
        let placement = PlacementSampler::new(&self.config, terrain).generate();
        self.grass = placement.blades;
        self.index = placement.index;
        self.surface_grass = placement.has_surface_grass;
        self.gen_flowers(terrain);

        let (w, h) = terrain.dims();
        let nominal = w * h * self.config.grass_density as usize;
        if self.flowers.is_empty() {
            log::info!("grass: {} out of {}", self.grass.len(), nominal);
        } else {
            log::info!("grass: {} out of {}, flowers: {}", self.grass.len(), nominal, self.flowers.len());
        }
    }

    fn gen_flowers<T: Terrain + ?Sized>(&mut self, terrain: &T) {
        if self.config.flower_density <= 0.0 || self.grass.is_empty() {
            return;
        }
        let start = Instant::now();
        let (w, h) = terrain.dims();
        let noise = FlowerNoise::new(
            self.config.seed as u32,
            terrain.origin(),
            terrain.cell_size(),
            w,
            h,
            self.config.flower_dist_thresh,
        );
        let factory = BladeFactory::new(&self.config);
        let mut rng = TileRng::new(self.config.seed.wrapping_add(FLOWER_SEED_SALT));
        let mut flowers = Vec::new();

        // Raster order keeps flowers sorted by row for the edit scan
        for y in 0..h {
            for x in 0..w {
                let weight = terrain.flower_weight(x, y);
                if weight <= 0.0 {
                    continue;
                }
                let density = weight * self.cell_density(x, y);
                factory.flowers_in_cell(&mut rng, &noise, terrain, x, y, density, &mut flowers);
            }
        }
        flowers.shrink_to_fit();
        self.flowers = flowers;
        log::debug!("Flower generation: {} flowers in {:.1}ms", self.flowers.len(), start.elapsed().as_secs_f64() * 1000.0);
    }

    /// Blades generated in a cell relative to the nominal density.
    fn cell_density(&self, x: usize, y: usize) -> f32 {
        self.index.range_for_cell(x, y).len() as f32 / self.config.grass_density as f32
    }

    /// Create buffers and upload whatever is invalid. Call once per frame
    /// before drawing.
    pub fn update<T: Terrain + ?Sized>(&mut self, terrain: &T) {
        if self.grass.is_empty() {
            return;
        }
        let start = Instant::now();
        let grass = &self.grass;
        let tip_raise = 0.05 * self.config.grass_length;
        let uploaded = self
            .grass_sync
            .sync(&self.device, grass.len(), |range, out| grass_vertices(grass, terrain, tip_raise, range, out));

        let flowers = &self.flowers;
        self.flower_sync.sync(&self.device, flowers.len(), |range, out| flower_vertices(flowers, range, out));

        if uploaded {
            log::info!(
                "Grass upload in {:.1}ms, mem used: {}, vmem used: {}",
                start.elapsed().as_secs_f64() * 1000.0,
                self.memory_bytes(),
                self.vertex_bytes()
            );
        }
    }

    /// Rescale every blade and flower to a new nominal length and width
    /// without regenerating. Both buffers must be re-uploaded afterwards.
    pub fn set_length_width(&mut self, length: f32, width: f32) -> Result<()> {
        if !(length > 0.0 && width > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "grass length/width must be positive, got {length}/{width}"
            )));
        }
        let lscale = length / self.config.grass_length;
        let wscale = width / self.config.grass_width;
        self.config.grass_length = length;
        self.config.grass_width = width;

        for blade in &mut self.grass {
            blade.dir *= lscale;
            blade.width *= wscale;
        }
        for flower in &mut self.flowers {
            let old_height = flower.height;
            flower.height *= lscale;
            flower.radius *= wscale;
            flower.position.z += flower.height - old_height;
        }
        self.grass_sync.invalidate();
        self.flower_sync.invalidate();
        Ok(())
    }

    /// Apply an edit around `center` and upload the changed spans.
    ///
    /// Burning is suppressed when the center itself is underwater. Flowers
    /// are crushed, burned, and removed by either `cut` or `remove`.
    pub fn modify_vegetation<T: Terrain + ?Sized>(
        &mut self,
        terrain: &T,
        center: Vec3,
        radius: f32,
        edit: &VegetationEdit,
    ) -> EditReport {
        let mut report = EditReport::default();
        if self.config.no_grass() || self.grass.is_empty() || edit.is_empty() {
            return report;
        }
        let mut edit = *edit;
        if edit.burn && terrain.is_underwater(center) {
            edit.burn = false;
        }
        let length = self.config.grass_length;

        if let Some(bounds) = mutation::edit_bounds(terrain, center, radius, length, self.surface_grass) {
            for y in bounds.y.clone() {
                for x in bounds.x.clone() {
                    if !terrain.in_bounds(x, y) {
                        continue;
                    }
                    let cell = (x as usize, y as usize);
                    let range = self.index.range_for_cell(cell.0, cell.1);
                    let span = mutation::modify_grass_cell(
                        &mut self.grass,
                        range,
                        terrain,
                        cell,
                        center,
                        bounds.radius,
                        &edit,
                        length,
                        self.config.use_water_gating,
                    );
                    self.upload_grass(terrain, span.range());
                    report.grass.union(span);
                }
            }
        }

        let flower_ops = (edit.crush, edit.burn, edit.cut || edit.remove);
        // No grass here means no flowers either
        if !self.flowers.is_empty() && self.density_at(terrain, center) > 0.0 {
            let span = mutation::modify_flowers(&mut self.flowers, terrain, center, radius, flower_ops, length);
            self.upload_flowers(span.range());
            report.flowers = span;
        }
        report
    }

    /// Re-snap the on-mesh blades of cell `(x, y)` after its terrain height
    /// changed. Panics if the cell is outside the terrain.
    pub fn mesh_height_change<T: Terrain + ?Sized>(&mut self, terrain: &T, x: usize, y: usize) -> DirtySpan {
        if self.grass.is_empty() {
            return DirtySpan::default();
        }
        let range = self.index.range_for_cell(x, y);
        let tolerance = 0.01 * self.config.grass_width;
        let span = mutation::mesh_height_change(&mut self.grass, range, terrain, tolerance);
        self.upload_grass(terrain, span.range());
        span
    }

    /// Re-snap flowers within `cell_radius` cells of `(x, y)`.
    pub fn flower_height_change<T: Terrain + ?Sized>(&mut self, terrain: &T, x: i32, y: i32, cell_radius: i32) -> DirtySpan {
        if self.flowers.is_empty() {
            return DirtySpan::default();
        }
        let span = mutation::flower_height_change(&mut self.flowers, terrain, (x, y), cell_radius);
        self.upload_flowers(span.range());
        span
    }

    /// Raise `pos` so a sphere of `radius` rests on the grass tips below
    /// it. `None` if no live blade is within reach.
    pub fn place_on_top<T: Terrain + ?Sized>(&self, terrain: &T, pos: Vec3, radius: f32) -> Option<Vec3> {
        if self.config.no_grass() || self.grass.is_empty() {
            return None;
        }
        let bounds = mutation::edit_bounds(terrain, pos, radius, self.config.grass_length, self.surface_grass)?;
        let rad_sq = bounds.radius * bounds.radius;
        let mut raised = pos;
        let mut contact = false;

        for y in bounds.y.clone() {
            for x in bounds.x.clone() {
                if !terrain.in_bounds(x, y) {
                    continue;
                }
                for g in &self.grass[self.index.range_for_cell(x as usize, y as usize)] {
                    if g.is_removed() || Vec2::new(pos.x - g.position.x, pos.y - g.position.y).length_squared() > rad_sq {
                        continue;
                    }
                    raised.z = raised.z.max(g.position.z + g.dir.z + radius);
                    contact = true;
                }
            }
        }
        contact.then_some(raised)
    }

    /// Generated blades in the cell under `pos` relative to the nominal
    /// density; tombstoned blades still count. 0 off the terrain.
    pub fn density_at<T: Terrain + ?Sized>(&self, terrain: &T, pos: Vec3) -> f32 {
        if self.config.no_grass() || self.grass.is_empty() || !terrain.is_over(pos) {
            return 0.0;
        }
        let (x, y) = terrain.cell_of(pos.x, pos.y);
        self.cell_density(x as usize, y as usize)
    }

    /// Cull grass cells for this frame. Ranges index blades; multiply by
    /// [`VERTS_PER_BLADE`] for vertices.
    pub fn draw_list<T: Terrain + Occluders + ?Sized>(&mut self, terrain: &T, view: &ViewState) -> DrawList {
        if self.grass.is_empty() || !self.grass_sync.is_valid() {
            return DrawList::default();
        }
        let params = CullParams {
            grass_length: self.config.grass_length,
            near_distance: self.config.near_distance_scale * self.config.grass_width,
            surface_grass: self.surface_grass,
        };
        self.culler.cull(terrain, &self.index, view, &params)
    }

    /// Uniform values for this frame's grass and flower passes.
    pub fn params(&self, wind: Vec2, seconds: f32) -> VegetationParams {
        VegetationParams::new(&self.config, wind, seconds)
    }

    fn upload_grass<T: Terrain + ?Sized>(&mut self, terrain: &T, range: Range<usize>) {
        let grass = &self.grass;
        let tip_raise = 0.05 * self.config.grass_length;
        self.grass_sync
            .upload_range(range, |r, out| grass_vertices(grass, terrain, tip_raise, r, out));
    }

    fn upload_flowers(&mut self, range: Range<usize>) {
        let flowers = &self.flowers;
        self.flower_sync.upload_range(range, |r, out| flower_vertices(flowers, r, out));
    }
}

/// Mesh blades shade with the interpolated terrain normal, others with +Z.
fn grass_vertices<T: Terrain + ?Sized>(
    blades: &[GrassBlade],
    terrain: &T,
    tip_raise: f32,
    range: Range<usize>,
    out: &mut Vec<GrassVertex>,
) {
    for blade in &blades[range] {
        let normal = if blade.on_mesh { terrain.interpolate_normal(blade.position) } else { Vec3::Z };
        out.extend_from_slice(&blade.vertices(normal, tip_raise));
    }
}

fn flower_vertices(flowers: &[Flower], range: Range<usize>, out: &mut Vec<FlowerVertex>) {
    for flower in &flowers[range] {
        out.extend_from_slice(&flower.vertices());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Frustum;
    use crate::render::buffer::{GpuBuffer, MemoryDevice};
    use crate::terrain::HeightField;

    const GRASS_RECORD: u64 = (VERTS_PER_BLADE * std::mem::size_of::<GrassVertex>()) as u64;

    fn flat(w: usize, h: usize) -> HeightField {
        HeightField::flat(w, h, Vec2::ZERO, Vec2::ONE, 0.0)
    }

    fn field_for(terrain: &HeightField, config: VegetationConfig) -> VegetationField<MemoryDevice> {
        let mut field = VegetationField::new(config, MemoryDevice).unwrap();
        field.regenerate(terrain);
        field.update(terrain);
        field
    }

    /// 5x2 vertices: four cells in a row, the middle two under water, so
    /// only cells 0 and 3 carry grass.
    fn two_islands() -> HeightField {
        let mut terrain = flat(5, 2);
        terrain.set_vertex_water(1, 0, 0.5);
        terrain.set_vertex_water(2, 0, 0.5);
        terrain
    }

    #[test]
    fn test_generate_and_upload() {
        let terrain = flat(3, 3);
        let field = field_for(&terrain, VegetationConfig::default());
        assert_eq!(field.size(), 16);
        assert_eq!(*field.index().offsets().last().unwrap() as usize, field.size());
        assert!(field.is_uploaded());
        let buffer = field.grass_buffer().unwrap();
        assert_eq!(buffer.size(), 16 * GRASS_RECORD);
        assert_eq!(buffer.allocations(), 1);
        assert_eq!(field.vertex_bytes() as u64, buffer.size());
        // No flowers, no flower buffer
        assert_eq!(field.flower_count(), 0);
        assert!(field.flower_buffer().is_none());

        // First blade's vertices made it to the buffer
        let verts: &[GrassVertex] = bytemuck::cast_slice(buffer.bytes());
        let b = field.blades()[0];
        let tip_raise = 0.05 * field.config().grass_length;
        assert_eq!(verts[2].position, (b.position + b.dir + Vec3::new(0.0, 0.0, tip_raise)).to_array());
        assert_eq!(verts[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_remove_exactly_one_cell() {
        let terrain = two_islands();
        let mut field = field_for(&terrain, VegetationConfig::default());
        assert_eq!(field.size(), 8);
        let cell0 = field.index().range_for_cell(0, 0);
        let cell3 = field.index().range_for_cell(3, 0);
        assert_eq!(cell0, 0..4);
        assert_eq!(cell3, 4..8);
        field.grass_sync.buffer_mut().unwrap().clear_writes();

        let report = field.modify_vegetation(&terrain, Vec3::new(0.5, 0.5, 0.0), 0.75, &VegetationEdit::remove());
        assert_eq!(report.grass.range(), cell0);
        assert!(report.flowers.is_empty());
        assert_eq!(field.size(), 8);
        assert!(field.blades()[cell0.clone()].iter().all(|b| b.is_removed()));
        assert!(field.blades()[cell3].iter().all(|b| !b.is_removed()));

        // Only the dirty span was re-uploaded, as degenerate triangles
        let buffer = field.grass_buffer().unwrap();
        assert_eq!(buffer.writes(), &[(0, 4 * GRASS_RECORD)]);
        let verts: &[GrassVertex] = bytemuck::cast_slice(buffer.bytes());
        assert_eq!(verts[0].position, verts[2].position);

        // Removing again changes nothing
        let again = field.modify_vegetation(&terrain, Vec3::new(0.5, 0.5, 0.0), 0.75, &VegetationEdit::remove());
        assert!(again.is_empty());
    }

    #[test]
    fn test_remove_single_blade_is_idempotent() {
        let terrain = flat(3, 3);
        let mut field = field_for(&terrain, VegetationConfig::default());
        let target = field.blades()[5].position;
        let first = field.modify_vegetation(&terrain, target, 1e-4, &VegetationEdit::remove());
        assert_eq!(first.grass.range(), 5..6);
        let snapshot = field.blades().to_vec();
        let second = field.modify_vegetation(&terrain, target, 1e-4, &VegetationEdit::remove());
        assert!(second.is_empty());
        assert_eq!(field.blades(), &snapshot[..]);
    }

    #[test]
    fn test_huge_radius_edit_stays_on_terrain() {
        let terrain = HeightField::flat(3, 3, Vec2::ZERO, Vec2::splat(0.01), 0.0);
        let mut field = field_for(&terrain, VegetationConfig::default());
        assert_eq!(field.size(), 16);
        let report = field.modify_vegetation(&terrain, Vec3::new(0.01, 0.01, 0.0), 20.0, &VegetationEdit::remove());
        assert_eq!(report.grass.range(), 0..16);
        assert!(field.blades().iter().all(|b| b.is_removed()));
    }

    #[test]
    fn test_density_at() {
        let terrain = two_islands();
        let mut field = field_for(&terrain, VegetationConfig::default());
        assert_eq!(field.density_at(&terrain, Vec3::new(-1.0, 0.5, 0.0)), 0.0);
        assert_eq!(field.density_at(&terrain, Vec3::new(9.0, 0.5, 0.0)), 0.0);
        assert!((field.density_at(&terrain, Vec3::new(0.5, 0.5, 0.0)) - 1.0).abs() < 1e-6);
        assert_eq!(field.density_at(&terrain, Vec3::new(1.5, 0.5, 0.0)), 0.0);

        // Tombstones keep their capacity
        field.modify_vegetation(&terrain, Vec3::new(0.5, 0.5, 0.0), 0.75, &VegetationEdit::remove());
        assert!((field.density_at(&terrain, Vec3::new(0.5, 0.5, 0.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_length_width() {
        let terrain = flat(3, 3);
        let mut field = field_for(&terrain, VegetationConfig::default());
        let before = field.blades().to_vec();
        assert!(field.is_uploaded());

        field.set_length_width(0.04, 0.002).unwrap();
        assert!(!field.is_uploaded());
        for (old, new) in before.iter().zip(field.blades()) {
            assert_eq!(old.position, new.position);
            assert!((new.length() - 2.0 * old.length()).abs() < 1e-6);
            assert!((new.width - old.width).abs() < 1e-9);
        }
        assert_eq!(field.config().grass_length, 0.04);

        field.update(&terrain);
        assert!(field.is_uploaded());
        assert_eq!(field.grass_buffer().unwrap().allocations(), 1);

        assert!(matches!(field.set_length_width(0.0, 0.002), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_place_on_top() {
        let terrain = flat(3, 3);
        let field = field_for(&terrain, VegetationConfig::default());
        let raised = field.place_on_top(&terrain, Vec3::new(1.0, 1.0, 0.0), 1.0).unwrap();
        let tallest = field.blades().iter().map(|b| b.position.z + b.dir.z).fold(0.0, f32::max);
        assert!(raised.z > 1.0 && raised.z <= tallest + 1.0 + 1e-6);
        assert_eq!((raised.x, raised.y), (1.0, 1.0));
        assert_eq!(field.place_on_top(&terrain, Vec3::new(1.0, 1.0, 5.0), 1.0), None);
    }

    #[test]
    fn test_burn_suppressed_under_water() {
        let mut terrain = flat(3, 3);
        let mut field = field_for(&terrain, VegetationConfig::default());
        let colors: Vec<_> = field.blades().iter().map(|b| b.color).collect();
        terrain.set_water_level(1.0);
        let report = field.modify_vegetation(&terrain, Vec3::new(1.0, 1.0, 0.0), 1.5, &VegetationEdit::burn());
        assert!(report.is_empty());
        assert!(field.blades().iter().zip(&colors).all(|(b, c)| b.color == *c));
    }

    #[test]
    fn test_edit_above_tips_is_noop() {
        let terrain = flat(3, 3);
        let mut field = field_for(&terrain, VegetationConfig::default());
        let before = field.blades().to_vec();
        let report = field.modify_vegetation(&terrain, Vec3::new(1.0, 1.0, 1.0), 0.5, &VegetationEdit::crush());
        assert!(report.is_empty());
        assert_eq!(field.blades(), &before[..]);
    }

    #[test]
    fn test_flowers_generated_and_edited() {
        let terrain = flat(12, 12);
        let config = VegetationConfig { flower_density: 6.0, ..Default::default() };
        let mut field = field_for(&terrain, config);
        assert!(field.flower_count() > 0);
        assert!(field.flower_buffer().is_some());
        // Generated row by row
        let flowers = field.flowers();
        assert!(flowers.windows(2).all(|w| w[0].position.y.floor() <= w[1].position.y.floor()));

        let target = flowers[0].position;
        let report = field.modify_vegetation(&terrain, target, 1e-4, &VegetationEdit::cut());
        assert_eq!(report.flowers.range(), 0..1);
        assert!(field.flowers()[0].is_removed());
    }

    #[test]
    fn test_mesh_height_change() {
        let mut terrain = flat(3, 3);
        let mut field = field_for(&terrain, VegetationConfig::default());
        field.grass_sync.buffer_mut().unwrap().clear_writes();
        assert!(field.mesh_height_change(&terrain, 0, 0).is_empty());

        terrain.set_height(0, 0, 1.0);
        let span = field.mesh_height_change(&terrain, 0, 0);
        let cell = field.index().range_for_cell(0, 0);
        assert!(!span.is_empty());
        assert!(span.range().start >= cell.start && span.range().end <= cell.end);
        for b in &field.blades()[cell] {
            assert!((b.position.z - terrain.interpolate_height(b.position.x, b.position.y)).abs() < 1e-6);
        }
        let writes = field.grass_buffer().unwrap().writes().to_vec();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, span.range().start as u64 * GRASS_RECORD);
    }

    #[test]
    fn test_flower_height_change() {
        let mut terrain = flat(12, 12);
        let config = VegetationConfig { flower_density: 6.0, ..Default::default() };
        let mut field = field_for(&terrain, config);
        for y in 0..12 {
            for x in 0..12 {
                terrain.set_height(x, y, 2.0);
            }
        }
        let span = field.flower_height_change(&terrain, 5, 5, 20);
        assert_eq!(span.range(), 0..field.flower_count());
        for f in field.flowers() {
            assert!((f.position.z - (2.0 + f.height)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_draw_list_and_clear() {
        let terrain = flat(3, 3);
        let mut field = field_for(&terrain, VegetationConfig::default());
        let view = ViewState::new(Vec3::new(1.0, 1.0, 50.0), Frustum::unbounded(), 0);
        let list = field.draw_list(&terrain, &view);
        assert_eq!(list.far, vec![0..16]);

        field.clear();
        assert!(field.is_empty());
        assert!(field.grass_buffer().is_none());
        assert!(field.draw_list(&terrain, &view).is_empty());
        assert_eq!(field.density_at(&terrain, Vec3::new(0.5, 0.5, 0.0)), 0.0);
    }

    #[test]
    fn test_disabled_field_is_empty() {
        let terrain = flat(3, 3);
        let config = VegetationConfig { enabled: false, ..Default::default() };
        let mut field = field_for(&terrain, config);
        assert!(field.is_empty());
        assert!(field.grass_buffer().is_none());
        assert!(field.modify_vegetation(&terrain, Vec3::new(1.0, 1.0, 0.0), 1.0, &VegetationEdit::remove()).is_empty());
        assert_eq!(field.place_on_top(&terrain, Vec3::new(1.0, 1.0, 0.0), 1.0), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VegetationConfig { grass_width: -1.0, ..Default::default() };
        assert!(VegetationField::new(config, MemoryDevice).is_err());
    }
}
