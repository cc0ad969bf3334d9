//! Localized in-place edits of grass and flowers.
//!
//! Every edit touches only instances within a horizontal radius of its
//! center, never adds or removes array slots, and reports the index span it
//! changed so only that span is re-uploaded.

use std::ops::{Range, RangeInclusive};

use glam::{Vec3, Vec4};

use super::blade::GrassBlade;
use super::flower::{pack_color, Flower};
use crate::terrain::Terrain;

/// Muddy tint submerged blades drift towards.
const UNDERWATER_COLOR: [u8; 3] = [120, 100, 50];
/// Blend step towards [`UNDERWATER_COLOR`] per check.
const UNDERWATER_BLEND: f32 = 0.1;

/// Which operations an edit applies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VegetationEdit {
    /// Flatten blades away from the center.
    pub crush: bool,
    /// Darken towards black.
    pub burn: bool,
    /// Shorten blades, closer ones more.
    pub cut: bool,
    /// Tint submerged blades muddy.
    pub check_underwater: bool,
    /// Tombstone everything in range.
    pub remove: bool,
    /// Blend towards this color; alpha scales the strength.
    pub color: Option<Vec4>,
}

impl VegetationEdit {
    pub fn crush() -> Self {
        Self { crush: true, ..Default::default() }
    }

    pub fn burn() -> Self {
        Self { burn: true, ..Default::default() }
    }

    pub fn cut() -> Self {
        Self { cut: true, ..Default::default() }
    }

    pub fn remove() -> Self {
        Self { remove: true, ..Default::default() }
    }

    pub fn colorize(color: Vec4) -> Self {
        Self { color: Some(color), ..Default::default() }
    }

    /// Nothing would change.
    pub fn is_empty(&self) -> bool {
        !(self.crush || self.burn || self.cut || self.check_underwater || self.remove || self.color.is_some())
    }
}

/// Smallest index span containing every modified instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtySpan {
    span: Option<(usize, usize)>,
}

impl DirtySpan {
    pub fn mark(&mut self, i: usize) {
        self.span = Some(match self.span {
            Some((lo, hi)) => (lo.min(i), hi.max(i)),
            None => (i, i),
        });
    }

    pub fn union(&mut self, other: DirtySpan) {
        if let Some((lo, hi)) = other.span {
            self.mark(lo);
            self.mark(hi);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_none()
    }

    /// Half-open index range, empty if nothing was marked.
    pub fn range(&self) -> Range<usize> {
        match self.span {
            Some((lo, hi)) => lo..hi + 1,
            None => 0..0,
        }
    }
}

/// Cells and effective radius covered by an edit.
#[derive(Clone, Debug, PartialEq)]
pub struct EditBounds {
    pub radius: f32,
    pub x: RangeInclusive<i32>,
    pub y: RangeInclusive<i32>,
}

/// Cells an edit at `center` can reach, or `None` if it cannot touch any
/// grass.
///
/// With only height-field grass, edits entirely above the blade tips or
/// below the mesh do nothing, and a center above the tips shrinks the
/// radius to the chord at tip height.
pub fn edit_bounds<T: Terrain + ?Sized>(
    terrain: &T,
    center: Vec3,
    radius: f32,
    grass_length: f32,
    surface_grass: bool,
) -> Option<EditBounds> {
    if radius <= 0.0 || !terrain.is_over(center) {
        return None;
    }
    let mut radius = radius;
    if !surface_grass {
        let mh = terrain.interpolate_height(center.x, center.y);
        if center.z - radius > mh + grass_length || center.z + radius < mh {
            return None;
        }
        let height = center.z - (mh + grass_length);
        if height > 0.0 {
            radius = (radius * radius - height * height).max(1e-6).sqrt();
        }
    }
    let (x1, y1) = terrain.cell_of(center.x - radius, center.y - radius);
    let (x2, y2) = terrain.cell_of(center.x + radius, center.y + radius);
    let (w, h) = terrain.dims();
    // Polygon grass registered with a vertex may spill half a cell lower
    let x = (x1 - 1).max(0)..=x2.min(w as i32 - 1);
    let y = (y1 - 1).max(0)..=y2.min(h as i32 - 1);
    if x.is_empty() || y.is_empty() {
        return None;
    }
    Some(EditBounds { radius, x, y })
}

/// Apply `edit` to the blades `range` of cell `(x, y)`.
///
/// `water_gating` skips color and burn edits on submerged blades.
pub fn modify_grass_cell<T: Terrain + ?Sized>(
    blades: &mut [GrassBlade],
    range: Range<usize>,
    terrain: &T,
    (x, y): (usize, usize),
    center: Vec3,
    radius: f32,
    edit: &VegetationEdit,
    grass_length: f32,
    water_gating: bool,
) -> DirtySpan {
    let mut dirty = DirtySpan::default();
    if edit.is_empty() || range.is_empty() {
        return dirty;
    }
    let water = terrain.water_level(x, y);
    let maybe_underwater =
        (edit.burn || edit.check_underwater) && water.is_some_and(|level| terrain.height(x, y) <= level);
    let sn = terrain.surface_normal(x, y);
    let target = edit.color.map(|c| (pack_color(c), c.w));
    let radius_sq = radius * radius;

    for i in range {
        let g = &mut blades[i];
        if g.is_removed() {
            continue;
        }
        let (dx, dy) = (g.position.x - center.x, g.position.y - center.y);
        let dsq = dx * dx + dy * dy;
        if dsq > radius_sq {
            continue;
        }
        let reld = dsq.sqrt() / radius;
        let underwater = maybe_underwater && g.on_mesh;
        let gated = underwater && water_gating;
        let mut updated = false;

        if edit.cut {
            let length = g.length();
            if length > 0.25 * grass_length && reld < 1.0 {
                g.dir *= reld;
                updated = true;
            }
        }
        if edit.crush && !g.is_removed() {
            let length = g.length();
            // Not already flat against the surface
            if g.dir.dot(sn).abs() > 0.1 * length {
                let atten = 1.0 - (1.0 - reld) * (1.0 - reld);
                let new_dir = Vec3::new(dx, dy, -(sn.x * dx + sn.y * dy) / sn.z).normalize_or_zero();
                // Not already aligned with the crush direction
                if new_dir != Vec3::ZERO && g.dir.dot(new_dir) < 0.95 * length {
                    g.dir = (g.dir * (atten / length) + new_dir * (1.0 - atten)).normalize_or_zero() * length;
                    g.normal = (g.normal * atten + sn * (1.0 - atten)).normalize_or_zero();
                    updated = true;
                }
            }
        }
        if let Some((rgb, alpha)) = target {
            if !gated && g.color[..] != rgb[..3] {
                let atten = 1.0 - alpha * (1.0 - reld) * (1.0 - reld);
                for c in 0..3 {
                    g.color[c] = (atten * g.color[c] as f32 + (1.0 - atten) * rgb[c] as f32) as u8;
                }
                updated = true;
            }
        }
        if edit.burn && !gated && g.color.iter().any(|&c| c > 0) {
            let atten = 1.0 - (1.0 - reld) * (1.0 - reld);
            let burned = g.color.map(|c| (atten * c as f32) as u8);
            if burned != g.color {
                g.color = burned;
                updated = true;
            }
        }
        if edit.check_underwater && underwater && g.color != UNDERWATER_COLOR {
            if water.is_some_and(|level| g.position.z + g.length() <= level) {
                for c in 0..3 {
                    g.color[c] = ((1.0 - UNDERWATER_BLEND) * g.color[c] as f32
                        + UNDERWATER_BLEND * UNDERWATER_COLOR[c] as f32) as u8;
                }
                updated = true;
            }
        }
        if edit.remove {
            g.remove();
            updated = true;
        }
        if updated {
            dirty.mark(i);
        }
    }
    dirty
}

/// Re-snap the on-mesh blades `range` to the current terrain height.
pub fn mesh_height_change<T: Terrain + ?Sized>(
    blades: &mut [GrassBlade],
    range: Range<usize>,
    terrain: &T,
    tolerance: f32,
) -> DirtySpan {
    let mut dirty = DirtySpan::default();
    for i in range {
        let g = &mut blades[i];
        if !g.on_mesh || g.is_removed() {
            continue;
        }
        let mh = terrain.interpolate_height(g.position.x, g.position.y);
        if (g.position.z - mh).abs() > tolerance {
            g.position.z = mh;
            dirty.mark(i);
        }
    }
    dirty
}

/// Crush, burn or remove flowers within a horizontal radius.
///
/// Flowers are stored in increasing row order, so the scan stops once it
/// passes `center.y + radius` by more than a cell.
pub fn modify_flowers<T: Terrain + ?Sized>(
    flowers: &mut [Flower],
    terrain: &T,
    center: Vec3,
    radius: f32,
    (crush, burn, remove): (bool, bool, bool),
    grass_length: f32,
) -> DirtySpan {
    let mut dirty = DirtySpan::default();
    if !(crush || burn || remove) || radius <= 0.0 {
        return dirty;
    }
    let radius_sq = radius * radius;
    let y_end = center.y + radius + terrain.cell_size().y;

    for (i, flower) in flowers.iter_mut().enumerate() {
        if flower.position.y > y_end {
            break;
        }
        if flower.is_removed() {
            continue;
        }
        let dsq = (flower.position.x - center.x).powi(2) + (flower.position.y - center.y).powi(2);
        if dsq > radius_sq {
            continue;
        }
        let reld = dsq.sqrt() / radius;

        if remove {
            flower.remove();
            dirty.mark(i);
            continue;
        }
        let mut modified = false;
        if crush && flower.height > 0.05 * grass_length {
            let delta = flower.height * (2.0 * (1.0 - reld) * (1.0 - reld)).min(1.0);
            if delta > 0.0 {
                flower.position.z -= delta;
                flower.height -= delta;
                // Flattened flowers lie on the surface
                if flower.height < 0.1 * grass_length {
                    let (cx, cy) = terrain.cell_of(flower.position.x, flower.position.y);
                    if terrain.in_bounds(cx, cy) {
                        flower.normal = terrain.surface_normal(cx as usize, cy as usize);
                    }
                }
                modified = true;
            }
        }
        if burn && flower.color.truncate() != Vec3::ZERO {
            let atten = 1.0 - (1.0 - reld) * (1.0 - reld);
            let rgb = flower.color.truncate() * atten;
            let rgb = if (rgb.x + rgb.y + rgb.z) / 3.0 < 0.05 { Vec3::ZERO } else { rgb };
            flower.color = rgb.extend(flower.color.w);
            modified = true;
        }
        if modified {
            dirty.mark(i);
        }
    }
    dirty
}

/// Re-snap flowers whose cell lies within `cell_radius` cells of `(x, y)`.
pub fn flower_height_change<T: Terrain + ?Sized>(
    flowers: &mut [Flower],
    terrain: &T,
    (x, y): (i32, i32),
    cell_radius: i32,
) -> DirtySpan {
    let mut dirty = DirtySpan::default();
    for (i, flower) in flowers.iter_mut().enumerate() {
        let (fx, fy) = terrain.cell_of(flower.position.x, flower.position.y);
        if (fx - x).pow(2) + (fy - y).pow(2) > cell_radius * cell_radius {
            continue;
        }
        flower.position.z = terrain.interpolate_height(flower.position.x, flower.position.y) + flower.height;
        dirty.mark(i);
    }
    dirty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::HeightField;
    use glam::Vec2;

    const LEN: f32 = 0.02;

    fn terrain() -> HeightField {
        HeightField::flat(4, 4, Vec2::ZERO, Vec2::ONE, 0.0)
    }

    fn upright(x: f32, y: f32) -> GrassBlade {
        GrassBlade::new(Vec3::new(x, y, 0.0), Vec3::Z * LEN, Vec3::X, [40, 160, 20], 0.002, true)
    }

    fn edit_one(blades: &mut [GrassBlade], center: Vec3, radius: f32, edit: VegetationEdit) -> DirtySpan {
        let n = blades.len();
        modify_grass_cell(blades, 0..n, &terrain(), (0, 0), center, radius, &edit, LEN, true)
    }

    #[test]
    fn test_dirty_span() {
        let mut d = DirtySpan::default();
        assert!(d.is_empty());
        assert_eq!(d.range(), 0..0);
        d.mark(5);
        d.mark(2);
        assert_eq!(d.range(), 2..6);
        let mut e = DirtySpan::default();
        e.mark(9);
        d.union(e);
        assert_eq!(d.range(), 2..10);
    }

    #[test]
    fn test_edit_bounds() {
        let t = terrain();
        let b = edit_bounds(&t, Vec3::new(1.5, 1.5, 0.0), 0.2, LEN, false).unwrap();
        assert_eq!(b.x, 0..=1);
        assert_eq!(b.y, 0..=1);
        assert_eq!(b.radius, 0.2);
        // Far above the grass
        assert!(edit_bounds(&t, Vec3::new(1.5, 1.5, 5.0), 0.2, LEN, false).is_none());
        // Below the mesh
        assert!(edit_bounds(&t, Vec3::new(1.5, 1.5, -5.0), 0.2, LEN, false).is_none());
        // Off the terrain
        assert!(edit_bounds(&t, Vec3::new(-3.0, 1.5, 0.0), 0.2, LEN, false).is_none());
        // Above the tips: chord radius
        let b = edit_bounds(&t, Vec3::new(1.5, 1.5, LEN + 0.3), 0.5, LEN, false).unwrap();
        assert!((b.radius - 0.4).abs() < 1e-5);
        // Surface grass keeps the full radius
        let b = edit_bounds(&t, Vec3::new(1.5, 1.5, LEN + 0.3), 0.5, LEN, true).unwrap();
        assert_eq!(b.radius, 0.5);
        // A radius far larger than the terrain stays within its cells
        let b = edit_bounds(&t, Vec3::new(1.5, 1.5, 0.0), 1000.0, LEN, true).unwrap();
        assert_eq!(b.x, 0..=3);
        assert_eq!(b.y, 0..=3);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut blades = vec![upright(0.2, 0.2), upright(0.5, 0.5), upright(0.8, 0.8)];
        let d = edit_one(&mut blades, Vec3::new(0.5, 0.5, 0.0), 0.01, VegetationEdit::remove());
        assert_eq!(d.range(), 1..2);
        assert!(blades[1].is_removed());
        assert!(!blades[0].is_removed() && !blades[2].is_removed());
        let snapshot = blades.clone();
        let d = edit_one(&mut blades, Vec3::new(0.5, 0.5, 0.0), 0.01, VegetationEdit::remove());
        assert!(d.is_empty());
        assert_eq!(blades, snapshot);
    }

    #[test]
    fn test_cut_until_minimum() {
        let mut blades = vec![upright(0.5, 0.5)];
        let center = Vec3::new(0.25, 0.5, 0.0);
        let mut rounds = 0;
        while !edit_one(&mut blades, center, 0.5, VegetationEdit::cut()).is_empty() {
            rounds += 1;
            assert!(rounds < 10);
        }
        // reld = 0.5 halves the length until it drops under a quarter
        assert_eq!(rounds, 2);
        assert!(blades[0].length() <= 0.25 * LEN + 1e-7);
        assert!(blades[0].length() > 0.0);
    }

    #[test]
    fn test_crush_flattens_and_terminates() {
        let mut blades = vec![upright(0.5, 0.5)];
        let center = Vec3::new(0.4, 0.5, 0.0);
        let mut rounds = 0;
        while !edit_one(&mut blades, center, 0.5, VegetationEdit::crush()).is_empty() {
            rounds += 1;
            assert!(rounds < 100, "crush never settles");
        }
        assert!(rounds > 0);
        let g = blades[0];
        assert!((g.length() - LEN).abs() < 1e-6);
        // Leaning away from the center
        assert!(g.dir.x > 0.0);
        assert!(g.dir.z.abs() <= 0.1 * LEN + 1e-6 || g.dir.normalize().x >= 0.95 - 1e-4);
    }

    #[test]
    fn test_burn_to_black() {
        let mut blades = vec![upright(0.5, 0.5)];
        let d = edit_one(&mut blades, Vec3::new(0.5, 0.5, 0.0), 0.3, VegetationEdit::burn());
        assert_eq!(d.range(), 0..1);
        assert_eq!(blades[0].color, [0, 0, 0]);
        assert!(edit_one(&mut blades, Vec3::new(0.5, 0.5, 0.0), 0.3, VegetationEdit::burn()).is_empty());
    }

    #[test]
    fn test_burn_at_rim_is_clean() {
        // reld == 1 leaves the color as it is
        let mut blades = vec![upright(0.5, 0.5)];
        assert!(edit_one(&mut blades, Vec3::new(0.25, 0.5, 0.0), 0.25, VegetationEdit::burn()).is_empty());
        assert_eq!(blades[0].color, [40, 160, 20]);
    }

    #[test]
    fn test_colorize_falloff() {
        let mut blades = vec![upright(0.5, 0.5), upright(0.75, 0.5)];
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        edit_one(&mut blades, Vec3::new(0.5, 0.5, 0.0), 0.5, VegetationEdit::colorize(red));
        assert_eq!(blades[0].color, [255, 0, 0]);
        // reld = 0.5: quarter of the way
        assert_eq!(blades[1].color, [93, 120, 15]);
        assert!(edit_one(&mut blades[..1], Vec3::new(0.5, 0.5, 0.0), 0.5, VegetationEdit::colorize(red)).is_empty());
    }

    #[test]
    fn test_underwater_blades() {
        let mut t = terrain();
        t.set_water_level(1.0);
        let mut blades = vec![upright(0.5, 0.5)];
        let edit = VegetationEdit { burn: true, check_underwater: true, ..Default::default() };
        let d = modify_grass_cell(&mut blades, 0..1, &t, (0, 0), Vec3::new(0.5, 0.5, 0.0), 0.3, &edit, LEN, true);
        assert_eq!(d.range(), 0..1);
        // Not burned, drifted towards mud
        let c = blades[0].color;
        assert!(c[0] > 40 && c[1] < 160 && c[2] > 0);

        // Without water gating burning applies too
        let mut blades = vec![upright(0.5, 0.5)];
        modify_grass_cell(&mut blades, 0..1, &t, (0, 0), Vec3::new(0.5, 0.5, 0.0), 0.3, &VegetationEdit::burn(), LEN, false);
        assert_eq!(blades[0].color, [0, 0, 0]);
    }

    #[test]
    fn test_colorize_under_water() {
        let mut t = terrain();
        t.set_water_level(1.0);
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let edit = VegetationEdit { color: Some(red), check_underwater: true, ..Default::default() };
        let center = Vec3::new(0.5, 0.5, 0.0);

        // Gated: only the mud drift applies, no red
        let mut blades = vec![upright(0.5, 0.5)];
        let d = modify_grass_cell(&mut blades, 0..1, &t, (0, 0), center, 0.3, &edit, LEN, true);
        assert_eq!(d.range(), 0..1);
        let c = blades[0].color;
        assert!(c[0] < 60 && c[1] > 140, "{c:?}");

        // Ungated: recolored at the center, then drifted
        let mut blades = vec![upright(0.5, 0.5)];
        modify_grass_cell(&mut blades, 0..1, &t, (0, 0), center, 0.3, &edit, LEN, false);
        let c = blades[0].color;
        assert!(c[0] > 200 && c[1] < 20, "{c:?}");
    }

    #[test]
    fn test_mesh_height_change() {
        let mut t = terrain();
        let mut blades = vec![upright(0.5, 0.5), upright(0.2, 0.2)];
        blades[1].on_mesh = false;
        assert!(mesh_height_change(&mut blades, 0..2, &t, 1e-5).is_empty());
        t.set_height(0, 0, 1.0);
        let d = mesh_height_change(&mut blades, 0..2, &t, 1e-5);
        assert_eq!(d.range(), 0..1);
        assert!((blades[0].position.z - 0.25).abs() < 1e-6);
        assert_eq!(blades[1].position.z, 0.0);
    }

    fn flower(x: f32, y: f32) -> Flower {
        Flower::new(Vec3::new(x, y, LEN), Vec3::new(0.1, 0.0, 1.0).normalize(), 0.004, LEN, Vec4::new(1.0, 1.0, 0.0, 1.0))
    }

    #[test]
    fn test_flower_crush_and_burn() {
        let t = terrain();
        let mut flowers = vec![flower(0.5, 0.5), flower(0.55, 0.5), flower(2.5, 2.5)];
        let d = modify_flowers(&mut flowers, &t, Vec3::new(0.5, 0.5, 0.0), 0.1, (true, false, false), LEN);
        assert_eq!(d.range(), 0..2);
        // Fully crushed at the center, flat on the surface
        assert_eq!(flowers[0].height, 0.0);
        assert_eq!(flowers[0].position.z, 0.0);
        assert_eq!(flowers[0].normal, Vec3::Z);
        // Half way out: delta = min(1, 2 * 0.25) of the height
        assert!((flowers[1].height - 0.5 * LEN).abs() < 1e-6);
        assert_eq!(flowers[2].height, LEN);
        // Crushed flowers are left alone
        let d = modify_flowers(&mut flowers[..1], &t, Vec3::new(0.5, 0.5, 0.0), 0.1, (true, false, false), LEN);
        assert!(d.is_empty());

        let d = modify_flowers(&mut flowers, &t, Vec3::new(0.5, 0.5, 0.0), 0.1, (false, true, false), LEN);
        assert_eq!(d.range(), 0..2);
        assert_eq!(flowers[0].color, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!(modify_flowers(&mut flowers[..1], &t, Vec3::new(0.5, 0.5, 0.0), 0.1, (false, true, false), LEN).is_empty());
    }

    #[test]
    fn test_flower_scan_stops_past_radius() {
        let t = terrain();
        // A flower past the scan window is not reached even though it is in range horizontally
        let mut flowers = vec![flower(0.5, 0.5), flower(0.5, 3.5), flower(0.5, 0.55)];
        let d = modify_flowers(&mut flowers, &t, Vec3::new(0.5, 0.5, 0.0), 0.1, (false, false, true), LEN);
        assert_eq!(d.range(), 0..1);
        assert!(flowers[0].is_removed());
        assert!(!flowers[2].is_removed());
    }

    #[test]
    fn test_flower_height_change() {
        let mut t = terrain();
        let mut flowers = vec![flower(0.5, 0.5), flower(3.5, 3.5)];
        t.set_height(0, 0, 1.0);
        t.set_height(1, 0, 1.0);
        t.set_height(0, 1, 1.0);
        t.set_height(1, 1, 1.0);
        let d = flower_height_change(&mut flowers, &t, (0, 0), 1);
        assert_eq!(d.range(), 0..1);
        assert!((flowers[0].position.z - (1.0 + LEN)).abs() < 1e-6);
        assert_eq!(flowers[1].position.z, LEN);
    }
}
