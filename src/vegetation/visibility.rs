//! Per-cell grass culling and draw range coalescing.

use std::ops::Range;

use glam::Vec3;

use super::index::CellIndex;
use crate::math::{Aabb, Frustum};
use crate::terrain::{OccluderId, Occluders, Terrain};

/// Camera state for one frame.
#[derive(Clone, Copy, Debug)]
pub struct ViewState {
    pub eye: Vec3,
    pub frustum: Frustum,
    /// Frame counter; staggers occluder refreshes across rows.
    pub frame: u64,
    /// Test cells against occluders.
    pub occlusion_culling: bool,
}

impl ViewState {
    pub fn new(eye: Vec3, frustum: Frustum, frame: u64) -> Self {
        Self { eye, frustum, frame, occlusion_culling: true }
    }
}

/// Blade ranges to draw this frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DrawList {
    /// Coalesced runs of visible cells.
    pub far: Vec<Range<usize>>,
    /// Cells close to the camera, drawn in a second pass without culling
    /// their blades.
    pub near: Vec<Range<usize>>,
}

impl DrawList {
    pub fn is_empty(&self) -> bool {
        self.far.is_empty() && self.near.is_empty()
    }

    /// Total blades across both passes.
    pub fn blade_count(&self) -> usize {
        self.far.iter().chain(&self.near).map(|r| r.len()).sum()
    }
}

/// Culls grass cells and remembers which occluder last hid each one.
#[derive(Clone, Debug, Default)]
pub struct GrassCuller {
    last_occluder: Vec<Option<OccluderId>>,
}

/// Per-field inputs to [`GrassCuller::cull`].
#[derive(Clone, Copy, Debug)]
pub struct CullParams {
    pub grass_length: f32,
    /// Cells whose corner is closer than this go to the near pass.
    pub near_distance: f32,
    /// Blades may stand on surfaces above the mesh.
    pub surface_grass: bool,
}

impl GrassCuller {
    /// Forget all memoized occluders (after regeneration).
    pub fn reset(&mut self) {
        self.last_occluder.clear();
    }

    /// Build the draw list for this frame.
    pub fn cull<T: Terrain + Occluders + ?Sized>(
        &mut self,
        terrain: &T,
        index: &CellIndex,
        view: &ViewState,
        params: &CullParams,
    ) -> DrawList {
        let mut list = DrawList::default();
        if index.is_empty() || index.len() == 0 {
            return list;
        }
        let (w, h) = index.dims();
        self.last_occluder.resize(w * h, None);

        let len = params.grass_length;
        let adj_camera = view.eye + Vec3::new(0.0, 0.0, 2.0 * len);
        let cell = terrain.cell_size();
        let top_z = terrain.max_height();
        let mut last_visible = false;
        let mut begin = 0;
        let mut last_occ_used: Option<OccluderId> = None;

        for y in 0..h {
            for x in 0..w {
                let range = index.range_for_cell(x, y);
                if range.is_empty() {
                    continue;
                }
                let ix = y * w + x;
                let mpos = terrain.vertex_pos(x, y);
                let mut visible;

                if x + 1 < w && y + 1 < h && back_facing(terrain, x, y, adj_camera) {
                    visible = false;
                } else {
                    let mut grass_top = mpos.z;
                    for (cx, cy) in [(x + 1, y), (x, y + 1), (x + 1, y + 1)] {
                        grass_top = grass_top.max(terrain.height(cx.min(w - 1), cy.min(h - 1)));
                    }
                    if params.surface_grass {
                        grass_top = grass_top.max(top_z);
                    }
                    let cube = Aabb::new(
                        Vec3::new(mpos.x - len, mpos.y - len, terrain.min_height(x, y)),
                        Vec3::new(mpos.x + cell.x + len, mpos.y + cell.y + len, grass_top + len),
                    );
                    visible = view.frustum.intersects_aabb(&cube);

                    if visible && view.occlusion_culling {
                        let mut memo = self.last_occluder[ix];
                        // Cells that were not hidden last time are only rechecked every 8th frame
                        if memo.is_some() || (view.frame + y as u64) & 7 == 0 {
                            let pts = cube.corners();
                            let shares_left = x > 0 && memo.is_some() && self.last_occluder[ix - 1] == memo;
                            let still_hidden = shares_left
                                && memo.is_some_and(|id| {
                                    !terrain.occluder_disabled(id) && terrain.occludes_all(id, view.eye, &pts[4..])
                                });
                            if still_hidden {
                                // The -X face was already checked with the left neighbor
                                visible = false;
                            } else {
                                let hint = memo.or(last_occ_used);
                                memo = terrain.find_occluder(view.eye, &pts, hint);
                                visible = memo.is_none();
                            }
                            if memo.is_some() {
                                last_occ_used = memo;
                            }
                            self.last_occluder[ix] = memo;
                        }
                    }
                }

                if visible && view.eye.distance(mpos) < params.near_distance {
                    list.near.push(range.clone());
                    visible = false;
                }
                if visible && !last_visible {
                    begin = range.start;
                } else if !visible && last_visible {
                    list.far.push(begin..range.start);
                }
                last_visible = visible;
            }
        }
        if last_visible {
            list.far.push(begin..index.len());
        }
        list
    }
}

/// All four corners of cell `(x, y)` face away from `camera`.
fn back_facing<T: Terrain + ?Sized>(terrain: &T, x: usize, y: usize, camera: Vec3) -> bool {
    [(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)]
        .iter()
        .all(|&(cx, cy)| terrain.surface_normal(cx, cy).dot(camera - terrain.vertex_pos(cx, cy)) < 0.0)
}
