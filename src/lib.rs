//! Verdure - procedural grass and flower fields
//!
//! Places grass blades and flowers over a height-field terrain, builds LOD
//! levels by greedy merging, applies localized runtime edits (crush, cut,
//! burn, recolor, remove) and keeps GPU vertex mirrors incrementally in sync.

pub mod core;
pub mod math;
pub mod terrain;
pub mod render;
pub mod vegetation;
