//! Procedural grass and flower field.
//!
//! Blades are placed per terrain cell by density, slope, ground texture,
//! water and sky occlusion, stored contiguously by cell, edited in place
//! (crush, cut, burn, recolor, remove) and mirrored into GPU vertex buffers
//! one dirty span at a time. [`VegetationField`] ties it together;
//! [`TiledGrass`] is the separate repeating LOD grass used by tiled
//! terrain.

pub mod blade;
pub mod config;
pub mod factory;
pub mod field;
pub mod flower;
pub mod index;
pub mod lod;
pub mod mutation;
pub mod noise_field;
pub mod params;
pub mod placement;
pub mod rng;
pub mod sync;
pub mod visibility;

pub use blade::{GrassBlade, GrassVertex, VERTS_PER_BLADE};
pub use config::VegetationConfig;
pub use field::{EditReport, VegetationField};
pub use flower::{Flower, FlowerVertex, FLOWER_QUAD_INDICES, VERTS_PER_FLOWER};
pub use index::CellIndex;
pub use lod::{LodGrass, TiledGrass};
pub use mutation::{DirtySpan, VegetationEdit};
pub use params::VegetationParams;
pub use visibility::{DrawList, ViewState};
