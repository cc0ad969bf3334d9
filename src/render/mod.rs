//! Rendering backend interfaces

pub mod buffer;
