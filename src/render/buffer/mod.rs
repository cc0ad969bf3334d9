//! GPU buffer management
//!
//! The vegetation field only needs an opaque vertex buffer it can allocate,
//! partially overwrite and destroy. [`GpuBuffer`] and [`GpuDevice`] are that
//! seam; `wgpu` and in-memory implementations live beside them.

pub mod vertex_buffer;
pub mod memory;

pub use vertex_buffer::{WgpuDevice, WgpuVertexBuffer};
pub use memory::{MemoryBuffer, MemoryDevice};

/// Writable GPU buffer object.
pub trait GpuBuffer {
    /// Allocate `size` bytes of storage, discarding previous contents.
    fn allocate(&mut self, size: u64);

    /// Overwrite `data.len()` bytes starting at byte `offset`.
    fn write(&mut self, offset: u64, data: &[u8]);

    /// Allocated size in bytes (0 before allocation or after destroy).
    fn size(&self) -> u64;

    /// Release the storage.
    fn destroy(&mut self);
}

/// Creates buffer objects.
pub trait GpuDevice {
    type Buffer: GpuBuffer;

    fn create_buffer(&self, label: &str) -> Self::Buffer;
}
