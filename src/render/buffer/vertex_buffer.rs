//! `wgpu` vertex buffers

use super::{GpuBuffer, GpuDevice};

/// Device + queue pair used to create and fill vertex buffers.
#[derive(Clone, Debug)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl GpuDevice for WgpuDevice {
    type Buffer = WgpuVertexBuffer;

    fn create_buffer(&self, label: &str) -> WgpuVertexBuffer {
        WgpuVertexBuffer {
            device: self.device.clone(),
            queue: self.queue.clone(),
            label: label.to_string(),
            buffer: None,
            size: 0,
        }
    }
}

/// Vertex buffer filled through `Queue::write_buffer`.
pub struct WgpuVertexBuffer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    label: String,
    buffer: Option<wgpu::Buffer>,
    size: u64,
}

impl WgpuVertexBuffer {
    /// Buffer to bind for drawing, if allocated
    pub fn raw(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }
}

/// Round up to the copy alignment `write_buffer` requires.
fn align_copy(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

impl GpuBuffer for WgpuVertexBuffer {
    fn allocate(&mut self, size: u64) {
        self.destroy();
        let aligned = align_copy(size.max(wgpu::COPY_BUFFER_ALIGNMENT));

        if aligned > 256 * 1024 * 1024 {
            log::warn!("{} buffer size: {}MB - ensure device limits are sufficient", self.label, aligned / 1024 / 1024);
        }

        self.buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: aligned,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.size = aligned;
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        let Some(buffer) = &self.buffer else {
            log::warn!("{}: write of {} bytes before allocation ignored", self.label, data.len());
            return;
        };
        debug_assert!(offset % wgpu::COPY_BUFFER_ALIGNMENT == 0);
        debug_assert!(data.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0);
        debug_assert!(offset + data.len() as u64 <= self.size);
        self.queue.write_buffer(buffer, offset, data);
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn destroy(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.size = 0;
    }
}

impl Drop for WgpuVertexBuffer {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_copy() {
        assert_eq!(align_copy(0), 0);
        assert_eq!(align_copy(1), 4);
        assert_eq!(align_copy(28), 28);
        assert_eq!(align_copy(30), 32);
    }
}
