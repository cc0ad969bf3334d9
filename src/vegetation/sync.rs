//! Keeps a GPU vertex buffer in step with an instance array.

use std::ops::Range;

use bytemuck::Pod;

use crate::render::buffer::{GpuBuffer, GpuDevice};

/// Instances converted and written per upload block.
pub const UPLOAD_BLOCK_RECORDS: usize = 4096;

/// Validity tracking and uploads for one vertex buffer.
///
/// Every instance ("record") expands to a fixed number of vertices, so
/// record `i` lives at byte `i * record_bytes`. The buffer is sized once per
/// full upload and never shrinks when instances are tombstoned.
pub struct BufferSync<B: GpuBuffer> {
    label: &'static str,
    record_bytes: u64,
    buffer: Option<B>,
    data_valid: bool,
    uploaded_bytes: u64,
}

impl<B: GpuBuffer> BufferSync<B> {
    /// `record_bytes` is the size of one instance's vertices.
    pub fn new(label: &'static str, record_bytes: usize) -> Self {
        Self {
            label,
            record_bytes: record_bytes as u64,
            buffer: None,
            data_valid: false,
            uploaded_bytes: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.data_valid
    }

    pub fn has_buffer(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&B> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut B> {
        self.buffer.as_mut()
    }

    /// Bytes written since creation.
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    /// Force a full re-upload on the next [`sync`](Self::sync).
    pub fn invalidate(&mut self) {
        self.data_valid = false;
    }

    /// Destroy the buffer object; the next sync recreates it.
    pub fn clear(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.data_valid = false;
    }

    /// Create the buffer if needed and, when invalid, upload all `count`
    /// records in blocks of [`UPLOAD_BLOCK_RECORDS`]. `fill` appends the
    /// vertices of a record range. Returns true if anything was uploaded.
    pub fn sync<D, V, F>(&mut self, device: &D, count: usize, fill: F) -> bool
    where
        D: GpuDevice<Buffer = B>,
        V: Pod,
        F: FnMut(Range<usize>, &mut Vec<V>),
    {
        if count == 0 {
            return false;
        }
        if self.buffer.is_none() {
            self.buffer = Some(device.create_buffer(self.label));
            self.data_valid = false;
        }
        if self.data_valid {
            return false;
        }
        let size = count as u64 * self.record_bytes;
        if let Some(buffer) = self.buffer.as_mut() {
            if buffer.size() != size {
                buffer.allocate(size);
            }
        }
        self.write_records(0..count, fill);
        self.data_valid = true;
        log::debug!("{}: uploaded {} records ({} bytes)", self.label, count, size);
        true
    }

    /// Re-upload only `range` after an in-place edit. Ignored until the
    /// first full upload has happened.
    pub fn upload_range<V, F>(&mut self, range: Range<usize>, fill: F)
    where
        V: Pod,
        F: FnMut(Range<usize>, &mut Vec<V>),
    {
        if range.is_empty() || !self.data_valid || self.buffer.is_none() {
            return;
        }
        self.write_records(range, fill);
    }

    fn write_records<V, F>(&mut self, range: Range<usize>, mut fill: F)
    where
        V: Pod,
        F: FnMut(Range<usize>, &mut Vec<V>),
    {
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        let mut scratch = Vec::new();
        let mut start = range.start;
        while start < range.end {
            let end = (start + UPLOAD_BLOCK_RECORDS).min(range.end);
            scratch.clear();
            fill(start..end, &mut scratch);
            let bytes: &[u8] = bytemuck::cast_slice(&scratch);
            debug_assert_eq!(bytes.len() as u64, (end - start) as u64 * self.record_bytes);
            buffer.write(start as u64 * self.record_bytes, bytes);
            self.uploaded_bytes += bytes.len() as u64;
            start = end;
        }
    }
}
