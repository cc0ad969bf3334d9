//! CPU-side buffer mirror for headless use and tests

use super::{GpuBuffer, GpuDevice};

/// Creates [`MemoryBuffer`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryDevice;

impl GpuDevice for MemoryDevice {
    type Buffer = MemoryBuffer;

    fn create_buffer(&self, label: &str) -> MemoryBuffer {
        MemoryBuffer {
            label: label.to_string(),
            ..Default::default()
        }
    }
}

/// Write-log entries kept before the oldest half is dropped.
pub const WRITE_LOG_LIMIT: usize = 1024;

/// Byte vector standing in for a GPU buffer. Logs the most recent writes
/// (at most [`WRITE_LOG_LIMIT`]) so callers can check what was re-uploaded.
#[derive(Clone, Debug, Default)]
pub struct MemoryBuffer {
    pub label: String,
    bytes: Vec<u8>,
    allocations: u32,
    writes: Vec<(u64, u64)>,
}

impl MemoryBuffer {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of `allocate` calls so far
    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    /// `(offset, len)` of every write since the last [`clear_writes`](Self::clear_writes)
    pub fn writes(&self) -> &[(u64, u64)] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }
}

impl GpuBuffer for MemoryBuffer {
    fn allocate(&mut self, size: u64) {
        self.bytes = vec![0; size as usize];
        self.allocations += 1;
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        let end = start + data.len();
        assert!(end <= self.bytes.len(), "{}: write {}..{} past end {}", self.label, start, end, self.bytes.len());
        self.bytes[start..end].copy_from_slice(data);
        if self.writes.len() >= WRITE_LOG_LIMIT {
            self.writes.drain(..WRITE_LOG_LIMIT / 2);
        }
        self.writes.push((offset, data.len() as u64));
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn destroy(&mut self) {
        self.bytes = Vec::new();
    }
}
