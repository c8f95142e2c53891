//! GPU buffer seam.
//!
//! Units never talk to a graphics API directly. They allocate through a
//! [`BufferAllocator`] and own the returned [`GpuBuffer`] exclusively:
//! `write` stages bytes, `flush` uploads staged bytes to the device, and
//! `destroy` releases the allocation.
//!
//! [`CpuBufferAllocator`] keeps a versioned CPU shadow of every buffer it
//! hands out and stays inspectable after the fact, which is what headless
//! tooling and tests use.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use log::warn;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::errors::{Result, SyncError};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

pub type BufferId = u64;

/// Allocates a process-unique buffer id.
#[inline]
pub fn next_buffer_id() -> BufferId {
    NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Allocation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: String,
    pub usage: wgpu::BufferUsages,
    pub size: u64,
}

impl BufferDesc {
    /// A uniform buffer that is written from the CPU.
    #[must_use]
    pub fn uniform(label: &str, size: u64) -> Self {
        Self {
            label: label.to_string(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            size,
        }
    }
}

pub trait GpuBuffer: std::fmt::Debug {
    fn id(&self) -> BufferId;

    fn size(&self) -> u64;

    /// Stages `bytes` at `offset`. Writes past the end are dropped.
    fn write(&mut self, offset: u64, bytes: &[u8]);

    /// Uploads everything staged since the last flush.
    fn flush(&mut self);

    /// Releases the allocation. Further writes and flushes are ignored.
    fn destroy(&mut self);
}

pub trait BufferAllocator {
    fn allocate(&self, desc: &BufferDesc) -> Result<Box<dyn GpuBuffer>>;
}

/// Returns the writable range for `len` bytes at `offset`, or `None` when it
/// does not fit.
pub(crate) fn staged_range(size: u64, offset: u64, len: usize) -> Option<std::ops::Range<usize>> {
    let end = offset.checked_add(len as u64)?;
    if end > size {
        return None;
    }
    Some(offset as usize..end as usize)
}

// ============================================================================
// CPU shadow buffers
// ============================================================================

#[derive(Debug)]
pub struct DataBuffer {
    id: BufferId,
    label: String,
    usage: wgpu::BufferUsages,
    data: RwLock<Vec<u8>>,
    flushed: RwLock<Vec<u8>>,
    write_count: AtomicU64,
    flush_count: AtomicU64,
    destroy_count: AtomicU32,
    destroyed: AtomicBool,
}

/// Shared handle to a CPU shadow buffer.
///
/// The unit owns one clone through `Box<dyn GpuBuffer>`; the allocator keeps
/// another so the contents can be inspected.
#[derive(Debug, Clone)]
pub struct CpuBufferRef(Arc<DataBuffer>);

impl PartialEq for CpuBufferRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for CpuBufferRef {}

impl CpuBufferRef {
    #[must_use]
    pub fn new(desc: &BufferDesc) -> Self {
        let size = desc.size as usize;
        Self(Arc::new(DataBuffer {
            id: next_buffer_id(),
            label: desc.label.clone(),
            usage: desc.usage,
            data: RwLock::new(vec![0; size]),
            flushed: RwLock::new(vec![0; size]),
            write_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            destroy_count: AtomicU32::new(0),
            destroyed: AtomicBool::new(false),
        }))
    }

    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0.label
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> wgpu::BufferUsages {
        self.0.usage
    }

    /// Staged contents, including writes that have not been flushed.
    pub fn read_data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.0.data.read()
    }

    /// Contents as of the last flush, i.e. what the device would see.
    pub fn read_flushed(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.0.flushed.read()
    }

    #[inline]
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.0.write_count.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.0.flush_count.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn destroy_count(&self) -> u32 {
        self.0.destroy_count.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.load(Ordering::Relaxed)
    }
}

impl GpuBuffer for CpuBufferRef {
    fn id(&self) -> BufferId {
        self.0.id
    }

    fn size(&self) -> u64 {
        self.0.data.read().len() as u64
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) {
        if self.is_destroyed() {
            return;
        }
        let mut data = self.0.data.write();
        let Some(range) = staged_range(data.len() as u64, offset, bytes.len()) else {
            warn!(
                "Buffer '{}': write of {} bytes at {offset} exceeds size {}",
                self.0.label,
                bytes.len(),
                data.len()
            );
            return;
        };
        data[range].copy_from_slice(bytes);
        self.0.write_count.fetch_add(1, Ordering::Relaxed);
    }

    fn flush(&mut self) {
        if self.is_destroyed() {
            return;
        }
        let data = self.0.data.read();
        self.0.flushed.write().copy_from_slice(&data);
        self.0.flush_count.fetch_add(1, Ordering::Relaxed);
    }

    fn destroy(&mut self) {
        self.0.destroy_count.fetch_add(1, Ordering::Relaxed);
        self.0.destroyed.store(true, Ordering::Relaxed);
    }
}

/// Allocator producing [`CpuBufferRef`]s and remembering every one of them.
#[derive(Debug, Default)]
pub struct CpuBufferAllocator {
    buffers: Mutex<Vec<CpuBufferRef>>,
    max_buffer_size: Option<u64>,
}

impl CpuBufferAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects allocations larger than `limit`, like a device limit would.
    #[must_use]
    pub fn with_max_buffer_size(limit: u64) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_buffer_size: Some(limit),
        }
    }

    /// Every buffer allocated so far, in allocation order.
    #[must_use]
    pub fn buffers(&self) -> Vec<CpuBufferRef> {
        self.buffers.lock().clone()
    }

    /// Most recent buffer allocated with `label`.
    #[must_use]
    pub fn find(&self, label: &str) -> Option<CpuBufferRef> {
        self.buffers.lock().iter().rev().find(|b| b.label() == label).cloned()
    }

    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.buffers.lock().len()
    }
}

impl BufferAllocator for CpuBufferAllocator {
    fn allocate(&self, desc: &BufferDesc) -> Result<Box<dyn GpuBuffer>> {
        if let Some(limit) = self.max_buffer_size
            && desc.size > limit
        {
            return Err(SyncError::BufferCreation {
                label: desc.label.clone(),
                size: desc.size,
                reason: format!("exceeds max buffer size {limit}"),
            });
        }
        let buffer = CpuBufferRef::new(desc);
        self.buffers.lock().push(buffer.clone());
        Ok(Box::new(buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_flush_publishes_bytes() {
        let allocator = CpuBufferAllocator::new();
        let mut buffer = allocator.allocate(&BufferDesc::uniform("Test", 8)).unwrap();
        buffer.write(4, &[1, 2, 3, 4]);

        let shadow = allocator.find("Test").unwrap();
        assert_eq!(&shadow.read_data()[4..], &[1, 2, 3, 4]);
        assert_eq!(&shadow.read_flushed()[4..], &[0, 0, 0, 0]);

        buffer.flush();
        assert_eq!(&shadow.read_flushed()[4..], &[1, 2, 3, 4]);
        assert_eq!(shadow.write_count(), 1);
        assert_eq!(shadow.flush_count(), 1);
    }

    #[test]
    fn out_of_range_write_is_dropped() {
        let allocator = CpuBufferAllocator::new();
        let mut buffer = allocator.allocate(&BufferDesc::uniform("Small", 4)).unwrap();
        buffer.write(2, &[9, 9, 9, 9]);
        buffer.write(u64::MAX, &[1]);

        let shadow = allocator.find("Small").unwrap();
        assert_eq!(shadow.write_count(), 0);
        assert_eq!(&shadow.read_data()[..], &[0, 0, 0, 0]);
    }

    #[test]
    fn destroyed_buffer_ignores_writes() {
        let allocator = CpuBufferAllocator::new();
        let mut buffer = allocator.allocate(&BufferDesc::uniform("Gone", 4)).unwrap();
        buffer.destroy();
        buffer.write(0, &[1]);
        buffer.flush();

        let shadow = allocator.find("Gone").unwrap();
        assert!(shadow.is_destroyed());
        assert_eq!(shadow.destroy_count(), 1);
        assert_eq!(shadow.flush_count(), 0);
    }

    #[test]
    fn allocation_over_limit_fails() {
        let allocator = CpuBufferAllocator::with_max_buffer_size(16);
        let err = allocator.allocate(&BufferDesc::uniform("Big", 32)).unwrap_err();
        assert!(matches!(err, SyncError::BufferCreation { size: 32, .. }));
        assert_eq!(allocator.allocation_count(), 0);
    }

    #[test]
    fn buffer_ids_are_unique() {
        let allocator = CpuBufferAllocator::new();
        let a = allocator.allocate(&BufferDesc::uniform("A", 4)).unwrap();
        let b = allocator.allocate(&BufferDesc::uniform("B", 4)).unwrap();
        assert_ne!(a.id(), b.id());
    }
}
