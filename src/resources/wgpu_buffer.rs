//! `wgpu` backed buffer allocation.
//!
//! Writes go into a CPU staging copy; `flush` uploads the staged bytes with a
//! single `Queue::write_buffer`.

use log::debug;

use crate::errors::{Result, SyncError};
use crate::resources::buffer::{
    BufferAllocator, BufferDesc, BufferId, GpuBuffer, next_buffer_id, staged_range,
};

pub struct WgpuBufferAllocator {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBufferAllocator {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl BufferAllocator for WgpuBufferAllocator {
    fn allocate(&self, desc: &BufferDesc) -> Result<Box<dyn GpuBuffer>> {
        let limit = self.device.limits().max_buffer_size;
        if desc.size > limit {
            return Err(SyncError::BufferCreation {
                label: desc.label.clone(),
                size: desc.size,
                reason: format!("exceeds device max_buffer_size {limit}"),
            });
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&desc.label),
            size: desc.size,
            usage: desc.usage,
            mapped_at_creation: false,
        });
        debug!("Allocated GPU buffer '{}' ({} bytes)", desc.label, desc.size);

        Ok(Box::new(WgpuBuffer {
            id: next_buffer_id(),
            buffer,
            queue: self.queue.clone(),
            staging: vec![0; desc.size as usize],
            dirty: false,
            destroyed: false,
        }))
    }
}

#[derive(Debug)]
pub struct WgpuBuffer {
    id: BufferId,
    buffer: wgpu::Buffer,
    queue: wgpu::Queue,
    staging: Vec<u8>,
    dirty: bool,
    destroyed: bool,
}

impl WgpuBuffer {
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl GpuBuffer for WgpuBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> u64 {
        self.staging.len() as u64
    }

    fn write(&mut self, offset: u64, bytes: &[u8]) {
        if self.destroyed {
            return;
        }
        if let Some(range) = staged_range(self.size(), offset, bytes.len()) {
            self.staging[range].copy_from_slice(bytes);
            self.dirty = true;
        }
    }

    fn flush(&mut self) {
        if self.destroyed || !self.dirty {
            return;
        }
        self.queue.write_buffer(&self.buffer, 0, &self.staging);
        self.dirty = false;
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.buffer.destroy();
            self.destroyed = true;
        }
    }
}
